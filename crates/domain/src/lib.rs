//! Fleet DNS Domain Layer
pub mod aliases;
pub mod config;
pub mod errors;
pub mod health;
pub mod names;
pub mod protocol;
pub mod records;

pub use aliases::{AliasConfig, AliasError};
pub use config::{CliOverrides, Config, ConfigError};
pub use errors::DnsError;
pub use health::HealthState;
pub use protocol::Protocol;
pub use records::{InstanceRecord, RecordSet, RecordsError};
