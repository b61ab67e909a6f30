//! # Fleet DNS Infrastructure Layer
//!
//! Adapters that plug the application ports into the outside world:
//! network listeners and the wire codec, the records file repository,
//! the resolv.conf manager, and the system clock and process runner.

pub mod alias_files;
pub mod clock;
pub mod dns;
pub mod health_store;
pub mod net;
pub mod records;
pub mod resolv_conf;
pub mod system_command;

pub use clock::SystemClock;
pub use health_store::InstanceHealthTable;
pub use net::NetDialer;
pub use records::{FileRecordSource, StaticRecordSource};
pub use resolv_conf::{ResolvConfError, ResolvConfManager};
pub use system_command::ExecCommandRunner;
