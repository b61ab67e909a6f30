mod clock;
mod command_runner;
mod dialer;
mod domain_resolver;
mod health_check;
mod instance_health;
mod record_source;

pub use clock::Clock;
pub use command_runner::{CommandError, CommandRunner};
pub use dialer::{Connection, Dialer};
pub use domain_resolver::DomainResolver;
pub use health_check::{HealthCheck, HealthCheckError};
pub use instance_health::InstanceHealth;
pub use record_source::RecordSource;
