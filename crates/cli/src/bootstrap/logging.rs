use fleet_dns_domain::Config;
use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// The level comes from the config file; `RUST_LOG` overrides it when
/// set, e.g. `RUST_LOG=fleet_dns_infrastructure=debug`.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
