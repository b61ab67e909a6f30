mod logging;

pub use logging::init_logging;

use fleet_dns_domain::{CliOverrides, Config};

/// Loads and validates the configuration before anything else runs, so a
/// malformed file fails the process with a clear error instead of a
/// half-started server.
pub fn load_config(path: Option<&str>, overrides: CliOverrides) -> anyhow::Result<Config> {
    let config = Config::load(path, overrides)?;
    config.validate()?;
    Ok(config)
}
