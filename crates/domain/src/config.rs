use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::names::fqdn;

const DEFAULT_DNS_PORT: u16 = 53;

/// Main configuration structure, deserialized from the JSON config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// How long the run loop waits for both listeners to confirm bound.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Upstream resolvers for names outside the local domain, `ip` or
    /// `ip:port` form.
    #[serde(default)]
    pub recursors: Vec<String>,

    #[serde(default = "default_recursor_timeout_ms")]
    pub recursor_timeout_ms: u64,

    /// Instance records dropped by the orchestrator. Without it the
    /// server still answers upcheck and recursor traffic.
    #[serde(default)]
    pub records_file: Option<String>,

    /// Directory of JSON alias files, merged in sorted order.
    #[serde(default)]
    pub alias_files_dir: Option<String>,

    #[serde(default = "default_local_domain")]
    pub local_domain: String,

    #[serde(default = "default_upcheck_domains")]
    pub upcheck_domains: Vec<String>,

    /// When set, rewrite the host resolver config so this server is the
    /// primary nameserver.
    #[serde(default)]
    pub override_nameserver: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_DNS_PORT
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_recursor_timeout_ms() -> u64 {
    2000
}

fn default_local_domain() -> String {
    "fleet.".to_string()
}

fn default_upcheck_domains() -> Vec<String> {
    vec!["healthcheck.fleet-dns.".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            timeout_ms: default_timeout_ms(),
            recursors: Vec::new(),
            recursor_timeout_ms: default_recursor_timeout_ms(),
            records_file: None,
            alias_files_dir: None,
            local_domain: default_local_domain(),
            upcheck_domains: default_upcheck_domains(),
            override_nameserver: false,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. fleet-dns.json in current directory
    /// 3. /etc/fleet-dns/config.json
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("fleet-dns.json").exists() {
            Self::from_file("fleet-dns.json")?
        } else if std::path::Path::new("/etc/fleet-dns/config.json").exists() {
            Self::from_file("/etc/fleet-dns/config.json")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        config.normalize();
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(address) = overrides.address {
            self.address = address;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
    }

    /// Canonicalizes domains to FQDN form and gives port-less recursors
    /// the standard DNS port.
    fn normalize(&mut self) {
        self.local_domain = fqdn(&self.local_domain);
        for domain in &mut self.upcheck_domains {
            *domain = fqdn(domain);
        }
        for recursor in &mut self.recursors {
            if let Ok(ip) = recursor.parse::<IpAddr>() {
                *recursor = SocketAddr::new(ip, DEFAULT_DNS_PORT).to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.is_empty() {
            return Err(ConfigError::Validation(
                "Bind address cannot be empty".to_string(),
            ));
        }
        if self.address.parse::<IpAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid bind address '{}'",
                self.address
            )));
        }
        if self.port == 0 {
            return Err(ConfigError::Validation("DNS port cannot be 0".to_string()));
        }
        for recursor in &self.recursors {
            if recursor.parse::<SocketAddr>().is_err() {
                return Err(ConfigError::Validation(format!(
                    "Invalid recursor address '{}'",
                    recursor
                )));
            }
        }
        if self.local_domain == "." {
            return Err(ConfigError::Validation(
                "Local domain cannot be the root".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn bind_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn recursor_timeout(&self) -> Duration {
        Duration::from_millis(self.recursor_timeout_ms)
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    FileRead(String, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
