//! Alias configuration loading.
//!
//! Operators drop one JSON file per concern into the alias directory.
//! Files are merged in name order and an alias defined twice across the
//! set is a deployment error, not a silent override.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use fleet_dns_domain::{AliasConfig, AliasError};

#[derive(Error, Debug)]
pub enum AliasFilesError {
    #[error("Failed to read alias directory {0}: {1}")]
    ReadDir(String, String),

    #[error("Failed to read alias file {0}: {1}")]
    ReadFile(String, String),

    #[error("Invalid alias file {0}: {1}")]
    Invalid(String, #[source] AliasError),
}

/// Merges every `*.json` file under `dir`, in lexical file name order.
pub fn load_alias_directory(dir: &Path) -> Result<AliasConfig, AliasFilesError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| AliasFilesError::ReadDir(dir.display().to_string(), e.to_string()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| AliasFilesError::ReadDir(dir.display().to_string(), e.to_string()))?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut config = AliasConfig::new();
    for path in paths {
        let display_name = path.display().to_string();
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| AliasFilesError::ReadFile(display_name.clone(), e.to_string()))?;
        let file_config = AliasConfig::from_json(&raw)
            .map_err(|e| AliasFilesError::Invalid(display_name.clone(), e))?;

        debug!(file = %display_name, aliases = file_config.len(), "Loaded alias file");
        config
            .merge(file_config)
            .map_err(|e| AliasFilesError::Invalid(display_name, e))?;
    }

    Ok(config)
}
