pub mod import_config;
pub mod logging_config;
pub mod storage_config;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{GridError, GridResult};

pub use import_config::ImportConfig;
pub use logging_config::LoggingConfig;
pub use storage_config::StorageConfig;

/// Top-level configuration aggregating all subsystem configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GridConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub import: ImportConfig,
}

impl GridConfig {
    /// Load config from a TOML string, falling back to defaults for missing fields.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> GridResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| GridError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml(&text)
            .map_err(|e| GridError::Config(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "loaded gridstore config");
        Ok(config)
    }
}
