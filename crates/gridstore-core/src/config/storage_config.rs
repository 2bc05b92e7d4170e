//! Backing store configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file. Default: "./data/gridstore.db".
    pub db_path: Option<String>,
    /// Reader connections beside the single writer. Default: 4.
    pub read_pool_size: Option<usize>,
    /// Lock wait before a statement fails with SQLITE_BUSY. Default: 5000.
    pub busy_timeout_ms: Option<u64>,
}

impl StorageConfig {
    pub fn effective_db_path(&self) -> &str {
        self.db_path.as_deref().unwrap_or("./data/gridstore.db")
    }

    pub fn effective_read_pool_size(&self) -> usize {
        match self.read_pool_size {
            Some(0) | None => 4,
            Some(n) => n,
        }
    }

    pub fn effective_busy_timeout_ms(&self) -> u64 {
        self.busy_timeout_ms.unwrap_or(5000)
    }
}
