//! Import defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ImportConfig {
    /// Discard unresolved headers instead of rejecting the import. Default: false.
    pub allow_unknown_columns: Option<bool>,
}

impl ImportConfig {
    pub fn effective_allow_unknown_columns(&self) -> bool {
        self.allow_unknown_columns.unwrap_or(false)
    }
}
