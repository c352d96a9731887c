//! Capability store configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the single capability slot is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the slot file
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

/// Default slot path: `$XDG_DATA_HOME/scribe/capability.json`
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".local")
                .join("share")
        })
        .join("scribe")
        .join("capability.json")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}
