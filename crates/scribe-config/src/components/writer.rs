//! Background writer configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Access mode a capability is acquired, queried and requested under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Read-only access
    Read,
    /// Read and write access
    #[default]
    ReadWrite,
}

impl AccessMode {
    /// Whether this mode permits writing
    pub fn allows_write(&self) -> bool {
        matches!(self, AccessMode::ReadWrite)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Read => write!(f, "read"),
            AccessMode::ReadWrite => write!(f, "readwrite"),
        }
    }
}

/// What the background writes and under which access mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Name of the target file created inside a directory capability
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Fixed label written before the timestamp
    #[serde(default = "default_label")]
    pub label: String,
    /// Access mode the foreground acquires and requests under. The background
    /// always queries `readwrite`, so `read` never produces writes.
    #[serde(default)]
    pub access_mode: AccessMode,
}

fn default_file_name() -> String {
    "test.txt".to_string()
}

fn default_label() -> String {
    "Written from main process trigger".to_string()
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            label: default_label(),
            access_mode: AccessMode::default(),
        }
    }
}
