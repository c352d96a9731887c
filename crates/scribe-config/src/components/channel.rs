//! Foreground/background channel configuration

use serde::{Deserialize, Serialize};

/// Endpoint the background context registers at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Fixed registration endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Capacity of the background outcome broadcast
    #[serde(default = "default_outcome_capacity")]
    pub outcome_capacity: usize,
}

fn default_endpoint() -> String {
    "/file_writer_sw.js".to_string()
}

fn default_outcome_capacity() -> usize {
    64
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            outcome_capacity: default_outcome_capacity(),
        }
    }
}
