//! File picker configuration

use serde::{Deserialize, Serialize};

/// Filter applied when the user picks a single file instead of a directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerConfig {
    /// Label shown next to the filter in the picker
    #[serde(default = "default_file_description")]
    pub file_description: String,
    /// Accepted extensions without the leading dot; empty accepts any file
    #[serde(default)]
    pub file_extensions: Vec<String>,
}

fn default_file_description() -> String {
    "Allowed files".to_string()
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            file_description: default_file_description(),
            file_extensions: Vec::new(),
        }
    }
}
