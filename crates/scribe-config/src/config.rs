//! Top-level configuration and loading

use crate::components::{
    ChannelConfig, LoggingConfig, PickerConfig, StoreConfig, TriggerConfig, WriterConfig,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the config file
    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is present but unusable
    #[error("invalid config value for '{field}': {reason}")]
    Invalid {
        /// Dotted path of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete scribe configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScribeConfig {
    /// Foreground trigger cadence
    #[serde(default)]
    pub trigger: TriggerConfig,
    /// Background write target and access mode
    #[serde(default)]
    pub writer: WriterConfig,
    /// Capability slot persistence
    #[serde(default)]
    pub store: StoreConfig,
    /// Channel endpoint
    #[serde(default)]
    pub channel: ChannelConfig,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
    /// File acquisition filter
    #[serde(default)]
    pub picker: PickerConfig,
}

impl ScribeConfig {
    /// Default config file path: `$XDG_CONFIG_HOME/scribe/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".config")
            })
            .join("scribe")
            .join("config.toml")
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: ScribeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file; the file must exist
    pub fn load(path: &Path) -> ConfigResult<Self> {
        debug!(path = %path.display(), "Loading scribe config");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from a file, using defaults if it does not exist
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            warn!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.trigger.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "trigger.interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }

        let name = self.writer.file_name.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid {
                field: "writer.file_name",
                reason: "must not be empty".to_string(),
            });
        }
        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(ConfigError::Invalid {
                field: "writer.file_name",
                reason: format!("'{}' must be a plain file name", name),
            });
        }

        if self.channel.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "channel.endpoint",
                reason: "must not be empty".to_string(),
            });
        }
        if let Some(ext) = self
            .picker
            .file_extensions
            .iter()
            .find(|ext| ext.trim_start_matches('.').trim().is_empty())
        {
            return Err(ConfigError::Invalid {
                field: "picker.file_extensions",
                reason: format!("'{}' is not an extension", ext),
            });
        }

        if self.channel.outcome_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "channel.outcome_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AccessMode;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_observed_behaviour() {
        let config = ScribeConfig::default();
        assert_eq!(config.trigger.interval(), Duration::from_millis(2000));
        assert_eq!(config.writer.file_name, "test.txt");
        assert_eq!(config.writer.label, "Written from main process trigger");
        assert_eq!(config.writer.access_mode, AccessMode::ReadWrite);
        assert_eq!(config.channel.endpoint, "/file_writer_sw.js");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = ScribeConfig::from_toml_str(
            r#"
            [trigger]
            interval_ms = 500

            [writer]
            access_mode = "read"
            "#,
        )
        .unwrap();

        assert_eq!(config.trigger.interval_ms, 500);
        assert_eq!(config.writer.access_mode, AccessMode::Read);
        assert_eq!(config.writer.file_name, "test.txt");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = ScribeConfig::from_toml_str("[trigger]\ninterval_ms = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "trigger.interval_ms",
                ..
            }
        ));
    }

    #[test]
    fn file_name_with_separator_is_rejected() {
        let err =
            ScribeConfig::from_toml_str("[writer]\nfile_name = \"../escape.txt\"\n").unwrap_err();
        assert!(err.to_string().contains("writer.file_name"));
    }

    #[test]
    fn blank_picker_extension_is_rejected() {
        let err = ScribeConfig::from_toml_str("[picker]\nfile_extensions = [\"mp4\", \".\"]\n")
            .unwrap_err();
        assert!(err.to_string().contains("picker.file_extensions"));
    }

    #[test]
    fn unknown_access_mode_fails_to_parse() {
        let err = ScribeConfig::from_toml_str("[writer]\naccess_mode = \"admin\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_or_default_without_file() {
        let tmp = TempDir::new().unwrap();
        let config = ScribeConfig::load_or_default(&tmp.path().join("missing.toml")).unwrap();
        assert_eq!(config, ScribeConfig::default());
    }

    #[test]
    fn load_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "[store]\npath = \"/var/lib/scribe/slot.json\"\n[channel]\nendpoint = \"/writer\"\n",
        )
        .unwrap();

        let config = ScribeConfig::load(&path).unwrap();
        assert_eq!(
            config.store.path,
            PathBuf::from("/var/lib/scribe/slot.json")
        );
        assert_eq!(config.channel.endpoint, "/writer");
    }

    #[test]
    fn default_path_is_namespaced() {
        let path = ScribeConfig::default_path();
        assert!(path.to_string_lossy().contains("scribe"));
        assert!(path.ends_with("config.toml"));
    }
}
