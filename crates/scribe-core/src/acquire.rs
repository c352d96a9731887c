//! Interactive acquisition of capabilities
//!
//! The picker UI itself lives in the embedding application. This module
//! defines the contract and a path-based picker that adapts any UI which can
//! produce a path (or nothing, when the user dismisses it). A pick yields
//! either a directory capability or a single-file capability.

use crate::capability::Capability;
use async_trait::async_trait;
use scribe_config::{AccessMode, PickerConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why an acquisition produced no capability
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AcquisitionError {
    /// The user dismissed the picker
    #[error("user cancelled selection")]
    UserCancelled,

    /// The platform has no picker
    #[error("picking is not supported on this platform")]
    Unsupported,

    /// Anything else (invalid selection, platform failure)
    #[error("acquisition failed: {0}")]
    Failed(String),
}

/// Which files a file pick may return
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilter {
    description: String,
    extensions: Vec<String>,
}

impl FileFilter {
    /// Accepts any regular file
    pub fn any() -> Self {
        Self::default()
    }

    /// Extensions are matched case-insensitively, with or without a leading dot
    pub fn new<I, S>(description: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            description: description.into(),
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.contains(&ext))
    }
}

impl From<&PickerConfig> for FileFilter {
    fn from(config: &PickerConfig) -> Self {
        Self::new(config.file_description.clone(), &config.file_extensions)
    }
}

/// Interactive acquisition of directories and single files. Foreground only.
#[async_trait]
pub trait DirectoryPicker: Send + Sync {
    /// Whether the platform can show a picker at all
    fn is_supported(&self) -> bool {
        true
    }

    /// Show the picker and wait for the user. May block indefinitely.
    async fn pick_directory(&self, mode: AccessMode) -> Result<Capability, AcquisitionError>;

    /// Pick one file matching `filter`. Pickers without a file mode report
    /// [`AcquisitionError::Unsupported`].
    async fn pick_file(
        &self,
        _mode: AccessMode,
        _filter: &FileFilter,
    ) -> Result<Capability, AcquisitionError> {
        Err(AcquisitionError::Unsupported)
    }
}

type PathSource = Box<dyn Fn() -> Option<PathBuf> + Send + Sync>;

/// Picker backed by a closure that yields the chosen path, or `None` on dismissal
pub struct PathPicker {
    source: PathSource,
}

impl PathPicker {
    pub fn new<F>(source: F) -> Self
    where
        F: Fn() -> Option<PathBuf> + Send + Sync + 'static,
    {
        Self {
            source: Box::new(source),
        }
    }

    /// Always selects `path`
    pub fn fixed(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(move || Some(path.clone()))
    }

    /// Always dismissed
    pub fn dismissed() -> Self {
        Self::new(|| None)
    }
}

#[async_trait]
impl DirectoryPicker for PathPicker {
    async fn pick_directory(&self, mode: AccessMode) -> Result<Capability, AcquisitionError> {
        let path = (self.source)().ok_or(AcquisitionError::UserCancelled)?;

        let metadata = std::fs::metadata(&path)
            .map_err(|e| AcquisitionError::Failed(format!("{}: {}", path.display(), e)))?;
        if !metadata.is_dir() {
            return Err(AcquisitionError::Failed(format!("{} is not a directory", path.display())));
        }

        Ok(Capability::directory(path, mode))
    }

    async fn pick_file(
        &self,
        mode: AccessMode,
        filter: &FileFilter,
    ) -> Result<Capability, AcquisitionError> {
        let path = (self.source)().ok_or(AcquisitionError::UserCancelled)?;

        let metadata = std::fs::metadata(&path)
            .map_err(|e| AcquisitionError::Failed(format!("{}: {}", path.display(), e)))?;
        if !metadata.is_file() {
            return Err(AcquisitionError::Failed(format!("{} is not a file", path.display())));
        }
        if !filter.accepts(&path) {
            return Err(AcquisitionError::Failed(format!(
                "{} does not match '{}' ({})",
                path.display(),
                filter.description(),
                filter.extensions().join(", ")
            )));
        }

        Ok(Capability::file(path, mode))
    }
}
