//! Capability handles
//!
//! A [`Capability`] is an opaque reference to a directory or a single file,
//! carrying the access mode it was acquired under. Holding one does not imply
//! permission: every use must query [`crate::PermissionQuery`] first.

use scribe_config::AccessMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Stable identity of a capability across persistence round-trips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityId(Uuid);

impl CapabilityId {
    /// Create a new random capability ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CapabilityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cap-{}", self.0)
    }
}

/// What a capability points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    /// A directory; writes target a fixed-name file inside it
    Directory,
    /// A single file; writes replace its content
    File,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityKind::Directory => write!(f, "directory"),
            CapabilityKind::File => write!(f, "file"),
        }
    }
}

/// Opaque, scoped reference to a filesystem location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    id: CapabilityId,
    kind: CapabilityKind,
    name: String,
    path: PathBuf,
    mode: AccessMode,
}

impl Capability {
    /// Create a capability for `path`.
    ///
    /// The display name is the last path component, or the whole path when
    /// there is none (e.g. `/`).
    pub fn new(kind: CapabilityKind, path: impl Into<PathBuf>, mode: AccessMode) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            id: CapabilityId::new(),
            kind,
            name,
            path,
            mode,
        }
    }

    /// Directory capability
    pub fn directory(path: impl Into<PathBuf>, mode: AccessMode) -> Self {
        Self::new(CapabilityKind::Directory, path, mode)
    }

    /// Single-file capability
    pub fn file(path: impl Into<PathBuf>, mode: AccessMode) -> Self {
        Self::new(CapabilityKind::File, path, mode)
    }

    pub fn id(&self) -> CapabilityId {
        self.id
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    /// Display identifier
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Access mode the capability was acquired under
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Resolve the write target for this capability.
    ///
    /// Directory capabilities resolve to `<dir>/<file_name>`; file capabilities
    /// are their own target.
    pub fn target_path(&self, file_name: &str) -> PathBuf {
        match self.kind {
            CapabilityKind::Directory => self.path.join(file_name),
            CapabilityKind::File => self.path.clone(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.kind, self.name, self.mode)
    }
}
