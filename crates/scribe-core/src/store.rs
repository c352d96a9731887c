//! Durable single-slot capability persistence
//!
//! The store holds at most one [`Capability`]. Writing `None` is an explicit
//! revoke, which [`FileCapabilityStore::slot`] reports separately from a slot
//! that was never written. Every write replaces the whole slot.
//!
//! # Slot File Format
//!
//! ```json
//! { "capability": { "id": "…", "kind": "directory", "name": "out", "path": "/data/out", "mode": "readwrite" } }
//! ```
//!
//! A revoked slot is `{ "capability": null }`; a never-set slot has no file.

use crate::capability::Capability;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from capability store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error reading/writing the slot
    #[error("capability store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The slot could not be serialized
    #[error("capability store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The slot file exists but does not hold a valid record
    #[error("capability slot at {path} is corrupt: {reason}")]
    Corrupt {
        /// Slot file path
        path: PathBuf,
        /// Parser message
        reason: String,
    },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Observable state of the single slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    /// Nothing was ever persisted
    NeverSet,
    /// Explicitly cleared
    Revoked,
    /// Holds a capability
    Occupied(Capability),
}

impl SlotState {
    /// The held capability, if any
    pub fn into_capability(self) -> Option<Capability> {
        match self {
            SlotState::Occupied(capability) => Some(capability),
            SlotState::NeverSet | SlotState::Revoked => None,
        }
    }
}

/// Durable single-slot storage for a capability.
///
/// Both execution contexts read through this trait; it is the only state they share.
pub trait CapabilityStore: Send + Sync {
    /// Read the slot. Both "never set" and "revoked" load as `None`.
    fn load(&self) -> StoreResult<Option<Capability>>;

    /// Overwrite the slot. `None` revokes.
    fn persist(&self, capability: Option<&Capability>) -> StoreResult<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SlotRecord {
    capability: Option<Capability>,
}

/// JSON-file backed store
///
/// Writes go to a temporary file in the slot's directory and are renamed over
/// the slot, so a reader never observes a partial record.
#[derive(Debug, Clone)]
pub struct FileCapabilityStore {
    path: PathBuf,
}

impl FileCapabilityStore {
    /// Create a store backed by the slot file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the path of the slot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the slot, distinguishing "never set" from "revoked"
    pub fn slot(&self) -> StoreResult<SlotState> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SlotState::NeverSet);
            }
            Err(e) => return Err(e.into()),
        };

        let record: SlotRecord =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        Ok(match record.capability {
            Some(capability) => SlotState::Occupied(capability),
            None => SlotState::Revoked,
        })
    }

    fn write(&self, record: &SlotRecord) -> StoreResult<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let json = serde_json::to_vec_pretty(record)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}

impl CapabilityStore for FileCapabilityStore {
    fn load(&self) -> StoreResult<Option<Capability>> {
        Ok(self.slot()?.into_capability())
    }

    fn persist(&self, capability: Option<&Capability>) -> StoreResult<()> {
        match capability {
            Some(cap) => debug!(
                capability = %cap.id(),
                path = %self.path.display(),
                "Persisting capability"
            ),
            None => debug!(path = %self.path.display(), "Revoking persisted capability"),
        }
        self.write(&SlotRecord {
            capability: capability.cloned(),
        })
    }
}

/// In-process store, for embedding without a filesystem slot and for tests
#[derive(Debug)]
pub struct MemoryCapabilityStore {
    slot: Mutex<SlotState>,
}

impl MemoryCapabilityStore {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(SlotState::NeverSet),
        }
    }

    /// Read the slot, distinguishing "never set" from "revoked"
    pub fn slot(&self) -> SlotState {
        self.slot.lock().clone()
    }
}

impl Default for MemoryCapabilityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityStore for MemoryCapabilityStore {
    fn load(&self) -> StoreResult<Option<Capability>> {
        Ok(self.slot.lock().clone().into_capability())
    }

    fn persist(&self, capability: Option<&Capability>) -> StoreResult<()> {
        *self.slot.lock() = match capability {
            Some(cap) => SlotState::Occupied(cap.clone()),
            None => SlotState::Revoked,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AccessMode;
    use tempfile::TempDir;

    fn store_in(tmp: &TempDir) -> FileCapabilityStore {
        FileCapabilityStore::new(tmp.path().join("state").join("capability.json"))
    }

    #[test]
    fn fresh_store_is_never_set() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);

        assert_eq!(store.slot().unwrap(), SlotState::NeverSet);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn persist_twice_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        let cap = Capability::directory(tmp.path(), AccessMode::ReadWrite);

        store.persist(Some(&cap)).unwrap();
        store.persist(Some(&cap)).unwrap();

        assert_eq!(store.load().unwrap(), Some(cap));
    }

    #[test]
    fn revoke_is_distinct_from_never_set() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        let cap = Capability::directory(tmp.path(), AccessMode::ReadWrite);

        store.persist(Some(&cap)).unwrap();
        store.persist(None).unwrap();

        assert_eq!(store.slot().unwrap(), SlotState::Revoked);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn second_persist_replaces_first() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        let first = Capability::directory(tmp.path().join("a"), AccessMode::ReadWrite);
        let second = Capability::directory(tmp.path().join("b"), AccessMode::Read);

        store.persist(Some(&first)).unwrap();
        store.persist(Some(&second)).unwrap();

        assert_eq!(store.load().unwrap(), Some(second));
    }

    #[test]
    fn survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let cap = Capability::file(tmp.path().join("out.txt"), AccessMode::ReadWrite);

        store_in(&tmp).persist(Some(&cap)).unwrap();
        let reopened = store_in(&tmp);

        assert_eq!(reopened.load().unwrap(), Some(cap));
    }

    #[test]
    fn corrupt_slot_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "not json").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn slot_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.persist(None).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn memory_store_tracks_revocation() {
        let store = MemoryCapabilityStore::new();
        assert_eq!(store.slot(), SlotState::NeverSet);

        let cap = Capability::directory("/tmp", AccessMode::ReadWrite);
        store.persist(Some(&cap)).unwrap();
        assert_eq!(store.load().unwrap(), Some(cap));

        store.persist(None).unwrap();
        assert_eq!(store.slot(), SlotState::Revoked);
        assert!(store.load().unwrap().is_none());
    }
}
