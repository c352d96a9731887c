//! # Scribe Core
//!
//! Data model and leaf components for granting, persisting and exercising a
//! scoped write capability.
//!
//! - [`Capability`]: opaque handle to a directory or file, owned by the store once persisted
//! - [`CapabilityStore`]: durable single-slot persistence
//! - [`PermissionQuery`] / [`PermissionRequest`]: permission state, with interactive
//!   escalation split into its own trait so non-interactive code cannot reach it
//! - [`DirectoryPicker`]: the interactive acquisition interface, for directories and
//!   single files filtered by [`FileFilter`]
//! - [`ChannelMessage`]: the foreground to background message schema

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod acquire;
pub mod capability;
pub mod error;
pub mod permission;
pub mod protocol;
pub mod store;

pub use acquire::{AcquisitionError, DirectoryPicker, FileFilter, PathPicker};
pub use capability::{Capability, CapabilityId, CapabilityKind};
pub use error::{ScribeError, ScribeResult};
pub use permission::{
    AutoConsent, ConsentPrompt, ConsentResponse, GrantRegistry, InteractiveValidator,
    PermissionDescriptor, PermissionQuery, PermissionRequest, PermissionState,
};
pub use protocol::{ChannelMessage, ProtocolError, PROTOCOL_VERSION};
pub use scribe_config::AccessMode;
pub use store::{
    CapabilityStore, FileCapabilityStore, MemoryCapabilityStore, SlotState, StoreError,
    StoreResult,
};
