//! Foreground controller.
//!
//! Owns the interactive side of the capability lifecycle: picking a
//! directory or a single file, restoring the persisted one at startup, re-authorizing an
//! expired one, and clearing it. While a capability exists it also runs the
//! trigger ticker, which posts `WRITE_INTERVAL_FILE` to the background once
//! per interval after the channel reports ready.
//!
//! ## State Machine
//!
//! ```text
//! NoCapability --pick directory/file (granted)--> Granted
//! NoCapability --restore (granted)--> Granted
//! NoCapability --restore (prompt/denied/unknown)--> NeedsReauthorization
//! NeedsReauthorization --reauthorize (granted)--> Granted
//! any --clear--> NoCapability
//! ```

use parking_lot::{Mutex, RwLock};
use scribe_core::{
    AcquisitionError, Capability, CapabilityKind, CapabilityStore, ChannelMessage,
    DirectoryPicker, FileFilter, PermissionDescriptor, PermissionRequest, PermissionState,
    ScribeError, ScribeResult,
};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::channel::ChannelHandle;

const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    NoCapability,
    Granted(Capability),
    /// Capability kept, but permission must be requested again
    NeedsReauthorization(Capability),
}

impl ControllerState {
    pub fn capability(&self) -> Option<&Capability> {
        match self {
            ControllerState::NoCapability => None,
            ControllerState::Granted(cap) | ControllerState::NeedsReauthorization(cap) => {
                Some(cap)
            }
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, ControllerState::Granted(_))
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::NoCapability => write!(f, "no capability"),
            ControllerState::Granted(cap) => write!(f, "granted ({})", cap.name()),
            ControllerState::NeedsReauthorization(cap) => {
                write!(f, "needs reauthorization ({})", cap.name())
            }
        }
    }
}

/// What the UI should react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    StateChanged(ControllerState),
    /// Picker dismissed; nothing changed
    AcquisitionCancelled,
    AcquisitionFailed(String),
    PermissionNotGranted(PermissionState),
    Cleared,
}

pub struct ForegroundController {
    store: Arc<dyn CapabilityStore>,
    permissions: Arc<dyn PermissionRequest>,
    picker: Arc<dyn DirectoryPicker>,
    descriptor: PermissionDescriptor,
    file_filter: FileFilter,
    channel: ChannelHandle,
    interval: Duration,
    state: RwLock<ControllerState>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<ControllerEvent>,
}

impl ForegroundController {
    pub fn new(
        store: Arc<dyn CapabilityStore>,
        permissions: Arc<dyn PermissionRequest>,
        picker: Arc<dyn DirectoryPicker>,
        descriptor: PermissionDescriptor,
        channel: ChannelHandle,
        interval: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            permissions,
            picker,
            descriptor,
            file_filter: FileFilter::any(),
            channel,
            interval,
            state: RwLock::new(ControllerState::NoCapability),
            ticker: Mutex::new(None),
            events,
        }
    }

    /// Restrict which files [`pick_file`](Self::pick_file) accepts
    pub fn with_file_filter(mut self, filter: FileFilter) -> Self {
        self.file_filter = filter;
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state.read().clone()
    }

    pub fn descriptor(&self) -> PermissionDescriptor {
        self.descriptor
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    /// Whether the trigger ticker is currently running
    pub fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Load the persisted capability and query (never request) its permission
    pub async fn restore(&self) -> ScribeResult<ControllerState> {
        let next = match self.store.load()? {
            None => {
                info!("No directory to restore");
                ControllerState::NoCapability
            }
            Some(cap) => {
                let permission = self.permissions.query(&cap, self.descriptor).await;
                if permission.is_granted() {
                    info!(capability = %cap.id(), name = %cap.name(), "Restored directory");
                    ControllerState::Granted(cap)
                } else {
                    info!(
                        capability = %cap.id(),
                        name = %cap.name(),
                        state = %permission,
                        "Restored directory needs reauthorization"
                    );
                    ControllerState::NeedsReauthorization(cap)
                }
            }
        };

        self.transition(next.clone());
        self.sync_ticker();
        Ok(next)
    }

    /// Acquire a directory interactively, request permission and persist it.
    ///
    /// A dismissed picker returns [`ScribeError::UserCancelledAcquisition`]
    /// and leaves the state untouched.
    pub async fn pick_directory(&self) -> ScribeResult<Capability> {
        self.acquire(CapabilityKind::Directory).await
    }

    /// Acquire a single file matching the configured filter. The background
    /// then writes to the file itself instead of a file inside a directory.
    pub async fn pick_file(&self) -> ScribeResult<Capability> {
        self.acquire(CapabilityKind::File).await
    }

    async fn acquire(&self, kind: CapabilityKind) -> ScribeResult<Capability> {
        if !self.picker.is_supported() {
            error!(kind = %kind, "Picking is not supported on this platform");
            self.emit(ControllerEvent::AcquisitionFailed(
                AcquisitionError::Unsupported.to_string(),
            ));
            return Err(AcquisitionError::Unsupported.into());
        }

        let mode = self.descriptor.mode();
        let picked = match kind {
            CapabilityKind::Directory => self.picker.pick_directory(mode).await,
            CapabilityKind::File => self.picker.pick_file(mode, &self.file_filter).await,
        };
        let cap = match picked {
            Ok(cap) => cap,
            Err(AcquisitionError::UserCancelled) => {
                warn!("User aborted {} selection", kind);
                self.emit(ControllerEvent::AcquisitionCancelled);
                return Err(ScribeError::UserCancelledAcquisition);
            }
            Err(e) => {
                error!(kind = %kind, error = %e, "Acquisition failed");
                self.emit(ControllerEvent::AcquisitionFailed(e.to_string()));
                return Err(e.into());
            }
        };

        let permission = self.permissions.request(&cap, self.descriptor).await;
        if !permission.is_granted() {
            warn!(
                capability = %cap.id(),
                kind = %kind,
                state = %permission,
                "Permission not granted for picked capability"
            );
            self.emit(ControllerEvent::PermissionNotGranted(permission));
            return Err(ScribeError::PermissionNotGranted(permission));
        }

        self.store.persist(Some(&cap))?;
        info!(
            capability = %cap.id(),
            kind = %kind,
            name = %cap.name(),
            "Capability selected"
        );
        self.transition(ControllerState::Granted(cap.clone()));
        self.sync_ticker();
        Ok(cap)
    }

    /// Request permission again for the persisted capability, without re-picking
    pub async fn reauthorize(&self) -> ScribeResult<PermissionState> {
        let cap = self
            .state()
            .capability()
            .cloned()
            .ok_or(ScribeError::CapabilityAbsent)?;

        let permission = self.permissions.request(&cap, self.descriptor).await;
        if !permission.is_granted() {
            warn!(capability = %cap.id(), state = %permission, "Reauthorization not granted");
            self.emit(ControllerEvent::PermissionNotGranted(permission));
            return Err(ScribeError::PermissionNotGranted(permission));
        }

        info!(capability = %cap.id(), "Directory reauthorized");
        self.transition(ControllerState::Granted(cap));
        Ok(permission)
    }

    /// Revoke the persisted capability and stop triggering.
    ///
    /// The state moves to `NoCapability` even if the store write fails; the
    /// error is still returned.
    pub async fn clear_directory(&self) -> ScribeResult<()> {
        let persisted = self.store.persist(None);
        self.transition(ControllerState::NoCapability);
        self.sync_ticker();
        self.emit(ControllerEvent::Cleared);
        info!("Directory cleared");
        persisted.map_err(Into::into)
    }

    /// Regular files directly inside the granted capability, sorted by name
    pub async fn list_files(&self) -> ScribeResult<Vec<PathBuf>> {
        let cap = match self.state() {
            ControllerState::Granted(cap) => cap,
            ControllerState::NoCapability => return Err(ScribeError::CapabilityAbsent),
            ControllerState::NeedsReauthorization(_) => {
                return Err(ScribeError::PermissionNotGranted(PermissionState::Prompt))
            }
        };

        if cap.kind() == CapabilityKind::File {
            return Ok(vec![cap.path().to_path_buf()]);
        }

        let mut entries = tokio::fs::read_dir(cap.path())
            .await
            .map_err(ScribeError::Listing)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(ScribeError::Listing)? {
            let file_type = entry.file_type().await.map_err(ScribeError::Listing)?;
            if file_type.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Stop the ticker. State and store are left as they are.
    pub fn shutdown(&self) {
        self.stop_ticker();
    }

    fn transition(&self, next: ControllerState) {
        let changed = {
            let mut state = self.state.write();
            if *state == next {
                false
            } else {
                let previous = std::mem::replace(&mut *state, next.clone());
                debug!(from = %previous, to = %next, "Controller state changed");
                true
            }
        };
        if changed {
            self.emit(ControllerEvent::StateChanged(next));
        }
    }

    fn emit(&self, event: ControllerEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Run the ticker while a capability exists, stop it otherwise
    fn sync_ticker(&self) {
        if self.state.read().capability().is_some() {
            self.start_ticker();
        } else {
            self.stop_ticker();
        }
    }

    fn start_ticker(&self) {
        let mut ticker = self.ticker.lock();
        if ticker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let channel = self.channel.clone();
        let period = self.interval;
        *ticker = Some(tokio::spawn(async move {
            if channel.ready().await.is_err() {
                return;
            }
            debug!(interval_ms = period.as_millis() as u64, "Trigger ticker started");

            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                match channel.controller() {
                    Some(controller) => {
                        if let Err(e) = controller.post_message(ChannelMessage::WriteIntervalFile) {
                            debug!(error = %e, "Trigger not delivered");
                        }
                    }
                    None => debug!("No active background, skipping trigger"),
                }
            }
        }));
    }

    fn stop_ticker(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
            debug!("Trigger ticker stopped");
        }
    }
}

impl Drop for ForegroundController {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.get_mut().take() {
            handle.abort();
        }
    }
}
