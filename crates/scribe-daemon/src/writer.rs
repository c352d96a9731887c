//! Background writer.
//!
//! Every trigger runs one write cycle:
//!
//! 1. load the capability from the store (nothing is cached between cycles)
//! 2. skip with a warning if the slot is empty
//! 3. query `readwrite` permission; skip with a warning unless `granted`
//! 4. overwrite the target with `"<label>: <ISO-8601 timestamp>"`
//!
//! Cycles never overlap: a trigger that arrives while a write is in flight is
//! dropped. Failures are logged and the next trigger is the only retry.

use chrono::{SecondsFormat, Utc};
use scribe_config::WriterConfig;
use scribe_core::{
    Capability, CapabilityStore, ChannelMessage, PermissionDescriptor, PermissionQuery,
    PermissionState,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::channel::Inbox;

/// Result of one write cycle, published to outcome subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written { path: PathBuf, bytes: usize },
    /// Store was empty
    SkippedAbsent,
    SkippedPermission(PermissionState),
    /// Another cycle was still writing
    SkippedBusy,
    Failed(String),
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written { .. })
    }
}

/// Every background query asks for write access, whatever mode the
/// foreground acquired under.
pub const WRITE_DESCRIPTOR: PermissionDescriptor = PermissionDescriptor::readwrite();

/// What to write
#[derive(Debug, Clone)]
pub struct WriterSettings {
    pub file_name: String,
    pub label: String,
}

impl From<&WriterConfig> for WriterSettings {
    fn from(config: &WriterConfig) -> Self {
        Self {
            file_name: config.file_name.clone(),
            label: config.label.clone(),
        }
    }
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self::from(&WriterConfig::default())
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Writes the target file on request. Holds no capability of its own.
#[derive(Clone)]
pub struct BackgroundWriter {
    store: Arc<dyn CapabilityStore>,
    permissions: Arc<dyn PermissionQuery>,
    settings: WriterSettings,
    writing: Arc<AtomicBool>,
    outcomes: broadcast::Sender<WriteOutcome>,
}

impl BackgroundWriter {
    /// `permissions` is query-only by type: the writer cannot prompt.
    pub fn new(
        store: Arc<dyn CapabilityStore>,
        permissions: Arc<dyn PermissionQuery>,
        settings: WriterSettings,
        outcome_capacity: usize,
    ) -> Self {
        let (outcomes, _) = broadcast::channel(outcome_capacity.max(1));
        Self {
            store,
            permissions,
            settings,
            writing: Arc::new(AtomicBool::new(false)),
            outcomes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WriteOutcome> {
        self.outcomes.subscribe()
    }

    pub(crate) fn outcome_sender(&self) -> broadcast::Sender<WriteOutcome> {
        self.outcomes.clone()
    }

    pub fn is_writing(&self) -> bool {
        self.writing.load(Ordering::Acquire)
    }

    /// Run one write cycle and publish its outcome
    pub async fn write_cycle(&self) -> WriteOutcome {
        let outcome = match InFlight::acquire(&self.writing) {
            Some(_guard) => self.attempt().await,
            None => {
                debug!("Write already in flight, dropping trigger");
                WriteOutcome::SkippedBusy
            }
        };
        let _ = self.outcomes.send(outcome.clone());
        outcome
    }

    async fn attempt(&self) -> WriteOutcome {
        let capability = match self.store.load() {
            Ok(Some(capability)) => capability,
            Ok(None) => {
                warn!("Directory not set for saving to, skipping write");
                return WriteOutcome::SkippedAbsent;
            }
            Err(e) => {
                error!(error = %e, "Failed to load capability");
                return WriteOutcome::Failed(e.to_string());
            }
        };

        if !capability.mode().allows_write() {
            warn!(
                capability = %capability.id(),
                mode = %capability.mode(),
                "Permission not granted for directory (capability is read-only), skipping write"
            );
            return WriteOutcome::SkippedPermission(PermissionState::Denied);
        }

        let state = self.permissions.query(&capability, WRITE_DESCRIPTOR).await;
        if !state.is_granted() {
            warn!(
                capability = %capability.id(),
                state = %state,
                "Permission not granted for directory, skipping write"
            );
            return WriteOutcome::SkippedPermission(state);
        }

        match self.write_target(&capability).await {
            Ok((path, bytes)) => {
                info!(path = %path.display(), bytes, "File successfully updated");
                WriteOutcome::Written { path, bytes }
            }
            Err(e) => {
                error!(capability = %capability.id(), error = %e, "Failed to write file");
                WriteOutcome::Failed(e.to_string())
            }
        }
    }

    async fn write_target(&self, capability: &Capability) -> std::io::Result<(PathBuf, usize)> {
        let path = capability.target_path(&self.settings.file_name);
        let payload = format!(
            "{}: {}",
            self.settings.label,
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        );

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .await?;
        file.write_all(payload.as_bytes()).await?;
        file.flush().await?;
        file.sync_all().await?;

        Ok((path, payload.len()))
    }

    /// Serve the inbox until it closes or `shutdown` fires.
    ///
    /// Each trigger runs on its own task so a slow write never blocks the
    /// inbox; the in-flight guard drops overlapping triggers.
    pub async fn run(self, mut inbox: Inbox, mut shutdown: oneshot::Receiver<()>) {
        let mut cycles = JoinSet::new();

        loop {
            let raw = tokio::select! {
                raw = inbox.recv() => match raw {
                    Some(raw) => raw,
                    None => break,
                },
                _ = &mut shutdown => {
                    debug!("Background writer received shutdown");
                    break;
                }
            };

            match ChannelMessage::decode(&raw) {
                Ok(Some(ChannelMessage::WriteIntervalFile)) => {
                    let writer = self.clone();
                    cycles.spawn(async move {
                        writer.write_cycle().await;
                    });
                }
                Ok(None) => debug!(message = %raw, "Ignoring unknown message kind"),
                Err(e) => warn!(error = %e, "Dropping malformed message"),
            }

            while cycles.try_join_next().is_some() {}
        }

        while cycles.join_next().await.is_some() {}
        info!(endpoint = %inbox.endpoint(), "Background writer stopped");
    }
}
