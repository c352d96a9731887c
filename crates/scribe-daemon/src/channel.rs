//! Message channel between the foreground and the background writer.
//!
//! The background registers at a fixed endpoint and receives an [`Inbox`].
//! Once it calls [`Inbox::activate`] the readiness signal flips and the
//! foreground's [`ChannelHandle::controller`] starts returning a sender.
//! Delivery is fire-and-forget: unbounded, no acknowledgement, no reply.
//!
//! Dropping the inbox unregisters it, so a restarted background can register
//! again at the same endpoint.

use parking_lot::Mutex;
use scribe_core::{ChannelMessage, ScribeError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::debug;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("no background can register at '{requested}' (expected '{expected}')")]
    UnknownEndpoint { requested: String, expected: String },

    #[error("a background context is already registered at '{0}'")]
    AlreadyRegistered(String),

    #[error("background context is gone")]
    Closed,

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to start background context: {0}")]
    Spawn(#[source] std::io::Error),
}

impl From<ChannelError> for ScribeError {
    fn from(err: ChannelError) -> Self {
        ScribeError::Channel(err.to_string())
    }
}

struct Registered {
    generation: u64,
    tx: mpsc::UnboundedSender<String>,
}

struct Shared {
    endpoint: String,
    slot: Mutex<Option<Registered>>,
    ready: watch::Sender<bool>,
    generations: AtomicU64,
}

impl Shared {
    fn release(&self, generation: u64) {
        let mut slot = self.slot.lock();
        if slot.as_ref().map(|r| r.generation) == Some(generation) {
            *slot = None;
            self.ready.send_replace(false);
            debug!(endpoint = %self.endpoint, "Background context unregistered");
        }
    }
}

/// Registration point for the background context
#[derive(Clone)]
pub struct ChannelRegistry {
    shared: Arc<Shared>,
}

impl ChannelRegistry {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                endpoint: endpoint.into(),
                slot: Mutex::new(None),
                ready,
                generations: AtomicU64::new(1),
            }),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    /// Register a background context at `endpoint`.
    ///
    /// Fails if the endpoint is not this registry's, or if a live context is
    /// already registered.
    pub fn register(&self, endpoint: &str) -> Result<Inbox, ChannelError> {
        if endpoint != self.shared.endpoint {
            return Err(ChannelError::UnknownEndpoint {
                requested: endpoint.to_string(),
                expected: self.shared.endpoint.clone(),
            });
        }

        let mut slot = self.shared.slot.lock();
        if let Some(existing) = slot.as_ref() {
            if !existing.tx.is_closed() {
                return Err(ChannelError::AlreadyRegistered(endpoint.to_string()));
            }
        }

        let generation = self.shared.generations.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        *slot = Some(Registered { generation, tx });
        self.shared.ready.send_replace(false);
        debug!(endpoint = %endpoint, generation, "Background context registered");

        Ok(Inbox {
            rx,
            generation,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Foreground side of the channel
    pub fn handle(&self) -> ChannelHandle {
        ChannelHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Background side: receives raw messages
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<String>,
    generation: u64,
    shared: Arc<Shared>,
}

impl Inbox {
    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    /// Signal readiness to the foreground
    pub fn activate(&self) {
        let slot = self.shared.slot.lock();
        if slot.as_ref().map(|r| r.generation) == Some(self.generation) {
            self.shared.ready.send_replace(true);
        }
    }

    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Inbox {
    fn drop(&mut self) {
        self.shared.release(self.generation);
    }
}

/// Foreground side: waits for readiness and posts messages
#[derive(Clone)]
pub struct ChannelHandle {
    shared: Arc<Shared>,
}

impl ChannelHandle {
    pub fn is_ready(&self) -> bool {
        *self.shared.ready.borrow()
    }

    /// Wait until a background context is registered and active
    pub async fn ready(&self) -> Result<(), ChannelError> {
        let mut rx = self.shared.ready.subscribe();
        rx.wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| ChannelError::Closed)
    }

    /// The active background, if any
    pub fn controller(&self) -> Option<ActiveController> {
        if !self.is_ready() {
            return None;
        }
        self.shared
            .slot
            .lock()
            .as_ref()
            .filter(|r| !r.tx.is_closed())
            .map(|r| ActiveController { tx: r.tx.clone() })
    }
}

/// Sender to the currently active background context
pub struct ActiveController {
    tx: mpsc::UnboundedSender<String>,
}

impl ActiveController {
    /// Post without waiting; there is no reply
    pub fn post_message(&self, message: ChannelMessage) -> Result<(), ChannelError> {
        let raw = message.encode()?;
        self.tx.send(raw).map_err(|_| ChannelError::Closed)
    }

    /// Post a raw, already-encoded message
    pub fn post_raw(&self, raw: impl Into<String>) -> Result<(), ChannelError> {
        self.tx.send(raw.into()).map_err(|_| ChannelError::Closed)
    }
}
