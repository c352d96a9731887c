//! Background execution context.
//!
//! The writer runs on its own OS thread with a current-thread runtime, so it
//! shares nothing with the foreground except the capability store file and
//! the message channel.

use std::thread::JoinHandle;
use tokio::sync::{broadcast, oneshot};
use tracing::{error, info, warn};

use crate::channel::{ChannelError, ChannelRegistry};
use crate::writer::{BackgroundWriter, WriteOutcome};

const THREAD_NAME: &str = "scribe-background";

/// Owns the background thread. Dropping it stops the writer without waiting.
pub struct BackgroundHost {
    endpoint: String,
    outcomes: broadcast::Sender<WriteOutcome>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl BackgroundHost {
    /// Register `writer` at `endpoint` and start serving triggers.
    ///
    /// Registration happens on the caller's thread so a bad endpoint or a
    /// live previous host is reported here. Activation (the readiness signal)
    /// happens once the background runtime is up.
    pub fn start(
        writer: BackgroundWriter,
        registry: &ChannelRegistry,
        endpoint: &str,
    ) -> Result<Self, ChannelError> {
        let inbox = registry.register(endpoint)?;
        info!(endpoint = %endpoint, "Background writer installed");

        let outcomes = writer.outcome_sender();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let thread = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!(error = %e, "Failed to build background runtime");
                        return;
                    }
                };

                runtime.block_on(async move {
                    inbox.activate();
                    info!(endpoint = %inbox.endpoint(), "Background writer activated");
                    writer.run(inbox, shutdown_rx).await;
                });
            })
            .map_err(ChannelError::Spawn)?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            outcomes,
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Observe write outcomes from the background
    pub fn subscribe(&self) -> broadcast::Receiver<WriteOutcome> {
        self.outcomes.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the writer and wait for in-flight writes to finish
    pub fn shutdown(mut self) {
        self.signal_shutdown();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(endpoint = %self.endpoint, "Background thread panicked");
            }
        }
        info!(endpoint = %self.endpoint, "Background writer shut down");
    }

    fn signal_shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for BackgroundHost {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}
