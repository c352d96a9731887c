//! Wires both contexts together from a [`ScribeConfig`].
//!
//! The foreground and the background each get their own handle on the store
//! file, so the file is the only state they share. They also share one
//! [`GrantRegistry`]: the controller reaches it through an
//! [`InteractiveValidator`], the writer only as a [`PermissionQuery`].

use scribe_config::{ConfigError, ScribeConfig};
use scribe_core::{
    ConsentPrompt, DirectoryPicker, FileCapabilityStore, FileFilter, GrantRegistry,
    InteractiveValidator, PermissionDescriptor, PermissionQuery, ScribeError,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::info;

use crate::channel::{ChannelError, ChannelHandle, ChannelRegistry};
use crate::controller::ForegroundController;
use crate::host::BackgroundHost;
use crate::writer::{BackgroundWriter, WriteOutcome, WriterSettings};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Scribe(#[from] ScribeError),
}

pub struct ScribeRuntime {
    config: ScribeConfig,
    grants: Arc<GrantRegistry>,
    channel: ChannelRegistry,
    writer: BackgroundWriter,
    host: Option<BackgroundHost>,
    controller: ForegroundController,
}

impl ScribeRuntime {
    /// Start the background, build the controller and restore persisted state
    pub async fn start<P>(
        config: ScribeConfig,
        picker: Arc<dyn DirectoryPicker>,
        consent: P,
    ) -> Result<Self, RuntimeError>
    where
        P: ConsentPrompt + 'static,
    {
        config.validate()?;

        let grants = Arc::new(GrantRegistry::new());
        let channel = ChannelRegistry::new(config.channel.endpoint.clone());

        let background_permissions: Arc<dyn PermissionQuery> = grants.clone();
        let writer = BackgroundWriter::new(
            Arc::new(FileCapabilityStore::new(&config.store.path)),
            background_permissions,
            WriterSettings::from(&config.writer),
            config.channel.outcome_capacity,
        );
        let host = BackgroundHost::start(writer.clone(), &channel, &config.channel.endpoint)?;

        let controller = ForegroundController::new(
            Arc::new(FileCapabilityStore::new(&config.store.path)),
            Arc::new(InteractiveValidator::new(grants.clone(), consent)),
            picker,
            PermissionDescriptor::new(config.writer.access_mode),
            channel.handle(),
            config.trigger.interval(),
        )
        .with_file_filter(FileFilter::from(&config.picker));
        let state = controller.restore().await?;
        info!(state = %state, store = %config.store.path.display(), "Scribe runtime started");

        Ok(Self {
            config,
            grants,
            channel,
            writer,
            host: Some(host),
            controller,
        })
    }

    pub fn config(&self) -> &ScribeConfig {
        &self.config
    }

    pub fn controller(&self) -> &ForegroundController {
        &self.controller
    }

    /// Grant decisions, e.g. to expire or revoke them
    pub fn grants(&self) -> &Arc<GrantRegistry> {
        &self.grants
    }

    pub fn channel(&self) -> ChannelHandle {
        self.channel.handle()
    }

    pub fn subscribe_outcomes(&self) -> broadcast::Receiver<WriteOutcome> {
        self.writer.subscribe()
    }

    pub fn is_background_running(&self) -> bool {
        self.host.as_ref().is_some_and(BackgroundHost::is_running)
    }

    /// Stop the background context and register a fresh one at the same endpoint
    pub fn restart_background(&mut self) -> Result<(), RuntimeError> {
        if let Some(host) = self.host.take() {
            host.shutdown();
        }
        let host = BackgroundHost::start(
            self.writer.clone(),
            &self.channel,
            &self.config.channel.endpoint,
        )?;
        self.host = Some(host);
        info!(endpoint = %self.config.channel.endpoint, "Background context restarted");
        Ok(())
    }

    /// Stop triggering, then stop the background and wait for it
    pub fn shutdown(mut self) {
        self.controller.shutdown();
        if let Some(host) = self.host.take() {
            host.shutdown();
        }
        info!("Scribe runtime stopped");
    }
}
