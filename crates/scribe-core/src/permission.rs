//! Permission state for capabilities
//!
//! Querying and requesting are separate traits. [`PermissionQuery`] is
//! side-effect free and safe from any context. [`PermissionRequest`] may block
//! on the user and is only implemented by [`InteractiveValidator`], which the
//! foreground owns. The background is handed a [`GrantRegistry`] (query only),
//! so it has no code path that can escalate a permission.
//!
//! ## State Rules
//!
//! | Situation                                   | `query` result |
//! |---------------------------------------------|----------------|
//! | location no longer exists                   | `Denied`       |
//! | grant recorded for a covering mode          | `Granted`      |
//! | user refused on last request                | `Denied`       |
//! | write mode on a read-only location          | `Denied`       |
//! | metadata unreadable                         | `Unknown`      |
//! | otherwise                                   | `Prompt`       |

use crate::capability::{Capability, CapabilityId};
use async_trait::async_trait;
use parking_lot::RwLock;
use scribe_config::AccessMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Requested access mode for a query or request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionDescriptor {
    mode: AccessMode,
}

impl PermissionDescriptor {
    pub const fn new(mode: AccessMode) -> Self {
        Self { mode }
    }

    pub const fn read() -> Self {
        Self::new(AccessMode::Read)
    }

    pub const fn readwrite() -> Self {
        Self::new(AccessMode::ReadWrite)
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

impl From<AccessMode> for PermissionDescriptor {
    fn from(mode: AccessMode) -> Self {
        Self::new(mode)
    }
}

/// Permission state of a capability under a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
    Unknown,
}

impl PermissionState {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionState::Granted)
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionState::Granted => write!(f, "granted"),
            PermissionState::Denied => write!(f, "denied"),
            PermissionState::Prompt => write!(f, "prompt"),
            PermissionState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Side-effect free permission lookup. Never prompts.
#[async_trait]
pub trait PermissionQuery: Send + Sync {
    async fn query(
        &self,
        capability: &Capability,
        descriptor: PermissionDescriptor,
    ) -> PermissionState;
}

/// Interactive escalation. Foreground only.
///
/// `request` may wait indefinitely for the user; there is no timeout.
#[async_trait]
pub trait PermissionRequest: PermissionQuery {
    async fn request(
        &self,
        capability: &Capability,
        descriptor: PermissionDescriptor,
    ) -> PermissionState;
}

/// The user's answer to a consent prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentResponse {
    Allow,
    Deny,
    /// Prompt closed without an answer
    Dismiss,
}

/// Asks the user for consent. Implemented by the embedding UI.
#[async_trait]
pub trait ConsentPrompt: Send + Sync {
    async fn ask(
        &self,
        capability: &Capability,
        descriptor: PermissionDescriptor,
    ) -> ConsentResponse;
}

/// Answers every prompt the same way (headless embedding, pre-approved setups)
#[derive(Debug, Clone, Copy)]
pub struct AutoConsent(pub ConsentResponse);

#[async_trait]
impl ConsentPrompt for AutoConsent {
    async fn ask(&self, _: &Capability, _: PermissionDescriptor) -> ConsentResponse {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Grant {
    mode: AccessMode,
    state: PermissionState,
}

/// Process-wide table of user decisions.
///
/// Plays the role of the platform permission service: every context may read
/// it, only [`InteractiveValidator`] may record a grant. Downgrades
/// ([`expire`](Self::expire), [`revoke`](Self::revoke)) are public.
#[derive(Debug, Default)]
pub struct GrantRegistry {
    grants: RwLock<HashMap<CapabilityId, Grant>>,
}

impl GrantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, capability: &Capability, mode: AccessMode, state: PermissionState) {
        self.grants
            .write()
            .insert(capability.id(), Grant { mode, state });
    }

    /// Forget any decision; the next query returns `Prompt`
    pub fn expire(&self, capability: &Capability) {
        if self.grants.write().remove(&capability.id()).is_some() {
            debug!(capability = %capability.id(), "Permission expired");
        }
    }

    /// Record a refusal; the next query returns `Denied`
    pub fn revoke(&self, capability: &Capability) {
        self.record(capability, capability.mode(), PermissionState::Denied);
        debug!(capability = %capability.id(), "Permission revoked");
    }

    fn evaluate(
        &self,
        capability: &Capability,
        descriptor: PermissionDescriptor,
    ) -> PermissionState {
        let metadata = match std::fs::metadata(capability.path()) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return PermissionState::Denied;
            }
            Err(_) => return PermissionState::Unknown,
        };

        let wants_write = descriptor.mode().allows_write();
        if wants_write && metadata.permissions().readonly() {
            return PermissionState::Denied;
        }

        match self.grants.read().get(&capability.id()) {
            Some(grant) if grant.state == PermissionState::Denied => PermissionState::Denied,
            Some(grant)
                if grant.state == PermissionState::Granted
                    && (grant.mode.allows_write() || !wants_write) =>
            {
                PermissionState::Granted
            }
            _ => PermissionState::Prompt,
        }
    }
}

#[async_trait]
impl PermissionQuery for GrantRegistry {
    async fn query(
        &self,
        capability: &Capability,
        descriptor: PermissionDescriptor,
    ) -> PermissionState {
        self.evaluate(capability, descriptor)
    }
}

/// Foreground validator: queries through the registry, escalates through a prompt
pub struct InteractiveValidator<P> {
    registry: Arc<GrantRegistry>,
    prompt: P,
}

impl<P: ConsentPrompt> InteractiveValidator<P> {
    pub fn new(registry: Arc<GrantRegistry>, prompt: P) -> Self {
        Self { registry, prompt }
    }

    /// Shared registry, for handing a query-only view to other contexts
    pub fn registry(&self) -> Arc<GrantRegistry> {
        Arc::clone(&self.registry)
    }
}

#[async_trait]
impl<P: ConsentPrompt> PermissionQuery for InteractiveValidator<P> {
    async fn query(
        &self,
        capability: &Capability,
        descriptor: PermissionDescriptor,
    ) -> PermissionState {
        self.registry.evaluate(capability, descriptor)
    }
}

#[async_trait]
impl<P: ConsentPrompt> PermissionRequest for InteractiveValidator<P> {
    async fn request(
        &self,
        capability: &Capability,
        descriptor: PermissionDescriptor,
    ) -> PermissionState {
        let current = self.registry.evaluate(capability, descriptor);
        if current.is_granted() {
            return current;
        }

        match self.prompt.ask(capability, descriptor).await {
            ConsentResponse::Allow => {
                self.registry
                    .record(capability, descriptor.mode(), PermissionState::Granted);
                let effective = self.registry.evaluate(capability, descriptor);
                info!(
                    capability = %capability.id(),
                    state = %effective,
                    "Permission request answered"
                );
                effective
            }
            ConsentResponse::Deny => {
                self.registry
                    .record(capability, descriptor.mode(), PermissionState::Denied);
                info!(capability = %capability.id(), "Permission request denied");
                PermissionState::Denied
            }
            ConsentResponse::Dismiss => {
                debug!(capability = %capability.id(), "Permission prompt dismissed");
                PermissionState::Prompt
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn granted_validator(response: ConsentResponse) -> InteractiveValidator<AutoConsent> {
        InteractiveValidator::new(Arc::new(GrantRegistry::new()), AutoConsent(response))
    }

    #[tokio::test]
    async fn unknown_capability_needs_prompt() {
        let tmp = TempDir::new().unwrap();
        let registry = GrantRegistry::new();
        let cap = Capability::directory(tmp.path(), AccessMode::ReadWrite);

        let state = registry.query(&cap, PermissionDescriptor::readwrite()).await;
        assert_eq!(state, PermissionState::Prompt);
    }

    #[tokio::test]
    async fn query_is_pure() {
        let tmp = TempDir::new().unwrap();
        let validator = granted_validator(ConsentResponse::Allow);
        let cap = Capability::directory(tmp.path(), AccessMode::ReadWrite);
        let desc = PermissionDescriptor::readwrite();

        let first = validator.query(&cap, desc).await;
        let second = validator.query(&cap, desc).await;
        let third = validator.query(&cap, desc).await;
        assert_eq!(first, PermissionState::Prompt);
        assert_eq!(first, second);
        assert_eq!(second, third);
    }

    #[tokio::test]
    async fn allow_grants_and_is_remembered() {
        let tmp = TempDir::new().unwrap();
        let validator = granted_validator(ConsentResponse::Allow);
        let cap = Capability::directory(tmp.path(), AccessMode::ReadWrite);
        let desc = PermissionDescriptor::readwrite();

        assert_eq!(validator.request(&cap, desc).await, PermissionState::Granted);
        assert_eq!(validator.registry().query(&cap, desc).await, PermissionState::Granted);
    }

    #[tokio::test]
    async fn read_grant_does_not_cover_write() {
        let tmp = TempDir::new().unwrap();
        let validator = granted_validator(ConsentResponse::Allow);
        let cap = Capability::directory(tmp.path(), AccessMode::Read);

        validator.request(&cap, PermissionDescriptor::read()).await;

        assert_eq!(
            validator.query(&cap, PermissionDescriptor::read()).await,
            PermissionState::Granted
        );
        assert_eq!(
            validator.query(&cap, PermissionDescriptor::readwrite()).await,
            PermissionState::Prompt
        );
    }

    #[tokio::test]
    async fn deny_is_recorded() {
        let tmp = TempDir::new().unwrap();
        let validator = granted_validator(ConsentResponse::Deny);
        let cap = Capability::directory(tmp.path(), AccessMode::ReadWrite);
        let desc = PermissionDescriptor::readwrite();

        assert_eq!(validator.request(&cap, desc).await, PermissionState::Denied);
        assert_eq!(validator.query(&cap, desc).await, PermissionState::Denied);
    }

    #[tokio::test]
    async fn dismiss_leaves_prompt() {
        let tmp = TempDir::new().unwrap();
        let validator = granted_validator(ConsentResponse::Dismiss);
        let cap = Capability::directory(tmp.path(), AccessMode::ReadWrite);
        let desc = PermissionDescriptor::readwrite();

        assert_eq!(validator.request(&cap, desc).await, PermissionState::Prompt);
        assert_eq!(validator.query(&cap, desc).await, PermissionState::Prompt);
    }

    #[tokio::test]
    async fn expire_and_revoke_downgrade() {
        let tmp = TempDir::new().unwrap();
        let validator = granted_validator(ConsentResponse::Allow);
        let registry = validator.registry();
        let cap = Capability::directory(tmp.path(), AccessMode::ReadWrite);
        let desc = PermissionDescriptor::readwrite();
        validator.request(&cap, desc).await;

        registry.expire(&cap);
        assert_eq!(registry.query(&cap, desc).await, PermissionState::Prompt);

        validator.request(&cap, desc).await;
        registry.revoke(&cap);
        assert_eq!(registry.query(&cap, desc).await, PermissionState::Denied);
    }

    #[tokio::test]
    async fn missing_location_is_denied() {
        let tmp = TempDir::new().unwrap();
        let validator = granted_validator(ConsentResponse::Allow);
        let cap = Capability::directory(tmp.path().join("gone"), AccessMode::ReadWrite);

        let state = validator
            .request(&cap, PermissionDescriptor::readwrite())
            .await;
        assert_eq!(state, PermissionState::Denied);
    }
}
