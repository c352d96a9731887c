//! Foreground lifecycle across runtime restarts.

use scribe_config::ScribeConfig;
use scribe_core::{
    AutoConsent, ConsentResponse, FileCapabilityStore, PathPicker, PermissionState, ScribeError,
    SlotState,
};
use scribe_daemon::{ControllerEvent, ControllerState, RuntimeError, ScribeRuntime};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn config_in(state_dir: &Path) -> ScribeConfig {
    let mut config = ScribeConfig::default();
    config.trigger.interval_ms = 50;
    config.store.path = state_dir.join("capability.json");
    config
}

async fn start_with(
    config: ScribeConfig,
    picker: PathPicker,
    consent: ConsentResponse,
) -> ScribeRuntime {
    ScribeRuntime::start(config, Arc::new(picker), AutoConsent(consent))
        .await
        .expect("runtime should start")
}

/// A picked directory survives a restart, but its grant does not
#[tokio::test]
async fn test_restart_restores_capability_needing_reauthorization() {
    let state = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();

    let first = start_with(
        config_in(state.path()),
        PathPicker::fixed(target.path()),
        ConsentResponse::Allow,
    )
    .await;
    let cap = first.controller().pick_directory().await.unwrap();
    first.shutdown();

    let second = start_with(
        config_in(state.path()),
        PathPicker::dismissed(),
        ConsentResponse::Allow,
    )
    .await;
    assert_eq!(
        second.controller().state(),
        ControllerState::NeedsReauthorization(cap.clone())
    );

    second.controller().reauthorize().await.unwrap();
    assert_eq!(second.controller().state(), ControllerState::Granted(cap));
    second.shutdown();
}

/// Clearing leaves an explicit revoke in the slot, not an empty one
#[tokio::test]
async fn test_clear_persists_revocation() {
    let state = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let config = config_in(state.path());
    let store_path = config.store.path.clone();

    let runtime = start_with(
        config,
        PathPicker::fixed(target.path()),
        ConsentResponse::Allow,
    )
    .await;
    let slot = FileCapabilityStore::new(&store_path);
    assert_eq!(slot.slot().unwrap(), SlotState::NeverSet);

    let cap = runtime.controller().pick_directory().await.unwrap();
    assert_eq!(slot.slot().unwrap(), SlotState::Occupied(cap));

    runtime.controller().clear_directory().await.unwrap();
    assert_eq!(slot.slot().unwrap(), SlotState::Revoked);
    runtime.shutdown();

    let restarted = start_with(
        config_in(state.path()),
        PathPicker::dismissed(),
        ConsentResponse::Allow,
    )
    .await;
    assert_eq!(restarted.controller().state(), ControllerState::NoCapability);
    restarted.shutdown();
}

/// Cancellation, failure and denial are three different outcomes
#[tokio::test]
async fn test_pick_outcomes_are_distinct() {
    let state = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();

    let cancelled = start_with(
        config_in(state.path()),
        PathPicker::dismissed(),
        ConsentResponse::Allow,
    )
    .await;
    let mut events = cancelled.controller().subscribe();
    let err = cancelled.controller().pick_directory().await.unwrap_err();
    assert!(matches!(err, ScribeError::UserCancelledAcquisition));
    assert_eq!(events.recv().await.unwrap(), ControllerEvent::AcquisitionCancelled);
    cancelled.shutdown();

    let failed = start_with(
        config_in(state.path()),
        PathPicker::fixed(target.path().join("missing")),
        ConsentResponse::Allow,
    )
    .await;
    let err = failed.controller().pick_directory().await.unwrap_err();
    assert!(matches!(err, ScribeError::Acquisition(_)));
    assert!(!err.is_cancellation());
    failed.shutdown();

    let denied = start_with(
        config_in(state.path()),
        PathPicker::fixed(target.path()),
        ConsentResponse::Dismiss,
    )
    .await;
    let err = denied.controller().pick_directory().await.unwrap_err();
    assert!(matches!(
        err,
        ScribeError::PermissionNotGranted(PermissionState::Prompt)
    ));
    assert_eq!(denied.controller().state(), ControllerState::NoCapability);
    denied.shutdown();
}

/// Bad configuration is rejected before anything starts
#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let state = TempDir::new().unwrap();
    let mut config = config_in(state.path());
    config.trigger.interval_ms = 0;

    let result = ScribeRuntime::start(
        config,
        Arc::new(PathPicker::dismissed()),
        AutoConsent(ConsentResponse::Allow),
    )
    .await;
    assert!(matches!(result, Err(RuntimeError::Config(_))));
}
