//! Error taxonomy
//!
//! None of these are fatal. In the foreground they surface as controller state
//! or events; the background turns them into log lines and a skipped write.

use crate::acquire::AcquisitionError;
use crate::permission::PermissionState;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScribeError {
    /// Picker dismissed; no state change
    #[error("user cancelled selection")]
    UserCancelledAcquisition,

    /// Acquisition failed for any reason other than cancellation
    #[error(transparent)]
    Acquisition(AcquisitionError),

    /// Query or request did not yield `granted`
    #[error("permission not granted ({0})")]
    PermissionNotGranted(PermissionState),

    /// Store is empty
    #[error("no capability is set")]
    CapabilityAbsent,

    /// IO failure while writing the target
    #[error("write failed: {0}")]
    WriteFailure(#[source] std::io::Error),

    /// IO failure while reading the capability's directory
    #[error("failed to list directory: {0}")]
    Listing(#[source] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Message could not be delivered to the background
    #[error("channel error: {0}")]
    Channel(String),
}

impl From<AcquisitionError> for ScribeError {
    fn from(err: AcquisitionError) -> Self {
        match err {
            AcquisitionError::UserCancelled => ScribeError::UserCancelledAcquisition,
            other => ScribeError::Acquisition(other),
        }
    }
}

impl ScribeError {
    /// Cancellation is the only outcome the UI should treat as a no-op
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ScribeError::UserCancelledAcquisition)
    }
}

pub type ScribeResult<T> = Result<T, ScribeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_maps_to_its_own_variant() {
        let err: ScribeError = AcquisitionError::UserCancelled.into();
        assert!(err.is_cancellation());
    }

    #[test]
    fn other_acquisition_failures_are_not_cancellations() {
        let err: ScribeError = AcquisitionError::Failed("boom".into()).into();
        assert!(!err.is_cancellation());
        assert!(err.to_string().contains("boom"));

        let err: ScribeError = AcquisitionError::Unsupported.into();
        assert!(!err.is_cancellation());
    }

    #[test]
    fn permission_error_names_state() {
        let err = ScribeError::PermissionNotGranted(PermissionState::Prompt);
        assert_eq!(err.to_string(), "permission not granted (prompt)");
    }
}
