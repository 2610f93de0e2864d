//! Reconciliation error types

use std::time::Duration;
use thiserror::Error;

/// Errors returned by a [`RemoteClient`](crate::RemoteClient) implementation.
///
/// The classification decides whether the poll loop may retry a failed call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Remote object not found: {0}")]
    NotFound(String),

    #[error("Transient remote failure: {0}")]
    Transient(String),

    #[error("Remote API rejected the request: {0}")]
    Rejected(String),
}

impl ClientError {
    /// Whether the call may succeed if reissued unchanged
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transient(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

/// Snapshot reconciliation errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Invalid declaration: {0}")]
    Validation(String),

    #[error("Remote create failed: {0}")]
    RemoteCreateFailed(#[source] ClientError),

    #[error("Remote read failed for {id}: {source}")]
    RemoteReadFailed {
        id: String,
        #[source]
        source: ClientError,
    },

    #[error("Timeout: snapshot {id} not complete after {waited:?} (last state: {last_state})")]
    Timeout {
        id: String,
        waited: Duration,
        last_state: String,
    },

    #[error("Snapshot {id} reached terminal state '{state}'")]
    TerminalState { id: String, state: String },

    #[error("Remote delete failed for {id}: {source}")]
    RemoteDeleteFailed {
        id: String,
        #[source]
        source: ClientError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// True when a read failed because the remote object no longer exists
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::RemoteReadFailed { source, .. } if source.is_not_found())
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(ClientError::Transient("503".into()).is_transient());
        assert!(!ClientError::NotFound("snap-1".into()).is_transient());
        assert!(!ClientError::Rejected("bad".into()).is_transient());
    }

    #[test]
    fn test_not_found_read() {
        let err = CloudError::RemoteReadFailed {
            id: "snap-1".into(),
            source: ClientError::NotFound("snap-1".into()),
        };
        assert!(err.is_not_found());

        let err = CloudError::RemoteReadFailed {
            id: "snap-1".into(),
            source: ClientError::Rejected("forbidden".into()),
        };
        assert!(!err.is_not_found());
    }
}
