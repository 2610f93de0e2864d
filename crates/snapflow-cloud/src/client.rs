//! Remote snapshot API abstraction

use crate::error::ClientError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Remote snapshot API
///
/// Implementations (Civo, test doubles, ...) are injected into the
/// [`Reconciler`](crate::Reconciler) at construction time.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Returns the client name (e.g., "civo")
    fn name(&self) -> &str;

    /// Request creation of a snapshot named `name`
    async fn create(&self, name: &str, request: &SnapshotRequest) -> ClientResult<RemoteSnapshot>;

    /// Fetch the current representation of a snapshot by id
    async fn find(&self, id: &str) -> ClientResult<RemoteSnapshot>;

    /// Request deletion of a snapshot by id
    async fn delete(&self, id: &str) -> ClientResult<()>;
}

/// Body of a snapshot creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRequest {
    /// Instance being snapshotted
    pub source_id: String,

    /// Quiesce the instance while the snapshot is taken
    pub safe_mode: bool,

    /// Cron expression for recurring snapshots
    pub schedule: Option<String>,
}

/// Snapshot as reported by the remote system
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSnapshot {
    pub id: String,
    pub name: String,
    pub instance_id: String,
    pub hostname: String,
    pub template_id: String,
    pub region: String,
    pub size_gb: i64,
    /// 1 when the snapshot was taken in safe mode
    pub safe: i64,
    pub state: SnapshotState,
    pub cron_timing: String,
    pub requested_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Remote snapshot state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SnapshotState {
    #[default]
    Pending,
    InProgress,
    Complete,
    Failed,
    /// Any value the remote reports that is not modelled above
    Other(String),
}

impl SnapshotState {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" | "new" | "queued" => SnapshotState::Pending,
            "in_progress" | "in-progress" | "inprogress" | "processing" => {
                SnapshotState::InProgress
            }
            "complete" | "completed" => SnapshotState::Complete,
            "failed" => SnapshotState::Failed,
            _ => SnapshotState::Other(value.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SnapshotState::Pending => "pending",
            SnapshotState::InProgress => "in_progress",
            SnapshotState::Complete => "complete",
            SnapshotState::Failed => "failed",
            SnapshotState::Other(value) => value,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, SnapshotState::Complete)
    }
}

impl From<&str> for SnapshotState {
    fn from(value: &str) -> Self {
        SnapshotState::parse(value)
    }
}

impl std::fmt::Display for SnapshotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state() {
        assert_eq!(SnapshotState::parse("complete"), SnapshotState::Complete);
        assert_eq!(SnapshotState::parse("Pending"), SnapshotState::Pending);
        assert_eq!(
            SnapshotState::parse("in_progress"),
            SnapshotState::InProgress
        );
        assert_eq!(SnapshotState::parse("failed"), SnapshotState::Failed);
        assert_eq!(
            SnapshotState::parse("uploading"),
            SnapshotState::Other("uploading".to_string())
        );
    }

    #[test]
    fn test_unknown_state_round_trips_verbatim() {
        let state = SnapshotState::parse("Uploading");
        assert_eq!(state.to_string(), "Uploading");
        assert!(!state.is_complete());
    }
}
