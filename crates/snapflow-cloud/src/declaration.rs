//! Declared snapshot resources

use crate::client::SnapshotRequest;
use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};

/// Desired state of a single snapshot
///
/// Every field is immutable once the snapshot exists; a changed declaration
/// is realized by replacing the remote object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDeclaration {
    /// Unique, caller-chosen snapshot name
    pub name: String,

    /// Instance to snapshot
    pub source_id: String,

    /// Shut the instance down while the snapshot is taken
    #[serde(default)]
    pub safe_mode: bool,

    /// One-shot or cron-scheduled
    #[serde(default)]
    pub mode: CreationMode,
}

impl SnapshotDeclaration {
    pub fn new(name: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_id: source_id.into(),
            safe_mode: false,
            mode: CreationMode::OneShot,
        }
    }

    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    /// Set the cron schedule; an empty string keeps the snapshot one-shot
    pub fn with_schedule(mut self, schedule: Option<&str>) -> Self {
        self.mode = CreationMode::from_schedule(schedule);
        self
    }

    /// Check the declaration before anything is sent to the remote API
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CloudError::Validation(
                "snapshot name must not be empty".to_string(),
            ));
        }
        if self.source_id.trim().is_empty() {
            return Err(CloudError::Validation(format!(
                "snapshot '{}' requires an instance id",
                self.name
            )));
        }
        Ok(())
    }

    /// Build the remote creation request
    pub fn request(&self) -> SnapshotRequest {
        SnapshotRequest {
            source_id: self.source_id.clone(),
            safe_mode: self.safe_mode,
            schedule: self.mode.schedule().map(str::to_string),
        }
    }
}

/// How a snapshot behaves once created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "schedule", rename_all = "snake_case")]
pub enum CreationMode {
    /// Taken once; creation waits for the remote `complete` state
    #[default]
    OneShot,
    /// Re-taken by the remote system on a cron schedule
    Recurring(String),
}

impl CreationMode {
    pub fn from_schedule(schedule: Option<&str>) -> Self {
        match schedule.map(str::trim) {
            Some(s) if !s.is_empty() => CreationMode::Recurring(s.to_string()),
            _ => CreationMode::OneShot,
        }
    }

    pub fn schedule(&self) -> Option<&str> {
        match self {
            CreationMode::OneShot => None,
            CreationMode::Recurring(schedule) => Some(schedule),
        }
    }

    /// Recurring snapshots have no single completion point to wait for
    pub fn requires_polling(&self) -> bool {
        matches!(self, CreationMode::OneShot)
    }
}

impl std::fmt::Display for CreationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreationMode::OneShot => write!(f, "one-shot"),
            CreationMode::Recurring(schedule) => write!(f, "recurring ({})", schedule),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_schedule_is_one_shot() {
        let decl = SnapshotDeclaration::new("db-snap", "i-123").with_schedule(Some(""));
        assert_eq!(decl.mode, CreationMode::OneShot);
        assert!(decl.mode.requires_polling());
        assert_eq!(decl.request().schedule, None);
    }

    #[test]
    fn test_schedule_selects_recurring() {
        let decl = SnapshotDeclaration::new("nightly", "i-123").with_schedule(Some("0 3 * * *"));
        assert_eq!(decl.mode, CreationMode::Recurring("0 3 * * *".to_string()));
        assert!(!decl.mode.requires_polling());
        assert_eq!(decl.request().schedule.as_deref(), Some("0 3 * * *"));
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        assert!(SnapshotDeclaration::new("", "i-123").validate().is_err());
        assert!(SnapshotDeclaration::new("db-snap", "  ").validate().is_err());
        assert!(SnapshotDeclaration::new("db-snap", "i-123").validate().is_ok());
    }

    #[test]
    fn test_mode_serialization() {
        let json = serde_json::to_value(CreationMode::Recurring("@daily".into())).unwrap();
        assert_eq!(json["kind"], "recurring");
        assert_eq!(json["schedule"], "@daily");

        let json = serde_json::to_value(CreationMode::OneShot).unwrap();
        assert_eq!(json["kind"], "one_shot");
    }
}
