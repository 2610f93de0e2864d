//! Projection of remote snapshots into persisted attributes

use crate::client::RemoteSnapshot;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Attributes persisted for a realized snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotAttributes {
    pub id: String,
    pub name: String,
    pub instance_id: String,
    pub safe: bool,
    pub schedule: Option<String>,
    pub hostname: String,
    pub template_id: String,
    pub region: String,
    pub size_gb: i64,
    pub state: String,
    pub requested_at: String,
    pub completed_at: String,
}

/// Map a remote snapshot onto its persisted attributes.
///
/// Every attribute is derived from `remote`; nothing is carried over from a
/// previous projection.
pub fn project(remote: &RemoteSnapshot) -> SnapshotAttributes {
    let schedule = match remote.cron_timing.trim() {
        "" => None,
        cron => Some(cron.to_string()),
    };

    SnapshotAttributes {
        id: remote.id.clone(),
        name: remote.name.clone(),
        instance_id: remote.instance_id.clone(),
        safe: remote.safe == 1,
        schedule,
        hostname: remote.hostname.clone(),
        template_id: remote.template_id.clone(),
        region: remote.region.clone(),
        size_gb: remote.size_gb,
        state: remote.state.to_string(),
        requested_at: format_timestamp(remote.requested_at),
        completed_at: format_timestamp(remote.completed_at),
    }
}

fn format_timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        .unwrap_or_default()
}

impl From<&RemoteSnapshot> for SnapshotAttributes {
    fn from(remote: &RemoteSnapshot) -> Self {
        project(remote)
    }
}
