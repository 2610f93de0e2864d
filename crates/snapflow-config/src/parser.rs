//! Snapshot declaration file parsing
//!
//! ```kdl
//! settings {
//!     region "LON1"
//!     create-timeout "30m"
//!     ignore-delete-errors #false
//! }
//!
//! snapshot "db-snap" {
//!     instance-id "b2f3c1de-0000-4a1b-9c55-5d0e8f1a2b3c"
//!     safe #true
//! }
//! ```

use crate::error::{ConfigError, Result};
use kdl::{KdlDocument, KdlNode, KdlValue};
use snapflow_cloud::{
    DeletePolicy, MIN_POLL_INTERVAL, PollConfig, ReconcilerConfig, SnapshotDeclaration,
    SnapshotState,
};
use std::path::Path;
use std::time::Duration;

const MIN_CREATE_TIMEOUT: Duration = Duration::from_secs(1);

/// Parsed declaration file
#[derive(Debug, Clone, Default)]
pub struct SnapshotFile {
    pub settings: Settings,
    pub snapshots: Vec<SnapshotDeclaration>,
}

impl SnapshotFile {
    pub fn get(&self, name: &str) -> Option<&SnapshotDeclaration> {
        self.snapshots.iter().find(|s| s.name == name)
    }
}

/// Reconciler and provider settings from the `settings` block
#[derive(Debug, Clone)]
pub struct Settings {
    /// Overrides `CIVO_REGION`
    pub region: Option<String>,
    pub create_timeout: Duration,
    pub poll_interval: Duration,
    pub max_poll_interval: Duration,
    pub ignore_delete_errors: bool,
    /// Remote states that abort the wait for a one-shot snapshot
    pub failure_states: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let poll = PollConfig::default();
        Self {
            region: None,
            create_timeout: ReconcilerConfig::default().create_timeout,
            poll_interval: poll.initial_interval,
            max_poll_interval: poll.max_interval,
            ignore_delete_errors: true,
            failure_states: poll
                .failure_states
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Settings {
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            create_timeout: self.create_timeout,
            delete_policy: DeletePolicy::from_ignore_flag(self.ignore_delete_errors),
            poll: PollConfig {
                initial_interval: self.poll_interval,
                max_interval: self.max_poll_interval.max(self.poll_interval),
                failure_states: self
                    .failure_states
                    .iter()
                    .map(|s| SnapshotState::parse(s))
                    .collect(),
                ..PollConfig::default()
            },
        }
    }
}

/// Read and parse a declaration file
pub fn load_snapshot_file(path: &Path) -> Result<SnapshotFile> {
    let content = std::fs::read_to_string(path)?;
    let file = parse_snapshot_file(&content)?;
    tracing::debug!(
        "Loaded {} snapshot declaration(s) from {}",
        file.snapshots.len(),
        path.display()
    );
    Ok(file)
}

/// Parse declaration file content
pub fn parse_snapshot_file(content: &str) -> Result<SnapshotFile> {
    let doc: KdlDocument = content.parse()?;
    let mut file = SnapshotFile::default();

    for node in doc.nodes() {
        match node.name().value() {
            "settings" => file.settings = parse_settings(node)?,
            "snapshot" => {
                let decl = parse_snapshot(node)?;
                if file.get(&decl.name).is_some() {
                    return Err(ConfigError::DuplicateSnapshot(decl.name));
                }
                file.snapshots.push(decl);
            }
            other => {
                tracing::warn!("Ignoring unknown top-level node: {}", other);
            }
        }
    }

    Ok(file)
}

/// Parse a `settings` node
fn parse_settings(node: &KdlNode) -> Result<Settings> {
    let mut settings = Settings::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let key = child.name().value();
            match key {
                "region" => settings.region = first_string(child),
                "create-timeout" | "create_timeout" => {
                    settings.create_timeout = duration_at_least(child, MIN_CREATE_TIMEOUT)?;
                }
                "poll-interval" | "poll_interval" => {
                    settings.poll_interval = duration_at_least(child, MIN_POLL_INTERVAL)?;
                }
                "max-poll-interval" | "max_poll_interval" => {
                    settings.max_poll_interval = duration_at_least(child, MIN_POLL_INTERVAL)?;
                }
                "ignore-delete-errors" | "ignore_delete_errors" => {
                    settings.ignore_delete_errors = flag_arg(child)?;
                }
                "failure-states" | "failure_states" => {
                    settings.failure_states = child
                        .entries()
                        .iter()
                        .filter_map(|e| e.value().as_string().map(|s| s.to_string()))
                        .collect();
                }
                other => {
                    tracing::warn!("Ignoring unknown setting: {}", other);
                }
            }
        }
    }

    Ok(settings)
}

/// Parse a `snapshot` node
fn parse_snapshot(node: &KdlNode) -> Result<SnapshotDeclaration> {
    let name = first_string(node)
        .ok_or_else(|| ConfigError::InvalidConfig("snapshot requires a name".to_string()))?;

    let mut instance_id = None;
    let mut safe = false;
    let mut schedule = None;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "instance-id" | "instance_id" => instance_id = first_string(child),
                "safe" => safe = flag_arg(child)?,
                "cron-timing" | "cron_timing" | "schedule" => schedule = first_string(child),
                other => {
                    return Err(ConfigError::InvalidConfig(format!(
                        "unknown field '{}' in snapshot '{}'",
                        other, name
                    )));
                }
            }
        }
    }

    let decl = SnapshotDeclaration::new(name, instance_id.unwrap_or_default())
        .with_safe_mode(safe)
        .with_schedule(schedule.as_deref());

    decl.validate()
        .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
    Ok(decl)
}

fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// A bare flag node (`safe`) counts as true
fn flag_arg(node: &KdlNode) -> Result<bool> {
    match node.entries().first().map(|e| e.value()) {
        None => Ok(true),
        Some(KdlValue::Bool(b)) => Ok(*b),
        Some(other) => Err(ConfigError::InvalidConfig(format!(
            "{} expects a boolean, got {}",
            node.name().value(),
            other
        ))),
    }
}

/// Durations are humantime strings ("90s", "20m") or integer seconds
fn duration_arg(node: &KdlNode) -> Result<Duration> {
    let key = node.name().value().to_string();
    let value = node
        .entries()
        .first()
        .map(|e| e.value())
        .ok_or_else(|| ConfigError::InvalidDuration {
            key: key.clone(),
            value: String::new(),
        })?;

    if let Some(seconds) = value.as_integer() {
        return u64::try_from(seconds)
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidDuration {
                key,
                value: seconds.to_string(),
            });
    }

    let text = value.as_string().unwrap_or_default();
    humantime::parse_duration(text).map_err(|_| ConfigError::InvalidDuration {
        key,
        value: text.to_string(),
    })
}

fn duration_at_least(node: &KdlNode, min: Duration) -> Result<Duration> {
    let value = duration_arg(node)?;
    if value < min {
        return Err(ConfigError::InvalidDuration {
            key: node.name().value().to_string(),
            value: format!(
                "{} (minimum {})",
                humantime::format_duration(value),
                humantime::format_duration(min)
            ),
        });
    }
    Ok(value)
}
