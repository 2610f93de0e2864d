//! Persisted snapshot state
//!
//! Manages the `.snapflow/state.json` file which holds the local handle
//! (remote id, lifecycle, last projected attributes) of every declared
//! snapshot.

use crate::declaration::SnapshotDeclaration;
use crate::error::{CloudError, Result};
use crate::projector::SnapshotAttributes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".snapflow";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// All persisted snapshot records, keyed by declared name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    pub resources: BTreeMap<String, ResourceRecord>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a record
    pub fn set_resource(&mut self, record: ResourceRecord) {
        self.resources.insert(record.declaration.name.clone(), record);
        self.updated_at = Utc::now();
    }

    /// Remove a record
    pub fn remove_resource(&mut self, name: &str) -> Option<ResourceRecord> {
        let result = self.resources.remove(name);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    pub fn get_resource(&self, name: &str) -> Option<&ResourceRecord> {
        self.resources.get(name)
    }

    /// Apply `f` to an existing record; returns false when `name` is unknown
    pub fn update_resource(&mut self, name: &str, f: impl FnOnce(&mut ResourceRecord)) -> bool {
        match self.resources.get_mut(name) {
            Some(record) => {
                f(record);
                self.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

/// Local handle of one declared snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Declaration the snapshot was created from
    pub declaration: SnapshotDeclaration,

    /// Remote identity, set as soon as the remote create returns
    pub id: Option<String>,

    pub lifecycle: LifecycleState,

    /// Attributes from the most recent successful read
    pub attributes: Option<SnapshotAttributes>,

    /// Error from the last failed operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    /// Remote state that ended the last wait; the snapshot cannot complete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_state: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceRecord {
    pub fn new(declaration: SnapshotDeclaration) -> Self {
        let now = Utc::now();
        Self {
            declaration,
            id: None,
            lifecycle: LifecycleState::Unrealized,
            attributes: None,
            last_error: None,
            terminal_state: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: LifecycleState) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Move to a new lifecycle state
    pub fn transition(&mut self, lifecycle: LifecycleState) {
        tracing::debug!(
            "{}: {} -> {}",
            self.declaration.name,
            self.lifecycle,
            lifecycle
        );
        self.lifecycle = lifecycle;
        self.updated_at = Utc::now();
    }

    /// Record a successful read; the remote id is authoritative
    pub fn realize(&mut self, attributes: SnapshotAttributes) {
        self.id = Some(attributes.id.clone());
        self.attributes = Some(attributes);
        self.last_error = None;
        self.terminal_state = None;
        self.transition(LifecycleState::Realized);
    }

    pub fn fail(&mut self, error: impl std::fmt::Display) {
        self.last_error = Some(error.to_string());
        self.transition(LifecycleState::Failed);
    }

    /// Record a failure; a [`CloudError::TerminalState`] marks the remote
    /// snapshot as unrecoverable
    pub fn fail_with(&mut self, error: &CloudError) {
        if let CloudError::TerminalState { state, .. } = error {
            self.terminal_state = Some(state.clone());
        }
        self.fail(error);
    }

    /// The remote snapshot reached a failure state and must be replaced
    pub fn needs_replacement(&self) -> bool {
        self.lifecycle == LifecycleState::Failed && self.terminal_state.is_some()
    }
}

/// Lifecycle of a single snapshot
///
/// `Unrealized -> Creating -> [Waiting] -> Realized -> Deleting -> Removed`;
/// `Waiting` is skipped for recurring snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Declared but never created
    Unrealized,
    /// Remote create in flight
    Creating,
    /// Remote create accepted, waiting for completion
    Waiting,
    /// Remote object confirmed
    Realized,
    /// Create or wait failed; the id may still be set
    Failed,
    /// Remote delete in flight
    Deleting,
    /// Remote delete requested and accepted
    Removed,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Unrealized => write!(f, "unrealized"),
            LifecycleState::Creating => write!(f, "creating"),
            LifecycleState::Waiting => write!(f, "waiting"),
            LifecycleState::Realized => write!(f, "realized"),
            LifecycleState::Failed => write!(f, "failed"),
            LifecycleState::Deleting => write!(f, "deleting"),
            LifecycleState::Removed => write!(f, "removed"),
        }
    }
}

/// Reads and writes `.snapflow/` under a project root
pub struct StateManager {
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the current state
    pub async fn load(&self) -> Result<GlobalState> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(GlobalState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: GlobalState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} snapshots", state.resources.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} snapshots", state.resources.len());
        Ok(())
    }

    /// Take the advisory lock guarding `state.json`.
    ///
    /// The lock file is created with `create_new`, so exactly one caller
    /// wins a race. A lock older than an hour is removed and the create
    /// retried once.
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();
        let holder = LockInfo::current();
        let content = serde_json::to_vec_pretty(&holder)?;

        match create_lock_file(&lock_path, &content).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                remove_stale_lock(&lock_path).await?;
                create_lock_file(&lock_path, &content)
                    .await
                    .map_err(|e| match e.kind() {
                        io::ErrorKind::AlreadyExists => CloudError::LockError(
                            "State lock was taken by another run".to_string(),
                        ),
                        _ => CloudError::Io(e),
                    })?;
            }
            Err(e) => return Err(e.into()),
        }

        tracing::debug!("Acquired state lock as {}", holder.holder);
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }
}

/// Locks older than this are taken over
const LOCK_STALE_AFTER_SECS: i64 = 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    acquired_at: DateTime<Utc>,
}

impl LockInfo {
    fn current() -> Self {
        let host = std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("HOST"))
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            holder: format!("{}:{}", host, std::process::id()),
            acquired_at: Utc::now(),
        }
    }
}

async fn create_lock_file(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(content).await?;
    file.flush().await
}

/// Remove the lock at `path` if it is stale; error if it is still held
async fn remove_stale_lock(path: &Path) -> Result<()> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        // released between our create attempt and this read
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    // an empty or partial file belongs to a holder still writing it
    let Ok(info) = serde_json::from_str::<LockInfo>(&content) else {
        return Err(CloudError::LockError(format!(
            "State is locked ({} is unreadable; remove it if no other run is active)",
            path.display()
        )));
    };

    let age = Utc::now().signed_duration_since(info.acquired_at);
    if age.num_seconds() < LOCK_STALE_AFTER_SECS {
        return Err(CloudError::LockError(format!(
            "State is locked by {} since {}",
            info.holder, info.acquired_at
        )));
    }

    tracing::warn!(
        "Removing stale state lock held by {} since {}",
        info.holder,
        info.acquired_at
    );
    match fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// Held state lock; the lock file is removed on release or drop
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        match fs::remove_file(&self.lock_path).await {
            Ok(()) => {
                tracing::debug!("Released state lock");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
