//! Plan and apply for declared snapshots

use crate::declaration::SnapshotDeclaration;
use crate::error::Result;
use crate::reconciler::Reconciler;
use crate::state::{GlobalState, LifecycleState, ResourceRecord, StateManager};
use serde::{Deserialize, Serialize};

/// Represents a planned action for one snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Declared snapshot name
    pub name: String,

    /// Desired state; absent for deletions
    pub declaration: Option<SnapshotDeclaration>,

    /// Remote identity of the existing snapshot, if any
    pub remote_id: Option<String>,

    /// Description of the action
    pub description: String,
}

impl Action {
    fn new(
        action_type: ActionType,
        name: &str,
        declaration: Option<SnapshotDeclaration>,
        remote_id: Option<String>,
        description: String,
    ) -> Self {
        Self {
            id: format!("{}-{}", action_type, name),
            action_type,
            name: name.to_string(),
            declaration,
            remote_id,
            description,
        }
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new snapshot
    Create,
    /// Delete and re-create; declared fields are immutable
    Replace,
    /// Delete a snapshot that is no longer declared
    Delete,
    /// Re-read remote state, resuming an unfinished create
    Refresh,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Replace => write!(f, "replace"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::Refresh => write!(f, "refresh"),
        }
    }
}

/// Result of applying actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Successfully applied actions
    pub succeeded: Vec<ActionResult>,

    /// Failed actions
    pub failed: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, action_id: String, message: String) {
        self.succeeded.push(ActionResult {
            action_id,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, action_id: String, error: String) {
        self.failed.push(ActionResult {
            action_id,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }
}

impl Default for ApplyResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// ID of the action
    pub action_id: String,

    /// Whether the action succeeded
    pub success: bool,

    /// Success message
    pub message: String,

    /// Error message if failed
    pub error: Option<String>,
}

/// Plan containing all actions to be applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// List of actions to perform
    pub actions: Vec<Action>,

    /// Whether the plan changes anything remotely
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions
            .iter()
            .any(|a| a.action_type != ActionType::Refresh);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            has_changes: false,
        }
    }

    /// Diff the declared snapshots against persisted state
    pub fn build(declared: &[SnapshotDeclaration], state: &GlobalState) -> Self {
        let mut actions = Vec::new();

        for decl in declared {
            let action = match state.get_resource(&decl.name) {
                Some(record) if record.id.is_some() && record.declaration != *decl => {
                    Action::new(
                        ActionType::Replace,
                        &decl.name,
                        Some(decl.clone()),
                        record.id.clone(),
                        format!("Replace snapshot {} (declaration changed)", decl.name),
                    )
                }
                Some(record) if record.id.is_some() && record.needs_replacement() => {
                    Action::new(
                        ActionType::Replace,
                        &decl.name,
                        Some(decl.clone()),
                        record.id.clone(),
                        format!(
                            "Replace snapshot {} (remote state {})",
                            decl.name,
                            record.terminal_state.as_deref().unwrap_or("failed")
                        ),
                    )
                }
                Some(record) if record.id.is_some() => Action::new(
                    ActionType::Refresh,
                    &decl.name,
                    Some(decl.clone()),
                    record.id.clone(),
                    format!("Refresh snapshot {}", decl.name),
                ),
                _ => Action::new(
                    ActionType::Create,
                    &decl.name,
                    Some(decl.clone()),
                    None,
                    format!(
                        "Create {} snapshot {} of {}",
                        decl.mode, decl.name, decl.source_id
                    ),
                ),
            };
            actions.push(action);
        }

        for (name, record) in &state.resources {
            if declared.iter().any(|d| &d.name == name) {
                continue;
            }
            actions.push(Action::new(
                ActionType::Delete,
                name,
                None,
                record.id.clone(),
                format!("Delete snapshot {} (no longer declared)", name),
            ));
        }

        Self::new(actions)
    }

    /// Delete every tracked snapshot, or only `name`
    pub fn destroy(state: &GlobalState, name: Option<&str>) -> Self {
        let actions = state
            .resources
            .iter()
            .filter(|(n, _)| name.is_none_or(|wanted| wanted == n.as_str()))
            .map(|(n, record)| {
                Action::new(
                    ActionType::Delete,
                    n,
                    None,
                    record.id.clone(),
                    format!("Delete snapshot {}", n),
                )
            })
            .collect();
        Self::new(actions)
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            replace: self.actions_by_type(ActionType::Replace).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            refresh: self.actions_by_type(ActionType::Refresh).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub create: usize,
    pub replace: usize,
    pub delete: usize,
    pub refresh: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to replace, {} to delete, {} to refresh",
            self.create, self.replace, self.delete, self.refresh
        )
    }
}

/// Outcome of one action: success message or error message
type Outcome = std::result::Result<String, String>;

/// Apply `plan` sequentially, saving state after every transition.
///
/// Action failures are collected in the [`ApplyResult`]; only state file
/// errors abort the run.
pub async fn apply(
    reconciler: &Reconciler,
    plan: &Plan,
    state: &mut GlobalState,
    store: &StateManager,
) -> Result<ApplyResult> {
    let mut result = ApplyResult::new();
    let start = std::time::Instant::now();

    for action in &plan.actions {
        tracing::info!("{}", action.description);

        let outcome = match (action.action_type, &action.declaration) {
            (ActionType::Create, Some(decl)) => create(reconciler, decl, state, store).await?,
            (ActionType::Replace, Some(decl)) => {
                match delete(reconciler, &action.name, action.remote_id.as_deref(), state, store)
                    .await?
                {
                    Ok(_) => create(reconciler, decl, state, store).await?,
                    Err(e) => Err(e),
                }
            }
            (ActionType::Delete, _) => {
                delete(reconciler, &action.name, action.remote_id.as_deref(), state, store)
                    .await?
            }
            (ActionType::Refresh, Some(decl)) => {
                refresh(reconciler, decl, action.remote_id.as_deref(), state, store).await?
            }
            (action_type, None) => Err(format!(
                "{} of {} requires a declaration",
                action_type, action.name
            )),
        };

        match outcome {
            Ok(message) => result.add_success(action.id.clone(), message),
            Err(error) => result.add_failure(action.id.clone(), error),
        }
    }

    result.duration_ms = start.elapsed().as_millis() as u64;
    Ok(result)
}

async fn create(
    reconciler: &Reconciler,
    decl: &SnapshotDeclaration,
    state: &mut GlobalState,
    store: &StateManager,
) -> Result<Outcome> {
    state.set_resource(ResourceRecord::new(decl.clone()).with_lifecycle(LifecycleState::Creating));
    store.save(state).await?;

    let id = match reconciler.request_create(decl).await {
        Ok(id) => id,
        Err(failure) => {
            // nothing exists remotely, so nothing is kept locally
            state.remove_resource(&decl.name);
            store.save(state).await?;
            return Ok(Err(failure.to_string()));
        }
    };

    let next = if decl.mode.requires_polling() {
        LifecycleState::Waiting
    } else {
        LifecycleState::Creating
    };
    state.update_resource(&decl.name, |record| {
        record.id = Some(id.clone());
        record.transition(next);
    });
    store.save(state).await?;

    let outcome = finish(reconciler, decl, &id, state).await;
    store.save(state).await?;
    Ok(outcome.map(|_| format!("Created snapshot {} (ID: {})", decl.name, id)))
}

async fn finish(
    reconciler: &Reconciler,
    decl: &SnapshotDeclaration,
    id: &str,
    state: &mut GlobalState,
) -> Outcome {
    match reconciler.await_realized(decl, id).await {
        Ok(attributes) => {
            state.update_resource(&decl.name, |record| record.realize(attributes));
            Ok(String::new())
        }
        Err(failure) => {
            state.update_resource(&decl.name, |record| record.fail_with(&failure.error));
            Err(format!("{} (snapshot {} kept for retry)", failure, id))
        }
    }
}

async fn delete(
    reconciler: &Reconciler,
    name: &str,
    remote_id: Option<&str>,
    state: &mut GlobalState,
    store: &StateManager,
) -> Result<Outcome> {
    let Some(id) = remote_id else {
        state.remove_resource(name);
        store.save(state).await?;
        return Ok(Ok(format!("Dropped {} (never created remotely)", name)));
    };

    state.update_resource(name, |record| record.transition(LifecycleState::Deleting));
    store.save(state).await?;

    let outcome = match reconciler.delete(id).await {
        Ok(()) => {
            state.update_resource(name, |record| record.transition(LifecycleState::Removed));
            state.remove_resource(name);
            Ok(format!("Deleted snapshot {} (ID: {})", name, id))
        }
        Err(e) => {
            state.update_resource(name, |record| record.fail(&e));
            Err(e.to_string())
        }
    };
    store.save(state).await?;
    Ok(outcome)
}

async fn refresh(
    reconciler: &Reconciler,
    decl: &SnapshotDeclaration,
    remote_id: Option<&str>,
    state: &mut GlobalState,
    store: &StateManager,
) -> Result<Outcome> {
    let Some(id) = remote_id else {
        return Ok(Ok(format!("{} has no remote identity", decl.name)));
    };

    let realized = state
        .get_resource(&decl.name)
        .is_some_and(|record| record.lifecycle == LifecycleState::Realized);

    let outcome = if realized {
        match reconciler.read(id).await {
            Ok(attributes) => {
                state.update_resource(&decl.name, |record| record.realize(attributes));
                Ok(format!("Refreshed snapshot {}", decl.name))
            }
            Err(e) if e.is_not_found() => {
                state.remove_resource(&decl.name);
                Ok(format!(
                    "Snapshot {} no longer exists remotely; removed from state",
                    decl.name
                ))
            }
            Err(e) => {
                state.update_resource(&decl.name, |record| {
                    record.last_error = Some(e.to_string())
                });
                Err(e.to_string())
            }
        }
    } else {
        finish(reconciler, decl, id, state)
            .await
            .map(|_| format!("Resumed snapshot {} (ID: {})", decl.name, id))
    };

    store.save(state).await?;
    Ok(outcome)
}
