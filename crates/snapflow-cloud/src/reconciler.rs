//! Create / Read / Delete orchestration for declared snapshots

use crate::client::RemoteClient;
use crate::declaration::{CreationMode, SnapshotDeclaration};
use crate::error::{ClientError, CloudError, Result};
use crate::poll::{PollConfig, PollPolicy};
use crate::projector::{SnapshotAttributes, project};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// What to do when the remote API refuses a delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Log the failure and report success
    #[default]
    Ignore,
    /// Surface the failure as [`CloudError::RemoteDeleteFailed`]
    Propagate,
}

impl DeletePolicy {
    pub fn from_ignore_flag(ignore_delete_errors: bool) -> Self {
        if ignore_delete_errors {
            DeletePolicy::Ignore
        } else {
            DeletePolicy::Propagate
        }
    }
}

/// Reconciler settings
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Budget for the waiting phase of a one-shot create
    pub create_timeout: Duration,
    pub delete_policy: DeletePolicy,
    pub poll: PollConfig,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            create_timeout: Duration::from_secs(20 * 60),
            delete_policy: DeletePolicy::default(),
            poll: PollConfig::default(),
        }
    }
}

/// A failed create, with the remote identity if one was assigned.
///
/// When `id` is set the remote object may exist; the caller must keep the
/// handle so the snapshot can still be read or deleted.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct CreateFailure {
    pub id: Option<String>,
    #[source]
    pub error: CloudError,
}

impl CreateFailure {
    fn unrealized(error: CloudError) -> Self {
        Self { id: None, error }
    }

    fn with_identity(id: &str, error: CloudError) -> Self {
        Self {
            id: Some(id.to_string()),
            error,
        }
    }
}

/// Reconciles declared snapshots against a remote API
pub struct Reconciler {
    client: Arc<dyn RemoteClient>,
    poll: PollPolicy,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(client: Arc<dyn RemoteClient>, config: ReconcilerConfig) -> Self {
        Self {
            client,
            poll: PollPolicy::new(config.poll.clone()),
            config,
        }
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Create a snapshot and wait until it is realized
    pub async fn create(
        &self,
        decl: &SnapshotDeclaration,
    ) -> std::result::Result<SnapshotAttributes, CreateFailure> {
        let id = self.request_create(decl).await?;
        self.await_realized(decl, &id).await
    }

    /// Validate the declaration and issue the remote create.
    ///
    /// Returns the identity assigned by the remote system. Nothing is sent
    /// when validation fails.
    pub async fn request_create(
        &self,
        decl: &SnapshotDeclaration,
    ) -> std::result::Result<String, CreateFailure> {
        decl.validate().map_err(CreateFailure::unrealized)?;

        tracing::info!(
            "Creating {} snapshot {} of instance {}",
            decl.mode,
            decl.name,
            decl.source_id
        );

        let created = self
            .client
            .create(&decl.name, &decl.request())
            .await
            .map_err(|e| CreateFailure::unrealized(CloudError::RemoteCreateFailed(e)))?;

        if created.id.trim().is_empty() {
            return Err(CreateFailure::unrealized(CloudError::RemoteCreateFailed(
                ClientError::Rejected(format!(
                    "remote returned no id for snapshot {}",
                    decl.name
                )),
            )));
        }

        tracing::debug!("Snapshot {} assigned id {}", decl.name, created.id);
        Ok(created.id)
    }

    /// Finish a create whose remote identity is already known
    pub async fn await_realized(
        &self,
        decl: &SnapshotDeclaration,
        id: &str,
    ) -> std::result::Result<SnapshotAttributes, CreateFailure> {
        let attributes = match &decl.mode {
            CreationMode::Recurring(schedule) => {
                // completion of a recurring snapshot is transient; read once
                tracing::debug!(
                    "Snapshot {} is scheduled ({}), skipping wait",
                    decl.name,
                    schedule
                );
                self.read(id).await
            }
            CreationMode::OneShot => {
                tracing::info!("Waiting for snapshot {} ({}) to complete", decl.name, id);
                self.poll
                    .wait_until_complete(self.client.as_ref(), id, self.config.create_timeout)
                    .await
                    .map(|snapshot| project(&snapshot))
            }
        }
        .map_err(|e| CreateFailure::with_identity(id, e))?;

        tracing::info!("Snapshot {} realized (state: {})", decl.name, attributes.state);
        Ok(attributes)
    }

    /// Refresh the attributes of an existing snapshot
    pub async fn read(&self, id: &str) -> Result<SnapshotAttributes> {
        let snapshot = self
            .client
            .find(id)
            .await
            .map_err(|source| CloudError::RemoteReadFailed {
                id: id.to_string(),
                source,
            })?;
        Ok(project(&snapshot))
    }

    /// Delete a snapshot, applying the configured [`DeletePolicy`]
    pub async fn delete(&self, id: &str) -> Result<()> {
        match self.client.delete(id).await {
            Ok(()) => {
                tracing::info!("Deleted snapshot {}", id);
                Ok(())
            }
            Err(source) => match self.config.delete_policy {
                DeletePolicy::Ignore => {
                    tracing::warn!("Ignoring failed delete of snapshot {}: {}", id, source);
                    Ok(())
                }
                DeletePolicy::Propagate => Err(CloudError::RemoteDeleteFailed {
                    id: id.to_string(),
                    source,
                }),
            },
        }
    }
}
