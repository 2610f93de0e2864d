//! snapflow reconciliation core
//!
//! This crate manages declared cloud instance snapshots: it creates them
//! through a [`RemoteClient`], waits for one-shot snapshots to complete,
//! projects remote state into persisted attributes and deletes them again.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  snapflow CLI                    │
//! │          (plan / apply / refresh / destroy)      │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                snapflow-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │ Reconciler  (create / read / delete)      │   │
//! │  │   ├── PollPolicy  (bounded wait)          │   │
//! │  │   └── projector   (remote → attributes)   │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ Plan / Apply │  │  State Mgmt  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │ trait RemoteClient
//! ┌───────▼───────┐
//! │     civo      │
//! │    client     │
//! └───────────────┘
//! ```

pub mod action;
pub mod client;
pub mod declaration;
pub mod error;
pub mod poll;
pub mod projector;
pub mod reconciler;
pub mod state;

#[cfg(test)]
mod testing;

// Re-exports
pub use action::{Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary, apply};
pub use client::{ClientResult, RemoteClient, RemoteSnapshot, SnapshotRequest, SnapshotState};
pub use declaration::{CreationMode, SnapshotDeclaration};
pub use error::{ClientError, CloudError, Result};
pub use poll::{MIN_POLL_INTERVAL, PollConfig, PollPolicy};
pub use projector::{SnapshotAttributes, project};
pub use reconciler::{CreateFailure, DeletePolicy, Reconciler, ReconcilerConfig};
pub use state::{GlobalState, LifecycleState, ResourceRecord, StateLock, StateManager};
