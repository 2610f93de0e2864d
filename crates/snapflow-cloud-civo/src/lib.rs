//! Civo client for snapflow
//!
//! This crate implements the [`RemoteClient`](snapflow_cloud::RemoteClient)
//! trait against the Civo v2 snapshot API, so snapflow can create, poll and
//! delete instance snapshots on Civo.
//!
//! # Requirements
//!
//! - `CIVO_TOKEN` must hold a Civo API key
//! - `CIVO_REGION` selects the region (default `LON1`)
//!
//! # Example
//!
//! ```ignore
//! use snapflow_cloud::{Reconciler, ReconcilerConfig, SnapshotDeclaration};
//! use snapflow_cloud_civo::{CivoClient, CivoConfig};
//! use std::sync::Arc;
//!
//! let client = CivoClient::new(CivoConfig::from_env()?)?;
//! let reconciler = Reconciler::new(Arc::new(client), ReconcilerConfig::default());
//!
//! let decl = SnapshotDeclaration::new("db-snap", "instance-id").with_safe_mode(true);
//! let attributes = reconciler.create(&decl).await?;
//! ```

pub mod client;
pub mod error;

pub use client::{CivoClient, CivoConfig};
pub use error::{CivoError, Result};
