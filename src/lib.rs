//! mongo-topology - MongoDB Topology Diff & Reconciliation
//!
//! Describes the logical structure of MongoDB clusters (databases, collections,
//! indexes, users and their roles) and:
//! - Computes a hierarchical diff between two topologies (CONTROL vs TEST)
//! - Introspects a live cluster into the same tree
//! - Additively reconciles a live cluster with a target topology

pub mod config;
pub mod connection;
pub mod error;
pub mod introspection;
pub mod loader;
pub mod models;
pub mod reconcile;
pub mod snapshot;

#[cfg(test)]
mod fixtures;

pub use connection::{ClusterAdmin, ClusterConnection, MongoAdmin};
pub use error::{AppError, AppResult};
pub use introspection::ClusterScanner;
pub use models::{Cluster, Collection, Database, Index, IndexDirection, IndexField, Role, Secret, User};
pub use reconcile::{Outcome, ReconcileReport, Reconciler};
pub use snapshot::{ClusterDiff, DiffEngine, DiffSummary};
