//! Topology Snapshot Module
//!
//! The heart of the crate - detecting what changed between two topologies.
//! This module provides:
//! - Identity matching (which entities are "the same" across versions)
//! - Topology diff engine (comparing two trees level by level)
//! - Diff summaries and text rendering

pub mod diff;
pub mod identity;
pub mod report;
pub mod summary;

pub use diff::{
    ClusterDiff, CollectionDiff, DatabaseDiff, DiffEngine, IndexChange, IndexDiff, RoleDiff, UserDiff,
};
pub use report::render_text;
pub use summary::DiffSummary;
