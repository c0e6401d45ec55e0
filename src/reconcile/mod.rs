//! Reconciliation Module
//!
//! Additive, best-effort application of a target topology to a live cluster.

pub mod driver;
pub mod report;

pub use driver::Reconciler;
pub use report::{EntityOutcome, EntityRef, Outcome, ReconcileReport};
