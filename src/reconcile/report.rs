//! Per-entity reconciliation results

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Entity touched by a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityRef {
    User { username: String },
    Index { collection: String, name: String },
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::User { username } => write!(f, "user {}", username),
            EntityRef::Index { collection, name } => write!(f, "index {}.{}", collection, name),
        }
    }
}

/// What happened to one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    /// Created on the live cluster
    Created,
    /// Would be created (dry run)
    Planned,
    /// Already present with the target definition
    Unchanged,
    /// Present with a different definition; left untouched
    Drifted(String),
    /// Creation failed; the batch continued
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityOutcome {
    pub database: String,
    pub entity: EntityRef,
    pub outcome: Outcome,
}

/// Result of one reconciliation pass over a cluster
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub run_id: Uuid,
    pub cluster: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<EntityOutcome>,
}

impl ReconcileReport {
    pub fn created(&self) -> Vec<&EntityOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.outcome == Outcome::Created)
            .collect()
    }

    pub fn failures(&self) -> Vec<&EntityOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Failed(_)))
            .collect()
    }

    pub fn drifted(&self) -> Vec<&EntityOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Drifted(_)))
            .collect()
    }

    /// True when no entity failed
    pub fn is_success(&self) -> bool {
        self.failures().is_empty()
    }
}
