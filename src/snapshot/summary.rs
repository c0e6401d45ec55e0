//! Diff summary statistics

use crate::snapshot::diff::ClusterDiff;
use serde::Serialize;

/// Summary statistics for a cluster diff
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub databases_added: usize,
    pub databases_removed: usize,
    pub databases_modified: usize,
    pub collections_added: usize,
    pub collections_removed: usize,
    pub collections_modified: usize,
    pub indexes_added: usize,
    pub indexes_removed: usize,
    pub indexes_modified: usize,
    pub users_added: usize,
    pub users_removed: usize,
    pub users_modified: usize,
    pub roles_granted: usize,
    pub roles_revoked: usize,
    pub total_changes: usize,
}

impl DiffSummary {
    /// Count every facet entry of a diff. Wholesale additions and removals
    /// count once, not once per child.
    pub fn from_diff(diff: &ClusterDiff) -> Self {
        let dbs = &diff.databases;
        let mut summary = DiffSummary {
            databases_added: dbs.added.len(),
            databases_removed: dbs.removed.len(),
            ..Default::default()
        };

        let mut modified: Vec<&String> = dbs.collections.keys().chain(dbs.users.keys()).collect();
        modified.sort();
        modified.dedup();
        summary.databases_modified = modified.len();

        for collections in dbs.collections.values() {
            summary.collections_added += collections.added.len();
            summary.collections_removed += collections.removed.len();
            summary.collections_modified += collections.changed.len();

            for indexes in collections.changed.values() {
                summary.indexes_added += indexes.added.len();
                summary.indexes_removed += indexes.removed.len();
                summary.indexes_modified += indexes.changed.len();
            }
        }

        for users in dbs.users.values() {
            summary.users_added += users.added.len();
            summary.users_removed += users.removed.len();
            summary.users_modified += users.changed.len();

            for roles in users.changed.values() {
                summary.roles_granted += roles.added.len();
                summary.roles_revoked += roles.removed.len();
            }
        }

        summary.total_changes = summary.databases_added
            + summary.databases_removed
            + summary.collections_added
            + summary.collections_removed
            + summary.indexes_added
            + summary.indexes_removed
            + summary.indexes_modified
            + summary.users_added
            + summary.users_removed
            + summary.roles_granted
            + summary.roles_revoked;

        summary
    }
}
