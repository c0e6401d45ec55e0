//! Topology Diff Engine
//!
//! Compares two topology trees (CONTROL and TEST) and produces a diff tree
//! mirroring the topology's shape. This is the "git diff" for a cluster.
//!
//! Every level follows the same recipe: split siblings by identity key into
//! added / removed / matched, then recurse into each matched pair and keep
//! the child diff only when it is non-empty. Matched entities are never
//! compared as whole values.

use crate::models::{Cluster, Collection, Database, Index, Role, User};
use crate::snapshot::identity::partition;
use serde::Serialize;
use std::collections::BTreeMap;

/// Same-named index whose definition differs between the two sides
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexChange {
    pub before: Index,
    pub after: Index,
}

/// Index changes within one collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDiff {
    pub added: Vec<Index>,
    pub removed: Vec<Index>,
    /// Index name -> definition change (fields or uniqueness)
    pub changed: BTreeMap<String, IndexChange>,
}

impl IndexDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Role grants added to or revoked from one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDiff {
    pub added: Vec<Role>,
    pub removed: Vec<Role>,
}

impl RoleDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Collection changes within one database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDiff {
    pub added: Vec<Collection>,
    pub removed: Vec<Collection>,
    /// Collection name -> index changes
    pub changed: BTreeMap<String, IndexDiff>,
}

impl CollectionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// User changes within one database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDiff {
    pub added: Vec<User>,
    pub removed: Vec<User>,
    /// Username -> role changes
    pub changed: BTreeMap<String, RoleDiff>,
}

impl UserDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Database-level aggregation.
///
/// Collection and user changes are independent facets keyed by database
/// name; a database differing in only one facet appears in only one map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseDiff {
    pub added: Vec<Database>,
    pub removed: Vec<Database>,
    pub collections: BTreeMap<String, CollectionDiff>,
    pub users: BTreeMap<String, UserDiff>,
}

impl DatabaseDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.collections.is_empty()
            && self.users.is_empty()
    }
}

/// Complete cluster diff result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDiff {
    /// CONTROL cluster name
    pub control_cluster: String,
    /// TEST cluster name
    pub test_cluster: String,
    /// CONTROL topology checksum
    pub control_checksum: String,
    /// TEST topology checksum
    pub test_checksum: String,
    pub databases: DatabaseDiff,
}

impl ClusterDiff {
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }
}

/// The diff engine that compares topology trees
pub struct DiffEngine;

impl DiffEngine {
    /// Compare two clusters. Host, port and credentials are never compared.
    pub fn diff(control: &Cluster, test: &Cluster) -> ClusterDiff {
        let databases = Self::diff_databases(&control.databases, &test.databases);

        ClusterDiff {
            control_cluster: control.name.clone(),
            test_cluster: test.name.clone(),
            control_checksum: control.topology_checksum(),
            test_checksum: test.topology_checksum(),
            databases,
        }
    }

    pub fn diff_databases(control: &[Database], test: &[Database]) -> DatabaseDiff {
        let split = partition(control, test);

        let mut collections = BTreeMap::new();
        let mut users = BTreeMap::new();

        for (before, after) in &split.matched {
            let collection_diff = Self::diff_collections(&before.collections, &after.collections);
            if !collection_diff.is_empty() {
                collections.insert(before.name.clone(), collection_diff);
            }

            let user_diff = Self::diff_users(&before.users, &after.users);
            if !user_diff.is_empty() {
                users.insert(before.name.clone(), user_diff);
            }
        }

        DatabaseDiff {
            added: split.added_owned(),
            removed: split.removed_owned(),
            collections,
            users,
        }
    }

    pub fn diff_collections(control: &[Collection], test: &[Collection]) -> CollectionDiff {
        let split = partition(control, test);

        let changed = split
            .matched
            .iter()
            .filter_map(|(before, after)| {
                let index_diff = Self::diff_indexes(&before.indexes, &after.indexes);
                (!index_diff.is_empty()).then(|| (before.name.clone(), index_diff))
            })
            .collect();

        CollectionDiff {
            added: split.added_owned(),
            removed: split.removed_owned(),
            changed,
        }
    }

    pub fn diff_indexes(control: &[Index], test: &[Index]) -> IndexDiff {
        let split = partition(control, test);

        let changed = split
            .matched
            .iter()
            .filter(|(before, after)| !before.same_definition(after))
            .map(|(before, after)| {
                let change = IndexChange {
                    before: (*before).clone(),
                    after: (*after).clone(),
                };
                (before.name.clone(), change)
            })
            .collect();

        IndexDiff {
            added: split.added_owned(),
            removed: split.removed_owned(),
            changed,
        }
    }

    /// Credentials are ignored; only role membership is compared.
    pub fn diff_users(control: &[User], test: &[User]) -> UserDiff {
        let split = partition(control, test);

        let changed = split
            .matched
            .iter()
            .filter_map(|(before, after)| {
                let role_diff = Self::diff_roles(&before.roles, &after.roles);
                (!role_diff.is_empty()).then(|| (before.username.clone(), role_diff))
            })
            .collect();

        UserDiff {
            added: split.added_owned(),
            removed: split.removed_owned(),
            changed,
        }
    }

    pub fn diff_roles(control: &[Role], test: &[Role]) -> RoleDiff {
        let split = partition(control, test);

        RoleDiff {
            added: split.added_owned(),
            removed: split.removed_owned(),
        }
    }
}
