//! Human-readable rendering of a cluster diff
//!
//! `+` added, `-` removed, `~` changed; nesting follows the topology.

use crate::models::{Index, User};
use crate::snapshot::diff::{ClusterDiff, CollectionDiff, UserDiff};
use crate::snapshot::summary::DiffSummary;
use std::collections::BTreeSet;
use std::fmt::Write;

fn describe_index(index: &Index) -> String {
    let fields: Vec<String> = index.fields.iter().map(|f| f.to_string()).collect();
    format!(
        "{} {{{}}}{}",
        index.name,
        fields.join(", "),
        if index.unique { " unique" } else { "" }
    )
}

fn describe_user(user: &User) -> String {
    format!("{} [{}]", user.username, user.roles.join(", "))
}

/// Render a diff as indented text lines
pub fn render_text(diff: &ClusterDiff) -> String {
    let mut out = String::new();
    let dbs = &diff.databases;

    let _ = writeln!(out, "cluster {} -> {}", diff.control_cluster, diff.test_cluster);

    if diff.is_empty() {
        let _ = writeln!(out, "  no changes");
        return out;
    }

    for db in &dbs.added {
        let _ = writeln!(
            out,
            "+ database {} ({} collections, {} users)",
            db.name,
            db.collections.len(),
            db.users.len()
        );
    }
    for db in &dbs.removed {
        let _ = writeln!(out, "- database {}", db.name);
    }

    let modified: BTreeSet<&String> = dbs.collections.keys().chain(dbs.users.keys()).collect();
    for name in modified {
        let _ = writeln!(out, "~ database {}", name);
        if let Some(collections) = dbs.collections.get(name) {
            render_collections(&mut out, collections);
        }
        if let Some(users) = dbs.users.get(name) {
            render_users(&mut out, users);
        }
    }

    let summary = DiffSummary::from_diff(diff);
    let _ = writeln!(out, "{} changes", summary.total_changes);
    out
}

fn render_collections(out: &mut String, diff: &CollectionDiff) {
    for coll in &diff.added {
        let _ = writeln!(out, "  + collection {} ({} indexes)", coll.name, coll.indexes.len());
    }
    for coll in &diff.removed {
        let _ = writeln!(out, "  - collection {}", coll.name);
    }
    for (name, indexes) in &diff.changed {
        let _ = writeln!(out, "  ~ collection {}", name);
        for idx in &indexes.added {
            let _ = writeln!(out, "    + index {}", describe_index(idx));
        }
        for idx in &indexes.removed {
            let _ = writeln!(out, "    - index {}", describe_index(idx));
        }
        for change in indexes.changed.values() {
            let _ = writeln!(
                out,
                "    ~ index {} -> {}",
                describe_index(&change.before),
                describe_index(&change.after)
            );
        }
    }
}

fn render_users(out: &mut String, diff: &UserDiff) {
    for user in &diff.added {
        let _ = writeln!(out, "  + user {}", describe_user(user));
    }
    for user in &diff.removed {
        let _ = writeln!(out, "  - user {}", user.username);
    }
    for (name, roles) in &diff.changed {
        let granted: Vec<String> = roles.added.iter().map(|r| format!("+{}", r)).collect();
        let revoked: Vec<String> = roles.removed.iter().map(|r| format!("-{}", r)).collect();
        let _ = writeln!(
            out,
            "  ~ user {}: {}",
            name,
            granted.into_iter().chain(revoked).collect::<Vec<_>>().join(" ")
        );
    }
}
