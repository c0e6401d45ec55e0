//! Reconciliation driver
//!
//! Brings a live cluster up to a target topology, additively: users and
//! indexes missing from the cluster are created, existing entities are never
//! dropped or altered. Each entity gets its own outcome and a failure never
//! stops the rest of the batch.

use crate::connection::ClusterAdmin;
use crate::models::{Cluster, Collection, Database, User};
use crate::reconcile::report::{EntityOutcome, EntityRef, Outcome, ReconcileReport};
use crate::snapshot::DiffEngine;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

pub struct Reconciler<'a> {
    admin: &'a dyn ClusterAdmin,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(admin: &'a dyn ClusterAdmin) -> Self {
        Self {
            admin,
            dry_run: false,
        }
    }

    /// Plan only: report what would be created without writing
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reconcile every database of `cluster`, one at a time, users first
    pub async fn reconcile(&self, cluster: &Cluster) -> ReconcileReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut outcomes = Vec::new();

        info!(
            "Reconciling cluster {} ({} databases, run {}, dry run: {})",
            cluster.name,
            cluster.databases.len(),
            run_id,
            self.dry_run
        );

        for db in &cluster.databases {
            outcomes.extend(self.reconcile_users(db).await);
            for coll in &db.collections {
                outcomes.extend(self.reconcile_indexes(db, coll).await);
            }
        }

        let report = ReconcileReport {
            run_id,
            cluster: cluster.name.clone(),
            dry_run: self.dry_run,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };

        info!(
            "Reconciled cluster {}: {} created, {} drifted, {} failed",
            cluster.name,
            report.created().len(),
            report.drifted().len(),
            report.failures().len()
        );

        report
    }

    async fn reconcile_users(&self, db: &Database) -> Vec<EntityOutcome> {
        let existing = match self.admin.list_users(&db.name).await {
            Ok(users) => users,
            Err(e) => {
                warn!("Could not list users of {}: {}; creating all", db.name, e);
                Vec::new()
            }
        };

        let mut outcomes = Vec::with_capacity(db.users.len());
        for user in &db.users {
            let outcome = match existing.iter().find(|u| u.username == user.username) {
                Some(live) => Self::compare_user(live, user),
                None if self.dry_run => Outcome::Planned,
                None => match self.admin.create_user(&db.name, user).await {
                    Ok(()) => Outcome::Created,
                    Err(e) => {
                        warn!("Error creating user {} in {}: {}", user.username, db.name, e);
                        Outcome::Failed(e.to_string())
                    }
                },
            };

            outcomes.push(EntityOutcome {
                database: db.name.clone(),
                entity: EntityRef::User {
                    username: user.username.clone(),
                },
                outcome,
            });
        }
        outcomes
    }

    fn compare_user(live: &User, target: &User) -> Outcome {
        let roles = DiffEngine::diff_roles(&live.roles, &target.roles);
        if roles.is_empty() {
            return Outcome::Unchanged;
        }
        Outcome::Drifted(format!(
            "roles missing: [{}], extra: [{}]",
            roles.added.join(", "),
            roles.removed.join(", ")
        ))
    }

    async fn reconcile_indexes(&self, db: &Database, coll: &Collection) -> Vec<EntityOutcome> {
        let existing = match self.admin.list_indexes(&db.name, &coll.name).await {
            Ok(indexes) => indexes,
            Err(e) => {
                warn!("Could not list indexes of {}.{}: {}; creating all", db.name, coll.name, e);
                Vec::new()
            }
        };

        let mut outcomes = Vec::with_capacity(coll.indexes.len());
        for index in &coll.indexes {
            let outcome = match existing.iter().find(|i| i.name == index.name) {
                Some(live) if live.same_definition(index) => Outcome::Unchanged,
                Some(_) => Outcome::Drifted("index definition differs".to_string()),
                None if self.dry_run => Outcome::Planned,
                None => match self.admin.create_index(&db.name, &coll.name, index).await {
                    Ok(()) => Outcome::Created,
                    Err(e) => {
                        warn!(
                            "Error creating index {} in collection {}.{}: {}",
                            index.name, db.name, coll.name, e
                        );
                        Outcome::Failed(e.to_string())
                    }
                },
            };

            outcomes.push(EntityOutcome {
                database: db.name.clone(),
                entity: EntityRef::Index {
                    collection: coll.name.clone(),
                    name: index.name.clone(),
                },
                outcome,
            });
        }
        outcomes
    }
}
