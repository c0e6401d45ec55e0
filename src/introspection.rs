//! Cluster Introspection Module
//!
//! Scans a live cluster into a topology tree, the "observed" side of a diff.

use crate::connection::{ClusterAdmin, ClusterConnection};
use crate::error::AppResult;
use crate::models::{Cluster, Collection, Database};
use tracing::{debug, info};

/// Databases owned by the server itself, never part of a topology
pub const SYSTEM_DATABASES: [&str; 3] = ["admin", "local", "config"];

/// Index MongoDB creates on every collection
pub const DEFAULT_ID_INDEX: &str = "_id_";

/// Collections owned by the server (`system.users`, `system.version`, ...)
const SYSTEM_COLLECTION_PREFIX: &str = "system.";

/// Scanner that builds a [`Cluster`] from live state
pub struct ClusterScanner<'a> {
    admin: &'a dyn ClusterAdmin,
    skip_databases: Vec<String>,
    keep_databases: Vec<String>,
}

impl<'a> ClusterScanner<'a> {
    pub fn new(admin: &'a dyn ClusterAdmin) -> Self {
        Self {
            admin,
            skip_databases: SYSTEM_DATABASES.iter().map(|s| s.to_string()).collect(),
            keep_databases: Vec::new(),
        }
    }

    /// Replace the list of databases left out of the scan
    pub fn skip_databases(mut self, names: Vec<String>) -> Self {
        self.skip_databases = names;
        self
    }

    /// Always scan these databases, even when they are on the skip list
    pub fn keep_databases(mut self, names: Vec<String>) -> Self {
        self.keep_databases = names;
        self
    }

    /// Keep every database `target` declares, so that a diff against
    /// `target` compares like with like
    pub fn for_target(self, target: &Cluster) -> Self {
        let names = target.databases.iter().map(|db| db.name.clone()).collect();
        self.keep_databases(names)
    }

    fn skips(&self, db_name: &str) -> bool {
        self.skip_databases.iter().any(|s| s == db_name)
            && !self.keep_databases.iter().any(|k| k == db_name)
    }

    /// Introspect the complete topology of the cluster behind `admin`
    pub async fn scan(&self, name: &str, connection: &ClusterConnection) -> AppResult<Cluster> {
        let mut databases = Vec::new();

        for db_name in self.admin.list_databases().await? {
            if self.skips(&db_name) {
                debug!("Skipping system database {}", db_name);
                continue;
            }
            databases.push(self.scan_database(&db_name).await?);
        }

        let cluster = Cluster {
            name: name.to_string(),
            host: connection.host.clone(),
            port: connection.port,
            username: connection.username.clone(),
            password: connection.password.clone(),
            authentication_database: connection.auth_database.clone(),
            databases,
        };

        info!(
            "Introspected cluster {} with {} databases (checksum {})",
            cluster.name,
            cluster.databases.len(),
            cluster.topology_checksum()
        );

        Ok(cluster)
    }

    async fn scan_database(&self, name: &str) -> AppResult<Database> {
        let mut collections = Vec::new();

        for coll_name in self.admin.list_collections(name).await? {
            if coll_name.starts_with(SYSTEM_COLLECTION_PREFIX) {
                continue;
            }
            let indexes = self
                .admin
                .list_indexes(name, &coll_name)
                .await?
                .into_iter()
                .filter(|idx| idx.name != DEFAULT_ID_INDEX)
                .collect();
            collections.push(Collection::new(coll_name, indexes));
        }

        let users = self.admin.list_users(name).await?;

        debug!(
            "Introspected database {} with {} collections, {} users",
            name,
            collections.len(),
            users.len()
        );

        Ok(Database::new(name, collections, users))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::InMemoryAdmin;
    use crate::models::{Index, IndexField, Secret, User};

    fn connection() -> ClusterConnection {
        ClusterConnection {
            host: "localhost".to_string(),
            port: 27017,
            username: "mongolocal".to_string(),
            password: Secret::new("mongosecret1a"),
            auth_database: "admin".to_string(),
        }
    }

    fn live_cluster() -> InMemoryAdmin {
        InMemoryAdmin::new()
            .with_user("admin", User::new("root", "", vec!["root".to_string()]))
            .with_collection("local", "startup_log")
            .with_index("test_db_2", "test_collection", Index::new("_id_", vec![IndexField::ascending("_id")], true))
            .with_index("test_db_2", "test_collection", Index::new("by_key", vec![IndexField::ascending("key")], false))
            .with_user("test_db_2", User::new("test_user", "password", vec!["readWrite".to_string()]))
    }

    #[tokio::test]
    async fn test_scan_skips_system_databases() {
        let admin = live_cluster();
        let cluster = ClusterScanner::new(&admin).scan("MyCluster", &connection()).await.unwrap();

        let names: Vec<&str> = cluster.databases.iter().map(|db| db.name.as_str()).collect();
        assert_eq!(names, vec!["test_db_2"]);
        assert_eq!(cluster.name, "MyCluster");
        assert_eq!(cluster.port, 27017);
    }

    #[tokio::test]
    async fn test_scan_reads_collections_indexes_and_users() {
        let admin = live_cluster();
        let cluster = ClusterScanner::new(&admin).scan("MyCluster", &connection()).await.unwrap();

        let db = cluster.database("test_db_2").unwrap();
        assert_eq!(db.collections.len(), 1);
        assert_eq!(db.collections[0].name, "test_collection");

        let index_names: Vec<&str> = db.collections[0].indexes.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(index_names, vec!["by_key"]);

        assert_eq!(db.users.len(), 1);
        assert_eq!(db.users[0].username, "test_user");
        assert!(db.users[0].password.is_empty());
    }

    #[tokio::test]
    async fn test_custom_skip_list() {
        let admin = live_cluster();
        let cluster = ClusterScanner::new(&admin)
            .skip_databases(vec!["test_db_2".to_string()])
            .scan("MyCluster", &connection())
            .await
            .unwrap();

        let names: Vec<&str> = cluster.databases.iter().map(|db| db.name.as_str()).collect();
        assert_eq!(names, vec!["admin", "local"]);
    }

    #[tokio::test]
    async fn test_declared_system_database_is_scanned() {
        let admin = live_cluster().with_collection("admin", "system.version");
        let target = Cluster {
            name: "MyCluster".to_string(),
            host: "localhost".to_string(),
            port: 27017,
            username: "mongolocal".to_string(),
            password: Secret::new("mongosecret1a"),
            authentication_database: "admin".to_string(),
            databases: vec![Database::new(
                "admin",
                vec![],
                vec![User::new("root", "pw", vec!["root".to_string()])],
            )],
        };

        let observed = ClusterScanner::new(&admin)
            .for_target(&target)
            .scan("MyCluster", &connection())
            .await
            .unwrap();

        let names: Vec<&str> = observed.databases.iter().map(|db| db.name.as_str()).collect();
        assert_eq!(names, vec!["admin", "test_db_2"]);
        assert!(observed.database("admin").unwrap().collections.is_empty());

        let diff = crate::snapshot::DiffEngine::diff(&observed, &target);
        assert!(diff.databases.added.is_empty());
        assert!(!diff.databases.users.contains_key("admin"));
        assert!(!diff.databases.collections.contains_key("admin"));
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_scan() {
        let admin = live_cluster().failing_listings();
        let result = ClusterScanner::new(&admin).scan("MyCluster", &connection()).await;
        assert!(result.is_err());
    }
}
