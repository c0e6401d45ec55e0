//! Test fixtures: topology builders and an in-memory cluster

use crate::connection::ClusterAdmin;
use crate::error::{AppError, AppResult};
use crate::models::{Cluster, Collection, Database, Index, IndexField, Secret, User};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

/// Database `name` with `collections` collections of `indexes` indexes each,
/// and `users` users holding `readWrite`
pub fn mock_database(name: &str, collections: usize, indexes: usize, users: usize) -> Database {
    Database::new(
        name,
        (0..collections)
            .map(|j| {
                Collection::new(
                    format!("collection_{}", j),
                    (0..indexes)
                        .map(|k| Index::new(format!("index_{}", k), vec![IndexField::ascending("field")], false))
                        .collect(),
                )
            })
            .collect(),
        (0..users)
            .map(|l| User::new(format!("user_{}", l), "pass", vec!["readWrite".to_string()]))
            .collect(),
    )
}

/// Cluster with databases `db_0..db_n`; `users_per_db[i]` users in `db_i`
pub fn mock_cluster(
    name: &str,
    num_dbs: usize,
    collections_per_db: usize,
    indexes_per_collection: usize,
    users_per_db: &[usize],
) -> Cluster {
    Cluster {
        name: name.to_string(),
        host: "localhost".to_string(),
        port: 27017,
        username: "user".to_string(),
        password: Secret::new("pass"),
        authentication_database: "admin".to_string(),
        databases: (0..num_dbs)
            .map(|i| {
                mock_database(
                    &format!("db_{}", i),
                    collections_per_db,
                    indexes_per_collection,
                    users_per_db[i],
                )
            })
            .collect(),
    }
}

#[derive(Debug, Default, Clone)]
struct MemoryDatabase {
    collections: BTreeMap<String, Vec<Index>>,
    users: Vec<User>,
}

/// In-memory stand-in for a live cluster
#[derive(Default)]
pub struct InMemoryAdmin {
    databases: RwLock<BTreeMap<String, MemoryDatabase>>,
    failing_entities: HashSet<String>,
    failing_listings: bool,
    writes: RwLock<Vec<String>>,
}

impl InMemoryAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, database: &str, collection: &str) -> Self {
        self.databases
            .get_mut()
            .entry(database.to_string())
            .or_default()
            .collections
            .entry(collection.to_string())
            .or_default();
        self
    }

    pub fn with_index(mut self, database: &str, collection: &str, index: Index) -> Self {
        self.databases
            .get_mut()
            .entry(database.to_string())
            .or_default()
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(index);
        self
    }

    pub fn with_user(mut self, database: &str, user: User) -> Self {
        self.databases
            .get_mut()
            .entry(database.to_string())
            .or_default()
            .users
            .push(user);
        self
    }

    /// Make creation of the user or index with this name fail
    pub fn failing(mut self, name: &str) -> Self {
        self.failing_entities.insert(name.to_string());
        self
    }

    /// Make every user/index listing fail
    pub fn failing_listings(mut self) -> Self {
        self.failing_listings = true;
        self
    }

    /// Write operations performed so far, as `kind:db.name`
    pub async fn writes(&self) -> Vec<String> {
        self.writes.read().await.clone()
    }

    fn listing_guard(&self) -> AppResult<()> {
        if self.failing_listings {
            return Err(AppError::Introspection("not authorized to list".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterAdmin for InMemoryAdmin {
    async fn list_databases(&self) -> AppResult<Vec<String>> {
        Ok(self.databases.read().await.keys().cloned().collect())
    }

    async fn list_collections(&self, database: &str) -> AppResult<Vec<String>> {
        let databases = self.databases.read().await;
        Ok(databases
            .get(database)
            .map(|db| db.collections.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_indexes(&self, database: &str, collection: &str) -> AppResult<Vec<Index>> {
        self.listing_guard()?;
        let databases = self.databases.read().await;
        Ok(databases
            .get(database)
            .and_then(|db| db.collections.get(collection))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_users(&self, database: &str) -> AppResult<Vec<User>> {
        self.listing_guard()?;
        let databases = self.databases.read().await;
        Ok(databases
            .get(database)
            .map(|db| {
                db.users
                    .iter()
                    .map(|u| User::new(u.username.clone(), Secret::default(), u.roles.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_user(&self, database: &str, user: &User) -> AppResult<()> {
        if self.failing_entities.contains(&user.username) {
            return Err(AppError::Validation(format!("cannot create user {}", user.username)));
        }

        let mut databases = self.databases.write().await;
        let db = databases.entry(database.to_string()).or_default();
        if db.users.iter().any(|u| u.username == user.username) {
            return Err(AppError::Validation(format!(
                "User \"{}@{}\" already exists",
                user.username, database
            )));
        }
        db.users.push(user.clone());

        self.writes.write().await.push(format!("user:{}.{}", database, user.username));
        Ok(())
    }

    async fn create_index(&self, database: &str, collection: &str, index: &Index) -> AppResult<()> {
        if self.failing_entities.contains(&index.name) {
            return Err(AppError::Validation(format!("cannot create index {}", index.name)));
        }

        let mut databases = self.databases.write().await;
        let indexes = databases
            .entry(database.to_string())
            .or_default()
            .collections
            .entry(collection.to_string())
            .or_default();

        match indexes.iter().find(|i| i.name == index.name) {
            Some(existing) if existing.same_definition(index) => {}
            Some(_) => {
                return Err(AppError::Validation(format!(
                    "Index with name: {} already exists with different options",
                    index.name
                )))
            }
            None => indexes.push(index.clone()),
        }

        self.writes
            .write()
            .await
            .push(format!("index:{}.{}.{}", database, collection, index.name));
        Ok(())
    }
}
