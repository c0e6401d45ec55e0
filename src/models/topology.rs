//! Topology model
//!
//! Value records describing a cluster's logical structure:
//! cluster → database → {collections → indexes, users → roles}.
//! Trees are built wholesale (config file or live scan) and never mutated.

use crate::models::Secret;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use validator::{Validate, ValidationError};

/// A permission grant, scoped to the database that owns the user
pub type Role = String;

/// Sort direction of one indexed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum IndexDirection {
    Ascending,
    Descending,
}

impl IndexDirection {
    pub fn as_i32(self) -> i32 {
        match self {
            IndexDirection::Ascending => 1,
            IndexDirection::Descending => -1,
        }
    }
}

impl TryFrom<i32> for IndexDirection {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(IndexDirection::Ascending),
            -1 => Ok(IndexDirection::Descending),
            other => Err(format!("invalid index direction {} (expected 1 or -1)", other)),
        }
    }
}

impl From<IndexDirection> for i32 {
    fn from(direction: IndexDirection) -> Self {
        direction.as_i32()
    }
}

/// One `field: direction` entry of an index key.
///
/// Written as a single-key map so that a list of them keeps key order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, IndexDirection>",
    into = "BTreeMap<String, IndexDirection>"
)]
pub struct IndexField {
    pub field: String,
    pub direction: IndexDirection,
}

impl IndexField {
    pub fn new(field: impl Into<String>, direction: IndexDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new(field, IndexDirection::Ascending)
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self::new(field, IndexDirection::Descending)
    }
}

impl TryFrom<BTreeMap<String, IndexDirection>> for IndexField {
    type Error = String;

    fn try_from(map: BTreeMap<String, IndexDirection>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(format!(
                "index field entry must have exactly one key, found {}",
                map.len()
            ));
        }
        let (field, direction) = map
            .into_iter()
            .next()
            .ok_or_else(|| "empty index field entry".to_string())?;
        Ok(Self { field, direction })
    }
}

impl From<IndexField> for BTreeMap<String, IndexDirection> {
    fn from(field: IndexField) -> Self {
        BTreeMap::from([(field.field, field.direction)])
    }
}

impl fmt::Display for IndexField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.direction.as_i32())
    }
}

/// Index on a collection, identified by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Index {
    #[validate(length(min = 1, message = "Index name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "An index needs at least one field"))]
    pub fields: Vec<IndexField>,
    #[serde(default)]
    pub unique: bool,
}

impl Index {
    pub fn new(name: impl Into<String>, fields: Vec<IndexField>, unique: bool) -> Self {
        Self {
            name: name.into(),
            fields,
            unique,
        }
    }

    /// Field set, ignoring declaration order
    pub fn field_set(&self) -> BTreeSet<(&str, IndexDirection)> {
        self.fields
            .iter()
            .map(|f| (f.field.as_str(), f.direction))
            .collect()
    }

    /// Same fields (as a set) and same uniqueness; the name is not compared
    pub fn same_definition(&self, other: &Index) -> bool {
        self.unique == other.unique && self.field_set() == other.field_set()
    }

    fn describe(&self) -> String {
        let fields: Vec<String> = self.field_set()
            .into_iter()
            .map(|(field, direction)| format!("{}:{}", field, direction.as_i32()))
            .collect();
        format!("{}[{}]{}", self.name, fields.join(","), if self.unique { "!" } else { "" })
    }
}

/// Collection and its secondary indexes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Collection {
    #[validate(custom(function = "validate_collection_name"))]
    pub name: String,
    #[serde(default)]
    #[validate(nested)]
    pub indexes: Vec<Index>,
}

impl Collection {
    pub fn new(name: impl Into<String>, indexes: Vec<Index>) -> Self {
        Self {
            name: name.into(),
            indexes,
        }
    }
}

/// Database user. The password is write-only.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct User {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    pub password: Secret,
    #[validate(custom(function = "validate_roles"))]
    pub roles: Vec<Role>,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<Secret>, roles: Vec<Role>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            roles,
        }
    }

    pub fn role_set(&self) -> BTreeSet<&str> {
        self.roles.iter().map(String::as_str).collect()
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.username == other.username && self.role_set() == other.role_set()
    }
}

impl Eq for User {}

/// Database with its collections and users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Database {
    #[validate(custom(function = "validate_database_name"))]
    pub name: String,
    #[serde(default)]
    #[validate(nested)]
    pub users: Vec<User>,
    #[serde(default)]
    #[validate(nested)]
    pub collections: Vec<Collection>,
}

impl Database {
    pub fn new(name: impl Into<String>, collections: Vec<Collection>, users: Vec<User>) -> Self {
        Self {
            name: name.into(),
            users,
            collections,
        }
    }
}

/// Cluster: connection coordinates plus its database topology.
///
/// Only `databases` takes part in diffs and equality.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Cluster {
    #[validate(length(min = 1, message = "Cluster name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Cluster host is required"))]
    pub host: String,
    #[validate(range(min = 1, message = "Cluster port must be non-zero"))]
    pub port: u16,
    pub username: String,
    pub password: Secret,
    #[validate(length(min = 1, message = "Authentication database is required"))]
    pub authentication_database: String,
    #[validate(nested)]
    pub databases: Vec<Database>,
}

impl PartialEq for Cluster {
    fn eq(&self, other: &Self) -> bool {
        self.databases == other.databases
    }
}

impl Cluster {
    /// Find a database by name
    pub fn database(&self, name: &str) -> Option<&Database> {
        self.databases.iter().find(|db| db.name == name)
    }

    /// Compute a checksum of the structural topology.
    ///
    /// Names are hashed in sorted order, index fields and roles as sets.
    /// Coordinates and credentials are excluded.
    pub fn topology_checksum(&self) -> String {
        let mut hasher = Sha256::new();

        let mut databases: Vec<&Database> = self.databases.iter().collect();
        databases.sort_by(|a, b| a.name.cmp(&b.name));

        for db in databases {
            hasher.update(format!("DB:{}", db.name).as_bytes());

            let mut collections: Vec<&Collection> = db.collections.iter().collect();
            collections.sort_by(|a, b| a.name.cmp(&b.name));
            for coll in collections {
                hasher.update(format!("COLL:{}.{}", db.name, coll.name).as_bytes());

                let mut indexes: Vec<&Index> = coll.indexes.iter().collect();
                indexes.sort_by(|a, b| a.name.cmp(&b.name));
                for idx in indexes {
                    hasher.update(format!("IDX:{}.{}.{}", db.name, coll.name, idx.describe()).as_bytes());
                }
            }

            let mut users: Vec<&User> = db.users.iter().collect();
            users.sort_by(|a, b| a.username.cmp(&b.username));
            for user in users {
                let roles: Vec<&str> = user.role_set().into_iter().collect();
                hasher.update(format!("USER:{}.{}:{}", db.name, user.username, roles.join(",")).as_bytes());
            }
        }

        format!("{:x}", hasher.finalize())
    }
}

/// MongoDB database names: no path or shell separators, at most 63 bytes
static DATABASE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[^/\\. "$*<>:|?\x00]{1,63}$"#).expect("valid database name pattern"));

fn validate_database_name(name: &str) -> Result<(), ValidationError> {
    if !DATABASE_NAME.is_match(name) || name.len() > 63 {
        let mut err = ValidationError::new("invalid_database_name");
        err.message = Some(format!("Invalid database name '{}'", name).into());
        return Err(err);
    }
    Ok(())
}

fn validate_collection_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        let mut err = ValidationError::new("empty_collection_name");
        err.message = Some("Collection name is required".into());
        return Err(err);
    }

    if name.starts_with("system.") || name.contains('$') || name.contains('\0') {
        let mut err = ValidationError::new("invalid_collection_name");
        err.message = Some(format!("Invalid collection name '{}'", name).into());
        return Err(err);
    }

    Ok(())
}

fn validate_roles(roles: &[Role]) -> Result<(), ValidationError> {
    if roles.iter().any(|r| r.trim().is_empty()) {
        let mut err = ValidationError::new("empty_role");
        err.message = Some("Role names must not be empty".into());
        return Err(err);
    }
    Ok(())
}
