//! Topology config file loader
//!
//! Parses YAML topology documents and validates them before they reach the
//! diff engine: structural rules through `validator`, identity-key uniqueness
//! through an explicit walk.

use crate::error::{validation_error, AppResult};
use crate::models::Cluster;
use crate::snapshot::identity::Keyed;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;
use validator::Validate;

/// Top-level config document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub clusters: Vec<Cluster>,
}

/// Parse a topology config file from a path
pub fn parse_config_file(path: &Path) -> AppResult<Vec<Cluster>> {
    let content = fs::read_to_string(path)?;
    let clusters = parse_config_str(&content)?;
    debug!("Loaded {} clusters from {}", clusters.len(), path.display());
    Ok(clusters)
}

/// Parse a topology config document from a string
pub fn parse_config_str(content: &str) -> AppResult<Vec<Cluster>> {
    let config: ConfigFile = serde_yaml::from_str(content)?;

    for cluster in &config.clusters {
        validate_cluster(cluster)?;
    }
    ensure_unique("clusters", &config.clusters.iter().map(|c| c.name.as_str()).collect::<Vec<_>>())?;

    Ok(config.clusters)
}

/// Render clusters back into the config document shape
pub fn render_config(clusters: &[Cluster]) -> AppResult<String> {
    let config = ConfigFile {
        clusters: clusters.to_vec(),
    };
    Ok(serde_yaml::to_string(&config)?)
}

/// Structural validation plus identity-key uniqueness at every level
pub fn validate_cluster(cluster: &Cluster) -> AppResult<()> {
    cluster.validate()?;

    ensure_unique_keys(&cluster.name, &cluster.databases)?;

    for db in &cluster.databases {
        let path = format!("{}.{}", cluster.name, db.name);
        ensure_unique_keys(&format!("{}.collections", path), &db.collections)?;
        ensure_unique_keys(&format!("{}.users", path), &db.users)?;

        for coll in &db.collections {
            let coll_path = format!("{}.{}", path, coll.name);
            ensure_unique_keys(&format!("{}.indexes", coll_path), &coll.indexes)?;

            for idx in &coll.indexes {
                let fields: Vec<&str> = idx.fields.iter().map(|f| f.field.as_str()).collect();
                ensure_unique(&format!("{}.{}.fields", coll_path, idx.name), &fields)?;
            }
        }

        for user in &db.users {
            ensure_unique_keys(&format!("{}.users.{}.roles", path, user.username), &user.roles)?;
        }
    }

    Ok(())
}

fn ensure_unique_keys<T: Keyed>(path: &str, items: &[T]) -> AppResult<()> {
    let keys: Vec<&str> = items.iter().map(Keyed::key).collect();
    ensure_unique(path, &keys)
}

fn ensure_unique(path: &str, keys: &[&str]) -> AppResult<()> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(*key) {
            return Err(validation_error(format!("Duplicate key '{}' in {}", key, path)));
        }
    }
    Ok(())
}
