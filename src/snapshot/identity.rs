//! Identity matching
//!
//! Sibling lists are treated as sets keyed by identity. Two entities are "the
//! same entity" across versions iff their keys match; everything else about
//! them is left to the next diff level.

use crate::models::{Collection, Database, Index, User};
use std::collections::{BTreeSet, HashMap, HashSet};

/// An entity with an identity key that is unique among its siblings
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Index {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Keyed for Collection {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Keyed for User {
    fn key(&self) -> &str {
        &self.username
    }
}

impl Keyed for Database {
    fn key(&self) -> &str {
        &self.name
    }
}

/// Roles are their own identity
impl Keyed for String {
    fn key(&self) -> &str {
        self
    }
}

/// Identity keys present in a sibling list
pub fn key_set<T: Keyed>(items: &[T]) -> BTreeSet<&str> {
    items.iter().map(Keyed::key).collect()
}

/// Result of matching two sibling lists by key.
///
/// `added` keeps TEST order; `removed` and `matched` keep CONTROL order.
#[derive(Debug)]
pub struct Partition<'a, T> {
    pub added: Vec<&'a T>,
    pub removed: Vec<&'a T>,
    pub matched: Vec<(&'a T, &'a T)>,
}

impl<'a, T: Clone> Partition<'a, T> {
    pub fn added_owned(&self) -> Vec<T> {
        self.added.iter().map(|t| (*t).clone()).collect()
    }

    pub fn removed_owned(&self) -> Vec<T> {
        self.removed.iter().map(|t| (*t).clone()).collect()
    }
}

/// Split CONTROL and TEST into added, removed and matched-by-key entities
pub fn partition<'a, T: Keyed>(control: &'a [T], test: &'a [T]) -> Partition<'a, T> {
    let control_keys: HashSet<&str> = control.iter().map(Keyed::key).collect();

    // First occurrence wins; duplicate keys are rejected before this point
    let mut test_by_key: HashMap<&str, &T> = HashMap::with_capacity(test.len());
    for item in test {
        test_by_key.entry(item.key()).or_insert(item);
    }

    let added = test
        .iter()
        .filter(|t| !control_keys.contains(t.key()))
        .collect();

    let removed = control
        .iter()
        .filter(|c| !test_by_key.contains_key(c.key()))
        .collect();

    let matched = control
        .iter()
        .filter_map(|c| test_by_key.get(c.key()).map(|t| (c, *t)))
        .collect();

    Partition {
        added,
        removed,
        matched,
    }
}
