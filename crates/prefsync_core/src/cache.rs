//! In-memory preference cache.

use prefsync_codec::PrefValue;
use std::collections::{BTreeMap, BTreeSet};

/// The resident key-value mapping of one preferences instance.
///
/// All reads are synchronous against whatever is currently resident;
/// populating the cache before the first read is the sync engine's job,
/// as is wrapping this type in the instance's mutual-exclusion domain.
/// `BTreeMap` keeps iteration deterministic for diffing and push
/// construction.
#[derive(Debug, Default, Clone)]
pub struct LocalCache {
    entries: BTreeMap<String, PrefValue>,
}

impl LocalCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under a key.
    pub fn get(&self, key: &str) -> Option<&PrefValue> {
        self.entries.get(key)
    }

    /// Returns whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns a copy of the full mapping.
    pub fn snapshot(&self) -> BTreeMap<String, PrefValue> {
        self.entries.clone()
    }

    /// Replaces the entire contents. Keys absent from `entries` are gone
    /// afterwards.
    pub fn replace_all(&mut self, entries: BTreeMap<String, PrefValue>) {
        self.entries = entries;
    }

    /// Applies a computed diff: removals first, then inserts/updates.
    pub fn apply_diff(&mut self, removed: &BTreeSet<String>, changed: BTreeMap<String, PrefValue>) {
        for key in removed {
            self.entries.remove(key);
        }
        for (key, value) in changed {
            self.entries.insert(key, value);
        }
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
