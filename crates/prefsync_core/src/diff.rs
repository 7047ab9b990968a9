//! Diff classification between two cache states.

use prefsync_codec::PrefValue;
use std::collections::BTreeMap;

/// How a key changed between two cache states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Key exists in the new state only.
    Added,
    /// Key exists in the old state only.
    Removed,
    /// Key exists in both states with different values.
    Updated,
}

/// One changed key with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChange {
    /// The affected key.
    pub key: String,
    /// The classification.
    pub kind: ChangeKind,
}

impl KeyChange {
    /// Creates a change record.
    pub fn new(key: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            key: key.into(),
            kind,
        }
    }
}

/// Classifies every key that differs between `before` and `after`.
///
/// Keys with equal values in both states produce no entry. Output is
/// ordered by key, so event dispatch is deterministic.
pub fn diff(
    before: &BTreeMap<String, PrefValue>,
    after: &BTreeMap<String, PrefValue>,
) -> Vec<KeyChange> {
    let mut changes = Vec::new();

    for (key, old) in before {
        match after.get(key) {
            None => changes.push(KeyChange::new(key, ChangeKind::Removed)),
            Some(new) if new != old => changes.push(KeyChange::new(key, ChangeKind::Updated)),
            Some(_) => {}
        }
    }
    for key in after.keys() {
        if !before.contains_key(key) {
            changes.push(KeyChange::new(key, ChangeKind::Added));
        }
    }

    changes.sort_by(|a, b| a.key.cmp(&b.key));
    changes
}
