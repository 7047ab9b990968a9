//! Transaction builder for staged preference edits.

use crate::store::Inner;
use prefsync_codec::PrefValue;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::thread;

/// One staged operation.
#[derive(Debug, Clone)]
pub(crate) enum EditOp {
    Put(String, PrefValue),
    Remove(String),
    Clear,
}

/// Computes the mapping an editor's staged operations produce over its
/// base snapshot.
///
/// `Clear` removes exactly the keys that were present in the base
/// snapshot; keys put by the same editor survive a later clear only if
/// they were not in the base.
pub(crate) fn resolve(
    base: &BTreeMap<String, PrefValue>,
    ops: &[EditOp],
) -> BTreeMap<String, PrefValue> {
    let mut result = base.clone();
    for op in ops {
        match op {
            EditOp::Put(key, value) => {
                result.insert(key.clone(), value.clone());
            }
            EditOp::Remove(key) => {
                result.remove(key);
            }
            EditOp::Clear => {
                for key in base.keys() {
                    result.remove(key);
                }
            }
        }
    }
    result
}

/// Accumulates put/remove/clear operations against a snapshot of the
/// cache and commits them atomically through the sync engine.
///
/// Staged operations never touch the shared cache until
/// [`commit`](Editor::commit) or [`apply`](Editor::apply); an editor is
/// consumed by either.
#[must_use = "staged edits do nothing until commit() or apply()"]
pub struct Editor {
    inner: Arc<Inner>,
    base: BTreeMap<String, PrefValue>,
    ops: Vec<EditOp>,
}

impl Editor {
    pub(crate) fn new(inner: Arc<Inner>, base: BTreeMap<String, PrefValue>) -> Self {
        Self {
            inner,
            base,
            ops: Vec::new(),
        }
    }

    fn stage(mut self, op: EditOp) -> Self {
        self.ops.push(op);
        self
    }

    /// Stages a typed value under a key.
    pub fn put(self, key: impl Into<String>, value: PrefValue) -> Self {
        self.stage(EditOp::Put(key.into(), value))
    }

    /// Stages a string value.
    pub fn put_string(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.put(key, PrefValue::Text(value.into()))
    }

    /// Stages a long value.
    pub fn put_long(self, key: impl Into<String>, value: i64) -> Self {
        self.put(key, PrefValue::Long(value))
    }

    /// Stages an int value.
    pub fn put_int(self, key: impl Into<String>, value: i32) -> Self {
        self.put(key, PrefValue::Int(value))
    }

    /// Stages a float value.
    pub fn put_float(self, key: impl Into<String>, value: f32) -> Self {
        self.put(key, PrefValue::Float(value))
    }

    /// Stages a boolean value.
    pub fn put_bool(self, key: impl Into<String>, value: bool) -> Self {
        self.put(key, PrefValue::Bool(value))
    }

    /// Stages a string-set value.
    pub fn put_string_set(self, key: impl Into<String>, value: BTreeSet<String>) -> Self {
        self.put(key, PrefValue::StringSet(value))
    }

    /// Stages removal of a key.
    pub fn remove(self, key: impl Into<String>) -> Self {
        self.stage(EditOp::Remove(key.into()))
    }

    /// Stages removal of every key present when this editor was created.
    pub fn clear(self) -> Self {
        self.stage(EditOp::Clear)
    }

    /// Applies the staged operations synchronously.
    ///
    /// Returns whether the local application succeeded; the remote push
    /// is initiated but not awaited.
    pub fn commit(self) -> bool {
        self.inner.commit_edit(&self.base, &self.ops)
    }

    /// Applies the staged operations on a background thread, with no
    /// completion signal.
    pub fn apply(self) {
        let Editor { inner, base, ops } = self;
        thread::spawn(move || {
            inner.commit_edit(&base, &ops);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(pairs: &[(&str, i64)]) -> BTreeMap<String, PrefValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), PrefValue::Long(*v)))
            .collect()
    }

    #[test]
    fn ops_replay_in_order() {
        let ops = vec![
            EditOp::Put("a".into(), PrefValue::Long(1)),
            EditOp::Put("a".into(), PrefValue::Long(2)),
            EditOp::Remove("b".into()),
        ];
        let result = resolve(&base(&[("b", 9)]), &ops);
        assert_eq!(result.get("a"), Some(&PrefValue::Long(2)));
        assert!(!result.contains_key("b"));
    }

    #[test]
    fn clear_removes_base_keys_only() {
        let ops = vec![
            EditOp::Put("fresh".into(), PrefValue::Long(1)),
            EditOp::Clear,
        ];
        let result = resolve(&base(&[("old", 9)]), &ops);
        assert!(result.contains_key("fresh"));
        assert!(!result.contains_key("old"));
    }

    #[test]
    fn clear_then_put_leaves_key_present() {
        let ops = vec![
            EditOp::Clear,
            EditOp::Put("k".into(), PrefValue::Text("v".into())),
        ];
        let result = resolve(&base(&[("k", 1), ("other", 2)]), &ops);
        assert_eq!(result.get("k"), Some(&PrefValue::Text("v".into())));
        assert!(!result.contains_key("other"));
    }

    #[test]
    fn empty_editor_resolves_to_base() {
        let b = base(&[("a", 1)]);
        assert_eq!(resolve(&b, &[]), b);
    }
}
