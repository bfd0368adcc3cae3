//! Builders that accumulate edits and apply them in one pass.

use tracing::debug;

use tessera_values::{Map, Set, Value};

use crate::collection::KvpCollection;
use crate::error::EditResult;
use crate::kvp::Kvp;

/// Accumulates map edits and applies them as one tree transformation.
///
/// Operations are recorded in arrival order; nothing touches the base map
/// until [`apply`](MapEditor::apply). When the same key is edited more than
/// once, the most recent operation wins. The base map is never modified;
/// `apply` produces a new map sharing unchanged chunks with the base.
pub struct MapEditor {
    base: Map,
    batch: KvpCollection,
}

impl MapEditor {
    pub fn new(base: Map) -> Self {
        Self {
            base,
            batch: KvpCollection::new(),
        }
    }

    /// Records a bind of `key` to `value`, replacing any existing binding
    /// when applied.
    pub fn set(&mut self, key: Value, value: Value) -> &mut Self {
        self.batch.push(Kvp::insert(key, value));
        self
    }

    /// Records a removal of `key`. Removing an absent key applies as a
    /// no-op.
    pub fn remove(&mut self, key: Value) -> &mut Self {
        self.batch.push(Kvp::remove(key));
        self
    }

    /// Number of recorded operations, counting repeats per key.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Sorts the batch, collapses repeated keys, and merges it against the
    /// base map, producing the edited map.
    pub fn apply(self) -> EditResult<Map> {
        let edits = self.batch.into_sorted_edits();
        debug!(edits = edits.len(), "applying map edit batch");
        Ok(self.base.apply_sorted_edits(&edits)?)
    }
}

/// Accumulates set membership edits and applies them as one tree
/// transformation.
///
/// Same contract as [`MapEditor`]: arrival order is kept until `apply`,
/// repeats on a value collapse to the most recent operation, and inserting
/// a present value or removing an absent one are no-ops.
pub struct SetEditor {
    base: Set,
    batch: KvpCollection,
}

impl SetEditor {
    pub fn new(base: Set) -> Self {
        Self {
            base,
            batch: KvpCollection::new(),
        }
    }

    /// Records an insertion of `value`.
    pub fn insert(&mut self, value: Value) -> &mut Self {
        self.batch.push(Kvp::insert(value, Value::Null));
        self
    }

    /// Records a removal of `value`.
    pub fn remove(&mut self, value: Value) -> &mut Self {
        self.batch.push(Kvp::remove(value));
        self
    }

    /// Number of recorded operations, counting repeats per value.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Sorts the batch, collapses repeated values, and merges it against
    /// the base set, producing the edited set.
    pub fn apply(self) -> EditResult<Set> {
        let edits: Vec<(Value, bool)> = self
            .batch
            .into_sorted_edits()
            .into_iter()
            .map(|(value, op)| (value, op.is_some()))
            .collect();
        debug!(edits = edits.len(), "applying set edit batch");
        Ok(self.base.apply_sorted_edits(&edits)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tessera_values::{MapEntry, ValueStore};

    fn key(i: u64) -> Value {
        Value::Uint(i.wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }

    fn entry(i: u64) -> MapEntry {
        MapEntry::new(key(i), Value::Uint(i))
    }

    // ---------------------------------------------------------------
    // Map editing
    // ---------------------------------------------------------------

    #[test]
    fn map_edits_apply_in_one_pass() {
        let store = ValueStore::in_memory();
        let base = Map::new(&store, (0..1_000).map(entry).collect()).unwrap();

        let mut editor = MapEditor::new(base.clone());
        editor
            .set(key(10), Value::String("ten".into()))
            .remove(key(20))
            .set(Value::String("fresh".into()), Value::Bool(true));
        assert_eq!(editor.pending(), 3);
        let edited = editor.apply().unwrap();

        assert_eq!(edited.len(), 1_000);
        assert_eq!(
            edited.get(&key(10)).unwrap(),
            Some(Value::String("ten".into()))
        );
        assert_eq!(edited.get(&key(20)).unwrap(), None);
        assert_eq!(
            edited.get(&Value::String("fresh".into())).unwrap(),
            Some(Value::Bool(true))
        );
        // base is untouched
        assert_eq!(base.get(&key(20)).unwrap(), Some(Value::Uint(20)));
    }

    #[test]
    fn repeated_edits_on_a_key_collapse_to_the_latest() {
        let store = ValueStore::in_memory();
        let base = Map::new(&store, vec![entry(1)]).unwrap();

        let mut editor = MapEditor::new(base);
        editor
            .set(key(1), Value::String("a".into()))
            .remove(key(1))
            .set(key(1), Value::String("b".into()));
        let edited = editor.apply().unwrap();
        assert_eq!(
            edited.get(&key(1)).unwrap(),
            Some(Value::String("b".into()))
        );
    }

    #[test]
    fn removing_an_absent_key_leaves_the_map_unchanged() {
        let store = ValueStore::in_memory();
        let base = Map::new(&store, (0..500).map(entry).collect()).unwrap();

        let mut editor = MapEditor::new(base.clone());
        editor.remove(Value::String("was never here".into()));
        let edited = editor.apply().unwrap();
        assert_eq!(edited.hash(), base.hash());
    }

    #[test]
    fn empty_batch_returns_an_identical_map() {
        let store = ValueStore::in_memory();
        let base = Map::new(&store, (0..100).map(entry).collect()).unwrap();
        let edited = MapEditor::new(base.clone()).apply().unwrap();
        assert_eq!(edited.hash(), base.hash());
    }

    #[test]
    fn editor_result_matches_a_model_map() {
        let store = ValueStore::in_memory();
        let base = Map::new(&store, (0..4_000).map(entry).collect()).unwrap();

        let mut model: BTreeMap<Value, Value> = BTreeMap::new();
        for i in 0..4_000 {
            model.insert(key(i), Value::Uint(i));
        }

        let mut editor = MapEditor::new(base);
        for i in 0..250u64 {
            let k = key(i * 13);
            if i % 4 == 0 {
                editor.remove(k.clone());
                model.remove(&k);
            } else {
                let v = Value::Uint(i + 1_000_000);
                editor.set(k.clone(), v.clone());
                model.insert(k, v);
            }
        }
        let edited = editor.apply().unwrap();

        let expected: Vec<MapEntry> = model
            .into_iter()
            .map(|(k, v)| MapEntry::new(k, v))
            .collect();
        let scratch = Map::new(&store, expected).unwrap();
        assert_eq!(edited.hash(), scratch.hash());
    }

    // ---------------------------------------------------------------
    // Set editing
    // ---------------------------------------------------------------

    #[test]
    fn set_edits_apply_in_one_pass() {
        let store = ValueStore::in_memory();
        let base = Set::new(&store, (0..1_000).map(key).collect()).unwrap();

        let mut editor = SetEditor::new(base.clone());
        editor
            .insert(Value::String("new member".into()))
            .remove(key(5))
            .insert(key(6)); // already present
        let edited = editor.apply().unwrap();

        assert_eq!(edited.len(), 1_000);
        assert!(edited.contains(&Value::String("new member".into())).unwrap());
        assert!(!edited.contains(&key(5)).unwrap());
        assert!(edited.contains(&key(6)).unwrap());
    }

    #[test]
    fn repeated_edits_on_a_value_collapse_to_the_latest() {
        let store = ValueStore::in_memory();
        let base = Set::new(&store, vec![key(1)]).unwrap();

        let mut editor = SetEditor::new(base.clone());
        editor.remove(key(1)).insert(key(1));
        let edited = editor.apply().unwrap();
        assert_eq!(edited.hash(), base.hash());

        let mut editor = SetEditor::new(base.clone());
        editor.insert(key(2)).remove(key(2));
        let edited = editor.apply().unwrap();
        assert_eq!(edited.hash(), base.hash());
    }

    #[test]
    fn set_editor_equals_building_from_scratch() {
        let store = ValueStore::in_memory();
        let base = Set::new(&store, (0..3_000).map(key).collect()).unwrap();

        let mut editor = SetEditor::new(base);
        for i in 0..100u64 {
            editor.remove(key(i * 3));
            editor.insert(Value::Int(-(i as i64)));
        }
        let edited = editor.apply().unwrap();

        let mut members: Vec<Value> = (0..3_000)
            .filter(|i| !(i % 3 == 0 && i / 3 < 100))
            .map(key)
            .collect();
        members.extend((0..100u64).map(|i| Value::Int(-(i as i64))));
        let scratch = Set::new(&store, members).unwrap();
        assert_eq!(edited.hash(), scratch.hash());
    }
}
