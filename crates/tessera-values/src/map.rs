//! Immutable map from values to values, kept in key order.

use std::cmp::Ordering;
use std::iter::Peekable;

use tessera_types::Hash;
use tracing::debug;

use crate::chunker::{collect_leaf_records, finish_tree, Splitter};
use crate::codec;
use crate::cursor::IterDriver;
use crate::error::{ValueError, ValueResult};
use crate::kind::ValueKind;
use crate::sequence::{MapEntry, Sequence};
use crate::store::ValueStore;
use crate::value::Value;

/// An immutable map of [`Value`] keys to [`Value`] values.
///
/// Entries are stored sorted by key, one key at most once. Two maps holding
/// the same entries are the same map regardless of edit history: they have
/// the same hash, the same encoding, and share the same chunks.
#[derive(Clone)]
pub struct Map {
    store: ValueStore,
    root: Sequence,
}

impl Map {
    /// Builds a map from `entries`. Input order does not matter; when the
    /// same key appears more than once the last occurrence wins.
    pub fn new(store: &ValueStore, mut entries: Vec<MapEntry>) -> ValueResult<Self> {
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        let mut deduped: Vec<MapEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            match deduped.last_mut() {
                Some(prev) if prev.key == entry.key => *prev = entry,
                _ => deduped.push(entry),
            }
        }

        let mut splitter = Splitter::new(store, ValueKind::Map);
        for entry in deduped {
            splitter.push_entry(entry)?;
        }
        let root = finish_tree(store, splitter.finish()?)?;
        Ok(Self {
            store: store.clone(),
            root,
        })
    }

    pub fn empty(store: &ValueStore) -> Self {
        Self {
            store: store.clone(),
            root: Sequence::empty(ValueKind::Map),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> u64 {
        self.root.num_items()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up the value stored under `key`. Scans in key order and stops
    /// at the first key past the probe.
    pub fn get(&self, key: &Value) -> ValueResult<Option<Value>> {
        for entry in self.iter() {
            let entry = entry?;
            match entry.key.cmp(key) {
                Ordering::Less => continue,
                Ordering::Equal => return Ok(Some(entry.value)),
                Ordering::Greater => return Ok(None),
            }
        }
        Ok(None)
    }

    pub fn contains_key(&self, key: &Value) -> ValueResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> MapIter {
        self.iter_at(0)
    }

    /// Iterates starting from the entry at position `index` in key order.
    pub fn iter_at(&self, index: u64) -> MapIter {
        MapIter {
            driver: IterDriver::new(self.store.clone(), self.root.clone(), index),
        }
    }

    /// Returns a new map with `key` bound to `value`, replacing any existing
    /// binding.
    pub fn set(&self, key: Value, value: Value) -> ValueResult<Self> {
        self.apply_sorted_edits(&[(key, Some(value))])
    }

    /// Returns a new map without `key`. Removing an absent key is a no-op
    /// that returns an identical map.
    pub fn remove(&self, key: &Value) -> ValueResult<Self> {
        self.apply_sorted_edits(&[(key.clone(), None)])
    }

    /// Applies a batch of edits in one pass. Each edit binds a key to
    /// `Some(value)` or removes it with `None`, and the batch must be sorted
    /// by strictly increasing key.
    ///
    /// The result is identical to building the edited entry set from
    /// scratch, and leaf chunks away from the edited regions are reused.
    pub fn apply_sorted_edits(&self, edits: &[(Value, Option<Value>)]) -> ValueResult<Self> {
        for pair in edits.windows(2) {
            if pair[0].0 >= pair[1].0 {
                return Err(ValueError::Invariant(
                    "map edits must be sorted by strictly increasing key".into(),
                ));
            }
        }
        if edits.is_empty() {
            return Ok(self.clone());
        }

        let mut splitter = Splitter::new(&self.store, ValueKind::Map);
        let mut pending = edits.iter().peekable();

        if self.root.is_leaf() {
            let entries = self
                .root
                .leaf_entries()
                .ok_or_else(|| ValueError::Invariant("map leaf without entries".into()))?;
            merge_entries(&mut splitter, &mut pending, entries)?;
        } else {
            let records = collect_leaf_records(&self.store, &self.root)?;
            let last = records.len() - 1;
            let mut reused = 0usize;
            for (idx, rec) in records.into_iter().enumerate() {
                let leaf = self.store.read_sequence(&rec.reference)?;
                let entries = leaf
                    .leaf_entries()
                    .ok_or_else(|| ValueError::Invariant("map leaf without entries".into()))?;
                let untouched = match (pending.peek(), entries.last()) {
                    (Some((key, _)), Some(max)) => key > &max.key,
                    _ => pending.peek().is_none(),
                };
                // The final leaf may end on a flush rather than a content
                // boundary, so it is only reusable when nothing follows it.
                let reusable = untouched
                    && splitter.at_boundary()
                    && (idx < last || pending.peek().is_none());
                if reusable {
                    splitter.pass_through(rec);
                    reused += 1;
                } else {
                    merge_entries(&mut splitter, &mut pending, entries)?;
                }
            }
            debug!(
                edits = edits.len(),
                reused_chunks = reused,
                "merged map edits"
            );
        }

        for (key, op) in pending {
            if let Some(value) = op {
                splitter.push_entry(MapEntry::new(key.clone(), value.clone()))?;
            }
        }

        let root = finish_tree(&self.store, splitter.finish()?)?;
        Ok(Self {
            store: self.store.clone(),
            root,
        })
    }

    /// Content hash of the map. Equal maps hash equal.
    pub fn hash(&self) -> Hash {
        Hash::of(&codec::encode_collection(&self.root))
    }

    pub(crate) fn from_sequence(store: ValueStore, root: Sequence) -> Self {
        Self { store, root }
    }

    pub(crate) fn sequence(&self) -> &Sequence {
        &self.root
    }

    pub(crate) fn into_sequence(self) -> Sequence {
        self.root
    }
}

/// Interleave sorted entries with sorted pending edits.
fn merge_entries(
    splitter: &mut Splitter<'_>,
    pending: &mut Peekable<std::slice::Iter<'_, (Value, Option<Value>)>>,
    entries: &[MapEntry],
) -> ValueResult<()> {
    for entry in entries {
        let mut dropped = false;
        let mut replacement: Option<Value> = None;
        while let Some((key, op)) = pending.peek() {
            match key.cmp(&entry.key) {
                Ordering::Less => {
                    if let Some(value) = op {
                        splitter.push_entry(MapEntry::new(key.clone(), value.clone()))?;
                    }
                    pending.next();
                }
                Ordering::Equal => {
                    match op {
                        Some(value) => replacement = Some(value.clone()),
                        None => dropped = true,
                    }
                    pending.next();
                    break;
                }
                Ordering::Greater => break,
            }
        }
        if dropped {
            continue;
        }
        match replacement {
            Some(value) => splitter.push_entry(MapEntry::new(entry.key.clone(), value))?,
            None => splitter.push_entry(entry.clone())?,
        }
    }
    Ok(())
}

/// Iterator over map entries in key order, yielding `ValueResult<MapEntry>`.
pub struct MapIter {
    driver: IterDriver,
}

impl Iterator for MapIter {
    type Item = ValueResult<MapEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.driver.next_entry()
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for Map {}

impl std::fmt::Debug for Map {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Map")
            .field("len", &self.len())
            .field("height", &self.root.level())
            .finish_non_exhaustive()
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}
