//! Immutable sorted set of values.

use std::cmp::Ordering;
use std::iter::Peekable;

use tessera_types::Hash;
use tracing::debug;

use crate::chunker::{collect_leaf_records, finish_tree, Splitter};
use crate::codec;
use crate::cursor::IterDriver;
use crate::error::{ValueError, ValueResult};
use crate::kind::ValueKind;
use crate::sequence::Sequence;
use crate::store::ValueStore;
use crate::value::Value;

/// An immutable set of [`Value`]s, kept in the total value order.
///
/// Membership is by value equality, so two sets with the same members are
/// the same set no matter how they were built. Meta nodes carry item counts
/// only, so membership checks scan in order and stop at the first value
/// past the probe.
#[derive(Clone)]
pub struct Set {
    store: ValueStore,
    root: Sequence,
}

impl Set {
    /// Builds a set from `values`. Duplicates collapse and order does not
    /// matter.
    pub fn new(store: &ValueStore, mut values: Vec<Value>) -> ValueResult<Self> {
        values.sort();
        values.dedup();
        let mut splitter = Splitter::new(store, ValueKind::Set);
        for value in values {
            splitter.push_value(value)?;
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
            root: Sequence::empty(ValueKind::Set),
        }
    }

    pub fn len(&self) -> u64 {
        self.root.num_items()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `value` is a member. Scans in value order and stops as soon
    /// as a larger member is seen.
    pub fn contains(&self, value: &Value) -> ValueResult<bool> {
        for item in self.iter() {
            match item?.cmp(value) {
                Ordering::Less => continue,
                Ordering::Equal => return Ok(true),
                Ordering::Greater => return Ok(false),
            }
        }
        Ok(false)
    }

    /// The smallest member, or `None` when empty.
    pub fn first(&self) -> ValueResult<Option<Value>> {
        self.iter().next().transpose()
    }

    /// Iterates over the members in value order.
    pub fn iter(&self) -> SetIter {
        self.iter_at(0)
    }

    /// Iterates starting from the member at position `index` in value order.
    pub fn iter_at(&self, index: u64) -> SetIter {
        SetIter {
            driver: IterDriver::new(self.store.clone(), self.root.clone(), index),
        }
    }

    /// Returns a new set with `value` added. Adding an existing member is a
    /// no-op that returns an identical set.
    pub fn insert(&self, value: Value) -> ValueResult<Self> {
        self.apply_sorted_edits(&[(value, true)])
    }

    /// Returns a new set with `value` removed. Removing an absent value is a
    /// no-op that returns an identical set.
    pub fn remove(&self, value: &Value) -> ValueResult<Self> {
        self.apply_sorted_edits(&[(value.clone(), false)])
    }

    /// Applies a batch of membership edits in one pass. Each edit is a value
    /// plus `true` to insert or `false` to remove, and the batch must be
    /// sorted by strictly increasing value.
    ///
    /// Inserting a present value and removing an absent one are both no-ops.
    /// The result is identical to building the edited membership from
    /// scratch, and leaf chunks away from the edited regions are reused.
    pub fn apply_sorted_edits(&self, edits: &[(Value, bool)]) -> ValueResult<Self> {
        for pair in edits.windows(2) {
            if pair[0].0 >= pair[1].0 {
                return Err(ValueError::Invariant(
                    "set edits must be sorted by strictly increasing value".into(),
                ));
            }
        }
        if edits.is_empty() {
            return Ok(self.clone());
        }

        let mut splitter = Splitter::new(&self.store, ValueKind::Set);
        let mut pending = edits.iter().peekable();

        if self.root.is_leaf() {
            let values = self
                .root
                .leaf_values()
                .ok_or_else(|| ValueError::Invariant("set leaf without values".into()))?;
            merge_values(&mut splitter, &mut pending, values)?;
        } else {
            let records = collect_leaf_records(&self.store, &self.root)?;
            let last = records.len() - 1;
            let mut reused = 0usize;
            for (idx, rec) in records.into_iter().enumerate() {
                let leaf = self.store.read_sequence(&rec.reference)?;
                let values = leaf
                    .leaf_values()
                    .ok_or_else(|| ValueError::Invariant("set leaf without values".into()))?;
                let untouched = match (pending.peek(), values.last()) {
                    (Some((edit, _)), Some(max)) => edit > max,
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
                    merge_values(&mut splitter, &mut pending, values)?;
                }
            }
            debug!(
                edits = edits.len(),
                reused_chunks = reused,
                "merged set edits"
            );
        }

        for (edit, insert) in pending {
            if *insert {
                splitter.push_value(edit.clone())?;
            }
        }

        let root = finish_tree(&self.store, splitter.finish()?)?;
        Ok(Self {
            store: self.store.clone(),
            root,
        })
    }

    /// Content hash of the set. Equal sets hash equal.
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

/// Interleave sorted member values with sorted pending edits.
fn merge_values(
    splitter: &mut Splitter<'_>,
    pending: &mut Peekable<std::slice::Iter<'_, (Value, bool)>>,
    values: &[Value],
) -> ValueResult<()> {
    for v in values {
        let mut drop_member = false;
        while let Some((edit, insert)) = pending.peek() {
            match edit.cmp(v) {
                Ordering::Less => {
                    if *insert {
                        splitter.push_value(edit.clone())?;
                    }
                    pending.next();
                }
                Ordering::Equal => {
                    drop_member = !*insert;
                    pending.next();
                    break;
                }
                Ordering::Greater => break,
            }
        }
        if !drop_member {
            splitter.push_value(v.clone())?;
        }
    }
    Ok(())
}

/// Iterator over set members in value order, yielding `ValueResult<Value>`.
pub struct SetIter {
    driver: IterDriver,
}

impl Iterator for SetIter {
    type Item = ValueResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.driver.next_value()
    }
}

impl PartialEq for Set {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for Set {}

impl std::fmt::Debug for Set {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Set")
            .field("len", &self.len())
            .field("height", &self.root.level())
            .finish_non_exhaustive()
    }
}

impl From<Set> for Value {
    fn from(set: Set) -> Self {
        Value::Set(set)
    }
}
