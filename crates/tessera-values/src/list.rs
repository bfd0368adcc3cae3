//! Immutable ordered sequence of values.

use tessera_types::Hash;

use crate::chunker::{concat_sequences, finish_tree, start_splice, Splitter};
use crate::codec;
use crate::cursor::{IterDriver, SequenceCursor};
use crate::error::ValueResult;
use crate::kind::ValueKind;
use crate::sequence::Sequence;
use crate::store::ValueStore;
use crate::value::Value;

/// An immutable list of [`Value`]s backed by a chunked tree.
///
/// Lists compare equal when their contents are equal, regardless of the
/// edit history that produced them. Indexing and [`iter_at`](List::iter_at)
/// seek through the tree by position instead of scanning from the front.
#[derive(Clone)]
pub struct List {
    store: ValueStore,
    root: Sequence,
}

impl List {
    /// Builds a list holding `values` in order, writing any interior chunks
    /// to the store.
    pub fn new(store: &ValueStore, values: Vec<Value>) -> ValueResult<Self> {
        let mut splitter = Splitter::new(store, ValueKind::List);
        for value in values {
            splitter.push_value(value)?;
        }
        let root = finish_tree(store, splitter.finish()?)?;
        Ok(Self {
            store: store.clone(),
            root,
        })
    }

    /// The empty list. Allocates nothing in the store.
    pub fn empty(store: &ValueStore) -> Self {
        Self {
            store: store.clone(),
            root: Sequence::empty(ValueKind::List),
        }
    }

    /// Number of items.
    pub fn len(&self) -> u64 {
        self.root.num_items()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the item at `index`, or `None` past the end. Seeks down the
    /// tree, reading one chunk per level.
    pub fn get(&self, index: u64) -> ValueResult<Option<Value>> {
        if index >= self.len() {
            return Ok(None);
        }
        let mut cursor = SequenceCursor::new_at(self.store.clone(), self.root.clone(), index)?;
        cursor.next_value()
    }

    /// Iterates over all items in order.
    pub fn iter(&self) -> ListIter {
        self.iter_at(0)
    }

    /// Iterates starting from `index`. An index of `len` yields an iterator
    /// that is already finished.
    pub fn iter_at(&self, index: u64) -> ListIter {
        ListIter {
            driver: IterDriver::new(self.store.clone(), self.root.clone(), index),
        }
    }

    /// Returns a new list with `values` added at the end. Chunks before the
    /// final leaf of `self` are reused as-is.
    pub fn append(&self, values: Vec<Value>) -> ValueResult<Self> {
        if values.is_empty() {
            return Ok(self.clone());
        }
        let mut splitter = start_splice(&self.store, &self.root)?;
        for value in values {
            splitter.push_value(value)?;
        }
        let root = finish_tree(&self.store, splitter.finish()?)?;
        Ok(Self {
            store: self.store.clone(),
            root,
        })
    }

    /// Concatenates two lists into a new one. The result is identical to
    /// building the combined list from scratch, and most chunks of both
    /// inputs are reused without being re-read.
    pub fn concat(&self, other: &List) -> ValueResult<Self> {
        let root = concat_sequences(&self.store, &self.root, &other.root)?;
        Ok(Self {
            store: self.store.clone(),
            root,
        })
    }

    /// Content hash of the list. Equal lists hash equal.
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

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for List {}

impl std::fmt::Debug for List {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("List")
            .field("len", &self.len())
            .field("height", &self.root.level())
            .finish_non_exhaustive()
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Value::List(list)
    }
}

/// Iterator over list items, yielding `ValueResult<Value>`.
///
/// Chunks are only read once the first item is requested. After an error or
/// the end of the list the iterator keeps returning `None`.
pub struct ListIter {
    driver: IterDriver,
}

impl Iterator for ListIter {
    type Item = ValueResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.driver.next_value()
    }
}
