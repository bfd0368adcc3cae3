//! An edit batch: pairs in arrival order until sorted.

use tessera_values::Value;

use crate::kvp::Kvp;

/// Returns `true` when the pairs are non-decreasing by key.
///
/// Duplicate keys are in order; the stable sort keeps their arrival order
/// and the merge resolves them last-wins. This is the check tests and debug
/// assertions run against a batch that is supposed to be sorted.
pub fn is_in_order<'a, I>(pairs: I) -> bool
where
    I: IntoIterator<Item = &'a Kvp>,
{
    let mut prev: Option<&Value> = None;
    for kvp in pairs {
        if let Some(p) = prev {
            if p > &kvp.key {
                return false;
            }
        }
        prev = Some(&kvp.key);
    }
    true
}

/// A batch of pending [`Kvp`] operations.
///
/// Operations accumulate in arrival order. [`sort_stable`] puts them in key
/// order while preserving arrival order between equal keys, which is what
/// makes "last pair wins" after the sort mean "most recently submitted
/// wins".
///
/// [`sort_stable`]: KvpCollection::sort_stable
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KvpCollection {
    pairs: Vec<Kvp>,
}

impl KvpCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one operation at the end of the batch.
    pub fn push(&mut self, kvp: Kvp) {
        self.pairs.push(kvp);
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Sorts the batch by key. The sort is stable: pairs with equal keys
    /// keep their arrival order, and sorting an already-sorted batch leaves
    /// it untouched.
    pub fn sort_stable(&mut self) {
        self.pairs.sort_by(|a, b| a.key.cmp(&b.key));
    }

    /// Whether the batch is currently non-decreasing by key.
    pub fn is_in_order(&self) -> bool {
        is_in_order(self.pairs.iter())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Kvp> {
        self.pairs.iter()
    }

    /// Sorts the batch and collapses duplicate keys down to the most
    /// recently submitted operation per key. The result is strictly
    /// increasing by key, the shape the collection merge consumes.
    pub fn into_sorted_edits(mut self) -> Vec<(Value, Option<Value>)> {
        self.sort_stable();
        let mut edits: Vec<(Value, Option<Value>)> = Vec::with_capacity(self.pairs.len());
        for kvp in self.pairs {
            match edits.last_mut() {
                Some((key, op)) if *key == kvp.key => *op = kvp.value,
                _ => edits.push((kvp.key, kvp.value)),
            }
        }
        edits
    }
}

impl FromIterator<Kvp> for KvpCollection {
    fn from_iter<I: IntoIterator<Item = Kvp>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a KvpCollection {
    type Item = &'a Kvp;
    type IntoIter = std::slice::Iter<'a, Kvp>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
