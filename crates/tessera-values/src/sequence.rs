use crate::error::{ValueError, ValueResult};
use crate::kind::ValueKind;
use crate::reference::Ref;
use crate::value::Value;

/// One key-value pair inside a map leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapEntry {
    pub key: Value,
    pub value: Value,
}

impl MapEntry {
    pub fn new(key: Value, value: Value) -> Self {
        Self { key, value }
    }
}

/// One child entry of a meta node: the child ref plus the running total of
/// leaf items over this node's children up to and including the child.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct MetaTuple {
    pub child: Ref,
    pub cumulative: u64,
}

/// Payload of one sequence node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SequenceItems {
    /// Leaf items of a list or set.
    Values(Vec<Value>),
    /// Leaf items of a map.
    Entries(Vec<MapEntry>),
    /// Leaf items of a blob.
    Bytes(Vec<u8>),
    /// Children of a meta node.
    Meta(Vec<MetaTuple>),
}

/// The decoded form of one chunk of a chunked collection.
///
/// Level 0 nodes hold items inline; level `n >= 1` nodes hold refs to level
/// `n - 1` chunks together with cumulative leaf-item counts. The cumulative
/// counts are what make index seek possible without walking whole subtrees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Sequence {
    kind: ValueKind,
    level: u64,
    items: SequenceItems,
}

impl Sequence {
    pub(crate) fn new_leaf_values(kind: ValueKind, values: Vec<Value>) -> Self {
        debug_assert!(matches!(kind, ValueKind::List | ValueKind::Set));
        Self {
            kind,
            level: 0,
            items: SequenceItems::Values(values),
        }
    }

    pub(crate) fn new_leaf_entries(entries: Vec<MapEntry>) -> Self {
        Self {
            kind: ValueKind::Map,
            level: 0,
            items: SequenceItems::Entries(entries),
        }
    }

    pub(crate) fn new_leaf_bytes(bytes: Vec<u8>) -> Self {
        Self {
            kind: ValueKind::Blob,
            level: 0,
            items: SequenceItems::Bytes(bytes),
        }
    }

    pub(crate) fn new_meta(kind: ValueKind, level: u64, tuples: Vec<MetaTuple>) -> Self {
        debug_assert!(level >= 1);
        debug_assert!(!tuples.is_empty());
        Self {
            kind,
            level,
            items: SequenceItems::Meta(tuples),
        }
    }

    /// The canonical empty collection of the given kind: a leaf with no items.
    pub(crate) fn empty(kind: ValueKind) -> Self {
        match kind {
            ValueKind::List | ValueKind::Set => Self::new_leaf_values(kind, Vec::new()),
            ValueKind::Map => Self::new_leaf_entries(Vec::new()),
            ValueKind::Blob => Self::new_leaf_bytes(Vec::new()),
            _ => unreachable!("not a collection kind: {kind}"),
        }
    }

    pub(crate) fn kind(&self) -> ValueKind {
        self.kind
    }

    pub(crate) fn level(&self) -> u64 {
        self.level
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.level == 0
    }

    pub(crate) fn items(&self) -> &SequenceItems {
        &self.items
    }

    /// Number of entries stored directly in this node.
    pub(crate) fn local_len(&self) -> usize {
        match &self.items {
            SequenceItems::Values(v) => v.len(),
            SequenceItems::Entries(e) => e.len(),
            SequenceItems::Bytes(b) => b.len(),
            SequenceItems::Meta(t) => t.len(),
        }
    }

    /// Total leaf items in the subtree rooted here.
    pub(crate) fn num_items(&self) -> u64 {
        match &self.items {
            SequenceItems::Meta(tuples) => tuples.last().map_or(0, |t| t.cumulative),
            _ => self.local_len() as u64,
        }
    }

    pub(crate) fn meta_tuples(&self) -> Option<&[MetaTuple]> {
        match &self.items {
            SequenceItems::Meta(t) => Some(t),
            _ => None,
        }
    }

    pub(crate) fn leaf_values(&self) -> Option<&[Value]> {
        match &self.items {
            SequenceItems::Values(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn leaf_entries(&self) -> Option<&[MapEntry]> {
        match &self.items {
            SequenceItems::Entries(e) => Some(e),
            _ => None,
        }
    }

    pub(crate) fn leaf_bytes(&self) -> Option<&[u8]> {
        match &self.items {
            SequenceItems::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// For a meta node, find the child subtree containing leaf index `target`
    /// and the index remaining within that subtree. `None` when `target` is
    /// past the end or the node is a leaf.
    pub(crate) fn child_index_for(&self, target: u64) -> Option<(usize, u64)> {
        let tuples = self.meta_tuples()?;
        let child = tuples.partition_point(|t| t.cumulative <= target);
        if child == tuples.len() {
            return None;
        }
        let preceding = if child == 0 {
            0
        } else {
            tuples[child - 1].cumulative
        };
        Some((child, target - preceding))
    }

    /// Report every ref this node directly embeds, in encoding order.
    pub(crate) fn walk_refs(&self, visit: &mut dyn FnMut(&Ref)) {
        match &self.items {
            SequenceItems::Meta(tuples) => {
                for t in tuples {
                    visit(&t.child);
                }
            }
            SequenceItems::Values(values) => {
                for v in values {
                    v.walk_refs(visit);
                }
            }
            SequenceItems::Entries(entries) => {
                for e in entries {
                    e.key.walk_refs(visit);
                    e.value.walk_refs(visit);
                }
            }
            SequenceItems::Bytes(_) => {}
        }
    }

    /// Consistency checks run on every decoded node.
    pub(crate) fn check(&self) -> ValueResult<()> {
        match &self.items {
            SequenceItems::Meta(tuples) => {
                if self.level == 0 {
                    return Err(ValueError::Invariant(
                        "meta items in a level-0 node".into(),
                    ));
                }
                if tuples.is_empty() {
                    return Err(ValueError::Invariant("meta node with no children".into()));
                }
                let mut prev = 0u64;
                for t in tuples {
                    if t.cumulative <= prev {
                        return Err(ValueError::Invariant(format!(
                            "cumulative counts not strictly increasing: {} after {prev}",
                            t.cumulative
                        )));
                    }
                    prev = t.cumulative;
                    if t.child.kind() != self.kind {
                        return Err(ValueError::Invariant(format!(
                            "meta child kind {} in a {} sequence",
                            t.child.kind(),
                            self.kind
                        )));
                    }
                    if t.child.height() + 1 != self.level {
                        return Err(ValueError::Invariant(format!(
                            "child height {} under level-{} node",
                            t.child.height(),
                            self.level
                        )));
                    }
                }
                Ok(())
            }
            leaf => {
                if self.level != 0 {
                    return Err(ValueError::Invariant(format!(
                        "leaf items in a level-{} node",
                        self.level
                    )));
                }
                let shape_ok = matches!(
                    (leaf, self.kind),
                    (SequenceItems::Values(_), ValueKind::List)
                        | (SequenceItems::Values(_), ValueKind::Set)
                        | (SequenceItems::Entries(_), ValueKind::Map)
                        | (SequenceItems::Bytes(_), ValueKind::Blob)
                );
                if !shape_ok {
                    return Err(ValueError::Invariant(format!(
                        "leaf payload does not match kind {}",
                        self.kind
                    )));
                }
                Ok(())
            }
        }
    }
}
