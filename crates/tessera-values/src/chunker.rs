//! Content-defined chunking of item streams into sequence trees.
//!
//! The splitter appends items, rolls their encoded bytes through the
//! boundary hash, and seals a leaf chunk whenever the boundary rule fires.
//! Because the hasher resets at every seal, the boundary positions are a
//! pure function of the items since the previous cut. That gives the two
//! reuse guarantees this module trades on:
//!
//! * chunks sealed strictly before a divergence point are byte-identical
//!   across builds, so splices reuse a left prefix untouched;
//! * once an incremental rebuild seals a chunk exactly where the original
//!   tree had a boundary, every following decision coincides, so the
//!   remaining original chunks can be passed through by ref.
//!
//! Meta levels are built the same way, rolling each child's hash bytes as
//! the parent-level item stream, until a single node remains.

use tessera_types::HASH_LEN;
use tracing::debug;

use crate::codec;
use crate::error::{ValueError, ValueResult};
use crate::kind::ValueKind;
use crate::reference::Ref;
use crate::rolling::{RollingHasher, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use crate::sequence::{MapEntry, MetaTuple, Sequence, SequenceItems};
use crate::store::ValueStore;
use crate::value::Value;

/// A written chunk plus the number of leaf items in its subtree.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ChildRecord {
    pub reference: Ref,
    pub items: u64,
}

/// Leaf items accumulated for the chunk currently being built.
enum LeafBuf {
    Values(Vec<Value>),
    Entries(Vec<MapEntry>),
    Bytes(Vec<u8>),
}

/// Outcome of splitting an item stream.
pub(crate) enum SplitResult {
    /// Everything fit in one leaf; nothing was written.
    Single(Sequence),
    /// Two or more chunks were written.
    Chunks(Vec<ChildRecord>),
}

/// Streams leaf items into content-defined chunks, writing each sealed
/// chunk to the store as it goes.
pub(crate) struct Splitter<'a> {
    store: &'a ValueStore,
    kind: ValueKind,
    hasher: RollingHasher,
    buf: LeafBuf,
    size: usize,
    records: Vec<ChildRecord>,
    scratch: Vec<u8>,
}

impl<'a> Splitter<'a> {
    pub(crate) fn new(store: &'a ValueStore, kind: ValueKind) -> Self {
        Self::with_records(store, kind, Vec::new())
    }

    /// Start with already-written leaf chunks as a reused prefix.
    pub(crate) fn with_records(
        store: &'a ValueStore,
        kind: ValueKind,
        records: Vec<ChildRecord>,
    ) -> Self {
        let buf = match kind {
            ValueKind::Map => LeafBuf::Entries(Vec::new()),
            ValueKind::Blob => LeafBuf::Bytes(Vec::new()),
            _ => LeafBuf::Values(Vec::new()),
        };
        Self {
            store,
            kind,
            hasher: RollingHasher::new(),
            buf,
            size: 0,
            records,
            scratch: Vec::new(),
        }
    }

    /// True when the splitter sits exactly on a chunk boundary: the current
    /// chunk is empty and the hash window is fresh.
    pub(crate) fn at_boundary(&self) -> bool {
        self.size == 0
    }

    /// Reuse an existing leaf chunk unchanged. Only valid on a boundary.
    pub(crate) fn pass_through(&mut self, record: ChildRecord) {
        debug_assert!(self.at_boundary());
        self.records.push(record);
    }

    pub(crate) fn push_value(&mut self, value: Value) -> ValueResult<()> {
        self.scratch.clear();
        codec::write_value(&mut self.scratch, &value);
        self.hasher.roll(&self.scratch);
        self.size += self.scratch.len();
        match &mut self.buf {
            LeafBuf::Values(values) => values.push(value),
            _ => return Err(ValueError::Invariant("value pushed into non-value leaf".into())),
        }
        self.maybe_seal()
    }

    pub(crate) fn push_entry(&mut self, entry: MapEntry) -> ValueResult<()> {
        self.scratch.clear();
        codec::write_value(&mut self.scratch, &entry.key);
        codec::write_value(&mut self.scratch, &entry.value);
        self.hasher.roll(&self.scratch);
        self.size += self.scratch.len();
        match &mut self.buf {
            LeafBuf::Entries(entries) => entries.push(entry),
            _ => return Err(ValueError::Invariant("entry pushed into non-map leaf".into())),
        }
        self.maybe_seal()
    }

    pub(crate) fn push_byte(&mut self, byte: u8) -> ValueResult<()> {
        self.hasher.roll_byte(byte);
        self.size += 1;
        match &mut self.buf {
            LeafBuf::Bytes(bytes) => bytes.push(byte),
            _ => return Err(ValueError::Invariant("byte pushed into non-blob leaf".into())),
        }
        self.maybe_seal()
    }

    pub(crate) fn push_bytes(&mut self, bytes: &[u8]) -> ValueResult<()> {
        for &b in bytes {
            self.push_byte(b)?;
        }
        Ok(())
    }

    fn maybe_seal(&mut self) -> ValueResult<()> {
        if (self.size >= MIN_CHUNK_SIZE && self.hasher.hits_boundary())
            || self.size >= MAX_CHUNK_SIZE
        {
            self.seal()?;
        }
        Ok(())
    }

    fn seal(&mut self) -> ValueResult<()> {
        let leaf = self.take_buf();
        let bytes = codec::encode_collection(&leaf);
        let hash = self.store.write_chunk(bytes)?;
        self.records.push(ChildRecord {
            reference: Ref::new(hash, self.kind, 0),
            items: leaf.num_items(),
        });
        self.hasher.reset();
        self.size = 0;
        Ok(())
    }

    fn take_buf(&mut self) -> Sequence {
        match &mut self.buf {
            LeafBuf::Values(values) => {
                Sequence::new_leaf_values(self.kind, std::mem::take(values))
            }
            LeafBuf::Entries(entries) => Sequence::new_leaf_entries(std::mem::take(entries)),
            LeafBuf::Bytes(bytes) => Sequence::new_leaf_bytes(std::mem::take(bytes)),
        }
    }

    pub(crate) fn finish(mut self) -> ValueResult<SplitResult> {
        if self.records.is_empty() {
            return Ok(SplitResult::Single(self.take_buf()));
        }
        if self.size > 0 {
            self.seal()?;
        }
        Ok(SplitResult::Chunks(self.records))
    }
}

/// Assemble a tree from a split outcome: write meta levels bottom-up until a
/// single root node remains. The root itself is not written.
pub(crate) fn finish_tree(store: &ValueStore, result: SplitResult) -> ValueResult<Sequence> {
    let mut records = match result {
        SplitResult::Single(root) => return Ok(root),
        SplitResult::Chunks(records) => records,
    };
    if records.is_empty() {
        return Err(ValueError::Invariant("no chunks to assemble".into()));
    }
    let kind = records[0].reference.kind();
    let mut level = 1u64;
    loop {
        if records.len() == 1 {
            // a reused prefix with nothing appended after it
            let root = store.read_sequence(&records[0].reference)?;
            debug!(kind = %kind, items = root.num_items(), level = root.level(), "assembled tree");
            return Ok(root);
        }
        let mut nodes = split_meta(kind, level, &records);
        if nodes.len() == 1 {
            let root = nodes.remove(0);
            debug!(kind = %kind, items = root.num_items(), level = root.level(), "assembled tree");
            return Ok(root);
        }
        records = write_meta_nodes(store, nodes)?;
        level += 1;
    }
}

/// Split child records into meta nodes at the given level, rolling each
/// child's hash bytes through the boundary hash.
fn split_meta(kind: ValueKind, level: u64, records: &[ChildRecord]) -> Vec<Sequence> {
    let mut nodes = Vec::new();
    let mut hasher = RollingHasher::new();
    let mut current: Vec<MetaTuple> = Vec::new();
    let mut size = 0usize;
    let mut cumulative = 0u64;
    for rec in records {
        hasher.roll(rec.reference.hash().as_bytes());
        size += HASH_LEN;
        cumulative += rec.items;
        current.push(MetaTuple {
            child: rec.reference,
            cumulative,
        });
        if (size >= MIN_CHUNK_SIZE && hasher.hits_boundary()) || size >= MAX_CHUNK_SIZE {
            nodes.push(Sequence::new_meta(kind, level, std::mem::take(&mut current)));
            hasher.reset();
            size = 0;
            cumulative = 0;
        }
    }
    if !current.is_empty() {
        nodes.push(Sequence::new_meta(kind, level, current));
    }
    nodes
}

fn write_meta_nodes(store: &ValueStore, nodes: Vec<Sequence>) -> ValueResult<Vec<ChildRecord>> {
    let mut records = Vec::with_capacity(nodes.len());
    for node in nodes {
        let items = node.num_items();
        let level = node.level();
        let kind = node.kind();
        let bytes = codec::encode_collection(&node);
        let hash = store.write_chunk(bytes)?;
        records.push(ChildRecord {
            reference: Ref::new(hash, kind, level),
            items,
        });
    }
    Ok(records)
}

/// Collect the leaf-chunk records of a meta-rooted tree, in order.
pub(crate) fn collect_leaf_records(
    store: &ValueStore,
    seq: &Sequence,
) -> ValueResult<Vec<ChildRecord>> {
    let mut records = Vec::new();
    collect_into(store, seq, &mut records)?;
    Ok(records)
}

fn collect_into(
    store: &ValueStore,
    seq: &Sequence,
    out: &mut Vec<ChildRecord>,
) -> ValueResult<()> {
    let tuples = seq
        .meta_tuples()
        .ok_or_else(|| ValueError::Invariant("expected a meta node".into()))?;
    let mut preceding = 0u64;
    for t in tuples {
        if seq.level() == 1 {
            out.push(ChildRecord {
                reference: t.child,
                items: t.cumulative - preceding,
            });
        } else {
            let child = store.read_sequence(&t.child)?;
            collect_into(store, &child, out)?;
        }
        preceding = t.cumulative;
    }
    Ok(())
}

/// Feed every leaf item of a leaf node into the splitter.
pub(crate) fn push_leaf_items(splitter: &mut Splitter<'_>, leaf: &Sequence) -> ValueResult<()> {
    match leaf.items() {
        SequenceItems::Values(values) => {
            for v in values {
                splitter.push_value(v.clone())?;
            }
            Ok(())
        }
        SequenceItems::Entries(entries) => {
            for e in entries {
                splitter.push_entry(e.clone())?;
            }
            Ok(())
        }
        SequenceItems::Bytes(bytes) => splitter.push_bytes(bytes),
        SequenceItems::Meta(_) => Err(ValueError::Invariant(
            "cannot push meta items through the splitter".into(),
        )),
    }
}

/// Prepare a splitter that continues an existing tree: every left leaf chunk
/// except the last is reused, and the last leaf's items are re-fed so the
/// splice region can re-chunk freely.
pub(crate) fn start_splice<'a>(
    store: &'a ValueStore,
    left: &Sequence,
) -> ValueResult<Splitter<'a>> {
    let kind = left.kind();
    if left.is_leaf() {
        let mut splitter = Splitter::new(store, kind);
        push_leaf_items(&mut splitter, left)?;
        return Ok(splitter);
    }
    let mut records = collect_leaf_records(store, left)?;
    let tail = records
        .pop()
        .ok_or_else(|| ValueError::Invariant("meta node with no leaves".into()))?;
    let tail_leaf = store.read_sequence(&tail.reference)?;
    let mut splitter = Splitter::with_records(store, kind, records);
    push_leaf_items(&mut splitter, &tail_leaf)?;
    Ok(splitter)
}

/// Logical concatenation of two same-kind trees. Left chunks before the
/// splice are reused directly; right chunks are reused again from the first
/// boundary that coincides with one of their original chunk starts.
pub(crate) fn concat_sequences(
    store: &ValueStore,
    left: &Sequence,
    right: &Sequence,
) -> ValueResult<Sequence> {
    debug_assert_eq!(left.kind(), right.kind());
    if left.num_items() == 0 {
        return Ok(right.clone());
    }
    if right.num_items() == 0 {
        return Ok(left.clone());
    }
    let mut splitter = start_splice(store, left)?;
    if right.is_leaf() {
        push_leaf_items(&mut splitter, right)?;
    } else {
        let mut reused = 0usize;
        for rec in collect_leaf_records(store, right)? {
            if splitter.at_boundary() {
                splitter.pass_through(rec);
                reused += 1;
            } else {
                let leaf = store.read_sequence(&rec.reference)?;
                push_leaf_items(&mut splitter, &leaf)?;
            }
        }
        debug!(kind = %left.kind(), reused_chunks = reused, "spliced trees");
    }
    finish_tree(store, splitter.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Odd multiplier keeps the mapping bijective and the encoded bytes
    // high-entropy, so content-defined boundaries occur at the normal rate.
    fn scrambled(i: u64) -> Value {
        Value::Uint(i.wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }

    fn build(store: &ValueStore, n: u64) -> Sequence {
        let mut splitter = Splitter::new(store, ValueKind::List);
        for i in 0..n {
            splitter.push_value(scrambled(i)).unwrap();
        }
        finish_tree(store, splitter.finish().unwrap()).unwrap()
    }

    #[test]
    fn empty_stream_builds_empty_leaf() {
        let store = ValueStore::in_memory();
        let root = build(&store, 0);
        assert!(root.is_leaf());
        assert_eq!(root.num_items(), 0);
    }

    #[test]
    fn small_stream_stays_in_one_unwritten_leaf() {
        let backing = std::sync::Arc::new(tessera_store::MemoryChunkStore::new());
        let store = ValueStore::new(backing.clone());
        let root = build(&store, 10);
        assert!(root.is_leaf());
        assert_eq!(root.num_items(), 10);
        assert_eq!(backing.len(), 0, "single-leaf builds write nothing");
    }

    #[test]
    fn large_stream_builds_meta_tree() {
        let store = ValueStore::in_memory();
        let root = build(&store, 10_000);
        assert!(!root.is_leaf());
        assert_eq!(root.num_items(), 10_000);
        assert!(root.check().is_ok());

        let records = collect_leaf_records(&store, &root).unwrap();
        assert!(records.len() > 1);
        let total: u64 = records.iter().map(|r| r.items).sum();
        assert_eq!(total, 10_000);
    }

    #[test]
    fn leaf_chunks_respect_size_bounds() {
        let store = ValueStore::in_memory();
        let root = build(&store, 10_000);
        let records = collect_leaf_records(&store, &root).unwrap();
        for rec in &records[..records.len() - 1] {
            let leaf = store.read_sequence(&rec.reference).unwrap();
            let mut item_bytes = 0usize;
            for v in leaf.leaf_values().unwrap() {
                let mut buf = Vec::new();
                codec::write_value(&mut buf, v);
                item_bytes += buf.len();
            }
            assert!(item_bytes >= MIN_CHUNK_SIZE, "undersized chunk: {item_bytes}");
            // one item of overshoot is allowed past the hard cap
            assert!(item_bytes < MAX_CHUNK_SIZE + 16, "oversized chunk: {item_bytes}");
        }
    }

    #[test]
    fn builds_are_deterministic() {
        let store_a = ValueStore::in_memory();
        let store_b = ValueStore::in_memory();
        let a = build(&store_a, 5_000);
        let b = build(&store_b, 5_000);
        assert_eq!(
            codec::encode_collection(&a),
            codec::encode_collection(&b)
        );
    }

    #[test]
    fn split_meta_tracks_node_local_cumulative() {
        let records: Vec<ChildRecord> = (0..4)
            .map(|i| ChildRecord {
                reference: Ref::new(
                    tessera_types::Hash::of(&[i]),
                    ValueKind::List,
                    0,
                ),
                items: u64::from(i) + 10,
            })
            .collect();
        let nodes = split_meta(ValueKind::List, 1, &records);
        let total: u64 = nodes.iter().map(|n| n.num_items()).sum();
        assert_eq!(total, 10 + 11 + 12 + 13);
        for node in &nodes {
            assert!(node.check().is_ok());
        }
    }

    #[test]
    fn concat_matches_from_scratch_build() {
        let store = ValueStore::in_memory();
        let mut left = Splitter::new(&store, ValueKind::List);
        for i in 0..4_000 {
            left.push_value(scrambled(i)).unwrap();
        }
        let left = finish_tree(&store, left.finish().unwrap()).unwrap();

        let mut right = Splitter::new(&store, ValueKind::List);
        for i in 4_000..9_000 {
            right.push_value(scrambled(i)).unwrap();
        }
        let right = finish_tree(&store, right.finish().unwrap()).unwrap();

        let joined = concat_sequences(&store, &left, &right).unwrap();
        let direct = build(&store, 9_000);
        assert_eq!(
            codec::encode_collection(&joined),
            codec::encode_collection(&direct)
        );
    }

    #[test]
    fn concat_with_empty_side_is_identity() {
        let store = ValueStore::in_memory();
        let big = build(&store, 3_000);
        let empty = Sequence::empty(ValueKind::List);
        let a = concat_sequences(&store, &big, &empty).unwrap();
        let b = concat_sequences(&store, &empty, &big).unwrap();
        assert_eq!(a, big);
        assert_eq!(b, big);
    }
}
