use crate::error::{ValueError, ValueResult};
use crate::sequence::{MapEntry, Sequence};
use crate::store::ValueStore;
use crate::value::Value;

struct Frame {
    seq: Sequence,
    idx: usize,
}

/// Transient position inside a sequence tree: a stack of (node, index)
/// frames from the root down to the current leaf. Seek descends by binary
/// search over the meta cumulative counts; advance walks the leaf and climbs
/// to the next sibling when it runs out. Never persisted, never shared.
pub(crate) struct SequenceCursor {
    store: ValueStore,
    stack: Vec<Frame>,
    exhausted: bool,
}

impl SequenceCursor {
    /// Position at leaf index `index`. An index at or past the end yields an
    /// already-exhausted cursor, not an error.
    pub(crate) fn new_at(store: ValueStore, root: Sequence, index: u64) -> ValueResult<Self> {
        if index >= root.num_items() {
            return Ok(Self {
                store,
                stack: Vec::new(),
                exhausted: true,
            });
        }
        let mut cursor = Self {
            store,
            stack: Vec::new(),
            exhausted: false,
        };
        cursor.descend_to(root, index)?;
        Ok(cursor)
    }

    fn descend_to(&mut self, mut seq: Sequence, mut target: u64) -> ValueResult<()> {
        loop {
            if seq.is_leaf() {
                self.stack.push(Frame {
                    seq,
                    idx: target as usize,
                });
                return Ok(());
            }
            let (child_idx, remaining) = seq.child_index_for(target).ok_or_else(|| {
                ValueError::Invariant("seek index beyond subtree counts".into())
            })?;
            let child = seq
                .meta_tuples()
                .and_then(|t| t.get(child_idx))
                .map(|t| t.child)
                .ok_or_else(|| ValueError::Invariant("meta node without children".into()))?;
            self.stack.push(Frame {
                seq,
                idx: child_idx,
            });
            seq = self.store.read_sequence(&child)?;
            target = remaining;
        }
    }

    pub(crate) fn next_value(&mut self) -> ValueResult<Option<Value>> {
        if self.exhausted {
            return Ok(None);
        }
        let frame = self
            .stack
            .last()
            .ok_or_else(|| ValueError::Invariant("cursor has no position".into()))?;
        let values = frame
            .seq
            .leaf_values()
            .ok_or_else(|| ValueError::Invariant("cursor is not over a value leaf".into()))?;
        let value = values
            .get(frame.idx)
            .cloned()
            .ok_or_else(|| ValueError::Invariant("cursor index out of bounds".into()))?;
        self.advance_one()?;
        Ok(Some(value))
    }

    pub(crate) fn next_entry(&mut self) -> ValueResult<Option<MapEntry>> {
        if self.exhausted {
            return Ok(None);
        }
        let frame = self
            .stack
            .last()
            .ok_or_else(|| ValueError::Invariant("cursor has no position".into()))?;
        let entries = frame
            .seq
            .leaf_entries()
            .ok_or_else(|| ValueError::Invariant("cursor is not over a map leaf".into()))?;
        let entry = entries
            .get(frame.idx)
            .cloned()
            .ok_or_else(|| ValueError::Invariant("cursor index out of bounds".into()))?;
        self.advance_one()?;
        Ok(Some(entry))
    }

    /// Copy blob bytes forward from the current position. Returns how many
    /// bytes were copied; 0 means the end was reached.
    pub(crate) fn read_bytes(&mut self, out: &mut [u8]) -> ValueResult<usize> {
        let mut copied = 0;
        while copied < out.len() && !self.exhausted {
            let frame = self
                .stack
                .last_mut()
                .ok_or_else(|| ValueError::Invariant("cursor has no position".into()))?;
            let leaf_len;
            let n;
            {
                let bytes = frame.seq.leaf_bytes().ok_or_else(|| {
                    ValueError::Invariant("cursor is not over a blob leaf".into())
                })?;
                leaf_len = bytes.len();
                n = (leaf_len - frame.idx).min(out.len() - copied);
                out[copied..copied + n].copy_from_slice(&bytes[frame.idx..frame.idx + n]);
            }
            frame.idx += n;
            let leaf_done = frame.idx == leaf_len;
            copied += n;
            if leaf_done {
                self.next_leaf()?;
            }
        }
        Ok(copied)
    }

    fn advance_one(&mut self) -> ValueResult<()> {
        let Some(frame) = self.stack.last_mut() else {
            self.exhausted = true;
            return Ok(());
        };
        frame.idx += 1;
        if frame.idx < frame.seq.local_len() {
            return Ok(());
        }
        self.next_leaf()
    }

    /// Leave the current leaf and move to the first position of the next
    /// one, climbing past exhausted meta frames on the way.
    fn next_leaf(&mut self) -> ValueResult<()> {
        self.stack.pop();
        loop {
            let Some(frame) = self.stack.last_mut() else {
                self.exhausted = true;
                return Ok(());
            };
            frame.idx += 1;
            if frame.idx < frame.seq.local_len() {
                let child = frame
                    .seq
                    .meta_tuples()
                    .and_then(|t| t.get(frame.idx))
                    .map(|t| t.child)
                    .ok_or_else(|| ValueError::Invariant("meta node without children".into()))?;
                let mut seq = self.store.read_sequence(&child)?;
                loop {
                    if seq.is_leaf() {
                        self.stack.push(Frame { seq, idx: 0 });
                        return Ok(());
                    }
                    let leftmost = seq
                        .meta_tuples()
                        .and_then(|t| t.first())
                        .map(|t| t.child)
                        .ok_or_else(|| {
                            ValueError::Invariant("meta node without children".into())
                        })?;
                    self.stack.push(Frame { seq, idx: 0 });
                    seq = self.store.read_sequence(&leftmost)?;
                }
            }
            self.stack.pop();
        }
    }
}

/// State machine behind the public collection iterators.
///
/// Construction is free; no chunk is read until the first item is pulled.
/// After the sequence ends or an error is returned the driver stays `Done`.
pub(crate) enum IterDriver {
    Pending {
        store: ValueStore,
        root: Sequence,
        index: u64,
    },
    Active(SequenceCursor),
    Done,
}

impl IterDriver {
    pub(crate) fn new(store: ValueStore, root: Sequence, index: u64) -> Self {
        IterDriver::Pending { store, root, index }
    }

    pub(crate) fn next_value(&mut self) -> Option<ValueResult<Value>> {
        self.step(SequenceCursor::next_value)
    }

    pub(crate) fn next_entry(&mut self) -> Option<ValueResult<MapEntry>> {
        self.step(SequenceCursor::next_entry)
    }

    fn step<T>(
        &mut self,
        advance: impl Fn(&mut SequenceCursor) -> ValueResult<Option<T>>,
    ) -> Option<ValueResult<T>> {
        loop {
            match std::mem::replace(self, IterDriver::Done) {
                IterDriver::Pending { store, root, index } => {
                    match SequenceCursor::new_at(store, root, index) {
                        Ok(cursor) => *self = IterDriver::Active(cursor),
                        Err(e) => return Some(Err(e)),
                    }
                }
                IterDriver::Active(mut cursor) => match advance(&mut cursor) {
                    Ok(Some(item)) => {
                        *self = IterDriver::Active(cursor);
                        return Some(Ok(item));
                    }
                    Ok(None) => return None,
                    Err(e) => return Some(Err(e)),
                },
                IterDriver::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::{finish_tree, Splitter};
    use crate::kind::ValueKind;

    fn scrambled(i: u64) -> Value {
        Value::Uint(i.wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }

    fn big_list(store: &ValueStore, n: u64) -> Sequence {
        let mut splitter = Splitter::new(store, ValueKind::List);
        for i in 0..n {
            splitter.push_value(scrambled(i)).unwrap();
        }
        finish_tree(store, splitter.finish().unwrap()).unwrap()
    }

    #[test]
    fn drains_a_leaf_root_in_order() {
        let store = ValueStore::in_memory();
        let root = Sequence::new_leaf_values(
            ValueKind::List,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)],
        );
        let mut cursor = SequenceCursor::new_at(store, root, 0).unwrap();
        let mut seen = Vec::new();
        while let Some(v) = cursor.next_value().unwrap() {
            seen.push(v);
        }
        assert_eq!(seen, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        // terminal state repeats
        assert_eq!(cursor.next_value().unwrap(), None);
        assert_eq!(cursor.next_value().unwrap(), None);
    }

    #[test]
    fn seeks_into_a_leaf_root() {
        let store = ValueStore::in_memory();
        let root =
            Sequence::new_leaf_values(ValueKind::List, vec![Value::Int(1), Value::Int(2)]);
        let mut cursor = SequenceCursor::new_at(store, root, 1).unwrap();
        assert_eq!(cursor.next_value().unwrap(), Some(Value::Int(2)));
        assert_eq!(cursor.next_value().unwrap(), None);
    }

    #[test]
    fn seek_at_or_past_the_end_is_exhausted() {
        let store = ValueStore::in_memory();
        let root = Sequence::new_leaf_values(ValueKind::List, vec![Value::Int(1)]);
        for index in [1, 2, 1000] {
            let mut cursor =
                SequenceCursor::new_at(store.clone(), root.clone(), index).unwrap();
            assert_eq!(cursor.next_value().unwrap(), None);
        }
    }

    #[test]
    fn crosses_chunk_boundaries_in_item_order() {
        let store = ValueStore::in_memory();
        let n = 8_000;
        let root = big_list(&store, n);
        assert!(!root.is_leaf());

        let mut cursor = SequenceCursor::new_at(store, root, 0).unwrap();
        let mut count = 0u64;
        while let Some(v) = cursor.next_value().unwrap() {
            assert_eq!(v, scrambled(count));
            count += 1;
        }
        assert_eq!(count, n);
    }

    #[test]
    fn seek_lands_on_the_exact_item() {
        let store = ValueStore::in_memory();
        let n = 8_000;
        let root = big_list(&store, n);
        for index in [0u64, 1, 4_095, 4_096, 7_999] {
            let mut cursor =
                SequenceCursor::new_at(store.clone(), root.clone(), index).unwrap();
            assert_eq!(cursor.next_value().unwrap(), Some(scrambled(index)));
        }
    }

    #[test]
    fn entry_cursor_walks_map_leaves() {
        let store = ValueStore::in_memory();
        let root = Sequence::new_leaf_entries(vec![
            MapEntry::new(Value::Int(1), Value::from("a")),
            MapEntry::new(Value::Int(2), Value::from("b")),
        ]);
        let mut cursor = SequenceCursor::new_at(store, root, 1).unwrap();
        assert_eq!(
            cursor.next_entry().unwrap(),
            Some(MapEntry::new(Value::Int(2), Value::from("b")))
        );
        assert_eq!(cursor.next_entry().unwrap(), None);
    }

    #[test]
    fn byte_cursor_reads_across_chunks() {
        let store = ValueStore::in_memory();
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut splitter = Splitter::new(&store, ValueKind::Blob);
        splitter.push_bytes(&data).unwrap();
        let root = finish_tree(&store, splitter.finish().unwrap()).unwrap();
        assert!(!root.is_leaf());

        let offset = 123_456u64;
        let mut cursor = SequenceCursor::new_at(store, root, offset).unwrap();
        let mut out = vec![0u8; 10_000];
        let mut total = 0;
        while total < out.len() {
            let n = cursor.read_bytes(&mut out[total..]).unwrap();
            if n == 0 {
                break;
            }
            total += n;
        }
        assert_eq!(total, out.len());
        assert_eq!(out, data[offset as usize..offset as usize + 10_000]);
    }
}
