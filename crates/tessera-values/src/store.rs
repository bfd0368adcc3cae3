use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tessera_store::{ChunkStore, MemoryChunkStore};
use tessera_types::Hash;
use tracing::debug;

use crate::blob::Blob;
use crate::codec;
use crate::error::{ValueError, ValueResult};
use crate::kind::ValueKind;
use crate::list::List;
use crate::map::Map;
use crate::reference::Ref;
use crate::sequence::Sequence;
use crate::set::Set;
use crate::value::Value;

/// Cheap-to-clone handle through which the value layer reads and writes
/// chunks. Collections hold one so cursors can fetch child chunks lazily.
#[derive(Clone)]
pub struct ValueStore {
    chunks: Arc<dyn ChunkStore>,
}

impl ValueStore {
    pub fn new(chunks: Arc<dyn ChunkStore>) -> Self {
        Self { chunks }
    }

    /// A store backed by process-local memory. The usual starting point for
    /// tests and scratch work.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryChunkStore::new()))
    }

    /// The underlying chunk store.
    pub fn chunks(&self) -> &Arc<dyn ChunkStore> {
        &self.chunks
    }

    /// Persist a value's root chunk and return a ref to it. Collection
    /// children are already in the store by the time this is called; this
    /// writes only the root.
    pub fn write_value(&self, value: &Value) -> ValueResult<Ref> {
        let bytes = codec::encode_value(value);
        let hash = self.chunks.write(bytes)?;
        debug!(hash = %hash.short_hex(), kind = %value.kind(), "wrote value chunk");
        Ok(Ref::new(hash, value.kind(), value.height()))
    }

    /// Read and decode the chunk with the given hash. A missing chunk is an
    /// error, never an empty value.
    pub fn read_value(&self, hash: &Hash) -> ValueResult<Value> {
        let chunk = self
            .chunks
            .read(hash)?
            .ok_or(ValueError::MissingChunk(*hash))?;
        codec::decode_value(chunk.data(), self)
    }

    /// Read the value a ref points at.
    pub fn resolve(&self, r: &Ref) -> ValueResult<Value> {
        self.read_value(&r.hash())
    }

    pub(crate) fn write_chunk(&self, bytes: Bytes) -> ValueResult<Hash> {
        Ok(self.chunks.write(bytes)?)
    }

    /// Read a chunk expected to hold a sequence node of the ref's kind and
    /// height. Used by cursors descending a tree.
    pub(crate) fn read_sequence(&self, r: &Ref) -> ValueResult<Sequence> {
        let value = self.read_value(&r.hash())?;
        let seq = match value {
            Value::List(l) if r.kind() == ValueKind::List => l.into_sequence(),
            Value::Set(s) if r.kind() == ValueKind::Set => s.into_sequence(),
            Value::Map(m) if r.kind() == ValueKind::Map => m.into_sequence(),
            Value::Blob(b) if r.kind() == ValueKind::Blob => b.into_sequence(),
            other => {
                return Err(ValueError::Invariant(format!(
                    "ref to {} resolved to a {} chunk",
                    r.kind(),
                    other.kind()
                )))
            }
        };
        if seq.level() != r.height() {
            return Err(ValueError::Invariant(format!(
                "ref height {} resolved to a level-{} node",
                r.height(),
                seq.level()
            )));
        }
        Ok(seq)
    }
}

impl fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueStore").finish_non_exhaustive()
    }
}

/// Wrap a sequence in the collection value matching its kind.
pub(crate) fn sequence_value(store: &ValueStore, seq: Sequence) -> Value {
    match seq.kind() {
        ValueKind::List => Value::List(List::from_sequence(store.clone(), seq)),
        ValueKind::Set => Value::Set(Set::from_sequence(store.clone(), seq)),
        ValueKind::Map => Value::Map(Map::from_sequence(store.clone(), seq)),
        ValueKind::Blob => Value::Blob(Blob::from_sequence(store.clone(), seq)),
        kind => unreachable!("not a collection kind: {kind}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_scalar() {
        let vs = ValueStore::in_memory();
        let v = Value::from("persisted");
        let r = vs.write_value(&v).unwrap();
        assert_eq!(r.kind(), ValueKind::String);
        assert_eq!(r.height(), 0);
        assert_eq!(vs.read_value(&r.hash()).unwrap(), v);
    }

    #[test]
    fn write_is_content_addressed() {
        let vs = ValueStore::in_memory();
        let a = vs.write_value(&Value::Int(9)).unwrap();
        let b = vs.write_value(&Value::Int(9)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hash(), Value::Int(9).hash());
    }

    #[test]
    fn read_missing_chunk_fails() {
        let vs = ValueStore::in_memory();
        let absent = Hash::of(b"never written");
        let err = vs.read_value(&absent).unwrap_err();
        assert!(matches!(err, ValueError::MissingChunk(h) if h == absent));
    }

    #[test]
    fn resolve_follows_a_ref() {
        let vs = ValueStore::in_memory();
        let v = Value::Uint(77);
        let r = vs.write_value(&v).unwrap();
        assert_eq!(vs.resolve(&r).unwrap(), v);
    }

    #[test]
    fn stores_can_be_shared_across_handles() {
        let backing = Arc::new(MemoryChunkStore::new());
        let a = ValueStore::new(backing.clone());
        let b = ValueStore::new(backing);
        let r = a.write_value(&Value::Bool(true)).unwrap();
        assert_eq!(b.read_value(&r.hash()).unwrap(), Value::Bool(true));
    }
}
