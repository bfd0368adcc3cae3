use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use tessera_types::Hash;

use crate::chunk::Chunk;
use crate::error::StoreResult;
use crate::traits::ChunkStore;

/// In-memory, HashMap-based chunk store.
///
/// Intended for tests and embedding. All chunks are held in memory behind a
/// `RwLock`; payloads are `Bytes`, so reads hand out cheap clones.
pub struct MemoryChunkStore {
    chunks: RwLock<HashMap<Hash, Bytes>>,
}

impl MemoryChunkStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
        }
    }

    /// Number of chunks currently stored.
    pub fn len(&self) -> usize {
        self.chunks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.chunks.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored chunks.
    pub fn total_bytes(&self) -> u64 {
        self.chunks
            .read()
            .expect("lock poisoned")
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }

    /// Remove all chunks from the store.
    pub fn clear(&self) {
        self.chunks.write().expect("lock poisoned").clear();
    }

    /// Return a sorted list of all chunk hashes in the store.
    pub fn all_hashes(&self) -> Vec<Hash> {
        let map = self.chunks.read().expect("lock poisoned");
        let mut hashes: Vec<Hash> = map.keys().copied().collect();
        hashes.sort();
        hashes
    }
}

impl Default for MemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkStore for MemoryChunkStore {
    fn read(&self, hash: &Hash) -> StoreResult<Option<Chunk>> {
        let map = self.chunks.read().expect("lock poisoned");
        Ok(map
            .get(hash)
            .map(|data| Chunk::from_parts(*hash, data.clone())))
    }

    fn write(&self, data: Bytes) -> StoreResult<Hash> {
        let hash = Hash::of(&data);
        let mut map = self.chunks.write().expect("lock poisoned");
        // Idempotent: content addressing guarantees an existing entry holds
        // the same bytes, so the second write is a no-op.
        map.entry(hash).or_insert(data);
        Ok(hash)
    }

    fn has(&self, hash: &Hash) -> StoreResult<bool> {
        let map = self.chunks.read().expect("lock poisoned");
        Ok(map.contains_key(hash))
    }
}

impl std::fmt::Debug for MemoryChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryChunkStore")
            .field("chunk_count", &self.len())
            .finish()
    }
}
