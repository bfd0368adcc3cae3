use bytes::Bytes;
use tessera_types::Hash;

use crate::chunk::Chunk;
use crate::error::StoreResult;

/// Content-addressed chunk store.
///
/// All implementations must satisfy these invariants:
/// - Chunks are immutable once written. Content addressing guarantees this:
///   the same bytes always produce the same hash.
/// - Writes are idempotent: writing identical bytes twice returns the same
///   hash, and the second write may be a no-op.
/// - Concurrent reads are always safe (chunks are immutable).
/// - The store never interprets chunk contents; it is a pure key-value
///   store keyed by content hash.
/// - All I/O errors are propagated, never silently ignored.
pub trait ChunkStore: Send + Sync {
    /// Read a chunk by its content hash.
    ///
    /// Returns `Ok(None)` if no chunk with that hash was ever written.
    /// Returns `Err` only on I/O failure or detected corruption.
    fn read(&self, hash: &Hash) -> StoreResult<Option<Chunk>>;

    /// Write a chunk and return its content hash.
    fn write(&self, data: Bytes) -> StoreResult<Hash>;

    /// Check whether a chunk exists in the store.
    fn has(&self, hash: &Hash) -> StoreResult<bool>;

    /// Read multiple chunks in a batch.
    ///
    /// Default implementation calls `read()` per hash. Backends may override
    /// for fewer I/O round-trips.
    fn read_batch(&self, hashes: &[Hash]) -> StoreResult<Vec<Option<Chunk>>> {
        hashes.iter().map(|h| self.read(h)).collect()
    }

    /// Write multiple chunks in a batch and return their hashes.
    ///
    /// Default implementation calls `write()` per chunk. Backends may
    /// override for fewer I/O round-trips (e.g., a single fsync).
    fn write_batch(&self, chunks: Vec<Bytes>) -> StoreResult<Vec<Hash>> {
        chunks.into_iter().map(|data| self.write(data)).collect()
    }
}
