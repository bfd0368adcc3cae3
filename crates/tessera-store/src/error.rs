use tessera_types::Hash;

/// Errors from chunk store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested chunk was not found.
    ///
    /// `ChunkStore::read` reports absence as `Ok(None)`; this variant is for
    /// callers that required the chunk to exist.
    #[error("chunk not found: {0}")]
    NotFound(Hash),

    /// Content hash mismatch on read (data corruption in the backend).
    #[error("hash mismatch for {expected}: computed {computed}")]
    HashMismatch { expected: Hash, computed: Hash },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend refuses writes.
    #[error("store is read-only")]
    ReadOnly,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
