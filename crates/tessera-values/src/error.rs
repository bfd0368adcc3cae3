use tessera_store::StoreError;
use tessera_types::Hash;
use thiserror::Error;

/// Errors raised by the value layer.
#[derive(Debug, Error)]
pub enum ValueError {
    /// A referenced chunk is absent from the store. Absence is never treated
    /// as an empty value.
    #[error("missing chunk: {0}")]
    MissingChunk(Hash),

    /// Chunk bytes do not parse as an encoded value.
    #[error("decode error at byte {offset}: {reason}")]
    Decode { offset: usize, reason: String },

    /// An internal consistency check failed. Signals a programming error,
    /// not a recoverable condition.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// The chunk store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result alias for value-layer operations.
pub type ValueResult<T> = Result<T, ValueError>;
