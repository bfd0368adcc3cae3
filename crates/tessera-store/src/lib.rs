//! Content-addressed chunk storage for the tessera collection engine.
//!
//! Every value in tessera, from scalars and structs to the leaf and meta
//! nodes of chunked collections, is encoded into an immutable chunk named by
//! the BLAKE3 hash of its bytes. This crate owns that boundary: the
//! [`Chunk`] unit, the [`ChunkStore`] trait, and an in-memory backend.
//!
//! # Design Rules
//!
//! 1. Chunks are immutable once written (content addressing guarantees it).
//! 2. Writes are idempotent; identical bytes dedup to one chunk.
//! 3. Concurrent reads are always safe (chunks are immutable).
//! 4. The store never interprets chunk contents; decoding belongs to the
//!    value layer.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod chunk;
pub mod error;
pub mod memory;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use chunk::Chunk;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryChunkStore;
pub use traits::ChunkStore;
