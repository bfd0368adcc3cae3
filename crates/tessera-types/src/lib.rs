//! Foundation types for the tessera collection engine.
//!
//! Everything tessera stores is a chunk, an immutable byte string addressed
//! by the BLAKE3 hash of its contents. This crate provides that address type
//! and nothing else; every other tessera crate depends on it.
//!
//! # Key Types
//!
//! - [`Hash`] -- Content address of a chunk; equal bytes hash equal
//! - [`TypeError`] -- Parse failures for the above

pub mod error;
pub mod hash;

pub use error::TypeError;
pub use hash::{Hash, HASH_LEN};
