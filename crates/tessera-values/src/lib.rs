//! Content-addressed values for Tessera.
//!
//! Everything in Tessera is a [`Value`]: scalars, structs, refs, and the
//! four collection types. Small values encode into a single chunk; large
//! collections split into a tree of chunks with content-defined boundaries,
//! so equal contents always produce equal chunks no matter how they were
//! built. A value's identity is the BLAKE3 hash of its canonical encoding,
//! which is what makes structural sharing and deduplication fall out for
//! free.
//!
//! # Key Types
//!
//! - [`Value`] -- The value model, one enum over every storable type
//! - [`ValueStore`] -- Reads and writes values over a chunk store
//! - [`List`], [`Set`], [`Map`], [`Blob`] -- Chunked immutable collections
//! - [`Ref`] -- A typed pointer to a value by content hash
//! - [`walk_refs`] -- Ref extraction from encoded bytes, without decoding

pub mod blob;
pub mod codec;
pub mod error;
pub mod kind;
pub mod list;
pub mod map;
pub mod reference;
pub mod rolling;
pub mod set;
pub mod store;
pub mod value;
pub mod walk;

mod chunker;
mod cursor;
mod sequence;

pub use blob::{Blob, BlobReader};
pub use codec::{decode_value, encode_value};
pub use error::{ValueError, ValueResult};
pub use kind::ValueKind;
pub use list::{List, ListIter};
pub use map::{Map, MapIter};
pub use reference::Ref;
pub use sequence::MapEntry;
pub use set::{Set, SetIter};
pub use store::ValueStore;
pub use value::{Struct, Value};
pub use walk::{collect_refs, walk_refs};
