//! Batched edit layer for Tessera.
//!
//! Mutating a chunked map or set one operation at a time rebuilds the tree
//! path once per operation. This crate batches instead: operations
//! accumulate in a [`KvpCollection`] in arrival order, a stable sort puts
//! them in key order without losing last-write-wins semantics, and a single
//! merge pass produces the new tree. [`MapEditor`] and [`SetEditor`] wrap
//! that flow behind a builder interface.
//!
//! # Key Types
//!
//! - [`Kvp`] -- One pending insert-or-replace / removal
//! - [`KvpCollection`] -- An edit batch, sortable and collapsible
//! - [`MapEditor`], [`SetEditor`] -- Accumulate edits, apply in one pass
//! - [`is_in_order`] -- Check that a batch is non-decreasing by key

pub mod collection;
pub mod editor;
pub mod error;
pub mod kvp;

pub use collection::{is_in_order, KvpCollection};
pub use editor::{MapEditor, SetEditor};
pub use error::{EditError, EditResult};
pub use kvp::Kvp;
