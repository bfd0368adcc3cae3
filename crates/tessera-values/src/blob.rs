//! Immutable byte sequence with random-access reads.

use std::io;

use tessera_types::Hash;

use crate::chunker::{concat_sequences, finish_tree, start_splice, Splitter};
use crate::codec;
use crate::cursor::SequenceCursor;
use crate::error::{ValueError, ValueResult};
use crate::kind::ValueKind;
use crate::sequence::Sequence;
use crate::store::ValueStore;
use crate::value::Value;

/// An immutable blob of bytes backed by a chunked tree.
///
/// Large blobs split into content-defined chunks, so blobs sharing runs of
/// bytes share chunks in the store. Reads go through [`BlobReader`], which
/// implements [`io::Read`] and [`io::Seek`] and fetches only the chunks a
/// read actually touches.
#[derive(Clone)]
pub struct Blob {
    store: ValueStore,
    root: Sequence,
}

impl Blob {
    /// Builds a blob holding `data`, writing any interior chunks to the
    /// store.
    pub fn new(store: &ValueStore, data: &[u8]) -> ValueResult<Self> {
        let mut splitter = Splitter::new(store, ValueKind::Blob);
        splitter.push_bytes(data)?;
        let root = finish_tree(store, splitter.finish()?)?;
        Ok(Self {
            store: store.clone(),
            root,
        })
    }

    pub fn empty(store: &ValueStore) -> Self {
        Self {
            store: store.clone(),
            root: Sequence::empty(ValueKind::Blob),
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> u64 {
        self.root.num_items()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a new blob with `data` added at the end. Chunks before the
    /// final leaf of `self` are reused as-is.
    pub fn append(&self, data: &[u8]) -> ValueResult<Self> {
        if data.is_empty() {
            return Ok(self.clone());
        }
        let mut splitter = start_splice(&self.store, &self.root)?;
        splitter.push_bytes(data)?;
        let root = finish_tree(&self.store, splitter.finish()?)?;
        Ok(Self {
            store: self.store.clone(),
            root,
        })
    }

    /// Concatenates two blobs into a new one. The result is identical to
    /// building the combined blob from scratch.
    pub fn concat(&self, other: &Blob) -> ValueResult<Self> {
        let root = concat_sequences(&self.store, &self.root, &other.root)?;
        Ok(Self {
            store: self.store.clone(),
            root,
        })
    }

    /// A positioned reader over the blob's bytes, starting at offset 0.
    pub fn reader(&self) -> BlobReader {
        BlobReader {
            store: self.store.clone(),
            root: self.root.clone(),
            position: 0,
            cursor: None,
        }
    }

    /// Copies the whole blob into memory.
    pub fn to_vec(&self) -> ValueResult<Vec<u8>> {
        let len = usize::try_from(self.len())
            .map_err(|_| ValueError::Invariant("blob does not fit in memory".into()))?;
        let mut out = vec![0u8; len];
        if len == 0 {
            return Ok(out);
        }
        let mut cursor = SequenceCursor::new_at(self.store.clone(), self.root.clone(), 0)?;
        let copied = cursor.read_bytes(&mut out)?;
        if copied != len {
            return Err(ValueError::Invariant(format!(
                "blob holds {copied} bytes but counts {len}"
            )));
        }
        Ok(out)
    }

    /// Content hash of the blob. Equal blobs hash equal.
    pub fn hash(&self) -> Hash {
        Hash::of(&codec::encode_collection(&self.root))
    }

    pub(crate) fn from_sequence(store: ValueStore, root: Sequence) -> Self {
        Self { store, root }
    }

    pub(crate) fn sequence(&self) -> &Sequence {
        &self.root
    }

    pub(crate) fn into_sequence(self) -> Sequence {
        self.root
    }
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for Blob {}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("len", &self.len())
            .field("height", &self.root.level())
            .finish_non_exhaustive()
    }
}

impl From<Blob> for Value {
    fn from(blob: Blob) -> Self {
        Value::Blob(blob)
    }
}

/// Seekable reader over a [`Blob`].
///
/// Seeking past the end is allowed; reads there return 0 bytes. The reader
/// holds no chunk data until the first read after a seek.
pub struct BlobReader {
    store: ValueStore,
    root: Sequence,
    position: u64,
    cursor: Option<SequenceCursor>,
}

impl BlobReader {
    /// Current read offset in bytes.
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl io::Read for BlobReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.position >= self.root.num_items() {
            return Ok(0);
        }
        let cursor = match &mut self.cursor {
            Some(cursor) => cursor,
            None => {
                let fresh =
                    SequenceCursor::new_at(self.store.clone(), self.root.clone(), self.position)
                        .map_err(io::Error::other)?;
                self.cursor.insert(fresh)
            }
        };
        let n = cursor.read_bytes(buf).map_err(io::Error::other)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl io::Seek for BlobReader {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let target = match pos {
            io::SeekFrom::Start(offset) => i128::from(offset),
            io::SeekFrom::End(delta) => i128::from(self.root.num_items()) + i128::from(delta),
            io::SeekFrom::Current(delta) => i128::from(self.position) + i128::from(delta),
        };
        let target = u64::try_from(target).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek outside the addressable range",
            )
        })?;
        self.position = target;
        self.cursor = None;
        Ok(self.position)
    }
}
