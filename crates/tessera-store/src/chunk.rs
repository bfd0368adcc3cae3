use bytes::Bytes;
use tessera_types::Hash;

/// An immutable, content-addressed byte blob.
///
/// A `Chunk` holds the encoding of exactly one value: a scalar, a struct,
/// or one leaf/meta node of a chunked sequence. The hash is computed from
/// the payload on construction and is the chunk's identity everywhere in
/// the system. Payloads are `Bytes`, so cloning a chunk is cheap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    hash: Hash,
    data: Bytes,
}

impl Chunk {
    /// Create a chunk from its payload, computing the content hash.
    pub fn new(data: Bytes) -> Self {
        let hash = Hash::of(&data);
        Self { hash, data }
    }

    /// Reassemble a chunk whose hash is already known.
    ///
    /// Callers are trusted to pass the hash of `data`; store backends use
    /// this on the read path to avoid re-hashing.
    pub fn from_parts(hash: Hash, data: Bytes) -> Self {
        Self { hash, data }
    }

    /// The content address of this chunk.
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// The chunk payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consume the chunk, returning its payload.
    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Recompute the hash from the payload and compare against the stored
    /// one. Backends that cannot trust their medium call this on read.
    pub fn verify(&self) -> bool {
        Hash::of(&self.data) == self.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_computes_content_hash() {
        let chunk = Chunk::new(Bytes::from_static(b"payload"));
        assert_eq!(chunk.hash(), Hash::of(b"payload"));
        assert!(chunk.verify());
    }

    #[test]
    fn identical_payloads_identical_hashes() {
        let a = Chunk::new(Bytes::from_static(b"same"));
        let b = Chunk::new(Bytes::from_static(b"same"));
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a, b);
    }

    #[test]
    fn different_payloads_different_hashes() {
        let a = Chunk::new(Bytes::from_static(b"one"));
        let b = Chunk::new(Bytes::from_static(b"two"));
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn from_parts_skips_hashing() {
        let data = Bytes::from_static(b"trusted");
        let hash = Hash::of(&data);
        let chunk = Chunk::from_parts(hash, data.clone());
        assert_eq!(chunk.hash(), hash);
        assert_eq!(chunk.data(), &data);
    }

    #[test]
    fn verify_detects_mismatch() {
        let chunk = Chunk::from_parts(Hash::of(b"expected"), Bytes::from_static(b"actual"));
        assert!(!chunk.verify());
    }

    #[test]
    fn size_and_empty() {
        let chunk = Chunk::new(Bytes::from_static(b"12345"));
        assert_eq!(chunk.size(), 5);
        assert!(!chunk.is_empty());
        assert!(Chunk::new(Bytes::new()).is_empty());
    }
}
