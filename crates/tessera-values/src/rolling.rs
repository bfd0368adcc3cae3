//! Rolling hash used to pick chunk boundaries.
//!
//! Chunk boundaries must depend only on the bytes near them, never on their
//! absolute position, so that an edit near the front of a large collection
//! perturbs only the chunks around the edit point. A cyclic-polynomial
//! (buzhash) rolling hash over a fixed window gives exactly that: once the
//! window is warm, the hash is a function of the last [`CHUNK_WINDOW`] bytes
//! alone.
//!
//! The hasher is reset at every boundary, which makes the whole boundary
//! sequence a pure function of the bytes since the previous cut. Re-chunking
//! that starts at an existing boundary therefore reproduces the original
//! decisions byte for byte, which is what lets concat and edit application
//! reuse untouched chunks.

/// Bytes covered by the rolling window.
pub const CHUNK_WINDOW: usize = 64;

/// Boundary test: `hash & BOUNDARY_MASK == BOUNDARY_PATTERN`.
/// A 12-bit mask puts the expected spacing near 4 KiB of item bytes.
pub const BOUNDARY_MASK: u32 = 0x0fff;
pub const BOUNDARY_PATTERN: u32 = 0x0fff;

/// Chunks smaller than this never close on a hash hit.
pub const MIN_CHUNK_SIZE: usize = 256;

/// Chunks are force-closed at this size even without a hash hit.
pub const MAX_CHUNK_SIZE: usize = 64 * 1024;

// Per-byte mixing table, derived with a fixed integer scramble so the
// hash is identical across builds and platforms.
const BYTE_TABLE: [u32; 256] = build_byte_table();

const fn mix32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x85eb_ca6b);
    x ^= x >> 13;
    x = x.wrapping_mul(0xc2b2_ae35);
    x ^= x >> 16;
    x
}

const fn build_byte_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = mix32((i as u32).wrapping_add(0x9e37_79b9));
        i += 1;
    }
    table
}

/// Cyclic-polynomial rolling hash over a [`CHUNK_WINDOW`]-byte window.
#[derive(Clone, Debug)]
pub struct RollingHasher {
    window: [u8; CHUNK_WINDOW],
    pos: usize,
    filled: usize,
    hash: u32,
}

impl RollingHasher {
    pub fn new() -> Self {
        Self {
            window: [0; CHUNK_WINDOW],
            pos: 0,
            filled: 0,
            hash: 0,
        }
    }

    /// Feed one byte, evicting the oldest window byte once warm.
    pub fn roll_byte(&mut self, byte: u8) {
        let incoming = BYTE_TABLE[byte as usize];
        if self.filled == CHUNK_WINDOW {
            let outgoing = BYTE_TABLE[self.window[self.pos] as usize];
            self.hash = self.hash.rotate_left(1)
                ^ outgoing.rotate_left(CHUNK_WINDOW as u32)
                ^ incoming;
        } else {
            self.hash = self.hash.rotate_left(1) ^ incoming;
            self.filled += 1;
        }
        self.window[self.pos] = byte;
        self.pos = (self.pos + 1) % CHUNK_WINDOW;
    }

    /// Feed a run of bytes.
    pub fn roll(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.roll_byte(b);
        }
    }

    /// Current hash value.
    pub fn sum(&self) -> u32 {
        self.hash
    }

    /// True when the current hash satisfies the boundary pattern.
    pub fn hits_boundary(&self) -> bool {
        self.hash & BOUNDARY_MASK == BOUNDARY_PATTERN
    }

    /// Return to the fresh state. Called at every chunk boundary.
    pub fn reset(&mut self) {
        self.window = [0; CHUNK_WINDOW];
        self.pos = 0;
        self.filled = 0;
        self.hash = 0;
    }
}

impl Default for RollingHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, RngCore, SeedableRng};

    #[test]
    fn deterministic_for_same_input() {
        let mut a = RollingHasher::new();
        let mut b = RollingHasher::new();
        a.roll(b"the quick brown fox jumps over the lazy dog");
        b.roll(b"the quick brown fox jumps over the lazy dog");
        assert_eq!(a.sum(), b.sum());
    }

    #[test]
    fn reset_matches_fresh_hasher() {
        let mut rolled = RollingHasher::new();
        rolled.roll(b"some earlier chunk contents");
        rolled.reset();
        rolled.roll(b"abc");

        let mut fresh = RollingHasher::new();
        fresh.roll(b"abc");
        assert_eq!(rolled.sum(), fresh.sum());
    }

    #[test]
    fn hash_depends_only_on_window_once_warm() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut data = vec![0u8; 1000];
        rng.fill_bytes(&mut data);

        let mut long = RollingHasher::new();
        long.roll(&data);

        let mut short = RollingHasher::new();
        short.roll(&data[data.len() - CHUNK_WINDOW..]);

        assert_eq!(long.sum(), short.sum());
    }

    #[test]
    fn window_content_changes_hash() {
        let mut a = RollingHasher::new();
        let mut b = RollingHasher::new();
        a.roll(b"aaaaaaaa");
        b.roll(b"aaaaaaab");
        assert_ne!(a.sum(), b.sum());
    }

    #[test]
    fn boundary_occurs_at_expected_rate() {
        // With a 12-bit mask a boundary hits every ~4096 bytes on average.
        // 1 MiB of seeded random input gives ~256 expected hits; allow a
        // wide band so the assertion never flakes.
        let mut rng = StdRng::seed_from_u64(42);
        let mut hasher = RollingHasher::new();
        let mut hits = 0usize;
        for _ in 0..(1 << 20) {
            hasher.roll_byte(rng.gen());
            if hasher.hits_boundary() {
                hits += 1;
            }
        }
        assert!(hits > 64, "boundary rate far too low: {hits}");
        assert!(hits < 1024, "boundary rate far too high: {hits}");
    }

    #[test]
    fn byte_table_is_stable() {
        // The table is part of the chunk-boundary contract; hashes of stored
        // trees depend on it. Pin a few entries.
        assert_eq!(BYTE_TABLE[0], mix32(0x9e37_79b9));
        assert_eq!(BYTE_TABLE[255], mix32(255u32.wrapping_add(0x9e37_79b9)));
        let distinct: std::collections::HashSet<u32> = BYTE_TABLE.iter().copied().collect();
        assert_eq!(distinct.len(), 256);
    }
}
