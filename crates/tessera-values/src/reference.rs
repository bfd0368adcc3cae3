use std::fmt;

use serde::{Deserialize, Serialize};
use tessera_types::Hash;

use crate::kind::ValueKind;

/// A typed pointer to a value by content hash.
///
/// A ref never owns its target; it names it. The cached kind and height let
/// readers route through a tree without fetching the target first: height 0
/// points at a scalar, struct, or leaf sequence chunk, height `n >= 1` at a
/// meta sequence chunk of that level.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ref {
    hash: Hash,
    kind: ValueKind,
    height: u64,
}

impl Ref {
    pub fn new(hash: Hash, kind: ValueKind, height: u64) -> Self {
        Self { hash, kind, height }
    }

    /// Content hash of the target chunk.
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// Kind of the target value.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Tree height of the target: 0 for scalars, structs, and leaf chunks.
    pub fn height(&self) -> u64 {
        self.height
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ref({} {} h{})",
            self.kind,
            self.hash.short_hex(),
            self.height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Ref {
        Ref::new(Hash::of(b"target"), ValueKind::List, 2)
    }

    #[test]
    fn accessors() {
        let r = sample();
        assert_eq!(r.hash(), Hash::of(b"target"));
        assert_eq!(r.kind(), ValueKind::List);
        assert_eq!(r.height(), 2);
    }

    #[test]
    fn refs_to_same_target_are_equal() {
        assert_eq!(sample(), sample());
    }

    #[test]
    fn order_is_hash_first() {
        let a = Ref::new(Hash::from_raw([1; 32]), ValueKind::Set, 9);
        let b = Ref::new(Hash::from_raw([2; 32]), ValueKind::Bool, 0);
        assert!(a < b);
    }

    #[test]
    fn serde_roundtrip() {
        let r = sample();
        let json = serde_json::to_string(&r).unwrap();
        let back: Ref = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn debug_is_compact() {
        let r = sample();
        let rendered = format!("{r:?}");
        assert!(rendered.starts_with("Ref(list "));
        assert!(rendered.ends_with("h2)"));
    }
}
