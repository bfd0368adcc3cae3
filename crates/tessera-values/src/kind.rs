use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of value kinds. The discriminant doubles as the wire tag,
/// and the tag ordinal is the first key of the total order over values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValueKind {
    Null = 0x00,
    Bool = 0x01,
    Int = 0x02,
    Uint = 0x03,
    Float = 0x04,
    String = 0x05,
    Blob = 0x06,
    List = 0x07,
    Map = 0x08,
    Set = 0x09,
    Ref = 0x0a,
    Struct = 0x0b,
}

impl ValueKind {
    /// The wire tag for this kind.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Look up a kind by wire tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x00 => Some(Self::Null),
            0x01 => Some(Self::Bool),
            0x02 => Some(Self::Int),
            0x03 => Some(Self::Uint),
            0x04 => Some(Self::Float),
            0x05 => Some(Self::String),
            0x06 => Some(Self::Blob),
            0x07 => Some(Self::List),
            0x08 => Some(Self::Map),
            0x09 => Some(Self::Set),
            0x0a => Some(Self::Ref),
            0x0b => Some(Self::Struct),
            _ => None,
        }
    }

    /// True for the four chunked collection kinds.
    pub fn is_collection(self) -> bool {
        matches!(self, Self::Blob | Self::List | Self::Map | Self::Set)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Float => "float",
            Self::String => "string",
            Self::Blob => "blob",
            Self::List => "list",
            Self::Map => "map",
            Self::Set => "set",
            Self::Ref => "ref",
            Self::Struct => "struct",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_roundtrip_all_kinds() {
        let kinds = [
            ValueKind::Null,
            ValueKind::Bool,
            ValueKind::Int,
            ValueKind::Uint,
            ValueKind::Float,
            ValueKind::String,
            ValueKind::Blob,
            ValueKind::List,
            ValueKind::Map,
            ValueKind::Set,
            ValueKind::Ref,
            ValueKind::Struct,
        ];
        for kind in kinds {
            assert_eq!(ValueKind::from_tag(kind.tag()), Some(kind));
        }
    }

    #[test]
    fn unknown_tag_is_none() {
        assert_eq!(ValueKind::from_tag(0x0c), None);
        assert_eq!(ValueKind::from_tag(0xff), None);
    }

    #[test]
    fn collection_kinds() {
        assert!(ValueKind::List.is_collection());
        assert!(ValueKind::Set.is_collection());
        assert!(ValueKind::Map.is_collection());
        assert!(ValueKind::Blob.is_collection());
        assert!(!ValueKind::Int.is_collection());
        assert!(!ValueKind::Struct.is_collection());
        assert!(!ValueKind::Ref.is_collection());
    }

    #[test]
    fn kind_order_follows_tag_order() {
        assert!(ValueKind::Null < ValueKind::Bool);
        assert!(ValueKind::Bool < ValueKind::Int);
        assert!(ValueKind::String < ValueKind::Blob);
        assert!(ValueKind::Ref < ValueKind::Struct);
    }

    #[test]
    fn serde_roundtrip() {
        let json = serde_json::to_string(&ValueKind::Map).unwrap();
        let back: ValueKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ValueKind::Map);
    }
}
