use std::cmp::Ordering;

use tessera_types::Hash;

use crate::blob::Blob;
use crate::codec;
use crate::kind::ValueKind;
use crate::list::List;
use crate::map::Map;
use crate::reference::Ref;
use crate::set::Set;

/// A named record with field-name-sorted fields.
///
/// Field order is canonical: construction sorts by name and keeps the last
/// value for a repeated name, so equal structs always encode identically.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Struct {
    name: String,
    fields: Vec<(String, Value)>,
}

impl Struct {
    pub fn new(name: impl Into<String>, mut fields: Vec<(String, Value)>) -> Self {
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        let mut canonical: Vec<(String, Value)> = Vec::with_capacity(fields.len());
        for field in fields {
            match canonical.last_mut() {
                Some(last) if last.0 == field.0 => *last = field,
                _ => canonical.push(field),
            }
        }
        Self {
            name: name.into(),
            fields: canonical,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .binary_search_by(|(name, _)| name.as_str().cmp(field))
            .ok()
            .map(|i| &self.fields[i].1)
    }

    pub(crate) fn from_sorted_fields(name: String, fields: Vec<(String, Value)>) -> Self {
        Self { name, fields }
    }
}

/// A polymorphic value: scalar, ref, struct, or chunked collection.
///
/// Values form a closed set of kinds. Two values are equal exactly when
/// their encodings are equal; for the composite kinds that is checked via
/// the content hash, and floats compare by bit pattern so that equality
/// stays consistent with the total order.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Ref(Ref),
    Struct(Struct),
    List(List),
    Set(Set),
    Map(Map),
    Blob(Blob),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Uint(_) => ValueKind::Uint,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Ref(_) => ValueKind::Ref,
            Value::Struct(_) => ValueKind::Struct,
            Value::List(_) => ValueKind::List,
            Value::Set(_) => ValueKind::Set,
            Value::Map(_) => ValueKind::Map,
            Value::Blob(_) => ValueKind::Blob,
        }
    }

    /// Content hash of this value's encoding.
    pub fn hash(&self) -> Hash {
        Hash::of(&codec::encode_value(self))
    }

    /// Tree height of the chunk this value would occupy: the root level for
    /// collections, 0 for everything else.
    pub(crate) fn height(&self) -> u64 {
        match self {
            Value::List(l) => l.sequence().level(),
            Value::Set(s) => s.sequence().level(),
            Value::Map(m) => m.sequence().level(),
            Value::Blob(b) => b.sequence().level(),
            _ => 0,
        }
    }

    /// A ref naming this value.
    pub fn to_ref(&self) -> Ref {
        Ref::new(self.hash(), self.kind(), self.height())
    }

    /// Visit every ref directly embedded in this value's encoding, in
    /// encoding order. Does not descend into referenced chunks: a chunked
    /// collection reports its root's child refs, not its grandchildren.
    pub fn walk_refs(&self, visit: &mut dyn FnMut(&Ref)) {
        match self {
            Value::Ref(r) => visit(r),
            Value::Struct(s) => {
                for (_, value) in s.fields() {
                    value.walk_refs(visit);
                }
            }
            Value::List(l) => l.sequence().walk_refs(visit),
            Value::Set(s) => s.sequence().walk_refs(visit),
            Value::Map(m) => m.sequence().walk_refs(visit),
            Value::Blob(b) => b.sequence().walk_refs(visit),
            _ => {}
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::Uint(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Ref> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&Set> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Blob(a), Value::Blob(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Ord for Value {
    /// The total order used by sets, maps, and the edit layer: kind ordinal
    /// first, then natural order within scalar kinds, content-hash order for
    /// structs and collections.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Uint(a), Value::Uint(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Ref(a), Value::Ref(b)) => a.cmp(b),
            _ if self.kind() != other.kind() => self.kind().cmp(&other.kind()),
            _ => self.hash().cmp(&other.hash()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Ref> for Value {
    fn from(v: Ref) -> Self {
        Value::Ref(v)
    }
}

impl From<Struct> for Value {
    fn from(v: Struct) -> Self {
        Value::Struct(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(seed: &[u8]) -> Ref {
        Ref::new(Hash::of(seed), ValueKind::Bool, 0)
    }

    // -----------------------------------------------------------------------
    // Equality
    // -----------------------------------------------------------------------

    #[test]
    fn scalar_equality() {
        assert_eq!(Value::Null, Value::Null);
        assert_eq!(Value::Int(-3), Value::Int(-3));
        assert_ne!(Value::Int(3), Value::Uint(3));
        assert_eq!(Value::from("abc"), Value::String("abc".into()));
    }

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(Value::Float(1.5), Value::Float(1.5));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn struct_equality_ignores_field_arrival_order() {
        let a = Struct::new(
            "point",
            vec![("x".into(), Value::Int(1)), ("y".into(), Value::Int(2))],
        );
        let b = Struct::new(
            "point",
            vec![("y".into(), Value::Int(2)), ("x".into(), Value::Int(1))],
        );
        assert_eq!(Value::Struct(a), Value::Struct(b));
    }

    #[test]
    fn struct_duplicate_field_keeps_last() {
        let s = Struct::new(
            "s",
            vec![("f".into(), Value::Int(1)), ("f".into(), Value::Int(2))],
        );
        assert_eq!(s.fields().len(), 1);
        assert_eq!(s.get("f"), Some(&Value::Int(2)));
    }

    #[test]
    fn struct_get_missing_field() {
        let s = Struct::new("s", vec![("a".into(), Value::Bool(true))]);
        assert_eq!(s.get("b"), None);
    }

    // -----------------------------------------------------------------------
    // Ordering
    // -----------------------------------------------------------------------

    #[test]
    fn order_groups_by_kind_first() {
        assert!(Value::Null < Value::Bool(false));
        assert!(Value::Bool(true) < Value::Int(i64::MIN));
        assert!(Value::Int(i64::MAX) < Value::Uint(0));
        assert!(Value::String("zzz".into()) < Value::Ref(r(b"a")));
    }

    #[test]
    fn order_within_kind_is_natural() {
        assert!(Value::Int(-5) < Value::Int(3));
        assert!(Value::Uint(2) < Value::Uint(10));
        assert!(Value::Float(-1.0) < Value::Float(1.0));
        assert!(Value::from("abc") < Value::from("abd"));
        assert!(!(Value::Bool(true) < Value::Bool(false)));
    }

    #[test]
    fn ordering_is_consistent_with_equality() {
        let pairs = [
            (Value::Int(7), Value::Int(7)),
            (Value::Float(f64::NAN), Value::Float(f64::NAN)),
            (Value::from("k"), Value::from("k")),
        ];
        for (a, b) in pairs {
            assert_eq!(a.cmp(&b), Ordering::Equal);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn sort_is_deterministic_over_mixed_kinds() {
        let mut one = vec![
            Value::from("b"),
            Value::Int(2),
            Value::Null,
            Value::Bool(true),
            Value::from("a"),
        ];
        let mut two = one.clone();
        two.reverse();
        one.sort();
        two.sort();
        assert_eq!(one, two);
        assert_eq!(one[0], Value::Null);
    }

    // -----------------------------------------------------------------------
    // Hash and refs
    // -----------------------------------------------------------------------

    #[test]
    fn equal_values_share_a_hash() {
        assert_eq!(Value::Int(42).hash(), Value::Int(42).hash());
        assert_ne!(Value::Int(42).hash(), Value::Uint(42).hash());
    }

    #[test]
    fn to_ref_carries_kind() {
        let v = Value::from("hello");
        let vref = v.to_ref();
        assert_eq!(vref.kind(), ValueKind::String);
        assert_eq!(vref.height(), 0);
        assert_eq!(vref.hash(), v.hash());
    }

    #[test]
    fn walk_refs_on_scalar_ref() {
        let inner = r(b"target");
        let mut seen = Vec::new();
        Value::Ref(inner).walk_refs(&mut |x| seen.push(*x));
        assert_eq!(seen, vec![inner]);
    }

    #[test]
    fn walk_refs_visits_struct_fields_in_name_order() {
        let s = Struct::new(
            "s",
            vec![
                ("z".into(), Value::Ref(r(b"z"))),
                ("a".into(), Value::Ref(r(b"a"))),
            ],
        );
        let mut seen = Vec::new();
        Value::Struct(s).walk_refs(&mut |x| seen.push(*x));
        assert_eq!(seen, vec![r(b"a"), r(b"z")]);
    }

    #[test]
    fn values_are_send_and_sync() {
        fn check<T: Send + Sync>() {}
        check::<Value>();
        check::<Struct>();
        check::<Ref>();
    }
}
