//! Binary encoding of values.
//!
//! One chunk holds exactly one encoded value. The grammar is a one-byte kind
//! tag followed by a kind-specific payload; lengths and counts are LEB128
//! varints. Collections encode their root sequence node: leaf nodes carry
//! items inline, meta nodes carry full ref values plus cumulative counts, so
//! a scanner can enumerate embedded refs without materializing anything.
//!
//! Encoding is canonical: struct fields are name-sorted, map leafs are
//! key-sorted, floats are raw IEEE bits. Equal values therefore produce
//! equal bytes, which is what content addressing relies on.

use bytes::Bytes;
use tessera_types::{Hash, HASH_LEN};

use crate::error::{ValueError, ValueResult};
use crate::kind::ValueKind;
use crate::reference::Ref;
use crate::sequence::{MapEntry, MetaTuple, Sequence, SequenceItems};
use crate::store::ValueStore;
use crate::value::{Struct, Value};

/// Decode recursion limit. Chunks are bounded, so honest data never gets
/// close; this caps stack use on adversarial input.
const MAX_DEPTH: usize = 128;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a value to its canonical chunk bytes.
pub fn encode_value(value: &Value) -> Bytes {
    let mut buf = Vec::new();
    write_value(&mut buf, value);
    Bytes::from(buf)
}

/// Encode a sequence node as a standalone collection chunk.
pub(crate) fn encode_collection(seq: &Sequence) -> Bytes {
    let mut buf = Vec::new();
    write_sequence(&mut buf, seq);
    Bytes::from(buf)
}

pub(crate) fn write_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.push(ValueKind::Null.tag()),
        Value::Bool(b) => {
            buf.push(ValueKind::Bool.tag());
            buf.push(u8::from(*b));
        }
        Value::Int(i) => {
            buf.push(ValueKind::Int.tag());
            write_varint(buf, zigzag(*i));
        }
        Value::Uint(u) => {
            buf.push(ValueKind::Uint.tag());
            write_varint(buf, *u);
        }
        Value::Float(f) => {
            buf.push(ValueKind::Float.tag());
            buf.extend_from_slice(&f.to_bits().to_be_bytes());
        }
        Value::String(s) => {
            buf.push(ValueKind::String.tag());
            write_string(buf, s);
        }
        Value::Ref(r) => write_ref(buf, r),
        Value::Struct(s) => write_struct(buf, s),
        Value::List(l) => write_sequence(buf, l.sequence()),
        Value::Set(s) => write_sequence(buf, s.sequence()),
        Value::Map(m) => write_sequence(buf, m.sequence()),
        Value::Blob(b) => write_sequence(buf, b.sequence()),
    }
}

fn write_ref(buf: &mut Vec<u8>, r: &Ref) {
    buf.push(ValueKind::Ref.tag());
    buf.extend_from_slice(r.hash().as_bytes());
    buf.push(r.kind().tag());
    write_varint(buf, r.height());
}

fn write_struct(buf: &mut Vec<u8>, s: &Struct) {
    buf.push(ValueKind::Struct.tag());
    write_string(buf, s.name());
    write_varint(buf, s.fields().len() as u64);
    for (name, value) in s.fields() {
        write_string(buf, name);
        write_value(buf, value);
    }
}

fn write_sequence(buf: &mut Vec<u8>, seq: &Sequence) {
    buf.push(seq.kind().tag());
    write_varint(buf, seq.level());
    match seq.items() {
        SequenceItems::Values(values) => {
            write_varint(buf, values.len() as u64);
            for v in values {
                write_value(buf, v);
            }
        }
        SequenceItems::Entries(entries) => {
            write_varint(buf, entries.len() as u64);
            for e in entries {
                write_value(buf, &e.key);
                write_value(buf, &e.value);
            }
        }
        SequenceItems::Bytes(bytes) => {
            write_varint(buf, bytes.len() as u64);
            buf.extend_from_slice(bytes);
        }
        SequenceItems::Meta(tuples) => {
            write_varint(buf, tuples.len() as u64);
            for t in tuples {
                write_ref(buf, &t.child);
                write_varint(buf, t.cumulative);
            }
        }
    }
}

pub(crate) fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

pub(crate) fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_varint(buf, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode one value from chunk bytes. The entire input must be consumed.
pub fn decode_value(data: &[u8], store: &ValueStore) -> ValueResult<Value> {
    let mut dec = Decoder::new(data);
    let value = dec.read_value(store)?;
    if !dec.is_done() {
        return Err(ValueError::Decode {
            offset: dec.position(),
            reason: "trailing bytes after value".into(),
        });
    }
    Ok(value)
}

/// Positional reader over encoded chunk bytes.
pub(crate) struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn is_done(&self) -> bool {
        self.pos == self.data.len()
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn fail(&self, reason: impl Into<String>) -> ValueError {
        ValueError::Decode {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    pub(crate) fn descend(&mut self) -> ValueResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.fail("nesting too deep"));
        }
        Ok(())
    }

    pub(crate) fn ascend(&mut self) {
        self.depth -= 1;
    }

    pub(crate) fn read_u8(&mut self) -> ValueResult<u8> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    pub(crate) fn read_bytes(&mut self, n: usize) -> ValueResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(self.fail("unexpected end of input"));
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_exact<const N: usize>(&mut self) -> ValueResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub(crate) fn read_varint(&mut self) -> ValueResult<u64> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift >= 64 {
                return Err(self.fail("varint overflow"));
            }
        }
    }

    pub(crate) fn read_zigzag(&mut self) -> ValueResult<i64> {
        Ok(unzigzag(self.read_varint()?))
    }

    pub(crate) fn read_len(&mut self) -> ValueResult<usize> {
        let len = self.read_varint()?;
        match usize::try_from(len) {
            Ok(len) if len <= self.remaining() => Ok(len),
            _ => Err(self.fail(format!("length {len} exceeds input"))),
        }
    }

    /// Borrowed form of [`read_string`](Self::read_string); the scanner uses
    /// it to validate without allocating.
    pub(crate) fn read_str(&mut self) -> ValueResult<&'a str> {
        let len = self.read_len()?;
        let start = self.pos;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes).map_err(|_| ValueError::Decode {
            offset: start,
            reason: "invalid utf-8 in string".into(),
        })
    }

    pub(crate) fn read_string(&mut self) -> ValueResult<String> {
        Ok(self.read_str()?.to_owned())
    }

    pub(crate) fn read_kind(&mut self) -> ValueResult<ValueKind> {
        let tag = self.read_u8()?;
        ValueKind::from_tag(tag).ok_or(ValueError::Decode {
            offset: self.pos - 1,
            reason: format!("unknown value tag {tag:#04x}"),
        })
    }

    pub(crate) fn read_hash(&mut self) -> ValueResult<Hash> {
        Ok(Hash::from_raw(self.read_exact::<HASH_LEN>()?))
    }

    /// Read a ref payload. The caller has already consumed the tag.
    pub(crate) fn read_ref_body(&mut self) -> ValueResult<Ref> {
        let hash = self.read_hash()?;
        let kind = self.read_kind()?;
        let height = self.read_varint()?;
        Ok(Ref::new(hash, kind, height))
    }

    pub(crate) fn read_value(&mut self, store: &ValueStore) -> ValueResult<Value> {
        self.descend()?;
        let result = self.read_value_inner(store);
        self.ascend();
        result
    }

    fn read_value_inner(&mut self, store: &ValueStore) -> ValueResult<Value> {
        let kind = self.read_kind()?;
        match kind {
            ValueKind::Null => Ok(Value::Null),
            ValueKind::Bool => match self.read_u8()? {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                b => Err(self.fail(format!("invalid bool byte {b:#04x}"))),
            },
            ValueKind::Int => Ok(Value::Int(self.read_zigzag()?)),
            ValueKind::Uint => Ok(Value::Uint(self.read_varint()?)),
            ValueKind::Float => {
                let raw = self.read_exact::<8>()?;
                Ok(Value::Float(f64::from_bits(u64::from_be_bytes(raw))))
            }
            ValueKind::String => Ok(Value::String(self.read_string()?)),
            ValueKind::Ref => Ok(Value::Ref(self.read_ref_body()?)),
            ValueKind::Struct => self.read_struct(store),
            ValueKind::List | ValueKind::Set | ValueKind::Map | ValueKind::Blob => {
                let seq = self.read_sequence_body(kind, store)?;
                Ok(crate::store::sequence_value(store, seq))
            }
        }
    }

    fn read_struct(&mut self, store: &ValueStore) -> ValueResult<Value> {
        let name = self.read_string()?;
        let count = self.read_len()?;
        let mut fields: Vec<(String, Value)> = Vec::new();
        for _ in 0..count {
            let field_name = self.read_string()?;
            if let Some((prev, _)) = fields.last() {
                if *prev >= field_name {
                    return Err(self.fail(format!("struct field {field_name:?} out of order")));
                }
            }
            let value = self.read_value(store)?;
            fields.push((field_name, value));
        }
        Ok(Value::Struct(Struct::from_sorted_fields(name, fields)))
    }

    fn read_sequence_body(
        &mut self,
        kind: ValueKind,
        store: &ValueStore,
    ) -> ValueResult<Sequence> {
        let level = self.read_varint()?;
        let count = self.read_len()?;
        let seq = if level == 0 {
            match kind {
                ValueKind::Blob => Sequence::new_leaf_bytes(self.read_bytes(count)?.to_vec()),
                ValueKind::Map => {
                    let mut entries = Vec::new();
                    for _ in 0..count {
                        let key = self.read_value(store)?;
                        let value = self.read_value(store)?;
                        entries.push(MapEntry::new(key, value));
                    }
                    Sequence::new_leaf_entries(entries)
                }
                ValueKind::List | ValueKind::Set => {
                    let mut values = Vec::new();
                    for _ in 0..count {
                        values.push(self.read_value(store)?);
                    }
                    Sequence::new_leaf_values(kind, values)
                }
                _ => return Err(self.fail(format!("{kind} is not a sequence kind"))),
            }
        } else {
            if count == 0 {
                return Err(self.fail("meta node with no children"));
            }
            let mut tuples = Vec::new();
            for _ in 0..count {
                let tag = self.read_kind()?;
                if tag != ValueKind::Ref {
                    return Err(self.fail("meta child must be a ref"));
                }
                let child = self.read_ref_body()?;
                let cumulative = self.read_varint()?;
                tuples.push(MetaTuple { child, cumulative });
            }
            Sequence::new_meta(kind, level, tuples)
        };
        seq.check()?;
        Ok(seq)
    }
}
