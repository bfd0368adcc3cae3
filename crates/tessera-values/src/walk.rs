//! Ref extraction straight from encoded chunk bytes.
//!
//! [`walk_refs`] scans an encoded value and reports every ref it contains
//! without building a [`Value`](crate::Value) tree and without touching a
//! store. Garbage collection and replication walk the chunk graph this way:
//! read a chunk, collect its outgoing refs, fetch those chunks, repeat.
//!
//! The scanner validates exactly what the decoder validates, so any chunk
//! it accepts would also decode. Refs are reported in encoding order, which
//! matches the order [`Value::walk_refs`](crate::Value::walk_refs) visits
//! them on the decoded value.

use crate::codec::Decoder;
use crate::error::{ValueError, ValueResult};
use crate::kind::ValueKind;
use crate::reference::Ref;

/// Scans `data` as one encoded value and calls `visit` for every ref in it,
/// in encoding order. Only refs stored directly in these bytes are reported;
/// the scanner never fetches child chunks.
pub fn walk_refs(data: &[u8], visit: &mut dyn FnMut(&Ref)) -> ValueResult<()> {
    let mut dec = Decoder::new(data);
    scan_value(&mut dec, visit)?;
    if !dec.is_done() {
        return Err(ValueError::Decode {
            offset: dec.position(),
            reason: "trailing bytes after value".into(),
        });
    }
    Ok(())
}

/// Convenience wrapper over [`walk_refs`] that gathers the refs into a vec.
pub fn collect_refs(data: &[u8]) -> ValueResult<Vec<Ref>> {
    let mut refs = Vec::new();
    walk_refs(data, &mut |r| refs.push(*r))?;
    Ok(refs)
}

fn scan_value(dec: &mut Decoder<'_>, visit: &mut dyn FnMut(&Ref)) -> ValueResult<()> {
    dec.descend()?;
    let result = scan_value_inner(dec, visit);
    dec.ascend();
    result
}

fn scan_value_inner(dec: &mut Decoder<'_>, visit: &mut dyn FnMut(&Ref)) -> ValueResult<()> {
    let kind = dec.read_kind()?;
    match kind {
        ValueKind::Null => Ok(()),
        ValueKind::Bool => match dec.read_u8()? {
            0 | 1 => Ok(()),
            _ => Err(dec.fail("invalid bool byte")),
        },
        ValueKind::Int => dec.read_zigzag().map(|_| ()),
        ValueKind::Uint => dec.read_varint().map(|_| ()),
        ValueKind::Float => dec.read_bytes(8).map(|_| ()),
        ValueKind::String => dec.read_str().map(|_| ()),
        ValueKind::Ref => {
            let reference = dec.read_ref_body()?;
            visit(&reference);
            Ok(())
        }
        ValueKind::Struct => scan_struct(dec, visit),
        ValueKind::List | ValueKind::Set | ValueKind::Map | ValueKind::Blob => {
            scan_sequence(dec, kind, visit)
        }
    }
}

fn scan_struct(dec: &mut Decoder<'_>, visit: &mut dyn FnMut(&Ref)) -> ValueResult<()> {
    dec.read_str()?;
    let count = dec.read_len()?;
    let mut prev: Option<&str> = None;
    for _ in 0..count {
        let name = dec.read_str()?;
        if let Some(p) = prev {
            if p >= name {
                return Err(dec.fail("struct fields out of order"));
            }
        }
        prev = Some(name);
        scan_value(dec, visit)?;
    }
    Ok(())
}

fn scan_sequence(
    dec: &mut Decoder<'_>,
    kind: ValueKind,
    visit: &mut dyn FnMut(&Ref),
) -> ValueResult<()> {
    let level = dec.read_varint()?;
    let count = dec.read_len()?;
    if level == 0 {
        match kind {
            ValueKind::Blob => dec.read_bytes(count).map(|_| ()),
            ValueKind::Map => {
                for _ in 0..count {
                    scan_value(dec, visit)?;
                    scan_value(dec, visit)?;
                }
                Ok(())
            }
            _ => {
                for _ in 0..count {
                    scan_value(dec, visit)?;
                }
                Ok(())
            }
        }
    } else {
        if count == 0 {
            return Err(dec.fail("meta node with no children"));
        }
        // Meta entries hold refs by construction; anything else is corrupt.
        for _ in 0..count {
            if dec.read_kind()? != ValueKind::Ref {
                return Err(dec.fail("meta entry is not a ref"));
            }
            let child = dec.read_ref_body()?;
            visit(&child);
            dec.read_varint()?;
        }
        Ok(())
    }
}
