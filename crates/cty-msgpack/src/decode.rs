//! Msgpack to value decoding

use crate::{MSGPACK_EXT_REFINED_UNKNOWN, MSGPACK_EXT_UNKNOWN};
use cty_diagnostics::{CtyError, CtyPath, PathStep, Result};
use cty_types::{
    CtyType, CtyValue, NativeValue, NumberError, Payload, Validator, decimal_from_f64, parse_decimal,
};
use log::trace;
use rmp::Marker;
use rmpv::Value;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

pub(crate) fn decode(bytes: &[u8], schema: &CtyType, max_depth: usize) -> Result<CtyValue> {
    check_nesting(bytes, max_depth)?;
    // Each container level costs the reader two frames, a leaf up to three
    let reader_depth = max_depth.saturating_add(2).saturating_mul(2);
    let mut rest = bytes;
    let wire = rmpv::decode::read_value_with_max_depth(&mut rest, reader_depth).map_err(|e| match e {
        rmpv::decode::Error::DepthLimitExceeded => CtyError::recursion_limit(max_depth, CtyPath::root()),
        other => CtyError::malformed(format!("Invalid msgpack data: {other}")),
    })?;
    if !rest.is_empty() {
        return Err(CtyError::malformed(format!(
            "{} trailing bytes after msgpack value",
            rest.len()
        )));
    }
    Decoder { max_depth }.node(&wire, schema, 0)
}

/// Walk the framing of the first value without recursion and fail once
/// containers nest deeper than `max_depth`
fn check_nesting(bytes: &[u8], max_depth: usize) -> Result<()> {
    let mut rest = bytes;
    // Items still to read in each open container
    let mut open: Vec<u64> = Vec::new();
    loop {
        let [marker, tail @ ..] = rest else {
            return Err(CtyError::malformed("Invalid msgpack data: unexpected end of input"));
        };
        rest = tail;
        let (skip, children) = match Marker::from_u8(*marker) {
            Marker::FixArray(n) => (0, u64::from(n)),
            Marker::Array16 => (0, read_len(&mut rest, 2)?),
            Marker::Array32 => (0, read_len(&mut rest, 4)?),
            Marker::FixMap(n) => (0, 2 * u64::from(n)),
            Marker::Map16 => (0, 2 * read_len(&mut rest, 2)?),
            Marker::Map32 => (0, 2 * read_len(&mut rest, 4)?),
            Marker::FixStr(n) => (u64::from(n), 0),
            Marker::Str8 | Marker::Bin8 => (read_len(&mut rest, 1)?, 0),
            Marker::Str16 | Marker::Bin16 => (read_len(&mut rest, 2)?, 0),
            Marker::Str32 | Marker::Bin32 => (read_len(&mut rest, 4)?, 0),
            Marker::Ext8 => (read_len(&mut rest, 1)? + 1, 0),
            Marker::Ext16 => (read_len(&mut rest, 2)? + 1, 0),
            Marker::Ext32 => (read_len(&mut rest, 4)? + 1, 0),
            Marker::FixExt1 => (2, 0),
            Marker::FixExt2 => (3, 0),
            Marker::FixExt4 => (5, 0),
            Marker::FixExt8 => (9, 0),
            Marker::FixExt16 => (17, 0),
            Marker::U8 | Marker::I8 => (1, 0),
            Marker::U16 | Marker::I16 => (2, 0),
            Marker::U32 | Marker::I32 | Marker::F32 => (4, 0),
            Marker::U64 | Marker::I64 | Marker::F64 => (8, 0),
            Marker::FixPos(_)
            | Marker::FixNeg(_)
            | Marker::Null
            | Marker::True
            | Marker::False
            | Marker::Reserved => (0, 0),
        };
        take(&mut rest, skip)?;

        if children > 0 {
            open.push(children);
            if open.len() > max_depth {
                return Err(CtyError::recursion_limit(max_depth, CtyPath::root()));
            }
            continue;
        }
        // The item is complete; close every container it finishes
        while let Some(remaining) = open.last_mut() {
            *remaining -= 1;
            if *remaining > 0 {
                break;
            }
            open.pop();
        }
        if open.is_empty() {
            return Ok(());
        }
    }
}

fn take<'a>(rest: &mut &'a [u8], len: u64) -> Result<&'a [u8]> {
    let len = usize::try_from(len)
        .ok()
        .filter(|len| *len <= rest.len())
        .ok_or_else(|| CtyError::malformed("Invalid msgpack data: unexpected end of input"))?;
    let (head, tail) = rest.split_at(len);
    *rest = tail;
    Ok(head)
}

fn read_len(rest: &mut &[u8], width: u64) -> Result<u64> {
    Ok(take(rest, width)?
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)))
}

/// Short name of a wire value's msgpack family
fn wire_kind(value: &Value) -> &'static str {
    match value {
        Value::Nil => "nil",
        Value::Boolean(_) => "bool",
        Value::Integer(_) => "int",
        Value::F32(_) | Value::F64(_) => "float",
        Value::String(_) => "str",
        Value::Binary(_) => "bin",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Ext(..) => "ext",
    }
}

fn mismatch(wire: &Value, schema: &CtyType) -> CtyError {
    CtyError::schema_mismatch(format!("msgpack {}", wire_kind(wire)), schema)
}

fn utf8(value: &rmpv::Utf8String) -> Result<String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| CtyError::malformed("msgpack string is not valid UTF-8"))
}

struct Decoder {
    max_depth: usize,
}

impl Decoder {
    fn node(&self, wire: &Value, schema: &CtyType, depth: usize) -> Result<CtyValue> {
        if depth > self.max_depth {
            return Err(CtyError::recursion_limit(self.max_depth, CtyPath::root()));
        }
        match wire {
            Value::Nil => return Ok(CtyValue::null(schema.clone())),
            Value::Ext(code, _) if *code == MSGPACK_EXT_UNKNOWN || *code == MSGPACK_EXT_REFINED_UNKNOWN => {
                return Ok(CtyValue::unknown(schema.clone()));
            }
            Value::Ext(code, _) => {
                return Err(CtyError::unsupported_wire(format!(
                    "Unsupported msgpack extension type {code}"
                )));
            }
            Value::Array(_) if !schema.is_dynamic() => {
                if let Some((encoded, inner)) = typed_envelope(wire) {
                    return self.envelope(&encoded, inner, schema, depth);
                }
                if !accepts_array(schema) {
                    return Err(mismatch(wire, schema));
                }
            }
            _ => {}
        }

        match schema {
            CtyType::Dynamic => self.dynamic(wire, depth),
            CtyType::String => match wire {
                Value::String(s) => Ok(CtyValue::string(utf8(s)?)),
                _ => Err(mismatch(wire, schema)),
            },
            CtyType::Number => self.number(wire).map(CtyValue::number),
            CtyType::Bool => match wire {
                Value::Boolean(b) => Ok(CtyValue::bool(*b)),
                _ => Err(mismatch(wire, schema)),
            },
            CtyType::List(elem) | CtyType::Set(elem) => {
                let Value::Array(items) = wire else {
                    return Err(mismatch(wire, schema));
                };
                let items = self.sequence(items.iter().map(|item| (item, elem.as_ref())), depth)?;
                if matches!(schema, CtyType::Set(_)) {
                    CtyValue::set(elem.as_ref().clone(), items)
                } else {
                    CtyValue::list(elem.as_ref().clone(), items)
                }
            }
            CtyType::Tuple(elems) => {
                let Value::Array(items) = wire else {
                    return Err(mismatch(wire, schema));
                };
                if items.len() != elems.len() {
                    return Err(CtyError::schema_mismatch(
                        format!("array of {} elements", items.len()),
                        schema,
                    ));
                }
                let items = self.sequence(items.iter().zip(elems), depth)?;
                CtyValue::known(schema.clone(), Payload::Tuple(items))
            }
            CtyType::Map(elem) => {
                let Value::Map(entries) = wire else {
                    return Err(mismatch(wire, schema));
                };
                let mut out = BTreeMap::new();
                for (key, item) in entries {
                    let key = self.key(key, schema)?;
                    let value = self
                        .node(item, elem, depth + 1)
                        .map_err(|e| e.at(PathStep::key(key.as_str())))?;
                    out.insert(key, value);
                }
                CtyValue::known(schema.clone(), Payload::Map(out))
            }
            CtyType::Object(obj) => {
                let Value::Map(entries) = wire else {
                    return Err(mismatch(wire, schema));
                };
                let mut attrs = BTreeMap::new();
                for (key, item) in entries {
                    let name = self.key(key, schema)?;
                    let Some(attr_ty) = obj.attribute_type(&name) else {
                        return Err(CtyError::schema_mismatch(
                            format!("object with attribute '{name}'"),
                            schema,
                        ));
                    };
                    let value = self
                        .node(item, attr_ty, depth + 1)
                        .map_err(|e| e.at(PathStep::attr(name.as_str())))?;
                    attrs.insert(name, value);
                }
                for (name, attr_ty) in obj.attributes() {
                    if attrs.contains_key(name) {
                        continue;
                    }
                    if !obj.is_optional(name) {
                        return Err(CtyError::schema_mismatch(
                            format!("object without attribute '{name}'"),
                            schema,
                        ));
                    }
                    attrs.insert(name.clone(), CtyValue::null(attr_ty.clone()));
                }
                CtyValue::known(schema.clone(), Payload::Object(attrs))
            }
            CtyType::Capsule(capsule) => Err(CtyError::unsupported_wire(format!(
                "Capsule type {} has no wire representation",
                capsule.name()
            ))),
        }
    }

    fn number(&self, wire: &Value) -> Result<Decimal> {
        let parsed = match wire {
            Value::Integer(i) => i
                .as_i64()
                .map(Decimal::from)
                .or_else(|| i.as_u64().map(Decimal::from))
                .ok_or(NumberError::Invalid),
            Value::F64(f) => decimal_from_f64(*f),
            Value::F32(f) => decimal_from_f64(f64::from(*f)),
            Value::String(s) => parse_decimal(&utf8(s)?),
            Value::Binary(b) => std::str::from_utf8(b).map_or(Err(NumberError::Invalid), parse_decimal),
            _ => return Err(mismatch(wire, &CtyType::Number)),
        };
        parsed.map_err(|e| match e {
            NumberError::Invalid => {
                CtyError::schema_mismatch(format!("msgpack {} {wire}", wire_kind(wire)), CtyType::Number)
            }
            NumberError::NotRepresentable => CtyError::unsupported_wire(format!(
                "Encoded number {wire} cannot be represented exactly"
            )),
        })
    }

    fn key(&self, key: &Value, schema: &CtyType) -> Result<String> {
        match key {
            Value::String(s) => utf8(s),
            other => Err(CtyError::schema_mismatch(
                format!("map key of msgpack {}", wire_kind(other)),
                schema,
            )),
        }
    }

    fn sequence<'a>(
        &self,
        items: impl Iterator<Item = (&'a Value, &'a CtyType)>,
        depth: usize,
    ) -> Result<Vec<CtyValue>> {
        items
            .enumerate()
            .map(|(i, (item, ty))| {
                self.node(item, ty, depth + 1)
                    .map_err(|e| e.at(PathStep::index(i)))
            })
            .collect()
    }

    /// Decode a value at a dynamic schema position
    fn dynamic(&self, wire: &Value, depth: usize) -> Result<CtyValue> {
        if let Some((type_json, inner)) = envelope_parts(wire) {
            if let Ok(spec) = serde_json::from_slice::<serde_json::Value>(type_json) {
                let ty = CtyType::from_type_spec(&spec)?;
                trace!("decoding dynamic envelope for {ty}");
                let value = self.node(inner, &ty, depth + 1)?;
                return Ok(CtyValue::dynamic(value));
            }
            trace!("dynamic payload has no readable type, inferring");
        }
        let native = self.native(wire, depth)?;
        let remaining = self.max_depth.saturating_sub(depth);
        Validator::new()
            .with_max_depth(remaining)
            .validate(&CtyType::Dynamic, native)
    }

    /// A concrete schema received a dynamic envelope
    fn envelope(
        &self,
        encoded: &CtyType,
        inner: &Value,
        schema: &CtyType,
        depth: usize,
    ) -> Result<CtyValue> {
        if !encoded.usable_as(schema) {
            return Err(CtyError::schema_mismatch(encoded, schema));
        }
        trace!("decoding dynamic envelope for {encoded} as {schema}");
        self.node(inner, schema, depth + 1)
    }

    /// Plain msgpack data for inference
    fn native(&self, wire: &Value, depth: usize) -> Result<NativeValue> {
        if depth > self.max_depth {
            return Err(CtyError::recursion_limit(self.max_depth, CtyPath::root()));
        }
        Ok(match wire {
            Value::Nil => NativeValue::Null,
            Value::Boolean(b) => NativeValue::Bool(*b),
            Value::Integer(i) => match i.as_i64() {
                Some(n) => NativeValue::Int(n),
                None => i.as_u64().map_or(NativeValue::Null, NativeValue::UInt),
            },
            Value::F32(f) => NativeValue::Float(f64::from(*f)),
            Value::F64(f) => NativeValue::Float(*f),
            Value::String(s) => NativeValue::String(utf8(s)?),
            Value::Binary(b) => NativeValue::Bytes(b.clone()),
            Value::Array(items) => NativeValue::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.native(item, depth + 1)
                            .map_err(|e| e.at(PathStep::index(i)))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Map(entries) => NativeValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| -> Result<(NativeValue, NativeValue)> {
                        Ok((self.native(k, depth + 1)?, self.native(v, depth + 1)?))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Ext(code, _) if *code == MSGPACK_EXT_UNKNOWN || *code == MSGPACK_EXT_REFINED_UNKNOWN => {
                NativeValue::Unknown
            }
            Value::Ext(code, _) => {
                return Err(CtyError::unsupported_wire(format!(
                    "Unsupported msgpack extension type {code}"
                )));
            }
        })
    }
}

fn accepts_array(schema: &CtyType) -> bool {
    matches!(
        schema,
        CtyType::Dynamic | CtyType::List(_) | CtyType::Set(_) | CtyType::Tuple(_)
    )
}

/// An envelope whose first element reads as a type; sequences of plain data
/// never start with a type description
fn typed_envelope(wire: &Value) -> Option<(CtyType, &Value)> {
    let (type_json, inner) = envelope_parts(wire)?;
    let json = std::str::from_utf8(type_json).ok()?;
    let encoded = CtyType::from_type_json(json).ok()?;
    Some((encoded, inner))
}

/// Split `[bin, value]` into its parts
fn envelope_parts(wire: &Value) -> Option<(&[u8], &Value)> {
    match wire {
        Value::Array(items) if items.len() == 2 => match &items[0] {
            Value::Binary(type_json) => Some((type_json.as_slice(), &items[1])),
            _ => None,
        },
        _ => None,
    }
}
