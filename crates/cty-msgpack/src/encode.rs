//! Value to msgpack encoding

use crate::MSGPACK_EXT_UNKNOWN;
use cty_diagnostics::{CtyError, CtyPath, PathStep, Result};
use cty_types::{CtyType, CtyValue, Payload, ValueState};
use log::trace;
use rmpv::Value;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use unicode_normalization::{UnicodeNormalization, is_nfc};

pub(crate) fn encode(value: &CtyValue, schema: &CtyType, max_depth: usize) -> Result<Vec<u8>> {
    let wire = Encoder { max_depth }.node(value, schema, 0)?;
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &wire)
        .map_err(|e| CtyError::serialization(format!("Failed to write msgpack: {e}")))?;
    Ok(buf)
}

struct Encoder {
    max_depth: usize,
}

impl Encoder {
    fn node(&self, value: &CtyValue, schema: &CtyType, depth: usize) -> Result<Value> {
        if depth > self.max_depth {
            return Err(CtyError::recursion_limit(self.max_depth, CtyPath::root()));
        }
        match value.state() {
            ValueState::Null => return Ok(Value::Nil),
            ValueState::Unknown(_) => return Ok(Value::Ext(MSGPACK_EXT_UNKNOWN, vec![0])),
            ValueState::Known(_) => {}
        }

        if schema.is_dynamic() {
            return self.envelope(value.inner_dynamic(), depth);
        }

        let value = value.inner_dynamic();
        if value.ty() != schema {
            return Err(CtyError::serialization(format!(
                "Value of type {} cannot be encoded as {schema}",
                value.ty()
            )));
        }
        // Re-check the state: a dynamic wrapper may carry a null or unknown
        let Some(payload) = value.payload() else {
            return self.node(value, schema, depth);
        };

        match (schema, payload) {
            (CtyType::String, Payload::String(s)) => Ok(Value::from(nfc(s))),
            (CtyType::Number, Payload::Number(n)) => Ok(number(*n)),
            (CtyType::Bool, Payload::Bool(b)) => Ok(Value::Boolean(*b)),
            (CtyType::List(elem) | CtyType::Set(elem), Payload::List(items) | Payload::Set(items)) => {
                self.sequence(items.iter().map(|v| (v, elem.as_ref())), depth)
            }
            (CtyType::Tuple(elems), Payload::Tuple(items)) => {
                self.sequence(items.iter().zip(elems), depth)
            }
            (CtyType::Map(elem), Payload::Map(entries)) => {
                let mut out = Vec::with_capacity(entries.len());
                for (key, item) in entries {
                    let encoded = self
                        .node(item, elem, depth + 1)
                        .map_err(|e| e.at(PathStep::key(key.as_str())))?;
                    out.push((Value::from(nfc(key)), encoded));
                }
                Ok(Value::Map(out))
            }
            (CtyType::Object(obj), Payload::Object(attrs)) => {
                let mut out = Vec::with_capacity(attrs.len());
                for (name, attr_ty) in obj.attributes() {
                    let Some(item) = attrs.get(name) else {
                        return Err(CtyError::serialization(format!(
                            "Object value is missing attribute '{name}'"
                        )));
                    };
                    let encoded = self
                        .node(item, attr_ty, depth + 1)
                        .map_err(|e| e.at(PathStep::attr(name.as_str())))?;
                    out.push((Value::from(name.as_str()), encoded));
                }
                Ok(Value::Map(out))
            }
            (CtyType::Capsule(capsule), _) => Err(CtyError::serialization(format!(
                "Capsule type {} has no wire representation",
                capsule.name()
            ))),
            _ => Err(CtyError::type_mismatch(format!(
                "Value of type {schema} has an inconsistent internal representation"
            ))),
        }
    }

    /// Encode `[type json, value]` for a dynamic schema position
    fn envelope(&self, value: &CtyValue, depth: usize) -> Result<Value> {
        let ty = value.ty();
        let type_json = ty.to_type_json().map_err(|e| {
            CtyError::serialization(format!("Cannot describe type {ty} on the wire: {e}"))
        })?;
        trace!("encoding dynamic envelope for {ty}");
        let inner = self.node(value, ty, depth + 1)?;
        Ok(Value::Array(vec![Value::Binary(type_json.into_bytes()), inner]))
    }

    fn sequence<'a>(
        &self,
        items: impl Iterator<Item = (&'a CtyValue, &'a CtyType)>,
        depth: usize,
    ) -> Result<Value> {
        let mut out = Vec::new();
        for (i, (item, ty)) in items.enumerate() {
            let encoded = self
                .node(item, ty, depth + 1)
                .map_err(|e| e.at(PathStep::index(i)))?;
            out.push(encoded);
        }
        Ok(Value::Array(out))
    }
}

fn nfc(s: &str) -> String {
    if is_nfc(s) { s.to_owned() } else { s.nfc().collect() }
}

/// Integers go out as msgpack ints, exact doubles as float64, anything else
/// as decimal text
fn number(n: Decimal) -> Value {
    let n = n.normalize();
    if n.scale() == 0 {
        if let Some(i) = n.to_i64() {
            return Value::from(i);
        }
        if let Some(u) = n.to_u64() {
            return Value::from(u);
        }
    }
    if let Some(f) = n.to_f64() {
        let exact = f.is_finite() && f.to_string().parse::<Decimal>().is_ok_and(|back| back == n);
        if exact {
            return Value::F64(f);
        }
    }
    Value::from(n.to_string())
}
