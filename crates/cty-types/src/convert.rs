//! Explicit conversion between types
//!
//! Conversions are single-hop:
//! - Number and Bool to String, String to Number and Bool
//! - element-wise between List, Set and Tuple
//! - attribute-wise between Map and Object
//! - out of a capsule through its convert hook
//!
//! Null and unknown inputs keep their state in the target type, and marks on
//! the input are kept on the output. Refinements are dropped.

use crate::value::canonical_set;
use crate::{
    CapsuleType, CapsuleValue, CtyType, CtyValue, MarkSet, NumberError, ObjectType, Payload,
    parse_decimal,
};
use cty_diagnostics::{
    CTY0101, CTY0102, CTY0103, CTY0104, CTY0105, CTY0106, CTY0107, CtyError, PathStep, Result,
};
use log::debug;
use std::collections::BTreeMap;

/// Convert a value to `target`
pub fn convert(value: &CtyValue, target: &CtyType) -> Result<CtyValue> {
    let result = convert_value(value, target);
    if let Err(err) = &result {
        debug!("Conversion from {} to {target} failed: {err}", value.ty());
    }
    result
}

impl CtyValue {
    /// Convert this value to `target`
    pub fn convert_to(&self, target: &CtyType) -> Result<CtyValue> {
        convert(self, target)
    }
}

fn convert_value(value: &CtyValue, target: &CtyType) -> Result<CtyValue> {
    if target.is_dynamic() {
        return Ok(value.clone());
    }
    let inner = value.inner_dynamic();
    let marks: MarkSet = value.marks().union(inner.marks()).cloned().collect();
    if inner.ty() == target {
        return Ok(inner.clone().with_marks(marks));
    }
    let converted = match inner.payload() {
        None if inner.is_null() => CtyValue::null(target.clone()),
        None => CtyValue::unknown(target.clone()),
        Some(payload) => convert_payload(inner.ty(), payload, target)?,
    };
    Ok(converted.with_marks(marks))
}

fn convert_element(value: &CtyValue, target: &CtyType, step: PathStep) -> Result<CtyValue> {
    if target.is_dynamic() {
        return Ok(CtyValue::dynamic(value.clone()));
    }
    convert_value(value, target).map_err(|e| e.at(step))
}

fn invalid(from: &CtyType, to: &CtyType, detail: impl AsRef<str>) -> CtyError {
    CtyError::conversion(CTY0101, from.ctype(), to.ctype(), detail)
}

fn convert_payload(from: &CtyType, payload: &Payload, target: &CtyType) -> Result<CtyValue> {
    match (payload, target) {
        (Payload::Number(n), CtyType::String) => Ok(CtyValue::string(n.normalize().to_string())),
        (Payload::Bool(b), CtyType::String) => Ok(CtyValue::string(b.to_string())),
        (Payload::String(s), CtyType::Number) => match parse_decimal(s) {
            Ok(n) => Ok(CtyValue::number(n)),
            Err(NumberError::Invalid) => Err(invalid(from, target, format!("'{s}' is not a valid number"))),
            Err(NumberError::NotRepresentable) => Err(CtyError::conversion(
                CTY0107,
                from.ctype(),
                target.ctype(),
                format!("'{s}' cannot be represented exactly as a number"),
            )),
        },
        (Payload::String(s), CtyType::Bool) => match s.to_ascii_lowercase().as_str() {
            "true" => Ok(CtyValue::bool(true)),
            "false" => Ok(CtyValue::bool(false)),
            _ => Err(invalid(from, target, format!("'{s}' is not a valid bool"))),
        },

        (
            Payload::List(items) | Payload::Set(items) | Payload::Tuple(items),
            CtyType::List(elem),
        ) => {
            let items = convert_sequence(items, elem)?;
            Ok(CtyValue::from_payload(target.clone(), Payload::List(items)))
        }
        (
            Payload::List(items) | Payload::Set(items) | Payload::Tuple(items),
            CtyType::Set(elem),
        ) => {
            if !items.is_empty() && !elem.is_hashable() {
                return Err(invalid(
                    from,
                    target,
                    format!("set elements of type {elem} are not hashable"),
                ));
            }
            let items = convert_sequence(items, elem)?;
            Ok(CtyValue::from_payload(
                target.clone(),
                Payload::Set(canonical_set(items)),
            ))
        }
        (
            Payload::List(items) | Payload::Set(items) | Payload::Tuple(items),
            CtyType::Tuple(elems),
        ) => {
            if items.len() != elems.len() {
                return Err(invalid(
                    from,
                    target,
                    format!("expected {} elements, got {}", elems.len(), items.len()),
                ));
            }
            let items = items
                .iter()
                .zip(elems)
                .enumerate()
                .map(|(i, (item, elem))| convert_element(item, elem, PathStep::index(i)))
                .collect::<Result<Vec<_>>>()?;
            Ok(CtyValue::from_payload(target.clone(), Payload::Tuple(items)))
        }

        (Payload::Map(entries) | Payload::Object(entries), CtyType::Map(elem)) => {
            let entries = entries
                .iter()
                .map(|(k, v)| -> Result<(String, CtyValue)> {
                    Ok((k.clone(), convert_element(v, elem, PathStep::key(k.clone()))?))
                })
                .collect::<Result<BTreeMap<_, _>>>()?;
            Ok(CtyValue::from_payload(target.clone(), Payload::Map(entries)))
        }
        (Payload::Map(entries) | Payload::Object(entries), CtyType::Object(obj)) => {
            convert_to_object(from, entries, target, obj)
        }

        (Payload::Capsule(value), _) => match from {
            CtyType::Capsule(capsule) => convert_capsule(capsule, value, target),
            _ => Err(CtyError::unsupported_conversion(from.ctype(), target.ctype())),
        },

        _ => Err(CtyError::unsupported_conversion(from.ctype(), target.ctype())),
    }
}

fn convert_sequence(items: &[CtyValue], elem: &CtyType) -> Result<Vec<CtyValue>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| convert_element(item, elem, PathStep::index(i)))
        .collect()
}

fn convert_to_object(
    from: &CtyType,
    entries: &BTreeMap<String, CtyValue>,
    target: &CtyType,
    obj: &ObjectType,
) -> Result<CtyValue> {
    if let Some(extra) = entries.keys().find(|name| !obj.has_attribute(name)) {
        return Err(CtyError::conversion(
            CTY0106,
            from.ctype(),
            target.ctype(),
            format!("unexpected attribute '{extra}'"),
        ));
    }
    let mut attrs = BTreeMap::new();
    for (name, attr_ty) in obj.attributes() {
        let attr = match entries.get(name) {
            Some(v) => convert_element(v, attr_ty, PathStep::attr(name.clone()))?,
            None if obj.is_optional(name) => CtyValue::null(attr_ty.clone()),
            None => {
                return Err(CtyError::conversion(
                    CTY0105,
                    from.ctype(),
                    target.ctype(),
                    format!("missing required attribute '{name}'"),
                ));
            }
        };
        attrs.insert(name.clone(), attr);
    }
    Ok(CtyValue::from_payload(target.clone(), Payload::Object(attrs)))
}

fn convert_capsule(capsule: &CapsuleType, value: &CapsuleValue, target: &CtyType) -> Result<CtyValue> {
    let from = format!("capsule({})", capsule.name());
    let Some(hook) = &capsule.ops().convert else {
        return Err(CtyError::conversion(
            CTY0102,
            from,
            target.ctype(),
            "the capsule type has no convert hook",
        ));
    };
    match hook(value, target) {
        None => Err(CtyError::conversion(
            CTY0103,
            from,
            target.ctype(),
            "the capsule convert hook declined",
        )),
        Some(converted) if converted.ty() == target => Ok(converted),
        Some(converted) => Err(CtyError::conversion(
            CTY0104,
            from,
            target.ctype(),
            format!("the capsule convert hook returned a value of type {}", converted.ty()),
        )),
    }
}
