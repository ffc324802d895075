//! Type inference for native data
//!
//! Used when data is validated against the dynamic type without an explicit
//! type envelope. Inference is a pure function and keeps no cache.

use crate::{CtyType, DEFAULT_MAX_DEPTH, NativeValue, unify};
use cty_diagnostics::{CtyError, CtyPath, PathStep, Result, ValidationError, ValidationKind};

/// Infer the type of native data
pub fn infer_type(value: &NativeValue) -> Result<CtyType> {
    infer_type_with_limit(value, DEFAULT_MAX_DEPTH)
}

/// Infer the type of native data, failing past `max_depth` levels of nesting
pub fn infer_type_with_limit(value: &NativeValue, max_depth: usize) -> Result<CtyType> {
    infer(value, 0, max_depth)
}

fn infer(value: &NativeValue, depth: usize, max_depth: usize) -> Result<CtyType> {
    if depth > max_depth {
        return Err(CtyError::recursion_limit(max_depth, CtyPath::root()));
    }
    let ty = match value {
        NativeValue::Null | NativeValue::Unknown => CtyType::Dynamic,
        NativeValue::Bool(_) => CtyType::Bool,
        NativeValue::Int(_) | NativeValue::UInt(_) | NativeValue::Float(_) | NativeValue::Decimal(_) => {
            CtyType::Number
        }
        NativeValue::String(_) | NativeValue::Bytes(_) => CtyType::String,
        NativeValue::List(items) => CtyType::list_of(infer_elements(items, depth, max_depth)?),
        NativeValue::Set(items) => CtyType::set_of(infer_elements(items, depth, max_depth)?),
        NativeValue::Tuple(items) => {
            let elems = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    infer(item, depth + 1, max_depth).map_err(|e| e.at(PathStep::index(i)))
                })
                .collect::<Result<Vec<_>>>()?;
            CtyType::tuple_of(elems)
        }
        NativeValue::Map(entries) => infer_mapping(entries, depth, max_depth)?,
        NativeValue::Capsule(_) => {
            return Err(ValidationError::new(
                ValidationKind::Dynamic,
                "Cannot infer a type for a capsule value; declare the capsule type instead",
            )
            .into());
        }
        NativeValue::Envelope(ty, _) => ty.clone(),
        NativeValue::Value(v) => v.ty().clone(),
    };
    Ok(ty)
}

fn infer_elements(items: &[NativeValue], depth: usize, max_depth: usize) -> Result<CtyType> {
    let types = items
        .iter()
        .enumerate()
        .map(|(i, item)| infer(item, depth + 1, max_depth).map_err(|e| e.at(PathStep::index(i))))
        .collect::<Result<Vec<_>>>()?;
    Ok(unify(&types))
}

/// String-keyed mappings become objects; any other key makes a map
fn infer_mapping(
    entries: &[(NativeValue, NativeValue)],
    depth: usize,
    max_depth: usize,
) -> Result<CtyType> {
    let string_keyed = entries
        .iter()
        .all(|(key, _)| matches!(key, NativeValue::String(_)));
    if string_keyed {
        let mut attrs = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            if let NativeValue::String(name) = key {
                let ty = infer(value, depth + 1, max_depth)
                    .map_err(|e| e.at(PathStep::attr(name.clone())))?;
                attrs.push((name.clone(), ty));
            }
        }
        return Ok(CtyType::object(attrs));
    }
    let values: Vec<NativeValue> = entries.iter().map(|(_, v)| v.clone()).collect();
    Ok(CtyType::map_of(infer_elements(&values, depth, max_depth)?))
}
