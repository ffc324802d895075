//! Validation of native data against a type
//!
//! Validation walks the target type and the host data together and produces
//! a typed [`CtyValue`]. It stops at the first failure. Failures carry the path
//! from the root, and a nested failure keeps its message while being
//! re-attributed to each enclosing container. Depth is bounded by an explicit
//! counter threaded through the recursion, so concurrent calls never share
//! state.

use crate::value::{canonical_set, normalize_nfc};
use crate::{
    CapsuleType, CtyConfig, CtyType, CtyValue, NativeValue, NumberError, ObjectType, Payload,
    decimal_from_f64, infer_type_with_limit, parse_decimal,
};
use cty_diagnostics::{
    CTY0011, CTY0012, CTY0013, CTY0014, CTY0015, CTY0016, CTY0017, CtyError, CtyPath, PathStep,
    Result, ValidationError, ValidationKind,
};
use indexmap::IndexMap;
use log::{debug, trace};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

fn nest(err: CtyError, kind: ValidationKind, step: PathStep) -> CtyError {
    match err {
        CtyError::Validation(e) => CtyError::Validation(e.nested(kind, step)),
        other => other.at(step),
    }
}

fn fail(kind: ValidationKind, message: impl AsRef<str>, value: &NativeValue) -> CtyError {
    ValidationError::new(kind, message).with_value(value).into()
}

/// Validation kind reported for failures at a node of type `ty`
fn kind_of(ty: &CtyType) -> ValidationKind {
    match ty {
        CtyType::String => ValidationKind::String,
        CtyType::Number => ValidationKind::Number,
        CtyType::Bool => ValidationKind::Bool,
        CtyType::List(_) => ValidationKind::List,
        CtyType::Set(_) => ValidationKind::Set,
        CtyType::Map(_) => ValidationKind::Map,
        CtyType::Tuple(_) => ValidationKind::Tuple,
        CtyType::Object(_) => ValidationKind::Attribute,
        CtyType::Capsule(_) => ValidationKind::Capsule,
        CtyType::Dynamic => ValidationKind::Dynamic,
    }
}

/// Validates native data against CTY types
#[derive(Debug, Clone)]
pub struct Validator {
    max_depth: usize,
    normalize_strings: bool,
}

impl Default for Validator {
    fn default() -> Self {
        Self::with_config(&CtyConfig::default())
    }
}

impl Validator {
    /// Create a validator with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &CtyConfig) -> Self {
        Self {
            max_depth: config.max_validation_depth,
            normalize_strings: config.normalize_strings,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Validate host data against `ty`
    pub fn validate(&self, ty: &CtyType, value: impl Into<NativeValue>) -> Result<CtyValue> {
        let result = self.validate_node(ty, value.into(), 0);
        if let Err(err) = &result {
            debug!("Validation against {ty} failed: {err}");
        }
        result
    }

    fn validate_node(&self, ty: &CtyType, value: NativeValue, depth: usize) -> Result<CtyValue> {
        if depth > self.max_depth {
            return Err(CtyError::recursion_limit(self.max_depth, CtyPath::root()));
        }
        let value = match value {
            NativeValue::Value(v) => return self.validate_value(ty, v, depth),
            NativeValue::Null => return Ok(CtyValue::null(ty.clone())),
            NativeValue::Unknown => return Ok(CtyValue::unknown(ty.clone())),
            NativeValue::Envelope(encoded, data) => {
                return self.validate_envelope(ty, &encoded, *data, depth);
            }
            other => other,
        };
        match ty {
            CtyType::String => self.validate_string(value),
            CtyType::Number => validate_number(value),
            CtyType::Bool => validate_bool(value),
            CtyType::List(elem) => self.validate_list(ty, elem, value, depth),
            CtyType::Set(elem) => self.validate_set(ty, elem, value, depth),
            CtyType::Map(elem) => self.validate_map(ty, elem, value, depth),
            CtyType::Tuple(elems) => self.validate_tuple(ty, elems, value, depth),
            CtyType::Object(obj) => self.validate_object(ty, obj, value, depth),
            CtyType::Capsule(capsule) => validate_capsule(ty, capsule, value),
            CtyType::Dynamic => self.validate_dynamic(value, depth),
        }
    }

    /// An already typed value is kept when its type matches, re-typed when
    /// null or unknown, and otherwise re-validated from its children
    fn validate_value(&self, ty: &CtyType, value: CtyValue, depth: usize) -> Result<CtyValue> {
        if ty.is_dynamic() {
            return Ok(CtyValue::dynamic(value));
        }
        if value.ty() == ty {
            return Ok(value);
        }
        let (value, marks) = value.unmark();
        let validated = if value.is_null() {
            CtyValue::null(ty.clone())
        } else if value.is_unknown() {
            CtyValue::unknown(ty.clone())
        } else {
            self.validate_node(ty, value.into_shallow_native(), depth)?
        };
        Ok(validated.with_marks(marks))
    }

    fn normalize(&self, s: String) -> String {
        if self.normalize_strings { normalize_nfc(s) } else { s }
    }

    fn validate_string(&self, value: NativeValue) -> Result<CtyValue> {
        let s = match value {
            NativeValue::String(s) => s,
            NativeValue::Bytes(bytes) => String::from_utf8(bytes).map_err(|e| {
                CtyError::from(ValidationError::new(
                    ValidationKind::String,
                    format!("Cannot convert bytes to string: {e}"),
                ))
            })?,
            other => {
                return Err(fail(
                    ValidationKind::String,
                    format!("Cannot convert {} to string.", other.kind_name()),
                    &other,
                ));
            }
        };
        Ok(CtyValue::from_payload(
            CtyType::String,
            Payload::String(self.normalize(s)),
        ))
    }

    fn validate_list(
        &self,
        ty: &CtyType,
        elem: &CtyType,
        value: NativeValue,
        depth: usize,
    ) -> Result<CtyValue> {
        let items = match value {
            NativeValue::List(items) | NativeValue::Tuple(items) | NativeValue::Set(items) => items,
            other => {
                return Err(fail(
                    ValidationKind::List,
                    format!("Expected list, tuple, or set, got {}", other.kind_name()),
                    &other,
                ));
            }
        };
        trace!("Validating {} elements against {ty}", items.len());
        let mut validated = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            if item.is_null() && !elem.is_dynamic() {
                return Err(ValidationError::with_code(
                    ValidationKind::List,
                    CTY0015,
                    format!("List elements cannot be null for element type {elem}"),
                )
                .at(PathStep::index(i))
                .into());
            }
            let v = self
                .validate_node(elem, item, depth + 1)
                .map_err(|e| nest(e, ValidationKind::List, PathStep::index(i)))?;
            validated.push(v);
        }
        Ok(CtyValue::from_payload(ty.clone(), Payload::List(validated)))
    }

    fn validate_set(
        &self,
        ty: &CtyType,
        elem: &CtyType,
        value: NativeValue,
        depth: usize,
    ) -> Result<CtyValue> {
        let items = match value {
            NativeValue::List(items) | NativeValue::Tuple(items) | NativeValue::Set(items) => items,
            other => {
                return Err(fail(
                    ValidationKind::Set,
                    format!("Expected set, list, or tuple, got {}", other.kind_name()),
                    &other,
                ));
            }
        };
        if !items.is_empty() && !elem.is_hashable() {
            return Err(ValidationError::with_code(
                ValidationKind::Set,
                CTY0011,
                format!("Set elements of type {elem} are not hashable"),
            )
            .into());
        }
        trace!("Validating {} elements against {ty}", items.len());
        let mut validated = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            if item.is_null() && !elem.is_dynamic() {
                return Err(ValidationError::with_code(
                    ValidationKind::Set,
                    CTY0015,
                    format!("Set elements cannot be null for element type {elem}"),
                )
                .at(PathStep::index(i))
                .into());
            }
            let v = self
                .validate_node(elem, item, depth + 1)
                .map_err(|e| nest(e, ValidationKind::Set, PathStep::index(i)))?;
            validated.push(v);
        }
        Ok(CtyValue::from_payload(
            ty.clone(),
            Payload::Set(canonical_set(validated)),
        ))
    }

    fn validate_map(
        &self,
        ty: &CtyType,
        elem: &CtyType,
        value: NativeValue,
        depth: usize,
    ) -> Result<CtyValue> {
        let entries = match value {
            NativeValue::Map(entries) => entries,
            other => {
                return Err(fail(
                    ValidationKind::Map,
                    format!("Expected a map, got {}", other.kind_name()),
                    &other,
                ));
            }
        };
        // Every key is checked before any value is validated.
        let mut keyed = Vec::with_capacity(entries.len());
        for (key, v) in entries {
            match key {
                NativeValue::String(k) => keyed.push((self.normalize(k), v)),
                other => {
                    return Err(ValidationError::with_code(
                        ValidationKind::Map,
                        CTY0012,
                        format!(
                            "Map keys must be strings, but got key of type {}",
                            other.kind_name()
                        ),
                    )
                    .with_value(&other)
                    .into());
                }
            }
        }
        trace!("Validating {} entries against {ty}", keyed.len());
        let mut validated = BTreeMap::new();
        for (key, v) in keyed {
            let v = self
                .validate_node(elem, v, depth + 1)
                .map_err(|e| nest(e, ValidationKind::Map, PathStep::key(key.clone())))?;
            validated.insert(key, v);
        }
        Ok(CtyValue::from_payload(ty.clone(), Payload::Map(validated)))
    }

    fn validate_tuple(
        &self,
        ty: &CtyType,
        elems: &[CtyType],
        value: NativeValue,
        depth: usize,
    ) -> Result<CtyValue> {
        let items = match value {
            NativeValue::List(items) | NativeValue::Tuple(items) => items,
            other => {
                return Err(fail(
                    ValidationKind::Tuple,
                    format!("Expected tuple or list, got {}", other.kind_name()),
                    &other,
                ));
            }
        };
        if items.len() != elems.len() {
            return Err(ValidationError::with_code(
                ValidationKind::Tuple,
                CTY0016,
                format!("Expected {} elements, got {}", elems.len(), items.len()),
            )
            .into());
        }
        let mut validated = Vec::with_capacity(items.len());
        for (i, (item, elem)) in items.into_iter().zip(elems).enumerate() {
            let v = self
                .validate_node(elem, item, depth + 1)
                .map_err(|e| nest(e, ValidationKind::Tuple, PathStep::index(i)))?;
            validated.push(v);
        }
        Ok(CtyValue::from_payload(ty.clone(), Payload::Tuple(validated)))
    }

    fn validate_object(
        &self,
        ty: &CtyType,
        obj: &ObjectType,
        value: NativeValue,
        depth: usize,
    ) -> Result<CtyValue> {
        let entries = match value {
            NativeValue::Map(entries) => entries,
            other => {
                return Err(fail(
                    ValidationKind::Attribute,
                    format!("Expected a map for object type, got {}", other.kind_name()),
                    &other,
                ));
            }
        };
        let mut provided: IndexMap<String, NativeValue> = IndexMap::with_capacity(entries.len());
        for (key, v) in entries {
            match key {
                NativeValue::String(k) => {
                    provided.insert(k, v);
                }
                other => {
                    return Err(ValidationError::with_code(
                        ValidationKind::Attribute,
                        CTY0012,
                        format!(
                            "Object attribute names must be strings, but got key of type {}",
                            other.kind_name()
                        ),
                    )
                    .into());
                }
            }
        }

        let mut unexpected: Vec<&str> = provided
            .keys()
            .filter(|name| !obj.has_attribute(name))
            .map(String::as_str)
            .collect();
        if !unexpected.is_empty() {
            unexpected.sort_unstable();
            return Err(ValidationError::with_code(
                ValidationKind::Attribute,
                CTY0014,
                format!("Unknown attributes: {}", unexpected.join(", ")),
            )
            .into());
        }

        trace!("Validating {} attributes against {ty}", obj.len());
        let mut attrs = BTreeMap::new();
        for (name, attr_ty) in obj.attributes() {
            let optional = obj.is_optional(name);
            let attr = match provided.swap_remove(name) {
                None if optional => CtyValue::null(attr_ty.clone()),
                None => {
                    return Err(ValidationError::with_code(
                        ValidationKind::Attribute,
                        CTY0013,
                        "Missing required attribute",
                    )
                    .at(PathStep::attr(name.clone()))
                    .into());
                }
                Some(v) if v.is_null() && !optional && !attr_ty.is_dynamic() => {
                    return Err(ValidationError::with_code(
                        ValidationKind::Attribute,
                        CTY0015,
                        "Attribute cannot be null",
                    )
                    .at(PathStep::attr(name.clone()))
                    .into());
                }
                Some(v) => self
                    .validate_node(attr_ty, v, depth + 1)
                    .map_err(|e| nest(e, ValidationKind::Attribute, PathStep::attr(name.clone())))?,
            };
            attrs.insert(name.clone(), attr);
        }
        Ok(CtyValue::from_payload(ty.clone(), Payload::Object(attrs)))
    }

    /// Data tagged with its own type: a dynamic target keeps that type, any
    /// other target must be one the tagged type is usable as
    fn validate_envelope(
        &self,
        ty: &CtyType,
        encoded: &CtyType,
        data: NativeValue,
        depth: usize,
    ) -> Result<CtyValue> {
        trace!("Validating envelope of {encoded} as {ty}");
        if ty.is_dynamic() {
            return self
                .validate_node(encoded, data, depth + 1)
                .map(CtyValue::dynamic);
        }
        if !encoded.usable_as(ty) {
            return Err(ValidationError::new(
                kind_of(ty),
                format!("Envelope of type {encoded} is not usable as {ty}"),
            )
            .into());
        }
        self.validate_node(ty, data, depth + 1)
    }

    fn validate_dynamic(&self, value: NativeValue, depth: usize) -> Result<CtyValue> {
        let remaining = self.max_depth.saturating_sub(depth);
        let inferred = infer_type_with_limit(&value, remaining)?;
        trace!("Inferred {inferred} for dynamic value");
        self.validate_node(&inferred, value, depth + 1)
            .map(CtyValue::dynamic)
    }
}

fn validate_number(value: NativeValue) -> Result<CtyValue> {
    let number = match value {
        NativeValue::Int(i) => Decimal::from(i),
        NativeValue::UInt(u) => Decimal::from(u),
        NativeValue::Decimal(d) => d,
        NativeValue::Float(f) => decimal_from_f64(f).map_err(|_| {
            CtyError::from(ValidationError::with_code(
                ValidationKind::Number,
                CTY0017,
                format!("Cannot represent {f} as a number"),
            ))
        })?,
        NativeValue::String(ref s) => match parse_decimal(s) {
            Ok(d) => d,
            Err(NumberError::Invalid) => {
                return Err(fail(
                    ValidationKind::Number,
                    format!("Cannot convert string '{s}' to number"),
                    &value,
                ));
            }
            Err(NumberError::NotRepresentable) => {
                return Err(ValidationError::with_code(
                    ValidationKind::Number,
                    CTY0017,
                    format!("Cannot represent '{s}' exactly as a number"),
                )
                .with_value(&value)
                .into());
            }
        },
        other => {
            return Err(fail(
                ValidationKind::Number,
                format!("Cannot convert {} to number.", other.kind_name()),
                &other,
            ));
        }
    };
    Ok(CtyValue::number(number))
}

fn validate_bool(value: NativeValue) -> Result<CtyValue> {
    let b = match &value {
        NativeValue::Bool(b) => *b,
        NativeValue::Int(0) | NativeValue::UInt(0) => false,
        NativeValue::Int(1) | NativeValue::UInt(1) => true,
        NativeValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => true,
            "false" | "0" => false,
            _ => {
                return Err(fail(
                    ValidationKind::Bool,
                    format!("Cannot convert string '{s}' to bool"),
                    &value,
                ));
            }
        },
        other => {
            return Err(fail(
                ValidationKind::Bool,
                format!("Cannot convert {} to bool.", other.kind_name()),
                other,
            ));
        }
    };
    Ok(CtyValue::bool(b))
}

fn validate_capsule(ty: &CtyType, capsule: &CapsuleType, value: NativeValue) -> Result<CtyValue> {
    match value {
        NativeValue::Capsule(v) if capsule.accepts(&v) => {
            Ok(CtyValue::from_payload(ty.clone(), Payload::Capsule(v)))
        }
        NativeValue::Capsule(_) => Err(ValidationError::new(
            ValidationKind::Capsule,
            format!(
                "Expected a host value of type {} for capsule {}",
                capsule.native_type_name(),
                capsule.name()
            ),
        )
        .into()),
        other => Err(fail(
            ValidationKind::Capsule,
            format!("Cannot wrap {} in capsule {}", other.kind_name(), capsule.name()),
            &other,
        )),
    }
}

impl CtyType {
    /// Validate host data against this type with default settings
    pub fn validate(&self, value: impl Into<NativeValue>) -> Result<CtyValue> {
        Validator::new().validate(self, value)
    }
}
