//! CTY runtime values
//!
//! Every value pairs a [`CtyType`] with one of three states (null, unknown or
//! known) and a set of marks. Values are immutable: operations that look like
//! mutation return a new value.

use crate::{CapsuleType, CapsuleValue, CtyType, MarkSet, NativeValue, Refinement, Validator};
use cty_diagnostics::{CtyError, Result};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use unicode_normalization::{UnicodeNormalization, is_nfc};

/// A typed CTY value
///
/// Equality, hashing and ordering are structural and ignore marks. The order
/// is total: null < unknown < known, then by type, then by payload, with
/// collections compared through their canonical child order.
#[derive(Debug, Clone)]
pub struct CtyValue {
    pub(crate) ty: CtyType,
    pub(crate) state: ValueState,
    pub(crate) marks: MarkSet,
}

/// The three states of a value
#[derive(Debug, Clone)]
pub enum ValueState {
    Null,
    Unknown(Option<Refinement>),
    Known(Payload),
}

/// Known payload, shaped by the value's type
#[derive(Clone)]
pub enum Payload {
    String(String),
    Number(Decimal),
    Bool(bool),
    List(Vec<CtyValue>),
    /// Sorted and deduplicated by the canonical value order
    Set(Vec<CtyValue>),
    Map(BTreeMap<String, CtyValue>),
    Tuple(Vec<CtyValue>),
    /// Every attribute of the object type is present; absent optional
    /// attributes are typed nulls
    Object(BTreeMap<String, CtyValue>),
    Capsule(CapsuleValue),
    /// The concrete value carried by a dynamic-typed value
    Dynamic(Box<CtyValue>),
}

impl Payload {
    fn variant_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Tuple(_) => "tuple",
            Self::Object(_) => "object",
            Self::Capsule(_) => "capsule",
            Self::Dynamic(_) => "dynamic",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::String(_) => 0,
            Self::Number(_) => 1,
            Self::Bool(_) => 2,
            Self::List(_) => 3,
            Self::Set(_) => 4,
            Self::Map(_) => 5,
            Self::Tuple(_) => 6,
            Self::Object(_) => 7,
            Self::Capsule(_) => 8,
            Self::Dynamic(_) => 9,
        }
    }

    /// Direct child values
    pub fn children(&self) -> Box<dyn Iterator<Item = &CtyValue> + '_> {
        match self {
            Self::List(items) | Self::Set(items) | Self::Tuple(items) => Box::new(items.iter()),
            Self::Map(entries) | Self::Object(entries) => Box::new(entries.values()),
            Self::Dynamic(inner) => Box::new(std::iter::once(inner.as_ref())),
            _ => Box::new(std::iter::empty()),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.debug_tuple("String").field(s).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Set(items) => f.debug_tuple("Set").field(items).finish(),
            Self::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Self::Tuple(items) => f.debug_tuple("Tuple").field(items).finish(),
            Self::Object(attrs) => f.debug_tuple("Object").field(attrs).finish(),
            Self::Capsule(_) => f.write_str("Capsule(..)"),
            Self::Dynamic(inner) => f.debug_tuple("Dynamic").field(inner).finish(),
        }
    }
}

/// Sort and deduplicate set elements, merging the marks of duplicates
pub(crate) fn canonical_set(mut items: Vec<CtyValue>) -> Vec<CtyValue> {
    items.sort();
    let mut kept: Vec<CtyValue> = Vec::with_capacity(items.len());
    for mut item in items {
        // Hook-equal capsules need not sort next to each other
        let duplicate = if has_loose_order(&item) {
            kept.iter_mut().find(|k| **k == item)
        } else {
            kept.last_mut().filter(|k| **k == item)
        };
        match duplicate {
            Some(k) => k.marks.append(&mut item.marks),
            None => kept.push(item),
        }
    }
    kept
}

/// True when the value order can separate two equal values: a capsule with
/// an equality hook but no hash hook, anywhere inside the value
fn has_loose_order(value: &CtyValue) -> bool {
    match value.payload() {
        Some(Payload::Dynamic(inner)) => has_loose_order(inner),
        _ => type_has_loose_order(value.ty()),
    }
}

fn type_has_loose_order(ty: &CtyType) -> bool {
    match ty {
        CtyType::Capsule(capsule) => capsule.ops().equal.is_some() && capsule.ops().hash.is_none(),
        CtyType::List(elem) | CtyType::Set(elem) | CtyType::Map(elem) => type_has_loose_order(elem),
        CtyType::Tuple(elems) => elems.iter().any(type_has_loose_order),
        CtyType::Object(obj) => obj.attributes().values().any(type_has_loose_order),
        CtyType::String | CtyType::Number | CtyType::Bool | CtyType::Dynamic => false,
    }
}

pub(crate) fn normalize_nfc(s: String) -> String {
    if is_nfc(&s) { s } else { s.nfc().collect() }
}

fn inconsistent(ty: &CtyType) -> CtyError {
    CtyError::type_mismatch(format!(
        "Value of type {ty} has an inconsistent internal representation"
    ))
}

/// Check that a payload matches its declared type
fn check_payload(ty: &CtyType, payload: Payload) -> Result<Payload> {
    let consistent = match (ty, &payload) {
        (CtyType::String, Payload::String(_))
        | (CtyType::Number, Payload::Number(_))
        | (CtyType::Bool, Payload::Bool(_))
        | (CtyType::Dynamic, Payload::Dynamic(_)) => true,
        (CtyType::List(elem), Payload::List(items)) => items.iter().all(|v| v.ty == **elem),
        (CtyType::Set(elem), Payload::Set(items)) => {
            (items.is_empty() || elem.is_hashable()) && items.iter().all(|v| v.ty == **elem)
        }
        (CtyType::Map(elem), Payload::Map(entries)) => entries.values().all(|v| v.ty == **elem),
        (CtyType::Tuple(elems), Payload::Tuple(items)) => {
            elems.len() == items.len() && elems.iter().zip(items).all(|(t, v)| v.ty == *t)
        }
        (CtyType::Object(obj), Payload::Object(attrs)) => {
            obj.len() == attrs.len()
                && obj
                    .attributes()
                    .iter()
                    .all(|(name, t)| attrs.get(name).is_some_and(|v| v.ty == *t))
        }
        (CtyType::Capsule(capsule), Payload::Capsule(value)) => capsule.accepts(value),
        _ => false,
    };
    if !consistent {
        return Err(CtyError::type_mismatch(format!(
            "A {} payload is not valid for type {ty}",
            payload.variant_name()
        )));
    }
    Ok(match payload {
        Payload::Set(items) => Payload::Set(canonical_set(items)),
        other => other,
    })
}

impl CtyValue {
    // === Constructors ===

    /// A typed null
    pub fn null(ty: CtyType) -> Self {
        Self::from_state(ty, ValueState::Null)
    }

    /// An unrefined unknown
    pub fn unknown(ty: CtyType) -> Self {
        Self::from_state(ty, ValueState::Unknown(None))
    }

    /// An unknown narrowed by a refinement valid for `ty`
    pub fn unknown_with_refinement(ty: CtyType, refinement: Refinement) -> Result<Self> {
        refinement.check_applicable(&ty)?;
        let refinement = (!refinement.is_empty()).then_some(refinement);
        Ok(Self::from_state(ty, ValueState::Unknown(refinement)))
    }

    /// A known value; the payload must match the type
    pub fn known(ty: CtyType, payload: Payload) -> Result<Self> {
        let payload = check_payload(&ty, payload)?;
        Ok(Self::from_state(ty, ValueState::Known(payload)))
    }

    pub(crate) fn from_state(ty: CtyType, state: ValueState) -> Self {
        Self {
            ty,
            state,
            marks: MarkSet::new(),
        }
    }

    /// Build a known value whose payload was produced by a checked path
    pub(crate) fn from_payload(ty: CtyType, payload: Payload) -> Self {
        Self::from_state(ty, ValueState::Known(payload))
    }

    /// A known string, NFC-normalized
    pub fn string(s: impl Into<String>) -> Self {
        Self::from_payload(CtyType::String, Payload::String(normalize_nfc(s.into())))
    }

    pub fn number(n: impl Into<Decimal>) -> Self {
        Self::from_payload(CtyType::Number, Payload::Number(n.into()))
    }

    pub fn bool(b: bool) -> Self {
        Self::from_payload(CtyType::Bool, Payload::Bool(b))
    }

    pub fn list(element_type: CtyType, items: Vec<CtyValue>) -> Result<Self> {
        Self::known(CtyType::list_of(element_type), Payload::List(items))
    }

    pub fn set(element_type: CtyType, items: Vec<CtyValue>) -> Result<Self> {
        Self::known(CtyType::set_of(element_type), Payload::Set(items))
    }

    pub fn map<K: Into<String>>(
        element_type: CtyType,
        entries: impl IntoIterator<Item = (K, CtyValue)>,
    ) -> Result<Self> {
        let entries = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::known(CtyType::map_of(element_type), Payload::Map(entries))
    }

    /// A tuple typed by its elements
    pub fn tuple(items: Vec<CtyValue>) -> Self {
        let ty = CtyType::tuple_of(items.iter().map(|v| v.ty.clone()).collect());
        Self::from_payload(ty, Payload::Tuple(items))
    }

    /// An object typed by its attributes, all required
    pub fn object<K: Into<String>>(attributes: impl IntoIterator<Item = (K, CtyValue)>) -> Self {
        let attrs: BTreeMap<String, CtyValue> =
            attributes.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let ty = CtyType::object(attrs.iter().map(|(k, v)| (k.clone(), v.ty.clone())));
        Self::from_payload(ty, Payload::Object(attrs))
    }

    /// Wrap a concrete value as dynamic; dynamic values are returned as is
    pub fn dynamic(inner: CtyValue) -> Self {
        if inner.ty.is_dynamic() {
            return inner;
        }
        Self::from_payload(CtyType::Dynamic, Payload::Dynamic(Box::new(inner)))
    }

    pub fn capsule(capsule: &CapsuleType, value: CapsuleValue) -> Result<Self> {
        Self::known(CtyType::Capsule(capsule.clone()), Payload::Capsule(value))
    }

    // === State ===

    pub fn ty(&self) -> &CtyType {
        &self.ty
    }

    pub fn state(&self) -> &ValueState {
        &self.state
    }

    pub fn is_null(&self) -> bool {
        matches!(self.state, ValueState::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.state, ValueState::Unknown(_))
    }

    pub fn is_known(&self) -> bool {
        matches!(self.state, ValueState::Known(_))
    }

    pub fn refinement(&self) -> Option<&Refinement> {
        match &self.state {
            ValueState::Unknown(refinement) => refinement.as_ref(),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match &self.state {
            ValueState::Known(payload) => Some(payload),
            _ => None,
        }
    }

    /// Check that neither this value nor any nested value is unknown
    pub fn is_wholly_known(&self) -> bool {
        match &self.state {
            ValueState::Null => true,
            ValueState::Unknown(_) => false,
            ValueState::Known(payload) => payload.children().all(CtyValue::is_wholly_known),
        }
    }

    /// The concrete value behind a dynamic wrapper, or this value
    pub fn inner_dynamic(&self) -> &CtyValue {
        match &self.state {
            ValueState::Known(Payload::Dynamic(inner)) => inner.inner_dynamic(),
            _ => self,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.inner_dynamic().payload() {
            Some(Payload::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self.inner_dynamic().payload() {
            Some(Payload::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.inner_dynamic().payload() {
            Some(Payload::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn is_true(&self) -> bool {
        self.as_bool() == Some(true)
    }

    pub fn is_false(&self) -> bool {
        self.as_bool() == Some(false)
    }

    /// Check if this is a known empty string or empty collection
    pub fn is_empty(&self) -> bool {
        match self.inner_dynamic().payload() {
            Some(Payload::String(s)) => s.is_empty(),
            Some(Payload::List(items) | Payload::Set(items) | Payload::Tuple(items)) => items.is_empty(),
            Some(Payload::Map(entries)) => entries.is_empty(),
            _ => false,
        }
    }

    // === Native access ===

    /// The host representation of this value
    ///
    /// Unknown values have none; nulls yield [`NativeValue::Null`]. Unknown
    /// values nested inside a known value become [`NativeValue::Unknown`].
    pub fn raw_value(&self) -> Result<NativeValue> {
        if self.is_unknown() {
            return Err(CtyError::invalid_state("Cannot get raw value of unknown value"));
        }
        Ok(self.to_native())
    }

    fn to_native(&self) -> NativeValue {
        let payload = match &self.state {
            ValueState::Null => return NativeValue::Null,
            ValueState::Unknown(_) => return NativeValue::Unknown,
            ValueState::Known(payload) => payload,
        };
        match payload {
            Payload::String(s) => NativeValue::String(s.clone()),
            Payload::Number(n) => NativeValue::Decimal(*n),
            Payload::Bool(b) => NativeValue::Bool(*b),
            Payload::List(items) => NativeValue::List(items.iter().map(Self::to_native).collect()),
            Payload::Set(items) => NativeValue::Set(items.iter().map(Self::to_native).collect()),
            Payload::Tuple(items) => NativeValue::Tuple(items.iter().map(Self::to_native).collect()),
            Payload::Map(entries) | Payload::Object(entries) => NativeValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (NativeValue::String(k.clone()), v.to_native()))
                    .collect(),
            ),
            Payload::Capsule(value) => NativeValue::Capsule(value.clone()),
            Payload::Dynamic(inner) => inner.to_native(),
        }
    }

    /// Unwrap one level into native containers of the child values, so a
    /// re-validation keeps children that already have the right type
    pub(crate) fn into_shallow_native(self) -> NativeValue {
        let payload = match self.state {
            ValueState::Null => return NativeValue::Null,
            ValueState::Unknown(_) => return NativeValue::Unknown,
            ValueState::Known(payload) => payload,
        };
        let wrap = |items: Vec<CtyValue>| -> Vec<NativeValue> {
            items.into_iter().map(NativeValue::Value).collect()
        };
        match payload {
            Payload::String(s) => NativeValue::String(s),
            Payload::Number(n) => NativeValue::Decimal(n),
            Payload::Bool(b) => NativeValue::Bool(b),
            Payload::List(items) => NativeValue::List(wrap(items)),
            Payload::Set(items) => NativeValue::Set(wrap(items)),
            Payload::Tuple(items) => NativeValue::Tuple(wrap(items)),
            Payload::Map(entries) | Payload::Object(entries) => NativeValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (NativeValue::String(k), NativeValue::Value(v)))
                    .collect(),
            ),
            Payload::Capsule(value) => NativeValue::Capsule(value),
            Payload::Dynamic(inner) => NativeValue::Value(*inner),
        }
    }

    // === Structural access ===

    fn marks_with(&self, inner: &CtyValue) -> MarkSet {
        self.marks.union(&inner.marks).cloned().collect()
    }

    /// Get an object attribute
    pub fn get_attr(&self, name: &str) -> Result<CtyValue> {
        let v = self.inner_dynamic();
        let CtyType::Object(obj) = &v.ty else {
            return Err(CtyError::type_mismatch(format!(
                "Cannot access attribute '{name}' on a value of type {}",
                v.ty
            )));
        };
        let Some(attr_ty) = obj.attribute_type(name) else {
            return Err(CtyError::lookup(format!("Object has no attribute '{name}'")));
        };
        let attr = match &v.state {
            ValueState::Unknown(_) => CtyValue::unknown(attr_ty.clone()),
            ValueState::Null => {
                return Err(CtyError::invalid_state(format!(
                    "Cannot access attribute '{name}' of a null object"
                )));
            }
            ValueState::Known(Payload::Object(attrs)) => attrs
                .get(name)
                .cloned()
                .ok_or_else(|| inconsistent(&v.ty))?,
            ValueState::Known(_) => return Err(inconsistent(&v.ty)),
        };
        Ok(attr.with_marks(self.marks_with(v)))
    }

    /// Get a list or tuple element
    pub fn index(&self, index: usize) -> Result<CtyValue> {
        let v = self.inner_dynamic();
        let element_ty = match &v.ty {
            CtyType::List(elem) => elem.as_ref(),
            CtyType::Tuple(elems) => elems.get(index).ok_or_else(|| {
                CtyError::lookup(format!(
                    "Tuple index {index} out of range for length {}",
                    elems.len()
                ))
            })?,
            other => {
                return Err(CtyError::type_mismatch(format!(
                    "Cannot index into a value of type {other}"
                )));
            }
        };
        let element = match &v.state {
            ValueState::Unknown(_) => CtyValue::unknown(element_ty.clone()),
            ValueState::Null => {
                return Err(CtyError::invalid_state(format!(
                    "Cannot access element at index {index} in a null value"
                )));
            }
            ValueState::Known(Payload::List(items) | Payload::Tuple(items)) => {
                items.get(index).cloned().ok_or_else(|| {
                    CtyError::lookup(format!(
                        "List index {index} out of range for length {}",
                        items.len()
                    ))
                })?
            }
            ValueState::Known(_) => return Err(inconsistent(&v.ty)),
        };
        Ok(element.with_marks(self.marks_with(v)))
    }

    /// Get a map element
    pub fn get_key(&self, key: &str) -> Result<CtyValue> {
        let v = self.inner_dynamic();
        let CtyType::Map(elem) = &v.ty else {
            return Err(CtyError::type_mismatch(format!(
                "Cannot look up key '{key}' on a value of type {}",
                v.ty
            )));
        };
        let element = match &v.state {
            ValueState::Unknown(_) => CtyValue::unknown(elem.as_ref().clone()),
            ValueState::Null => {
                return Err(CtyError::invalid_state(format!(
                    "Cannot look up key '{key}' in a null map"
                )));
            }
            ValueState::Known(Payload::Map(entries)) => entries
                .get(key)
                .cloned()
                .ok_or_else(|| CtyError::lookup(format!("Map has no key '{key}'")))?,
            ValueState::Known(_) => return Err(inconsistent(&v.ty)),
        };
        Ok(element.with_marks(self.marks_with(v)))
    }

    /// Number of elements in a collection or tuple; nulls have none
    pub fn length(&self) -> Result<usize> {
        let v = self.inner_dynamic();
        if !(v.ty.is_collection() || matches!(v.ty, CtyType::Tuple(_))) {
            return Err(CtyError::type_mismatch(format!(
                "Value of type {} has no length",
                v.ty
            )));
        }
        match &v.state {
            ValueState::Unknown(_) => Err(CtyError::invalid_state(
                "Cannot get length of unknown value",
            )),
            ValueState::Null => Ok(0),
            ValueState::Known(Payload::List(items) | Payload::Set(items) | Payload::Tuple(items)) => {
                Ok(items.len())
            }
            ValueState::Known(Payload::Map(entries)) => Ok(entries.len()),
            ValueState::Known(_) => Err(inconsistent(&v.ty)),
        }
    }

    /// Elements of a list, set or tuple, or the values of a map
    pub fn elements(&self) -> Result<Vec<&CtyValue>> {
        let v = self.inner_dynamic();
        match &v.state {
            ValueState::Unknown(_) => Err(CtyError::invalid_state("Cannot iterate unknown value")),
            ValueState::Null => Ok(Vec::new()),
            ValueState::Known(
                payload @ (Payload::List(_) | Payload::Set(_) | Payload::Tuple(_) | Payload::Map(_)),
            ) => Ok(payload.children().collect()),
            ValueState::Known(_) => Err(CtyError::type_mismatch(format!(
                "Value of type {} is not iterable",
                v.ty
            ))),
        }
    }

    // === Structural updates ===

    fn known_list(&self, op: &str) -> Result<&Vec<CtyValue>> {
        if !matches!(self.ty, CtyType::List(_)) {
            return Err(CtyError::type_mismatch(format!(
                "'.{op}()' can only be used on list values, not {}",
                self.ty
            )));
        }
        match &self.state {
            ValueState::Known(Payload::List(items)) => Ok(items),
            ValueState::Known(_) => Err(inconsistent(&self.ty)),
            _ => Err(CtyError::invalid_state(format!(
                "'.{op}()' requires a known list"
            ))),
        }
    }

    fn known_map(&self, op: &str) -> Result<&BTreeMap<String, CtyValue>> {
        if !matches!(self.ty, CtyType::Map(_)) {
            return Err(CtyError::type_mismatch(format!(
                "'.{op}()' can only be used on map values, not {}",
                self.ty
            )));
        }
        match &self.state {
            ValueState::Known(Payload::Map(entries)) => Ok(entries),
            ValueState::Known(_) => Err(inconsistent(&self.ty)),
            _ => Err(CtyError::invalid_state(format!(
                "'.{op}()' requires a known map"
            ))),
        }
    }

    fn revalidate(&self, native: NativeValue) -> Result<CtyValue> {
        Validator::new()
            .validate(&self.ty, native)
            .map(|v| v.with_marks(self.marks.iter().cloned()))
    }

    /// A new list with one more element
    pub fn append(&self, value: impl Into<NativeValue>) -> Result<CtyValue> {
        let items = self.known_list("append")?;
        let mut natives: Vec<NativeValue> = items.iter().cloned().map(NativeValue::Value).collect();
        natives.push(value.into());
        self.revalidate(NativeValue::List(natives))
    }

    /// A new list with the element at `index` replaced
    pub fn with_element_at(&self, index: usize, value: impl Into<NativeValue>) -> Result<CtyValue> {
        let items = self.known_list("with_element_at")?;
        if index >= items.len() {
            return Err(CtyError::lookup(format!(
                "List index {index} out of range for length {}",
                items.len()
            )));
        }
        let mut natives: Vec<NativeValue> = items.iter().cloned().map(NativeValue::Value).collect();
        natives[index] = value.into();
        self.revalidate(NativeValue::List(natives))
    }

    /// A new map with `key` set
    pub fn with_key(&self, key: impl Into<String>, value: impl Into<NativeValue>) -> Result<CtyValue> {
        let key = key.into();
        let entries = self.known_map("with_key")?;
        let mut natives: Vec<(NativeValue, NativeValue)> = entries
            .iter()
            .filter(|(k, _)| **k != key)
            .map(|(k, v)| (NativeValue::String(k.clone()), NativeValue::Value(v.clone())))
            .collect();
        natives.push((NativeValue::String(key), value.into()));
        self.revalidate(NativeValue::Map(natives))
    }

    /// A new map without `key`; missing keys return an unchanged copy
    pub fn without_key(&self, key: &str) -> Result<CtyValue> {
        let entries = self.known_map("without_key")?;
        if !entries.contains_key(key) {
            return Ok(self.clone());
        }
        let mut entries = entries.clone();
        entries.remove(key);
        let mut value = Self::from_payload(self.ty.clone(), Payload::Map(entries));
        value.marks = self.marks.clone();
        Ok(value)
    }
}

// === Equality, hashing and ordering ===

fn state_rank(state: &ValueState) -> u8 {
    match state {
        ValueState::Null => 0,
        ValueState::Unknown(_) => 1,
        ValueState::Known(_) => 2,
    }
}

fn compare_payload(ty: &CtyType, a: &Payload, b: &Payload) -> Ordering {
    match (a, b) {
        (Payload::String(x), Payload::String(y)) => x.cmp(y),
        (Payload::Number(x), Payload::Number(y)) => x.cmp(y),
        (Payload::Bool(x), Payload::Bool(y)) => x.cmp(y),
        (Payload::List(x), Payload::List(y))
        | (Payload::Set(x), Payload::Set(y))
        | (Payload::Tuple(x), Payload::Tuple(y)) => x.cmp(y),
        (Payload::Map(x), Payload::Map(y)) | (Payload::Object(x), Payload::Object(y)) => x.cmp(y),
        (Payload::Capsule(x), Payload::Capsule(y)) => match ty {
            CtyType::Capsule(capsule) => capsule.compare_values(x, y),
            _ => Ordering::Equal,
        },
        (Payload::Dynamic(x), Payload::Dynamic(y)) => x.cmp(y),
        _ => a.rank().cmp(&b.rank()),
    }
}

impl Ord for CtyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        state_rank(&self.state)
            .cmp(&state_rank(&other.state))
            .then_with(|| self.ty.cmp(&other.ty))
            .then_with(|| match (&self.state, &other.state) {
                (ValueState::Unknown(a), ValueState::Unknown(b)) => a.cmp(b),
                (ValueState::Known(a), ValueState::Known(b)) => compare_payload(&self.ty, a, b),
                _ => Ordering::Equal,
            })
    }
}

impl PartialOrd for CtyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for CtyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CtyValue {}

impl Hash for CtyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.hash(state);
        match &self.state {
            ValueState::Null => 0u8.hash(state),
            ValueState::Unknown(refinement) => {
                1u8.hash(state);
                refinement.hash(state);
            }
            ValueState::Known(payload) => {
                2u8.hash(state);
                match payload {
                    Payload::String(s) => s.hash(state),
                    Payload::Number(n) => n.hash(state),
                    Payload::Bool(b) => b.hash(state),
                    Payload::List(items) | Payload::Set(items) | Payload::Tuple(items) => {
                        items.hash(state)
                    }
                    Payload::Map(entries) | Payload::Object(entries) => entries.hash(state),
                    Payload::Capsule(value) => {
                        if let CtyType::Capsule(capsule) = &self.ty {
                            capsule.hash_value(value, state);
                        }
                    }
                    Payload::Dynamic(inner) => inner.hash(state),
                }
            }
        }
    }
}

impl fmt::Display for CtyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = match &self.state {
            ValueState::Null => return f.write_str("null"),
            ValueState::Unknown(_) => return f.write_str("(unknown)"),
            ValueState::Known(payload) => payload,
        };
        match payload {
            Payload::String(s) => write!(f, "{s:?}"),
            Payload::Number(n) => write!(f, "{}", n.normalize()),
            Payload::Bool(b) => write!(f, "{b}"),
            Payload::List(items) | Payload::Set(items) | Payload::Tuple(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Payload::Map(entries) | Payload::Object(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k} = {v}")?;
                }
                f.write_str("}")
            }
            Payload::Capsule(_) => write!(f, "{}(..)", self.ty),
            Payload::Dynamic(inner) => write!(f, "{inner}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_value_states() {
        let null = CtyValue::null(CtyType::String);
        assert!(null.is_null());
        assert!(matches!(null.raw_value(), Ok(NativeValue::Null)));

        let unknown = CtyValue::unknown(CtyType::String);
        assert!(unknown.is_unknown());
        assert!(matches!(
            unknown.raw_value(),
            Err(CtyError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_known_checks_payload() {
        let result = CtyValue::known(CtyType::Number, Payload::String("1".into()));
        assert!(matches!(result, Err(CtyError::TypeMismatch { .. })));

        let result = CtyValue::list(CtyType::String, vec![CtyValue::number(1)]);
        assert!(matches!(result, Err(CtyError::TypeMismatch { .. })));
    }

    #[test]
    fn test_set_is_canonical() {
        let set = CtyValue::set(
            CtyType::Number,
            vec![CtyValue::number(3), CtyValue::number(1), CtyValue::number(3)],
        )
        .unwrap();
        assert_eq!(set.length().unwrap(), 2);
        let elems: Vec<Decimal> = set
            .elements()
            .unwrap()
            .into_iter()
            .filter_map(CtyValue::as_number)
            .collect();
        assert_eq!(elems, vec![Decimal::from(1), Decimal::from(3)]);
    }

    #[test]
    fn test_canonical_order() {
        let null = CtyValue::null(CtyType::Number);
        let unknown = CtyValue::unknown(CtyType::Number);
        let known = CtyValue::number(-100);
        assert!(null < unknown);
        assert!(unknown < known);
    }

    #[test]
    fn test_hash_consistent_with_eq() {
        let mut set = HashSet::new();
        set.insert(CtyValue::string("a"));
        set.insert(CtyValue::string("a").with_mark("sensitive"));
        set.insert(CtyValue::number(Decimal::new(100, 2)));
        set.insert(CtyValue::number(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_string_nfc_normalized() {
        let decomposed = CtyValue::string("e\u{301}");
        assert_eq!(decomposed.as_str(), Some("\u{e9}"));
    }

    #[test]
    fn test_get_attr_propagates_marks() {
        let obj = CtyValue::object([("name", CtyValue::string("web"))]).with_mark("sensitive");
        let name = obj.get_attr("name").unwrap();
        assert_eq!(name.as_str(), Some("web"));
        assert!(name.is_marked());
        assert!(matches!(obj.get_attr("missing"), Err(CtyError::Lookup { .. })));
    }

    #[test]
    fn test_structural_updates() {
        let list = CtyValue::list(CtyType::String, vec![CtyValue::string("a")]).unwrap();
        let appended = list.append("b").unwrap();
        assert_eq!(appended.length().unwrap(), 2);
        assert_eq!(list.length().unwrap(), 1);

        let replaced = appended.with_element_at(0, "z").unwrap();
        assert_eq!(replaced.index(0).unwrap().as_str(), Some("z"));
        assert!(matches!(
            appended.with_element_at(5, "z"),
            Err(CtyError::Lookup { .. })
        ));

        let map = CtyValue::map(CtyType::Number, [("a", CtyValue::number(1))]).unwrap();
        let map = map.with_key("b", 2).unwrap();
        assert_eq!(map.length().unwrap(), 2);
        let map = map.without_key("a").unwrap();
        assert_eq!(map.length().unwrap(), 1);
        assert!(matches!(list.with_key("a", 1), Err(CtyError::TypeMismatch { .. })));
    }

    #[test]
    fn test_unknown_element_access() {
        let unknown = CtyValue::unknown(CtyType::list_of(CtyType::Bool));
        let elem = unknown.index(3).unwrap();
        assert!(elem.is_unknown());
        assert_eq!(elem.ty(), &CtyType::Bool);
        assert!(unknown.length().is_err());
    }

    #[test]
    fn test_dynamic_wrapping() {
        let wrapped = CtyValue::dynamic(CtyValue::string("x"));
        assert_eq!(wrapped.ty(), &CtyType::Dynamic);
        assert_eq!(wrapped.as_str(), Some("x"));
        assert_eq!(CtyValue::dynamic(wrapped.clone()), wrapped);
    }
}
