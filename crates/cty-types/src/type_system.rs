//! CTY Type System
//!
//! This module defines the structural CTY types:
//! - CtyType enum covering primitives, collections, structural types,
//!   capsules and the dynamic wildcard
//! - Object type definitions with optional attributes
//! - Structural equality, `usable_as` and the textual `ctype` render

use crate::CapsuleType;
use cty_diagnostics::{CtyError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The complete CTY type representation
///
/// Equality is structural and recursive. Capsule types are the one exception:
/// they compare by name, native type tag and the identity of their hooks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CtyType {
    // === Primitive Types ===
    /// Unicode string, NFC-normalized
    String,
    /// Exact decimal number
    Number,
    /// Boolean
    Bool,

    // === Collection Types ===
    /// Ordered homogeneous sequence
    List(Box<CtyType>),
    /// Unordered homogeneous collection of distinct values
    Set(Box<CtyType>),
    /// String-keyed homogeneous mapping
    Map(Box<CtyType>),

    // === Structural Types ===
    /// Fixed-arity heterogeneous sequence
    Tuple(Vec<CtyType>),
    /// Fixed set of named attributes
    Object(ObjectType),

    // === Extension Types ===
    /// Opaque wrapper around a host value
    Capsule(CapsuleType),

    /// The top type: every type is usable as dynamic
    Dynamic,
}

impl CtyType {
    // === Constructors ===

    /// Create a list type
    pub fn list_of(element_type: CtyType) -> Self {
        Self::List(Box::new(element_type))
    }

    /// Create a set type
    pub fn set_of(element_type: CtyType) -> Self {
        Self::Set(Box::new(element_type))
    }

    /// Create a map type
    pub fn map_of(element_type: CtyType) -> Self {
        Self::Map(Box::new(element_type))
    }

    /// Create a tuple type
    pub fn tuple_of(element_types: Vec<CtyType>) -> Self {
        Self::Tuple(element_types)
    }

    /// Create an object type where every attribute is required
    pub fn object<K: Into<String>>(attributes: impl IntoIterator<Item = (K, CtyType)>) -> Self {
        Self::Object(ObjectType::new(attributes))
    }

    /// Create an object type with optional attributes
    ///
    /// Every optional name must be one of the attributes.
    pub fn object_with_optional<K: Into<String>, O: Into<String>>(
        attributes: impl IntoIterator<Item = (K, CtyType)>,
        optional: impl IntoIterator<Item = O>,
    ) -> Result<Self> {
        ObjectType::with_optional(attributes, optional).map(Self::Object)
    }

    /// Create a capsule type
    pub fn capsule(capsule: CapsuleType) -> Self {
        Self::Capsule(capsule)
    }

    // === Type Properties ===

    /// Check if this is the dynamic type
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic)
    }

    /// Check if this is a primitive type
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::String | Self::Number | Self::Bool)
    }

    /// Check if this is a list, set or map type
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List(_) | Self::Set(_) | Self::Map(_))
    }

    /// Check if this is a tuple or object type
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Tuple(_) | Self::Object(_))
    }

    pub fn is_capsule(&self) -> bool {
        matches!(self, Self::Capsule(_))
    }

    /// Values of orderable types support `<`, `<=`, `>` and `>=`
    pub fn is_orderable(&self) -> bool {
        matches!(self, Self::Number | Self::String)
    }

    /// Whether values of this type may be set elements
    ///
    /// Lists, sets, maps and objects are mutable-shaped containers and are
    /// rejected; tuples and everything else are accepted.
    pub fn is_hashable(&self) -> bool {
        !matches!(
            self,
            Self::List(_) | Self::Set(_) | Self::Map(_) | Self::Object(_)
        )
    }

    // === Type Accessors ===

    /// Get the element type of a list, set or map
    pub fn element_type(&self) -> Option<&CtyType> {
        match self {
            Self::List(elem) | Self::Set(elem) | Self::Map(elem) => Some(elem),
            _ => None,
        }
    }

    /// Get the element types of a tuple
    pub fn tuple_elements(&self) -> Option<&[CtyType]> {
        match self {
            Self::Tuple(elems) => Some(elems),
            _ => None,
        }
    }

    /// Get the object definition
    pub fn object_type(&self) -> Option<&ObjectType> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get the capsule definition
    pub fn capsule_type(&self) -> Option<&CapsuleType> {
        match self {
            Self::Capsule(capsule) => Some(capsule),
            _ => None,
        }
    }

    // === Type Relationships ===

    /// Check if values of this type can be used where `target` is expected
    ///
    /// - Every type is usable as dynamic, dynamic only as itself
    /// - Collections are covariant in their element type
    /// - Tuples need equal arity and usable elements
    /// - Objects need the same attribute names, usable attribute types, and
    ///   every attribute optional here must be optional in the target
    pub fn usable_as(&self, target: &CtyType) -> bool {
        match (self, target) {
            (_, Self::Dynamic) => true,
            (Self::List(a), Self::List(b))
            | (Self::Set(a), Self::Set(b))
            | (Self::Map(a), Self::Map(b)) => a.usable_as(b),
            (Self::Tuple(a), Self::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.usable_as(y))
            }
            (Self::Object(a), Self::Object(b)) => a.usable_as(b),
            _ => self == target,
        }
    }

    /// Stable textual render of the type
    ///
    /// Used as a diagnostic label and as a key for caching by type.
    pub fn ctype(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Number => "number".to_string(),
            Self::Bool => "bool".to_string(),
            Self::Dynamic => "dynamic".to_string(),
            Self::List(elem) => format!("list({})", elem.ctype()),
            Self::Set(elem) => format!("set({})", elem.ctype()),
            Self::Map(elem) => format!("map({})", elem.ctype()),
            Self::Tuple(elems) => {
                let parts: Vec<String> = elems.iter().map(CtyType::ctype).collect();
                format!("tuple([{}])", parts.join(", "))
            }
            Self::Object(obj) => {
                let parts: Vec<String> = obj
                    .attributes
                    .iter()
                    .map(|(name, ty)| {
                        let marker = if obj.optional.contains(name) { "?" } else { "" };
                        format!("{name}{marker}: {}", ty.ctype())
                    })
                    .collect();
                format!("object({{{}}})", parts.join(", "))
            }
            Self::Capsule(capsule) => format!("capsule({})", capsule.name()),
        }
    }
}

impl fmt::Display for CtyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ctype())
    }
}

impl Default for CtyType {
    fn default() -> Self {
        Self::Dynamic
    }
}

/// Object type definition
///
/// Attributes are kept sorted by name so that rendering, hashing and wire
/// encoding are canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectType {
    attributes: BTreeMap<String, CtyType>,
    optional: BTreeSet<String>,
}

impl ObjectType {
    /// Create an object type where every attribute is required
    pub fn new<K: Into<String>>(attributes: impl IntoIterator<Item = (K, CtyType)>) -> Self {
        Self {
            attributes: attributes
                .into_iter()
                .map(|(name, ty)| (name.into(), ty))
                .collect(),
            optional: BTreeSet::new(),
        }
    }

    /// Create an object type with optional attributes
    pub fn with_optional<K: Into<String>, O: Into<String>>(
        attributes: impl IntoIterator<Item = (K, CtyType)>,
        optional: impl IntoIterator<Item = O>,
    ) -> Result<Self> {
        let mut obj = Self::new(attributes);
        for name in optional {
            let name = name.into();
            if !obj.attributes.contains_key(&name) {
                return Err(CtyError::invalid_type(format!(
                    "Optional attribute '{name}' is not an attribute of the object type"
                )));
            }
            obj.optional.insert(name);
        }
        Ok(obj)
    }

    /// Attribute types by name
    pub fn attributes(&self) -> &BTreeMap<String, CtyType> {
        &self.attributes
    }

    /// Names of optional attributes
    pub fn optional(&self) -> &BTreeSet<String> {
        &self.optional
    }

    pub fn attribute_type(&self, name: &str) -> Option<&CtyType> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn is_optional(&self, name: &str) -> bool {
        self.optional.contains(name)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Check if both definitions declare exactly the same attribute names
    pub fn same_names(&self, other: &ObjectType) -> bool {
        self.attributes.len() == other.attributes.len()
            && self.attributes.keys().eq(other.attributes.keys())
    }

    fn usable_as(&self, target: &ObjectType) -> bool {
        self.same_names(target)
            && self.optional.is_subset(&target.optional)
            && self
                .attributes
                .iter()
                .zip(target.attributes.values())
                .all(|((_, a), b)| a.usable_as(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cty_type_properties() {
        assert!(CtyType::Dynamic.is_dynamic());
        assert!(CtyType::Number.is_primitive());
        assert!(CtyType::list_of(CtyType::String).is_collection());
        assert!(CtyType::tuple_of(vec![]).is_structural());
        assert!(CtyType::tuple_of(vec![CtyType::String]).is_hashable());
        assert!(!CtyType::map_of(CtyType::String).is_hashable());
    }

    #[test]
    fn test_structural_equality() {
        let a = CtyType::object([("name", CtyType::String), ("tags", CtyType::list_of(CtyType::String))]);
        let b = CtyType::object([("tags", CtyType::list_of(CtyType::String)), ("name", CtyType::String)]);
        assert_eq!(a, b);
        assert_ne!(CtyType::list_of(CtyType::String), CtyType::set_of(CtyType::String));
    }

    #[test]
    fn test_usable_as() {
        let list_str = CtyType::list_of(CtyType::String);
        assert!(list_str.usable_as(&CtyType::Dynamic));
        assert!(list_str.usable_as(&CtyType::list_of(CtyType::Dynamic)));
        assert!(!CtyType::Dynamic.usable_as(&list_str));
        assert!(!CtyType::list_of(CtyType::Dynamic).usable_as(&list_str));

        let required = CtyType::object([("a", CtyType::String)]);
        let optional = CtyType::object_with_optional([("a", CtyType::String)], ["a"]).unwrap();
        assert!(required.usable_as(&optional));
        assert!(!optional.usable_as(&required));
    }

    #[test]
    fn test_optional_must_be_attribute() {
        let result = CtyType::object_with_optional([("a", CtyType::String)], ["b"]);
        assert!(matches!(result, Err(CtyError::InvalidType { .. })));
    }

    #[test]
    fn test_ctype_render() {
        assert_eq!(CtyType::map_of(CtyType::Bool).ctype(), "map(bool)");
        assert_eq!(
            CtyType::tuple_of(vec![CtyType::String, CtyType::Number]).ctype(),
            "tuple([string, number])"
        );
        let obj =
            CtyType::object_with_optional([("a", CtyType::String), ("b", CtyType::Number)], ["b"])
                .unwrap();
        assert_eq!(obj.to_string(), "object({a: string, b?: number})");
    }
}
