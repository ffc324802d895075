//! Host-side data accepted by validation and produced by `raw_value`

use crate::{CapsuleValue, CtyType, CtyValue, parse_decimal};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Untyped host data
#[derive(Debug, Clone)]
pub enum NativeValue {
    Null,
    /// A not-yet-known value of whatever type it is validated against
    Unknown,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<NativeValue>),
    Tuple(Vec<NativeValue>),
    Set(Vec<NativeValue>),
    /// Key/value pairs in insertion order; keys are usually strings
    Map(Vec<(NativeValue, NativeValue)>),
    Capsule(CapsuleValue),
    /// Data tagged with the type it was produced under
    Envelope(CtyType, Box<NativeValue>),
    /// An already typed value
    Value(CtyValue),
}

impl NativeValue {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    pub fn tuple(items: Vec<NativeValue>) -> Self {
        Self::Tuple(items)
    }

    pub fn set(items: Vec<NativeValue>) -> Self {
        Self::Set(items)
    }

    /// A string-keyed map
    pub fn map<K: Into<String>, V: Into<NativeValue>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Self::String(k.into()), v.into()))
                .collect(),
        )
    }

    /// Tag `data` with an explicit type, as a dynamic envelope does on the wire
    pub fn envelope(ty: CtyType, data: impl Into<NativeValue>) -> Self {
        Self::Envelope(ty, Box::new(data.into()))
    }

    /// Wrap a host object for a capsule type
    pub fn capsule<T: Any + Send + Sync>(value: T) -> Self {
        Self::Capsule(Arc::new(value))
    }

    pub fn is_null(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Value(v) => v.is_null(),
            _ => false,
        }
    }

    /// Short name of the host shape, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Unknown => "unknown",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::UInt(_) => "int",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Capsule(_) => "capsule",
            Self::Envelope(..) => "envelope",
            Self::Value(_) => "value",
        }
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for NativeValue {
            fn from(n: $t) -> Self {
                Self::Int(i64::from(n))
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for NativeValue {
            fn from(n: $t) -> Self {
                Self::UInt(u64::from(n))
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u8, u16, u32, u64);

impl From<isize> for NativeValue {
    fn from(n: isize) -> Self {
        i64::try_from(n).map_or(Self::Float(n as f64), Self::Int)
    }
}

impl From<usize> for NativeValue {
    fn from(n: usize) -> Self {
        u64::try_from(n).map_or(Self::Float(n as f64), Self::UInt)
    }
}

impl From<bool> for NativeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f32> for NativeValue {
    fn from(n: f32) -> Self {
        Self::Float(f64::from(n))
    }
}

impl From<f64> for NativeValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<Decimal> for NativeValue {
    fn from(n: Decimal) -> Self {
        Self::Decimal(n)
    }
}

impl From<&str> for NativeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<CtyValue> for NativeValue {
    fn from(v: CtyValue) -> Self {
        Self::Value(v)
    }
}

impl From<CapsuleValue> for NativeValue {
    fn from(v: CapsuleValue) -> Self {
        Self::Capsule(v)
    }
}

impl<T: Into<NativeValue>> From<Option<T>> for NativeValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<NativeValue>> From<Vec<T>> for NativeValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<NativeValue>> From<BTreeMap<K, V>> for NativeValue {
    fn from(entries: BTreeMap<K, V>) -> Self {
        Self::map(entries)
    }
}

impl<K: Into<String>, V: Into<NativeValue>> From<HashMap<K, V>> for NativeValue {
    fn from(entries: HashMap<K, V>) -> Self {
        Self::map(entries)
    }
}

impl<K: Into<String>, V: Into<NativeValue>> From<IndexMap<K, V>> for NativeValue {
    fn from(entries: IndexMap<K, V>) -> Self {
        Self::map(entries)
    }
}

impl From<serde_json::Value> for NativeValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    // Parse the literal so decimals like 0.1 stay exact.
                    let literal = n.to_string();
                    parse_decimal(&literal)
                        .map_or_else(|_| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Decimal)
                }
            }
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(entries) => Self::map(entries),
        }
    }
}
