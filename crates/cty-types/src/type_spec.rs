//! JSON type specifications
//!
//! The canonical JSON form of a type, also carried inside the dynamic wire
//! envelope:
//!
//! ```text
//! "string" | "number" | "bool" | "dynamic"
//! ["list", T]  ["set", T]  ["map", T]
//! ["tuple", [T, ...]]
//! ["object", {"name": T, ...}]
//! ["object", {"name": T, ...}, ["optional", ...]]
//! ```

use crate::CtyType;
use cty_diagnostics::{CtyError, Result};
use serde_json::{Map, Value, json};

impl CtyType {
    /// Render the JSON specification of this type
    ///
    /// Capsule types have no JSON form.
    pub fn to_type_spec(&self) -> Result<Value> {
        let spec = match self {
            Self::String => json!("string"),
            Self::Number => json!("number"),
            Self::Bool => json!("bool"),
            Self::Dynamic => json!("dynamic"),
            Self::List(elem) => json!(["list", elem.to_type_spec()?]),
            Self::Set(elem) => json!(["set", elem.to_type_spec()?]),
            Self::Map(elem) => json!(["map", elem.to_type_spec()?]),
            Self::Tuple(elems) => {
                let elems = elems
                    .iter()
                    .map(CtyType::to_type_spec)
                    .collect::<Result<Vec<_>>>()?;
                json!(["tuple", elems])
            }
            Self::Object(obj) => {
                let mut attrs = Map::new();
                for (name, ty) in obj.attributes() {
                    attrs.insert(name.clone(), ty.to_type_spec()?);
                }
                if obj.optional().is_empty() {
                    json!(["object", attrs])
                } else {
                    json!(["object", attrs, obj.optional()])
                }
            }
            Self::Capsule(capsule) => {
                return Err(CtyError::invalid_type_spec(format!(
                    "capsule type {} has no JSON form",
                    capsule.name()
                )));
            }
        };
        Ok(spec)
    }

    /// Compact JSON text of the type specification, keys sorted
    pub fn to_type_json(&self) -> Result<String> {
        let spec = self.to_type_spec()?;
        serde_json::to_string(&spec).map_err(|e| CtyError::invalid_type_spec(e.to_string()))
    }

    /// Parse a type from its JSON specification
    pub fn from_type_spec(spec: &Value) -> Result<Self> {
        match spec {
            Value::String(name) => match name.as_str() {
                "string" => Ok(Self::String),
                "number" => Ok(Self::Number),
                "bool" => Ok(Self::Bool),
                "dynamic" => Ok(Self::Dynamic),
                other => Err(CtyError::invalid_type_spec(format!(
                    "unknown primitive type '{other}'"
                ))),
            },
            Value::Array(parts) => match parts.as_slice() {
                [Value::String(kind), elem] if kind == "list" => {
                    Ok(Self::list_of(Self::from_type_spec(elem)?))
                }
                [Value::String(kind), elem] if kind == "set" => {
                    Ok(Self::set_of(Self::from_type_spec(elem)?))
                }
                [Value::String(kind), elem] if kind == "map" => {
                    Ok(Self::map_of(Self::from_type_spec(elem)?))
                }
                [Value::String(kind), Value::Array(elems)] if kind == "tuple" => {
                    let elems = elems
                        .iter()
                        .map(Self::from_type_spec)
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Self::tuple_of(elems))
                }
                [Value::String(kind), Value::Object(attrs)] if kind == "object" => {
                    Ok(Self::object(parse_attributes(attrs)?))
                }
                [Value::String(kind), Value::Object(attrs), Value::Array(optional)]
                    if kind == "object" =>
                {
                    let optional = optional
                        .iter()
                        .map(|name| match name {
                            Value::String(name) => Ok(name.clone()),
                            other => Err(CtyError::invalid_type_spec(format!(
                                "optional attribute names must be strings, got {other}"
                            ))),
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Self::object_with_optional(parse_attributes(attrs)?, optional)
                        .map_err(|e| CtyError::invalid_type_spec(e.to_string()))
                }
                _ => Err(CtyError::invalid_type_spec(format!(
                    "unrecognized type specification {spec}"
                ))),
            },
            other => Err(CtyError::invalid_type_spec(format!(
                "unrecognized type specification {other}"
            ))),
        }
    }

    /// Parse a type from JSON text
    pub fn from_type_json(json: &str) -> Result<Self> {
        let spec: Value =
            serde_json::from_str(json).map_err(|e| CtyError::invalid_type_spec(e.to_string()))?;
        Self::from_type_spec(&spec)
    }
}

fn parse_attributes(attrs: &Map<String, Value>) -> Result<Vec<(String, CtyType)>> {
    attrs
        .iter()
        .map(|(name, spec)| -> Result<(String, CtyType)> {
            Ok((name.clone(), CtyType::from_type_spec(spec)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CapsuleType;

    #[test]
    fn test_primitive_specs() {
        assert_eq!(CtyType::String.to_type_json().unwrap(), r#""string""#);
        assert_eq!(CtyType::from_type_json(r#""dynamic""#).unwrap(), CtyType::Dynamic);
    }

    #[test]
    fn test_object_spec_sorted_and_compact() {
        let ty = CtyType::object_with_optional(
            [("zone", CtyType::String), ("count", CtyType::Number)],
            ["zone"],
        )
        .unwrap();
        let json = ty.to_type_json().unwrap();
        assert_eq!(json, r#"["object",{"count":"number","zone":"string"},["zone"]]"#);
        assert_eq!(CtyType::from_type_json(&json).unwrap(), ty);
    }

    #[test]
    fn test_nested_spec() {
        let ty = CtyType::map_of(CtyType::tuple_of(vec![
            CtyType::set_of(CtyType::Bool),
            CtyType::Dynamic,
        ]));
        let spec = ty.to_type_spec().unwrap();
        assert_eq!(spec, json!(["map", ["tuple", [["set", "bool"], "dynamic"]]]));
        assert_eq!(CtyType::from_type_spec(&spec).unwrap(), ty);
    }

    #[test]
    fn test_invalid_specs() {
        for bad in [r#""integer""#, r#"["list"]"#, r#"["object",{},["a"]]"#, "{", "42"] {
            let err = CtyType::from_type_json(bad).unwrap_err();
            assert!(matches!(err, CtyError::InvalidTypeSpec { .. }), "{bad}");
            assert!(err.to_string().contains("Invalid Terraform type specification"));
        }
        let capsule = CtyType::Capsule(CapsuleType::new::<u8>("Byte"));
        assert!(capsule.to_type_spec().is_err());
    }
}
