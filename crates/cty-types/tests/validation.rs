//! Validation tests for the CTY type system
//!
//! Tests validation of native data against types:
//! - Primitive coercions
//! - Collections, tuples and objects
//! - Error kinds, codes and paths
//! - Dynamic inference and envelopes

use cty_diagnostics::{CTY0011, CTY0012, CTY0013, CTY0014, CTY0015, CTY0016, CtyError, ValidationKind};
use cty_types::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use rust_decimal::Decimal;
use serde_json::json;

fn validation_error(result: cty_diagnostics::Result<CtyValue>) -> cty_diagnostics::ValidationError {
    match result {
        Err(CtyError::Validation(err)) => err,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

// === Primitives ===

#[rstest]
#[case(NativeValue::from("true"), true)]
#[case(NativeValue::from("False"), false)]
#[case(NativeValue::from("1"), true)]
#[case(NativeValue::from(0i64), false)]
#[case(NativeValue::from(true), true)]
fn test_bool_accepts(#[case] input: NativeValue, #[case] expected: bool) {
    assert_eq!(CtyType::Bool.validate(input).unwrap().as_bool(), Some(expected));
}

#[rstest]
#[case(NativeValue::from("yes"))]
#[case(NativeValue::from(2i64))]
#[case(NativeValue::from(1.0f64))]
fn test_bool_rejects(#[case] input: NativeValue) {
    let err = validation_error(CtyType::Bool.validate(input));
    assert_eq!(err.kind, ValidationKind::Bool);
    assert!(err.message.starts_with("Boolean validation error: "));
}

#[rstest]
#[case(NativeValue::from(42i64), "42")]
#[case(NativeValue::from(u64::MAX), "18446744073709551615")]
#[case(NativeValue::from("3.14"), "3.14")]
#[case(NativeValue::from("1e3"), "1000")]
#[case(NativeValue::from(0.1f64), "0.1")]
fn test_number_accepts(#[case] input: NativeValue, #[case] expected: &str) {
    let n = CtyType::Number.validate(input).unwrap().as_number().unwrap();
    assert_eq!(n.normalize().to_string(), expected);
}

#[test]
fn test_number_rejects_bool_and_infinity() {
    assert!(CtyType::Number.validate(true).is_err());
    let err = validation_error(CtyType::Number.validate(f64::INFINITY));
    assert!(err.message.contains("Cannot represent"));
}

#[test]
fn test_string_from_bytes_and_rejects_numbers() {
    let v = CtyType::String.validate(NativeValue::bytes(b"abc".to_vec())).unwrap();
    assert_eq!(v.as_str(), Some("abc"));

    let err = validation_error(CtyType::String.validate(5i64));
    assert_eq!(err.message, "String validation error: Cannot convert int to string.");
}

#[test]
fn test_string_normalization_configurable() {
    let decomposed = "e\u{301}";
    let normalized = CtyType::String.validate(decomposed).unwrap();
    assert_eq!(normalized.as_str(), Some("\u{e9}"));

    let config = CtyConfig {
        normalize_strings: false,
        ..CtyConfig::default()
    };
    let raw = Validator::with_config(&config)
        .validate(&CtyType::String, decomposed)
        .unwrap();
    assert_eq!(raw.as_str(), Some(decomposed));
}

// === Null and unknown ===

#[test]
fn test_null_and_unknown_inputs() {
    let ty = CtyType::list_of(CtyType::String);
    let null = ty.validate(NativeValue::Null).unwrap();
    assert!(null.is_null());
    assert_eq!(null.ty(), &ty);

    let unknown = ty.validate(NativeValue::Unknown).unwrap();
    assert!(unknown.is_unknown());
}

#[test]
fn test_null_list_element_rejected() {
    let err = validation_error(
        CtyType::list_of(CtyType::String).validate(vec![Some("a"), None]),
    );
    assert_eq!(err.code, CTY0015);
    assert_eq!(err.path.to_string(), "[1]");

    let dynamic = CtyType::list_of(CtyType::Dynamic)
        .validate(vec![Some("a"), None])
        .unwrap();
    assert_eq!(dynamic.length().unwrap(), 2);
}

// === Collections ===

#[test]
fn test_set_deduplicates() {
    let set = CtyType::set_of(CtyType::Number)
        .validate(vec![3i64, 1, 3, 2, 1])
        .unwrap();
    assert_eq!(set.length().unwrap(), 3);
}

#[test]
fn test_set_of_collections_not_hashable() {
    let ty = CtyType::set_of(CtyType::list_of(CtyType::String));
    let err = validation_error(ty.validate(vec![vec!["a"]]));
    assert!(err.is_unhashable());
    assert_eq!(err.code, CTY0011);
    assert_eq!(err.kind, ValidationKind::Set);
}

#[test]
fn test_map_keys_must_be_strings() {
    let data = NativeValue::Map(vec![
        (NativeValue::from("ok"), NativeValue::from("x")),
        (NativeValue::from(1i64), NativeValue::from(5i64)),
    ]);
    let err = validation_error(CtyType::map_of(CtyType::String).validate(data));
    assert_eq!(err.code, CTY0012);
    assert_eq!(
        err.message,
        "Map keys must be strings, but got key of type int"
    );
}

#[test]
fn test_map_allows_null_values() {
    let data = NativeValue::map([("a", None::<i64>), ("b", Some(2))]);
    let map = CtyType::map_of(CtyType::Number).validate(data).unwrap();
    assert!(map.get_key("a").unwrap().is_null());
    assert_eq!(map.get_key("b").unwrap().as_number(), Some(Decimal::from(2)));
}

#[test]
fn test_map_value_error_path() {
    let data = NativeValue::map([("retries", "many")]);
    let err = validation_error(CtyType::map_of(CtyType::Number).validate(data));
    assert_eq!(err.kind, ValidationKind::Map);
    assert_eq!(err.path.to_string(), "['retries']");
}

#[test]
fn test_tuple_arity() {
    let ty = CtyType::tuple_of(vec![CtyType::String, CtyType::Number]);
    let ok = ty.validate(NativeValue::tuple(vec!["a".into(), 1i64.into()])).unwrap();
    assert_eq!(ok.index(1).unwrap().as_number(), Some(Decimal::ONE));

    let err = validation_error(ty.validate(vec!["a"]));
    assert_eq!(err.code, CTY0016);
}

// === Objects ===

#[test]
fn test_object_attribute_error_names_value() {
    let ty = CtyType::object([("age", CtyType::Number)]);
    let err = validation_error(ty.validate(json!({"age": "not-a-number"})));
    assert_eq!(err.kind, ValidationKind::Attribute);
    assert_eq!(err.path.to_string(), "age");
    assert!(err.message.contains("not-a-number"));
    assert!(err.to_string().starts_with("At age: "));
}

#[test]
fn test_object_unknown_attributes_sorted() {
    let ty = CtyType::object([("a", CtyType::String)]);
    let err = validation_error(ty.validate(json!({"a": "x", "zeta": 1, "beta": 2})));
    assert_eq!(err.code, CTY0014);
    assert!(err.message.ends_with("Unknown attributes: beta, zeta"));
}

#[test]
fn test_object_required_and_optional() {
    let ty = CtyType::object_with_optional(
        [("name", CtyType::String), ("port", CtyType::Number)],
        ["port"],
    )
    .unwrap();

    let v = ty.validate(json!({"name": "web"})).unwrap();
    let port = v.get_attr("port").unwrap();
    assert!(port.is_null());
    assert_eq!(port.ty(), &CtyType::Number);

    let err = validation_error(ty.validate(json!({"port": 80})));
    assert_eq!(err.code, CTY0013);
    assert_eq!(err.path.to_string(), "name");

    let err = validation_error(ty.validate(json!({"name": null})));
    assert_eq!(err.code, CTY0015);
    assert!(err.message.contains("Attribute cannot be null"));

    assert!(ty.validate(json!({"name": "web", "port": null})).is_ok());
}

#[test]
fn test_deep_error_keeps_origin() {
    let ty = CtyType::object([(
        "config",
        CtyType::list_of(CtyType::map_of(CtyType::Number)),
    )]);
    let data = json!({"config": [{"retries": 3}, {"retries": "x"}]});
    let err = validation_error(ty.validate(data));
    assert_eq!(err.path.to_string(), "config[1]['retries']");
    assert_eq!(err.kind, ValidationKind::Attribute);
    assert_eq!(err.origin, ValidationKind::Number);
    assert!(err.value.is_some());
}

// === Dynamic ===

#[test]
fn test_dynamic_wraps_typed_value() {
    let inner = CtyValue::number(7);
    let v = CtyType::Dynamic.validate(inner.clone()).unwrap();
    assert_eq!(v.ty(), &CtyType::Dynamic);
    assert_eq!(v.inner_dynamic(), &inner);

    let again = CtyType::Dynamic.validate(v.clone()).unwrap();
    assert_eq!(again, v);
}

#[test]
fn test_dynamic_bytes_pair_is_inferred() {
    let data = NativeValue::List(vec![
        NativeValue::bytes(b"not a type".to_vec()),
        NativeValue::from("x"),
    ]);
    let v = CtyType::Dynamic.validate(data).unwrap();
    assert_eq!(v.inner_dynamic().ty(), &CtyType::list_of(CtyType::String));
}

#[test]
fn test_dynamic_rejects_capsule_inference() {
    let err = validation_error(CtyType::Dynamic.validate(NativeValue::capsule(1u8)));
    assert_eq!(err.kind, ValidationKind::Dynamic);
}

// === Capsules ===

#[derive(Debug, PartialEq)]
struct Endpoint(String);

#[test]
fn test_capsule_checks_native_type() {
    let ty = CtyType::Capsule(CapsuleType::new::<Endpoint>("Endpoint"));
    let v = ty.validate(NativeValue::capsule(Endpoint("a".into()))).unwrap();
    assert_eq!(v.ty(), &ty);

    let err = validation_error(ty.validate(NativeValue::capsule(5u8)));
    assert_eq!(err.kind, ValidationKind::Capsule);
    assert!(ty.validate("a").is_err());
}

// === Typed value re-validation ===

#[test]
fn test_typed_value_revalidated_when_type_differs() {
    let list = CtyValue::list(CtyType::String, vec![CtyValue::string("1")]).unwrap();
    let set = CtyType::set_of(CtyType::String).validate(list).unwrap();
    assert_eq!(set.ty(), &CtyType::set_of(CtyType::String));

    let strings = CtyValue::list(CtyType::String, vec![CtyValue::string("x")]).unwrap();
    let err = validation_error(CtyType::list_of(CtyType::Number).validate(strings));
    assert_eq!(err.path.to_string(), "[0]");
}
