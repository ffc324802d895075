//! End-to-end scenarios across the CTY stack
//!
//! Tests complete workflows:
//! - Validate, convert, compare and encode in one flow
//! - Diagnostic messages users see
//! - Configuration driving validator and codec limits

use cty::*;
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde_json::json;

// === Scenarios ===

#[test]
fn test_attribute_error_names_raw_value() {
    let ty = CtyType::object([("age", CtyType::Number)]);
    let err = ty.validate(json!({"age": "not-a-number"})).unwrap_err();

    let validation = err.as_validation().unwrap();
    assert_eq!(validation.kind, ValidationKind::Attribute);
    assert_eq!(validation.path.to_string(), "age");
    assert_snapshot!(err, @"CTY0002: At age: Number validation error: Cannot convert string 'not-a-number' to number");
}

#[test]
fn test_unify_objects() {
    let a = CtyType::object([("a", CtyType::String)]);
    let ab = CtyType::object([("a", CtyType::String), ("b", CtyType::Number)]);
    assert_eq!(unify([&a, &ab]), CtyType::Dynamic);

    let optional = CtyType::object_with_optional([("a", CtyType::String)], ["a"]).unwrap();
    let unified = unify([&a, &optional]);
    assert_eq!(unified, optional);
    assert_snapshot!(unified, @"object({a?: string})");
}

#[test]
fn test_number_string_conversion() {
    let text = convert(&CtyValue::number(123), &CtyType::String).unwrap();
    assert_eq!(text.as_str(), Some("123"));

    let err = convert(&CtyValue::string("not-a-number"), &CtyType::Number).unwrap_err();
    assert!(matches!(err, CtyError::Conversion { .. }));
    assert_snapshot!(err, @"CTY0101: Cannot convert string to number: 'not-a-number' is not a valid number");
}

#[test]
fn test_null_list_survives_the_wire() {
    let ty = CtyType::list_of(CtyType::String);
    let bytes = cty_to_msgpack(&CtyValue::null(ty.clone()), &ty).unwrap();
    let decoded = cty_from_msgpack(&bytes, &ty).unwrap();
    assert!(decoded.is_null());
    assert_eq!(decoded.ty(), &ty);
}

#[test]
fn test_refined_unknown_comparisons() {
    let below_ten = CtyValue::unknown_with_refinement(
        CtyType::Number,
        Refinement::new().with_number_upper_bound(10, false),
    )
    .unwrap();
    let fifteen = CtyValue::number(15);
    assert!(below_ten.greater_than(&fifteen).unwrap().is_false());
    assert!(below_ten.less_than(&fifteen).unwrap().is_true());

    let a = CtyValue::unknown(CtyType::Number);
    assert!(a.less_than(&CtyValue::unknown(CtyType::Number)).unwrap().is_unknown());

    let err = fifteen.less_than(&CtyValue::string("15")).unwrap_err();
    assert_snapshot!(err, @"CTY0202: Cannot compare values of type number and string");
}

// === Workflows ===

#[test]
fn test_provider_config_workflow() {
    let schema = CtyType::object_with_optional(
        [
            ("region", CtyType::String),
            ("retries", CtyType::Number),
            ("endpoints", CtyType::map_of(CtyType::String)),
            ("extra", CtyType::Dynamic),
        ],
        ["retries", "extra"],
    )
    .unwrap();

    let config = schema
        .validate(json!({
            "region": "eu-west-1",
            "endpoints": {"s3": "https://s3.local"},
        }))
        .unwrap()
        .with_mark(CtyMark::sensitive());
    assert!(config.get_attr("retries").unwrap().is_null());
    assert!(config.get_attr("region").unwrap().has_mark(&CtyMark::sensitive()));

    let bytes = MsgPackCodec::new().encode(&config, &schema).unwrap();
    let decoded = MsgPackCodec::new().decode(&bytes, &schema).unwrap();
    assert_eq!(decoded, config);
    assert!(!decoded.is_marked());

    let as_map = convert(
        &decoded.get_attr("endpoints").unwrap(),
        &CtyType::object([("s3", CtyType::String)]),
    )
    .unwrap();
    assert_eq!(as_map.get_attr("s3").unwrap().as_str(), Some("https://s3.local"));
}

#[test]
fn test_dynamic_payload_workflow() {
    let data = json!({"replicas": 3, "zones": ["a", "b"], "weight": 0.25});
    let inferred = infer_type(&NativeValue::from(data.clone())).unwrap();
    assert_snapshot!(inferred, @"object({replicas: number, weight: number, zones: list(string)})");

    let value = CtyType::Dynamic.validate(data).unwrap();
    assert_eq!(value.inner_dynamic().ty(), &inferred);

    let bytes = cty_to_msgpack(&value, &CtyType::Dynamic).unwrap();
    let decoded = cty_from_msgpack(&bytes, &CtyType::Dynamic).unwrap();
    assert_eq!(decoded, value);
    assert_eq!(
        decoded.inner_dynamic().get_attr("weight").unwrap().as_number(),
        Some(Decimal::new(25, 2))
    );

    let typed = cty_from_msgpack(&bytes, &inferred).unwrap();
    assert_eq!(&typed, value.inner_dynamic());
}

#[test]
fn test_type_json_interop() {
    let ty = CtyType::object_with_optional(
        [("name", CtyType::String), ("tags", CtyType::set_of(CtyType::String))],
        ["tags"],
    )
    .unwrap();
    let json = ty.to_type_json().unwrap();
    assert_snapshot!(json, @r#"["object",{"name":"string","tags":["set","string"]},["tags"]]"#);
    assert_eq!(CtyType::from_type_json(&json).unwrap(), ty);
}

// === Capsules ===

#[derive(Debug, PartialEq)]
struct Port(u16);

#[test]
fn test_capsule_conversion_hook() {
    let ops = CapsuleOps::new().with_convert(|value, target| {
        let port = value.downcast_ref::<Port>()?;
        match target {
            CtyType::Number => Some(CtyValue::number(port.0)),
            CtyType::String => Some(CtyValue::string(port.0.to_string())),
            _ => None,
        }
    });
    let capsule = CapsuleType::with_ops::<Port>("Port", ops);
    let ty = CtyType::Capsule(capsule);

    let value = ty.validate(NativeValue::capsule(Port(8080))).unwrap();
    assert_eq!(convert(&value, &CtyType::Number).unwrap().as_number(), Some(Decimal::from(8080)));
    assert_eq!(convert(&value, &CtyType::String).unwrap().as_str(), Some("8080"));
    assert!(convert(&value, &CtyType::Bool).is_err());
    assert!(cty_to_msgpack(&value, &ty).is_err());
}

// === Configuration ===

#[test]
fn test_config_limits_flow_through() {
    let config = CtyConfig::from_lookup(|name| match name {
        "CTY_MAX_VALIDATION_DEPTH" => Some("2".to_string()),
        "CTY_MAX_CODEC_DEPTH" => Some("2".to_string()),
        _ => None,
    })
    .unwrap();

    let ty = CtyType::list_of(CtyType::list_of(CtyType::list_of(CtyType::Number)));
    let data = json!([[[1]]]);
    let err = Validator::with_config(&config).validate(&ty, data.clone()).unwrap_err();
    assert!(matches!(err, CtyError::RecursionLimit { limit: 2, .. }));

    let value = ty.validate(data).unwrap();
    let err = MsgPackCodec::with_config(&config).encode(&value, &ty).unwrap_err();
    assert_eq!(err.path().unwrap().to_string(), "[0][0][0]");
}

#[test]
fn test_invalid_config_value() {
    let err = CtyConfig::from_lookup(|name| {
        (name == "CTY_NORMALIZE_STRINGS").then(|| "maybe".to_string())
    })
    .unwrap_err();
    assert!(matches!(err, CtyError::Config { .. }));
}
