//! CTY error codes following a structured numbering system
//!
//! Error code ranges:
//! - CTY0001-CTY0099: Validation errors (native data against a type)
//! - CTY0100-CTY0199: Conversion errors
//! - CTY0200-CTY0299: Value model errors (state, comparison, lookup)
//! - CTY0300-CTY0399: Codec errors (serialization, deserialization)
//! - CTY0400-CTY0499: System errors (recursion, type specs, configuration)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    /// Check if this is a validation error (0001-0099)
    pub const fn is_validation_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    /// Check if this is a conversion error (0100-0199)
    pub const fn is_conversion_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    /// Check if this is a value model error (0200-0299)
    pub const fn is_value_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Check if this is a codec error (0300-0399)
    pub const fn is_codec_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Check if this is a system error (0400-0499)
    pub const fn is_system_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CTY{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Validation errors (0001-0099)
    map.insert(1, ErrorInfo::new("String validation failed"));
    map.insert(2, ErrorInfo::new("Number validation failed"));
    map.insert(3, ErrorInfo::new("Bool validation failed"));
    map.insert(4, ErrorInfo::new("List validation failed"));
    map.insert(5, ErrorInfo::new("Set validation failed"));
    map.insert(6, ErrorInfo::new("Map validation failed"));
    map.insert(7, ErrorInfo::new("Tuple validation failed"));
    map.insert(8, ErrorInfo::new("Object attribute validation failed"));
    map.insert(9, ErrorInfo::new("Capsule validation failed"));
    map.insert(10, ErrorInfo::new("Dynamic validation failed"));
    map.insert(11, ErrorInfo::new("Set element is not hashable")
        .with_help("Lists, sets, maps and objects cannot be set elements; use a tuple or a primitive"));
    map.insert(12, ErrorInfo::new("Map key is not a string"));
    map.insert(13, ErrorInfo::new("Missing required attribute")
        .with_help("Provide the attribute or declare it optional on the object type"));
    map.insert(14, ErrorInfo::new("Unknown attribute"));
    map.insert(15, ErrorInfo::new("Null value not permitted here"));
    map.insert(16, ErrorInfo::new("Tuple arity mismatch"));
    map.insert(17, ErrorInfo::new("Number cannot be represented")
        .with_help("Numbers are exact decimals; NaN, infinities and values beyond 28 significant digits are rejected"));

    // Conversion errors (0100-0199)
    map.insert(100, ErrorInfo::new("Conversion not supported"));
    map.insert(101, ErrorInfo::new("Value cannot be converted to target type"));
    map.insert(102, ErrorInfo::new("Capsule type has no conversion hook"));
    map.insert(103, ErrorInfo::new("Capsule conversion hook declined"));
    map.insert(104, ErrorInfo::new("Capsule conversion hook returned the wrong type"));
    map.insert(105, ErrorInfo::new("Missing attribute during conversion"));
    map.insert(106, ErrorInfo::new("Unexpected attribute during conversion"));
    map.insert(107, ErrorInfo::new("Number cannot be represented exactly")
        .with_help("The text has more than 28 significant digits or lies outside the decimal range"));

    // Value model errors (0200-0299)
    map.insert(200, ErrorInfo::new("Type mismatch"));
    map.insert(201, ErrorInfo::new("Invalid value state")
        .with_help("Unknown values have no raw value; check is_unknown() first"));
    map.insert(202, ErrorInfo::new("Incomparable types"));
    map.insert(203, ErrorInfo::new("Lookup failed"));
    map.insert(204, ErrorInfo::new("Invalid refinement"));
    map.insert(205, ErrorInfo::new("Invalid type construction"));

    // Codec errors (0300-0399)
    map.insert(300, ErrorInfo::new("Serialization failed"));
    map.insert(301, ErrorInfo::new("Malformed wire data"));
    map.insert(302, ErrorInfo::new("Wire data does not match schema")
        .with_help("Decode with the type the value was encoded with, or with dynamic"));
    map.insert(303, ErrorInfo::new("Unsupported wire construct"));

    // System errors (0400-0499)
    map.insert(400, ErrorInfo::new("Maximum recursion depth exceeded")
        .with_help("Raise max_validation_depth or max_codec_depth, or check for cyclic input"));
    map.insert(401, ErrorInfo::new("Invalid type specification"));
    map.insert(402, ErrorInfo::new("Invalid configuration"));

    map
});

// Convenient error code constants

// Validation errors
pub const CTY0001: ErrorCode = ErrorCode::new(1);
pub const CTY0002: ErrorCode = ErrorCode::new(2);
pub const CTY0003: ErrorCode = ErrorCode::new(3);
pub const CTY0004: ErrorCode = ErrorCode::new(4);
pub const CTY0005: ErrorCode = ErrorCode::new(5);
pub const CTY0006: ErrorCode = ErrorCode::new(6);
pub const CTY0007: ErrorCode = ErrorCode::new(7);
pub const CTY0008: ErrorCode = ErrorCode::new(8);
pub const CTY0009: ErrorCode = ErrorCode::new(9);
pub const CTY0010: ErrorCode = ErrorCode::new(10);
pub const CTY0011: ErrorCode = ErrorCode::new(11);
pub const CTY0012: ErrorCode = ErrorCode::new(12);
pub const CTY0013: ErrorCode = ErrorCode::new(13);
pub const CTY0014: ErrorCode = ErrorCode::new(14);
pub const CTY0015: ErrorCode = ErrorCode::new(15);
pub const CTY0016: ErrorCode = ErrorCode::new(16);
pub const CTY0017: ErrorCode = ErrorCode::new(17);

// Conversion errors
pub const CTY0100: ErrorCode = ErrorCode::new(100);
pub const CTY0101: ErrorCode = ErrorCode::new(101);
pub const CTY0102: ErrorCode = ErrorCode::new(102);
pub const CTY0103: ErrorCode = ErrorCode::new(103);
pub const CTY0104: ErrorCode = ErrorCode::new(104);
pub const CTY0105: ErrorCode = ErrorCode::new(105);
pub const CTY0106: ErrorCode = ErrorCode::new(106);
pub const CTY0107: ErrorCode = ErrorCode::new(107);

// Value model errors
pub const CTY0200: ErrorCode = ErrorCode::new(200);
pub const CTY0201: ErrorCode = ErrorCode::new(201);
pub const CTY0202: ErrorCode = ErrorCode::new(202);
pub const CTY0203: ErrorCode = ErrorCode::new(203);
pub const CTY0204: ErrorCode = ErrorCode::new(204);
pub const CTY0205: ErrorCode = ErrorCode::new(205);

// Codec errors
pub const CTY0300: ErrorCode = ErrorCode::new(300);
pub const CTY0301: ErrorCode = ErrorCode::new(301);
pub const CTY0302: ErrorCode = ErrorCode::new(302);
pub const CTY0303: ErrorCode = ErrorCode::new(303);

// System errors
pub const CTY0400: ErrorCode = ErrorCode::new(400);
pub const CTY0401: ErrorCode = ErrorCode::new(401);
pub const CTY0402: ErrorCode = ErrorCode::new(402);
