//! CTY error types

use crate::{
    CTY0001, CTY0002, CTY0003, CTY0004, CTY0005, CTY0006, CTY0007, CTY0008, CTY0009, CTY0010,
    CTY0011, CTY0100, CTY0200, CTY0201, CTY0202, CTY0203, CTY0204, CTY0205, CTY0300, CTY0301,
    CTY0302, CTY0303, CTY0400, CTY0401, CTY0402, CtyPath, ErrorCode, PathStep,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest value rendering kept on a validation error
const MAX_VALUE_REPR: usize = 200;

/// Structural kind a validation error is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationKind {
    String,
    Number,
    Bool,
    List,
    Set,
    Map,
    Tuple,
    /// Object attributes
    Attribute,
    Capsule,
    Dynamic,
}

impl ValidationKind {
    /// Default error code for a failure of this kind
    pub const fn default_code(&self) -> ErrorCode {
        match self {
            Self::String => CTY0001,
            Self::Number => CTY0002,
            Self::Bool => CTY0003,
            Self::List => CTY0004,
            Self::Set => CTY0005,
            Self::Map => CTY0006,
            Self::Tuple => CTY0007,
            Self::Attribute => CTY0008,
            Self::Capsule => CTY0009,
            Self::Dynamic => CTY0010,
        }
    }

    fn message_prefix(&self) -> &'static str {
        match self {
            Self::String => "String validation error: ",
            Self::Number => "Number validation error: ",
            Self::Bool => "Boolean validation error: ",
            _ => "",
        }
    }
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::List => "list",
            Self::Set => "set",
            Self::Map => "map",
            Self::Tuple => "tuple",
            Self::Attribute => "attribute",
            Self::Capsule => "capsule",
            Self::Dynamic => "dynamic",
        };
        f.write_str(name)
    }
}

/// A failure to validate native data against a type
///
/// `kind` names the outermost container the failure surfaced through, while
/// `origin` keeps the kind of the node that actually rejected the data. The
/// message is composed once at the failing node and never rewritten as the
/// error unwinds; only the path grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub code: ErrorCode,
    pub kind: ValidationKind,
    pub origin: ValidationKind,
    pub path: CtyPath,
    pub message: String,
    /// Truncated rendering of the offending value
    pub value: Option<String>,
}

impl ValidationError {
    /// Create an error of the given kind with that kind's default code
    pub fn new(kind: ValidationKind, message: impl AsRef<str>) -> Self {
        Self::with_code(kind, kind.default_code(), message)
    }

    /// Create an error with an explicit code
    pub fn with_code(kind: ValidationKind, code: ErrorCode, message: impl AsRef<str>) -> Self {
        Self {
            code,
            kind,
            origin: kind,
            path: CtyPath::root(),
            message: format!("{}{}", kind.message_prefix(), message.as_ref()),
            value: None,
        }
    }

    /// Attach a rendering of the offending value
    pub fn with_value(mut self, value: impl fmt::Debug) -> Self {
        let mut repr = format!("{value:?}");
        if repr.len() > MAX_VALUE_REPR {
            let mut cut = MAX_VALUE_REPR;
            while !repr.is_char_boundary(cut) {
                cut -= 1;
            }
            repr.truncate(cut);
            repr.push_str("...");
        }
        self.value = Some(repr);
        self
    }

    /// Attach the error to a step below the current root
    pub fn at(mut self, step: PathStep) -> Self {
        self.path.prepend(step);
        self
    }

    /// Re-attribute a nested failure to an enclosing container
    pub fn nested(mut self, kind: ValidationKind, step: PathStep) -> Self {
        self.kind = kind;
        self.path.prepend(step);
        self
    }

    /// Whether this is the distinct "set element not hashable" failure
    pub fn is_unhashable(&self) -> bool {
        self.code == CTY0011
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "At {}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Deserialization failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeserializationKind {
    /// The bytes are not valid wire data
    Malformed,
    /// The bytes are well-formed but disagree with the decoding type
    SchemaMismatch,
    /// A construct this codec does not handle, such as an unknown extension
    Unsupported,
}

/// A diagnostic message derived from an error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
    pub path: Option<String>,
    pub help: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {} - {}", self.code, self.message)?;
        if let Some(path) = &self.path {
            write!(f, " at {}", path)?;
        }
        Ok(())
    }
}

fn at_path(path: &CtyPath, message: &str) -> String {
    if path.is_empty() {
        message.to_string()
    } else {
        format!("At {path}: {message}")
    }
}

/// Main CTY error type
#[derive(Debug, Clone, Error)]
pub enum CtyError {
    /// Native data did not conform to a type
    #[error("{code}: {err}", code = .0.code, err = .0)]
    Validation(ValidationError),

    /// Explicit conversion between types failed
    #[error("{code}: {}", at_path(.path, .message))]
    Conversion {
        code: ErrorCode,
        from: String,
        to: String,
        path: CtyPath,
        message: String,
    },

    /// A value's payload disagrees with its type, or an operation was applied
    /// to a value of the wrong type
    #[error("{code}: {message}")]
    TypeMismatch { code: ErrorCode, message: String },

    /// Two values cannot be compared
    #[error("{code}: {message}")]
    IncomparableTypes {
        code: ErrorCode,
        left: String,
        right: String,
        message: String,
    },

    /// Operation not valid for the value's state (e.g. raw value of an unknown)
    #[error("{code}: {message}")]
    InvalidState { code: ErrorCode, message: String },

    /// Index, attribute or key lookup failed
    #[error("{code}: {message}")]
    Lookup { code: ErrorCode, message: String },

    /// Refinement does not apply to the type or is self-contradictory
    #[error("{code}: {message}")]
    InvalidRefinement { code: ErrorCode, message: String },

    /// Type constructor received inconsistent parts
    #[error("{code}: {message}")]
    InvalidType { code: ErrorCode, message: String },

    /// Wire encoding failed
    #[error("{code}: {}", at_path(.path, .message))]
    Serialization {
        code: ErrorCode,
        path: CtyPath,
        message: String,
    },

    /// Wire decoding failed
    #[error("{code}: {}", at_path(.path, .message))]
    Deserialization {
        code: ErrorCode,
        kind: DeserializationKind,
        path: CtyPath,
        message: String,
    },

    /// Input nested deeper than the configured bound
    #[error("{code}: Maximum recursion depth of {limit} exceeded at {path}")]
    RecursionLimit {
        code: ErrorCode,
        limit: usize,
        path: CtyPath,
    },

    /// JSON type specification could not be parsed or produced
    #[error("{code}: {message}")]
    InvalidTypeSpec { code: ErrorCode, message: String },

    /// Configuration value could not be parsed
    #[error("{code}: {message}")]
    Config { code: ErrorCode, message: String },
}

impl CtyError {
    /// Create a conversion error naming both types
    pub fn conversion(
        code: ErrorCode,
        from: impl Into<String>,
        to: impl Into<String>,
        detail: impl AsRef<str>,
    ) -> Self {
        let from = from.into();
        let to = to.into();
        let detail = detail.as_ref();
        let message = if detail.is_empty() {
            format!("Cannot convert {from} to {to}")
        } else {
            format!("Cannot convert {from} to {to}: {detail}")
        };
        Self::Conversion {
            code,
            from,
            to,
            path: CtyPath::root(),
            message,
        }
    }

    /// Create an unsupported conversion error
    pub fn unsupported_conversion(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::conversion(CTY0100, from, to, "")
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch {
            code: CTY0200,
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            code: CTY0201,
            message: message.into(),
        }
    }

    pub fn incomparable(left: impl Into<String>, right: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IncomparableTypes {
            code: CTY0202,
            left: left.into(),
            right: right.into(),
            message: message.into(),
        }
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup {
            code: CTY0203,
            message: message.into(),
        }
    }

    pub fn invalid_refinement(message: impl Into<String>) -> Self {
        Self::InvalidRefinement {
            code: CTY0204,
            message: message.into(),
        }
    }

    pub fn invalid_type(message: impl Into<String>) -> Self {
        Self::InvalidType {
            code: CTY0205,
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            code: CTY0300,
            path: CtyPath::root(),
            message: message.into(),
        }
    }

    /// Create a deserialization error for bytes that are not valid wire data
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Deserialization {
            code: CTY0301,
            kind: DeserializationKind::Malformed,
            path: CtyPath::root(),
            message: message.into(),
        }
    }

    /// Create a deserialization error naming the encoded and expected types
    pub fn schema_mismatch(encoded: impl fmt::Display, expected: impl fmt::Display) -> Self {
        Self::Deserialization {
            code: CTY0302,
            kind: DeserializationKind::SchemaMismatch,
            path: CtyPath::root(),
            message: format!("Encoded {encoded} is not usable as {expected}"),
        }
    }

    pub fn unsupported_wire(message: impl Into<String>) -> Self {
        Self::Deserialization {
            code: CTY0303,
            kind: DeserializationKind::Unsupported,
            path: CtyPath::root(),
            message: message.into(),
        }
    }

    pub fn recursion_limit(limit: usize, path: CtyPath) -> Self {
        Self::RecursionLimit {
            code: CTY0400,
            limit,
            path,
        }
    }

    pub fn invalid_type_spec(message: impl AsRef<str>) -> Self {
        Self::InvalidTypeSpec {
            code: CTY0401,
            message: format!("Invalid Terraform type specification: {}", message.as_ref()),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: CTY0402,
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(err) => err.code,
            Self::Conversion { code, .. }
            | Self::TypeMismatch { code, .. }
            | Self::IncomparableTypes { code, .. }
            | Self::InvalidState { code, .. }
            | Self::Lookup { code, .. }
            | Self::InvalidRefinement { code, .. }
            | Self::InvalidType { code, .. }
            | Self::Serialization { code, .. }
            | Self::Deserialization { code, .. }
            | Self::RecursionLimit { code, .. }
            | Self::InvalidTypeSpec { code, .. }
            | Self::Config { code, .. } => *code,
        }
    }

    /// Get the path if the error is path-aware
    pub fn path(&self) -> Option<&CtyPath> {
        match self {
            Self::Validation(err) => Some(&err.path),
            Self::Conversion { path, .. }
            | Self::Serialization { path, .. }
            | Self::Deserialization { path, .. }
            | Self::RecursionLimit { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Attach the error to a step below the current root
    ///
    /// Errors without a path are returned unchanged.
    pub fn at(mut self, step: PathStep) -> Self {
        match &mut self {
            Self::Validation(err) => err.path.prepend(step),
            Self::Conversion { path, .. }
            | Self::Serialization { path, .. }
            | Self::Deserialization { path, .. }
            | Self::RecursionLimit { path, .. } => path.prepend(step),
            _ => {}
        }
        self
    }

    /// Get the validation error if this is one
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }

    /// Get the deserialization class if this is a decode failure
    pub fn deserialization_kind(&self) -> Option<DeserializationKind> {
        match self {
            Self::Deserialization { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = self.code();
        let message = match self {
            Self::Validation(err) => err.message.clone(),
            Self::Conversion { message, .. }
            | Self::TypeMismatch { message, .. }
            | Self::IncomparableTypes { message, .. }
            | Self::InvalidState { message, .. }
            | Self::Lookup { message, .. }
            | Self::InvalidRefinement { message, .. }
            | Self::InvalidType { message, .. }
            | Self::Serialization { message, .. }
            | Self::Deserialization { message, .. }
            | Self::InvalidTypeSpec { message, .. }
            | Self::Config { message, .. } => message.clone(),
            Self::RecursionLimit { limit, .. } => {
                format!("Maximum recursion depth of {limit} exceeded")
            }
        };
        Diagnostic {
            code,
            message,
            path: self.path().filter(|p| !p.is_empty()).map(ToString::to_string),
            help: code.info().help.map(str::to_string),
        }
    }
}

impl From<ValidationError> for CtyError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}
