//! CTY structural type system for Rust
//!
//! This crate provides the complete CTY stack:
//! - Types, values, marks and refinements
//! - Validation of native data with path-tracked diagnostics
//! - Conversion, unification and three-valued comparisons
//! - The msgpack wire codec shared with go-cty
//!
//! # Example
//!
//! ```
//! use cty::{CtyType, cty_from_msgpack, cty_to_msgpack};
//!
//! let ty = CtyType::object([("name", CtyType::String), ("port", CtyType::Number)]);
//! let value = ty.validate(serde_json::json!({"name": "web", "port": 8080}))?;
//!
//! let bytes = cty_to_msgpack(&value, &ty)?;
//! assert_eq!(cty_from_msgpack(&bytes, &ty)?, value);
//! # Ok::<(), cty::CtyError>(())
//! ```

// Re-export all public APIs from internal crates
pub use cty_diagnostics as diagnostics;
pub use cty_msgpack as msgpack;
pub use cty_types as types;

// Convenience re-exports
pub use cty_diagnostics::{CtyError, CtyPath, PathStep, Result, ValidationError, ValidationKind};
pub use cty_msgpack::{MsgPackCodec, WireCodec, cty_from_msgpack, cty_to_msgpack};
pub use cty_types::{
    CapsuleOps, CapsuleType, CtyConfig, CtyMark, CtyType, CtyValue, NativeValue, Refinement,
    Validator, convert, infer_type, unify,
};
