//! CTY diagnostics and error handling
//!
//! This crate provides the error handling infrastructure shared by the CTY
//! type system and its wire codec, including error codes, value paths and
//! path-aware validation errors.

mod error;
mod error_code;
mod path;

pub use error::*;
pub use error_code::*;
pub use path::*;

/// Result type for CTY operations
pub type Result<T> = std::result::Result<T, CtyError>;
