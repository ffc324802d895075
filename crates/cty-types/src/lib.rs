//! CTY type system
//!
//! This crate defines the CTY structural type system and value model:
//! - Types (primitives, collections, tuples, objects, capsules, dynamic)
//! - Values with null, unknown and known states, marks and refinements
//! - Validation of native data into typed values
//! - Type inference, conversion and unification
//! - Three-valued comparisons and JSON type specifications

pub mod capsule;
pub mod compare;
pub mod config;
pub mod convert;
pub mod inference;
pub mod marks;
pub mod native;
pub mod number;
pub mod refinement;
pub mod type_spec;
pub mod type_system;
pub mod unify;
pub mod validate;
pub mod value;

pub use capsule::*;
pub use config::*;
pub use convert::*;
pub use inference::*;
pub use marks::*;
pub use native::*;
pub use number::*;
pub use refinement::*;
pub use type_system::*;
pub use unify::*;
pub use validate::*;
pub use value::*;
