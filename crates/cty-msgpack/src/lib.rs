//! MessagePack wire codec for CTY values
//!
//! This crate provides:
//! - The [`WireCodec`] trait and its msgpack implementation
//! - Encoding of `(value, type)` pairs into canonical msgpack bytes
//! - Decoding of msgpack bytes against a schema type
//! - The self-describing envelope used wherever the schema is dynamic

pub mod codec;
mod decode;
mod encode;

pub use codec::*;
