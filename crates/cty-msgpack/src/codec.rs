//! Codec entry points
//!
//! A [`WireCodec`] turns a value into bytes using its type as the schema,
//! and turns bytes back into a value given the same or a compatible type.

use crate::{decode, encode};
use cty_diagnostics::Result;
use cty_types::{CtyConfig, CtyType, CtyValue, DEFAULT_MAX_DEPTH};
use log::debug;

/// Extension code carrying an unknown value
pub const MSGPACK_EXT_UNKNOWN: i8 = 0;

/// Extension code carrying an unknown value with refinements
///
/// Refinements are not part of the wire state, so a payload under this code
/// decodes to a plain unknown.
pub const MSGPACK_EXT_REFINED_UNKNOWN: i8 = 12;

/// Trait for CTY wire codecs
pub trait WireCodec {
    /// Encode a value using `schema` to drive the layout
    fn encode(&self, value: &CtyValue, schema: &CtyType) -> Result<Vec<u8>>;

    /// Decode bytes produced for `schema`
    fn decode(&self, bytes: &[u8], schema: &CtyType) -> Result<CtyValue>;
}

/// MessagePack codec
///
/// The layout matches the go-cty msgpack encoding, so bytes can be
/// exchanged with Terraform and its providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgPackCodec {
    /// Maximum nesting depth for a single encode or decode call
    pub max_depth: usize,
}

impl Default for MsgPackCodec {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl MsgPackCodec {
    /// Create a codec with the default depth bound
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &CtyConfig) -> Self {
        Self {
            max_depth: config.max_codec_depth,
        }
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl WireCodec for MsgPackCodec {
    fn encode(&self, value: &CtyValue, schema: &CtyType) -> Result<Vec<u8>> {
        encode::encode(value, schema, self.max_depth)
    }

    fn decode(&self, bytes: &[u8], schema: &CtyType) -> Result<CtyValue> {
        decode::decode(bytes, schema, self.max_depth).inspect_err(|err| {
            debug!("msgpack decode as {schema} failed: {err}");
        })
    }
}

/// Encode a value with the default codec
pub fn cty_to_msgpack(value: &CtyValue, schema: &CtyType) -> Result<Vec<u8>> {
    MsgPackCodec::default().encode(value, schema)
}

/// Decode bytes with the default codec
pub fn cty_from_msgpack(bytes: &[u8], schema: &CtyType) -> Result<CtyValue> {
    MsgPackCodec::default().decode(bytes, schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cty_diagnostics::{CTY0300, CTY0400, DeserializationKind};
    use cty_types::{CapsuleType, Refinement};
    use std::sync::Arc;

    #[test]
    fn test_null_and_unknown_bytes() {
        let ty = CtyType::String;
        assert_eq!(cty_to_msgpack(&CtyValue::null(ty.clone()), &ty).unwrap(), vec![0xc0]);
        assert_eq!(
            cty_to_msgpack(&CtyValue::unknown(ty.clone()), &ty).unwrap(),
            vec![0xd4, 0x00, 0x00]
        );
    }

    #[test]
    fn test_refinement_not_encoded() {
        let refined = CtyValue::unknown_with_refinement(
            CtyType::Number,
            Refinement::new().with_number_lower_bound(0, true),
        )
        .unwrap();
        let bytes = cty_to_msgpack(&refined, &CtyType::Number).unwrap();
        assert_eq!(bytes, vec![0xd4, 0x00, 0x00]);

        let back = cty_from_msgpack(&bytes, &CtyType::Number).unwrap();
        assert!(back.is_unknown());
        assert!(back.refinement().is_none());
    }

    #[test]
    fn test_refined_ext_decodes_to_unknown() {
        // fixext1, code 12, payload {1: false}
        let bytes = [0xd5, 0x0c, 0x81, 0x01, 0xc2];
        let value = cty_from_msgpack(&bytes, &CtyType::Number).unwrap();
        assert!(value.is_unknown());
        assert_eq!(value.ty(), &CtyType::Number);
    }

    #[test]
    fn test_unknown_ext_code_rejected() {
        let bytes = [0xd4, 0x05, 0x00];
        let err = cty_from_msgpack(&bytes, &CtyType::String).unwrap_err();
        assert_eq!(err.deserialization_kind(), Some(DeserializationKind::Unsupported));
    }

    #[test]
    fn test_capsule_not_encodable() {
        #[derive(Debug)]
        struct Socket;

        let capsule = CapsuleType::new::<Socket>("Socket");
        let value = CtyValue::capsule(&capsule, Arc::new(Socket)).unwrap();
        let err = cty_to_msgpack(&value, &CtyType::Capsule(capsule)).unwrap_err();
        assert_eq!(err.code(), CTY0300);
    }

    #[test]
    fn test_depth_bound() {
        let mut ty = CtyType::String;
        let mut value = CtyValue::string("leaf");
        for _ in 0..5 {
            value = CtyValue::list(ty.clone(), vec![value]).unwrap();
            ty = CtyType::list_of(ty);
        }
        let shallow = MsgPackCodec::with_max_depth(3);
        assert_eq!(shallow.encode(&value, &ty).unwrap_err().code(), CTY0400);

        let bytes = cty_to_msgpack(&value, &ty).unwrap();
        assert_eq!(shallow.decode(&bytes, &ty).unwrap_err().code(), CTY0400);
        assert_eq!(cty_from_msgpack(&bytes, &ty).unwrap(), value);
    }

    #[test]
    fn test_with_config() {
        let config = CtyConfig {
            max_codec_depth: 7,
            ..CtyConfig::default()
        };
        assert_eq!(MsgPackCodec::with_config(&config).max_depth, 7);
        assert_eq!(MsgPackCodec::new().max_depth, DEFAULT_MAX_DEPTH);
    }
}
