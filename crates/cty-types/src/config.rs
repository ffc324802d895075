//! Runtime configuration
//!
//! Defaults can be overridden from the environment:
//! - `CTY_MAX_VALIDATION_DEPTH`
//! - `CTY_MAX_CODEC_DEPTH`
//! - `CTY_NORMALIZE_STRINGS`

use cty_diagnostics::{CtyError, Result};
use serde::{Deserialize, Serialize};

/// Default bound on nesting for validation, inference and the codec
pub const DEFAULT_MAX_DEPTH: usize = 500;

pub const ENV_MAX_VALIDATION_DEPTH: &str = "CTY_MAX_VALIDATION_DEPTH";
pub const ENV_MAX_CODEC_DEPTH: &str = "CTY_MAX_CODEC_DEPTH";
pub const ENV_NORMALIZE_STRINGS: &str = "CTY_NORMALIZE_STRINGS";

/// Configuration shared by the validator and the wire codec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CtyConfig {
    /// Maximum nesting depth accepted by validation and inference
    pub max_validation_depth: usize,
    /// Maximum nesting depth accepted by encode and decode
    pub max_codec_depth: usize,
    /// Apply NFC normalization to strings during validation
    pub normalize_strings: bool,
}

impl Default for CtyConfig {
    fn default() -> Self {
        Self {
            max_validation_depth: DEFAULT_MAX_DEPTH,
            max_codec_depth: DEFAULT_MAX_DEPTH,
            normalize_strings: true,
        }
    }
}

impl CtyConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_MAX_VALIDATION_DEPTH) {
            config.max_validation_depth = parse_depth(ENV_MAX_VALIDATION_DEPTH, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_CODEC_DEPTH) {
            config.max_codec_depth = parse_depth(ENV_MAX_CODEC_DEPTH, &raw)?;
        }
        if let Some(raw) = lookup(ENV_NORMALIZE_STRINGS) {
            config.normalize_strings = parse_flag(ENV_NORMALIZE_STRINGS, &raw)?;
        }
        log::debug!("Loaded CTY configuration: {config:?}");
        Ok(config)
    }

    /// Parse configuration from a JSON document; missing fields keep defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CtyError::config(format!("Invalid configuration: {e}")))
    }
}

fn parse_depth(key: &str, raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(depth) if depth > 0 => Ok(depth),
        _ => Err(CtyError::config(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(CtyError::config(format!("{key} must be a boolean, got '{raw}'"))),
    }
}
