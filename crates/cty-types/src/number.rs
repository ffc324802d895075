//! Exact decimal parsing for number literals
//!
//! Numbers are held as [`Decimal`], which carries 28 significant digits. A
//! literal that would need rounding, or that lies outside that range, is
//! rejected as [`NumberError::NotRepresentable`] instead of being approximated.

use regex::Regex;
use rust_decimal::Decimal;
use std::sync::LazyLock;

static DECIMAL_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?\d+(\.\d+)?([eE][+-]?\d+)?$").expect("decimal literal regex must compile")
});

/// Why text or a float could not become a number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberError {
    /// Not a decimal literal at all
    Invalid,
    /// A well-formed number with no exact decimal representation
    NotRepresentable,
}

/// Parse a decimal literal exactly, accepting exponent forms like `-1.5e2`
pub fn parse_decimal(text: &str) -> Result<Decimal, NumberError> {
    let text = text.trim();
    if !DECIMAL_LITERAL.is_match(text) {
        return Err(NumberError::Invalid);
    }
    let parsed = text
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|_| NumberError::NotRepresentable)?;

    let mantissa = text.find(['e', 'E']).map_or(text, |i| &text[..i]);
    if significant_digits(mantissa) != significant_digits(&parsed.normalize().to_string()) {
        return Err(NumberError::NotRepresentable);
    }
    Ok(parsed)
}

/// Exact decimal for a finite float, via its shortest round-trip form
pub fn decimal_from_f64(f: f64) -> Result<Decimal, NumberError> {
    if !f.is_finite() {
        return Err(NumberError::NotRepresentable);
    }
    parse_decimal(&format!("{f:e}"))
}

fn significant_digits(text: &str) -> String {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.trim_matches('0').to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("42", Decimal::from(42))]
    #[case(" -1.5e2 ", Decimal::from(-150))]
    #[case("+0.25", Decimal::new(25, 2))]
    #[case("1.500", Decimal::new(15, 1))]
    #[case("0", Decimal::ZERO)]
    #[case("79228162514264337593543950335", Decimal::MAX)]
    fn test_exact_literals(#[case] text: &str, #[case] expected: Decimal) {
        assert_eq!(parse_decimal(text), Ok(expected));
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("1.")]
    #[case("1e")]
    #[case("NaN")]
    fn test_invalid_literals(#[case] text: &str) {
        assert_eq!(parse_decimal(text), Err(NumberError::Invalid));
    }

    #[rstest]
    #[case("1e30")]
    #[case("123456789012345678901234567890")]
    #[case("0.12345678901234567890123456789012")]
    #[case("1e-40")]
    fn test_rounding_is_rejected(#[case] text: &str) {
        assert_eq!(parse_decimal(text), Err(NumberError::NotRepresentable));
    }

    #[test]
    fn test_floats() {
        assert_eq!(decimal_from_f64(0.1), Ok(Decimal::new(1, 1)));
        assert_eq!(decimal_from_f64(-2.5e3), Ok(Decimal::from(-2500)));
        assert_eq!(decimal_from_f64(f64::NAN), Err(NumberError::NotRepresentable));
        assert_eq!(decimal_from_f64(1e300), Err(NumberError::NotRepresentable));
    }
}
