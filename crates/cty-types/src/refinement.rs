//! Refinements of unknown values
//!
//! A refinement narrows what an unknown value may turn out to be without
//! making it known: a numeric range, a string prefix, a collection length
//! range, or whether it will be null.

use crate::CtyType;
use cty_diagnostics::{CtyError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One end of a numeric range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NumberBound {
    pub value: Decimal,
    pub inclusive: bool,
}

impl NumberBound {
    pub fn inclusive(value: impl Into<Decimal>) -> Self {
        Self {
            value: value.into(),
            inclusive: true,
        }
    }

    pub fn exclusive(value: impl Into<Decimal>) -> Self {
        Self {
            value: value.into(),
            inclusive: false,
        }
    }
}

/// Partial knowledge about an unknown value
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Refinement {
    /// `Some(true)` when the value will be null, `Some(false)` when it will not
    pub is_known_null: Option<bool>,
    pub string_prefix: Option<String>,
    pub number_lower_bound: Option<NumberBound>,
    pub number_upper_bound: Option<NumberBound>,
    pub collection_length_lower_bound: Option<u64>,
    pub collection_length_upper_bound: Option<u64>,
}

impl Refinement {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value will not be null
    pub fn not_null(mut self) -> Self {
        self.is_known_null = Some(false);
        self
    }

    pub fn with_string_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.string_prefix = Some(prefix.into());
        self
    }

    pub fn with_number_lower_bound(mut self, value: impl Into<Decimal>, inclusive: bool) -> Self {
        self.number_lower_bound = Some(NumberBound {
            value: value.into(),
            inclusive,
        });
        self
    }

    pub fn with_number_upper_bound(mut self, value: impl Into<Decimal>, inclusive: bool) -> Self {
        self.number_upper_bound = Some(NumberBound {
            value: value.into(),
            inclusive,
        });
        self
    }

    pub fn with_length_lower_bound(mut self, len: u64) -> Self {
        self.collection_length_lower_bound = Some(len);
        self
    }

    pub fn with_length_upper_bound(mut self, len: u64) -> Self {
        self.collection_length_upper_bound = Some(len);
        self
    }

    /// Check if the refinement carries no information
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Reject refinements that do not apply to `ty` or describe no value
    pub fn check_applicable(&self, ty: &CtyType) -> Result<()> {
        let has_number = self.number_lower_bound.is_some() || self.number_upper_bound.is_some();
        if has_number && !matches!(ty, CtyType::Number) {
            return Err(CtyError::invalid_refinement(format!(
                "Numeric bounds cannot refine a value of type {ty}"
            )));
        }
        if self.string_prefix.is_some() && !matches!(ty, CtyType::String) {
            return Err(CtyError::invalid_refinement(format!(
                "A string prefix cannot refine a value of type {ty}"
            )));
        }
        let has_length = self.collection_length_lower_bound.is_some()
            || self.collection_length_upper_bound.is_some();
        if has_length && !ty.is_collection() {
            return Err(CtyError::invalid_refinement(format!(
                "Length bounds cannot refine a value of type {ty}"
            )));
        }

        if let (Some(lower), Some(upper)) = (&self.number_lower_bound, &self.number_upper_bound) {
            let empty = lower.value > upper.value
                || (lower.value == upper.value && !(lower.inclusive && upper.inclusive));
            if empty {
                return Err(CtyError::invalid_refinement(format!(
                    "Numeric bounds describe an empty range: lower {} is not below upper {}",
                    lower.value, upper.value
                )));
            }
        }
        if let (Some(lower), Some(upper)) = (
            self.collection_length_lower_bound,
            self.collection_length_upper_bound,
        ) {
            if lower > upper {
                return Err(CtyError::invalid_refinement(format!(
                    "Length lower bound {lower} exceeds upper bound {upper}"
                )));
            }
        }
        if self.is_known_null == Some(true) && !self.is_empty_except_null() {
            return Err(CtyError::invalid_refinement(
                "A value known to be null cannot carry other refinements",
            ));
        }
        Ok(())
    }

    fn is_empty_except_null(&self) -> bool {
        Self {
            is_known_null: None,
            ..self.clone()
        }
        .is_empty()
    }

    /// The closed or open numeric range this refinement allows
    pub fn number_range(&self) -> (Option<NumberBound>, Option<NumberBound>) {
        (self.number_lower_bound, self.number_upper_bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_bounds_only_for_numbers() {
        let r = Refinement::new().with_number_upper_bound(10, false);
        assert!(r.check_applicable(&CtyType::Number).is_ok());
        assert!(r.check_applicable(&CtyType::String).is_err());
    }

    #[test]
    fn test_length_bounds_for_collections() {
        let r = Refinement::new().with_length_lower_bound(1).with_length_upper_bound(3);
        assert!(r.check_applicable(&CtyType::list_of(CtyType::String)).is_ok());
        assert!(r.check_applicable(&CtyType::Number).is_err());

        let inverted = Refinement::new().with_length_lower_bound(4).with_length_upper_bound(3);
        assert!(inverted.check_applicable(&CtyType::set_of(CtyType::Number)).is_err());
    }

    #[test]
    fn test_degenerate_range_accepted_only_inclusive() {
        let point = Refinement::new()
            .with_number_lower_bound(5, true)
            .with_number_upper_bound(5, true);
        assert!(point.check_applicable(&CtyType::Number).is_ok());

        let empty = Refinement::new()
            .with_number_lower_bound(5, false)
            .with_number_upper_bound(5, true);
        assert!(empty.check_applicable(&CtyType::Number).is_err());
    }
}
