//! Three-valued comparisons
//!
//! Comparisons return a Bool value that is unknown when the answer depends on
//! an unknown operand. Refined unknown numbers take part as intervals, so a
//! bound can settle the answer before the value is known. Known numbers are
//! the degenerate interval `[x, x]` and an unrefined unknown is unbounded.
//!
//! Every result carries the union of the marks on both operands.

use crate::{CtyType, CtyValue, MarkSet, NumberBound, ValueState};
use cty_diagnostics::{CtyError, Result};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl OrderOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

/// Range a number may take; `None` ends are unbounded
#[derive(Debug, Clone, Copy)]
struct Interval {
    lower: Option<NumberBound>,
    upper: Option<NumberBound>,
}

impl Interval {
    fn of(value: &CtyValue) -> Option<Self> {
        if !matches!(value.ty(), CtyType::Number) {
            return None;
        }
        match &value.state {
            ValueState::Known(_) => value.as_number().map(|n| Self {
                lower: Some(NumberBound::inclusive(n)),
                upper: Some(NumberBound::inclusive(n)),
            }),
            ValueState::Unknown(refinement) => {
                let (lower, upper) = refinement
                    .as_ref()
                    .map_or((None, None), |r| r.number_range());
                Some(Self { lower, upper })
            }
            ValueState::Null => None,
        }
    }
}

/// Every value of `a` is below every value of `b`
fn strictly_below(a: &Interval, b: &Interval) -> bool {
    match (a.upper, b.lower) {
        (Some(upper), Some(lower)) => {
            upper.value < lower.value
                || (upper.value == lower.value && !(upper.inclusive && lower.inclusive))
        }
        _ => false,
    }
}

/// Every value of `a` is at most every value of `b`
fn at_most(a: &Interval, b: &Interval) -> bool {
    match (a.upper, b.lower) {
        (Some(upper), Some(lower)) => upper.value <= lower.value,
        _ => false,
    }
}

fn less_than(a: &Interval, b: &Interval) -> Option<bool> {
    if strictly_below(a, b) {
        Some(true)
    } else if at_most(b, a) {
        Some(false)
    } else {
        None
    }
}

fn less_or_equal(a: &Interval, b: &Interval) -> Option<bool> {
    if at_most(a, b) {
        Some(true)
    } else if strictly_below(b, a) {
        Some(false)
    } else {
        None
    }
}

fn combined_marks(a: &CtyValue, b: &CtyValue) -> MarkSet {
    [a, a.inner_dynamic(), b, b.inner_dynamic()]
        .into_iter()
        .flat_map(|v| v.marks().iter().cloned())
        .collect()
}

fn bool_result(result: Option<bool>, a: &CtyValue, b: &CtyValue) -> CtyValue {
    let value = match result {
        Some(b) => CtyValue::bool(b),
        None => CtyValue::unknown(CtyType::Bool),
    };
    value.with_marks(combined_marks(a, b))
}

/// The type both operands share, looking through unknown or null dynamics
fn shared_type<'a>(a: &'a CtyValue, b: &'a CtyValue) -> Result<&'a CtyType> {
    match (a.ty(), b.ty()) {
        (CtyType::Dynamic, ty) | (ty, CtyType::Dynamic) => Ok(ty),
        (x, y) if x == y => Ok(x),
        (x, y) => Err(CtyError::incomparable(
            x.ctype(),
            y.ctype(),
            format!("Cannot compare values of type {x} and {y}"),
        )),
    }
}

fn known_null(value: &CtyValue) -> Option<bool> {
    value.refinement().and_then(|r| r.is_known_null)
}

impl CtyValue {
    /// Three-valued equality
    pub fn equals(&self, other: &CtyValue) -> Result<CtyValue> {
        let (a, b) = (self.inner_dynamic(), other.inner_dynamic());
        shared_type(a, b)?;
        let result = match (&a.state, &b.state) {
            (ValueState::Null, ValueState::Null) => Some(true),
            (ValueState::Null, ValueState::Known(_)) | (ValueState::Known(_), ValueState::Null) => {
                Some(false)
            }
            (ValueState::Null, ValueState::Unknown(_)) => known_null(b),
            (ValueState::Unknown(_), ValueState::Null) => known_null(a),
            _ if a.is_wholly_known() && b.is_wholly_known() => Some(a == b),
            _ => {
                let disjoint = match (Interval::of(a), Interval::of(b)) {
                    (Some(x), Some(y)) => strictly_below(&x, &y) || strictly_below(&y, &x),
                    _ => false,
                };
                let null_mismatch = (a.is_known() && known_null(b) == Some(true))
                    || (b.is_known() && known_null(a) == Some(true));
                (disjoint || null_mismatch).then_some(false)
            }
        };
        Ok(bool_result(result, self, other))
    }

    /// Three-valued inequality
    pub fn not_equals(&self, other: &CtyValue) -> Result<CtyValue> {
        let eq = self.equals(other)?;
        Ok(match eq.as_bool() {
            Some(b) => CtyValue::bool(!b).with_marks(eq.marks().iter().cloned()),
            None => eq,
        })
    }

    pub fn less_than(&self, other: &CtyValue) -> Result<CtyValue> {
        self.ordered(other, OrderOp::Lt)
    }

    pub fn less_than_or_equal(&self, other: &CtyValue) -> Result<CtyValue> {
        self.ordered(other, OrderOp::Le)
    }

    pub fn greater_than(&self, other: &CtyValue) -> Result<CtyValue> {
        self.ordered(other, OrderOp::Gt)
    }

    pub fn greater_than_or_equal(&self, other: &CtyValue) -> Result<CtyValue> {
        self.ordered(other, OrderOp::Ge)
    }

    fn ordered(&self, other: &CtyValue, op: OrderOp) -> Result<CtyValue> {
        let (a, b) = (self.inner_dynamic(), other.inner_dynamic());
        let ty = shared_type(a, b)?;
        if !ty.is_orderable() && !ty.is_dynamic() {
            return Err(CtyError::incomparable(
                a.ty().ctype(),
                b.ty().ctype(),
                format!("Values of type {ty} do not support '{}'", op.symbol()),
            ));
        }
        if a.is_null() || b.is_null() {
            return Err(CtyError::incomparable(
                a.ty().ctype(),
                b.ty().ctype(),
                format!("Cannot apply '{}' to a null value", op.symbol()),
            ));
        }
        let result = match ty {
            CtyType::Number => match (Interval::of(a), Interval::of(b)) {
                (Some(x), Some(y)) => match op {
                    OrderOp::Lt => less_than(&x, &y),
                    OrderOp::Le => less_or_equal(&x, &y),
                    OrderOp::Gt => less_than(&y, &x),
                    OrderOp::Ge => less_or_equal(&y, &x),
                },
                _ => None,
            },
            CtyType::String => match (a.as_str(), b.as_str()) {
                (Some(x), Some(y)) => Some(op.holds(x.cmp(y))),
                _ => None,
            },
            _ => None,
        };
        Ok(bool_result(result, self, other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Refinement;

    fn below(n: i64, inclusive: bool) -> CtyValue {
        let r = Refinement::new().with_number_upper_bound(n, inclusive);
        CtyValue::unknown_with_refinement(CtyType::Number, r).unwrap()
    }

    #[test]
    fn test_known_numbers() {
        let one = CtyValue::number(1);
        let two = CtyValue::number(2);
        assert!(one.less_than(&two).unwrap().is_true());
        assert!(two.less_than_or_equal(&one).unwrap().is_false());
        assert!(two.greater_than_or_equal(&two).unwrap().is_true());
        assert!(one.equals(&CtyValue::number(1)).unwrap().is_true());
        assert!(one.not_equals(&two).unwrap().is_true());
    }

    #[test]
    fn test_refined_bounds_decide() {
        let fifteen = CtyValue::number(15);
        assert!(below(10, false).less_than(&fifteen).unwrap().is_true());
        assert!(below(10, false).greater_than(&fifteen).unwrap().is_false());
        assert!(below(10, false).equals(&fifteen).unwrap().is_false());
        assert!(below(20, true).less_than(&fifteen).unwrap().is_unknown());
    }

    #[test]
    fn test_exclusive_boundary() {
        let ten = CtyValue::number(10);
        assert!(below(10, false).less_than(&ten).unwrap().is_true());
        assert!(below(10, true).less_than(&ten).unwrap().is_unknown());
        assert!(below(10, true).less_than_or_equal(&ten).unwrap().is_true());
    }

    #[test]
    fn test_unknown_operands() {
        let u = CtyValue::unknown(CtyType::Number);
        assert!(u.less_than(&u).unwrap().is_unknown());
        assert!(u.equals(&CtyValue::number(1)).unwrap().is_unknown());
    }

    #[test]
    fn test_incomparable() {
        let n = CtyValue::number(1);
        let s = CtyValue::string("1");
        assert!(matches!(n.equals(&s), Err(CtyError::IncomparableTypes { .. })));
        assert!(matches!(n.less_than(&s), Err(CtyError::IncomparableTypes { .. })));

        let null = CtyValue::null(CtyType::Number);
        assert!(matches!(null.less_than(&n), Err(CtyError::IncomparableTypes { .. })));
        assert!(null.equals(&n).unwrap().is_false());

        let t = CtyValue::bool(true);
        assert!(t.less_than(&t).is_err());
    }

    #[test]
    fn test_result_carries_marks() {
        let a = CtyValue::string("a").with_mark("sensitive");
        let b = CtyValue::string("b");
        let result = a.less_than(&b).unwrap();
        assert!(result.is_true());
        assert!(result.is_marked());
    }
}
