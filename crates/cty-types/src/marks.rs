//! Value marks
//!
//! Marks are opaque tags (such as "sensitive") carried alongside a value.
//! They survive conversion and structural operations but never take part in
//! equality, hashing, ordering or wire encoding.

use crate::{CtyValue, Payload, ValueState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An opaque value mark
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CtyMark(String);

impl CtyMark {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The conventional mark for secrets
    pub fn sensitive() -> Self {
        Self::new("sensitive")
    }

    pub fn tag(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CtyMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CtyMark {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// The marks on one value
pub type MarkSet = BTreeSet<CtyMark>;

impl CtyValue {
    /// Marks directly on this value
    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    pub fn has_mark(&self, mark: &CtyMark) -> bool {
        self.marks.contains(mark)
    }

    pub fn is_marked(&self) -> bool {
        !self.marks.is_empty()
    }

    /// Return a copy carrying one more mark
    pub fn with_mark(mut self, mark: impl Into<CtyMark>) -> Self {
        self.marks.insert(mark.into());
        self
    }

    /// Return a copy carrying additional marks
    pub fn with_marks<I>(mut self, marks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<CtyMark>,
    {
        self.marks.extend(marks.into_iter().map(Into::into));
        self
    }

    /// Strip the marks of this value, leaving children untouched
    pub fn unmark(mut self) -> (Self, MarkSet) {
        let marks = std::mem::take(&mut self.marks);
        (self, marks)
    }

    /// Strip marks from this value and every nested value
    pub fn unmark_deep(self) -> (Self, MarkSet) {
        let mut collected = MarkSet::new();
        let value = strip_marks(self, &mut collected);
        (value, collected)
    }

    /// Check if this value or any nested value is marked
    pub fn contains_marked(&self) -> bool {
        if self.is_marked() {
            return true;
        }
        match &self.state {
            ValueState::Known(payload) => payload.children().any(CtyValue::contains_marked),
            _ => false,
        }
    }
}

fn strip_marks(mut value: CtyValue, collected: &mut MarkSet) -> CtyValue {
    collected.append(&mut value.marks);
    if let ValueState::Known(payload) = value.state {
        let payload = match payload {
            Payload::List(items) => Payload::List(strip_all(items, collected)),
            Payload::Set(items) => Payload::Set(strip_all(items, collected)),
            Payload::Tuple(items) => Payload::Tuple(strip_all(items, collected)),
            Payload::Map(entries) => Payload::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, strip_marks(v, collected)))
                    .collect(),
            ),
            Payload::Object(attrs) => Payload::Object(
                attrs
                    .into_iter()
                    .map(|(k, v)| (k, strip_marks(v, collected)))
                    .collect(),
            ),
            Payload::Dynamic(inner) => Payload::Dynamic(Box::new(strip_marks(*inner, collected))),
            scalar => scalar,
        };
        value.state = ValueState::Known(payload);
    }
    value
}

fn strip_all(items: Vec<CtyValue>, collected: &mut MarkSet) -> Vec<CtyValue> {
    items.into_iter().map(|v| strip_marks(v, collected)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CtyType;

    #[test]
    fn test_marks_do_not_affect_equality() {
        let plain = CtyValue::string("secret");
        let marked = plain.clone().with_mark(CtyMark::sensitive());
        assert!(marked.has_mark(&CtyMark::sensitive()));
        assert_eq!(plain, marked);
    }

    #[test]
    fn test_unmark_is_shallow() {
        let inner = CtyValue::string("x").with_mark("inner");
        let list = CtyValue::list(CtyType::String, vec![inner])
            .unwrap()
            .with_mark("outer");
        let (unmarked, marks) = list.unmark();
        assert_eq!(marks.len(), 1);
        assert!(!unmarked.is_marked());
        assert!(unmarked.contains_marked());
    }

    #[test]
    fn test_unmark_deep_collects_all() {
        let inner = CtyValue::string("x").with_mark("inner");
        let list = CtyValue::list(CtyType::String, vec![inner])
            .unwrap()
            .with_mark("outer");
        let (unmarked, marks) = list.unmark_deep();
        assert_eq!(marks.len(), 2);
        assert!(!unmarked.contains_marked());
    }
}
