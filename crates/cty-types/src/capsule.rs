//! Capsule types: opaque wrappers around host values
//!
//! A capsule type is identified by its name, the Rust type it wraps and the
//! identity of its hooks. Two capsule types built from separately created
//! hook closures are different types even when everything else matches; a
//! clone of a capsule type shares its hooks and stays equal to the original.

use crate::{CtyType, CtyValue};
use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The host value carried by a capsule
pub type CapsuleValue = Arc<dyn Any + Send + Sync>;

/// Custom equality between two wrapped host values
pub type CapsuleEqualFn = Arc<dyn Fn(&CapsuleValue, &CapsuleValue) -> bool + Send + Sync>;

/// Custom hash of a wrapped host value
pub type CapsuleHashFn = Arc<dyn Fn(&CapsuleValue) -> u64 + Send + Sync>;

/// Custom conversion out of a capsule; `None` declines the conversion
pub type CapsuleConvertFn =
    Arc<dyn Fn(&CapsuleValue, &CtyType) -> Option<CtyValue> + Send + Sync>;

/// Optional behaviour hooks for a capsule type
#[derive(Clone, Default)]
pub struct CapsuleOps {
    pub equal: Option<CapsuleEqualFn>,
    pub hash: Option<CapsuleHashFn>,
    pub convert: Option<CapsuleConvertFn>,
}

impl CapsuleOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_equal(
        mut self,
        f: impl Fn(&CapsuleValue, &CapsuleValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.equal = Some(Arc::new(f));
        self
    }

    pub fn with_hash(mut self, f: impl Fn(&CapsuleValue) -> u64 + Send + Sync + 'static) -> Self {
        self.hash = Some(Arc::new(f));
        self
    }

    pub fn with_convert(
        mut self,
        f: impl Fn(&CapsuleValue, &CtyType) -> Option<CtyValue> + Send + Sync + 'static,
    ) -> Self {
        self.convert = Some(Arc::new(f));
        self
    }

    fn identities(&self) -> [usize; 3] {
        [
            hook_identity(&self.equal),
            hook_identity(&self.hash),
            hook_identity(&self.convert),
        ]
    }
}

fn hook_identity<F: ?Sized>(hook: &Option<Arc<F>>) -> usize {
    hook.as_ref()
        .map_or(0, |h| Arc::as_ptr(h).cast::<()>() as usize)
}

fn value_identity(value: &CapsuleValue) -> usize {
    Arc::as_ptr(value).cast::<()>() as usize
}

struct CapsuleInner {
    name: String,
    native_type: TypeId,
    native_type_name: &'static str,
    ops: CapsuleOps,
}

/// An opaque capsule type
#[derive(Clone)]
pub struct CapsuleType {
    inner: Arc<CapsuleInner>,
}

impl CapsuleType {
    /// Create a capsule type wrapping values of `T`
    pub fn new<T: Any + Send + Sync>(name: impl Into<String>) -> Self {
        Self::with_ops::<T>(name, CapsuleOps::default())
    }

    /// Create a capsule type wrapping values of `T` with custom hooks
    pub fn with_ops<T: Any + Send + Sync>(name: impl Into<String>, ops: CapsuleOps) -> Self {
        Self {
            inner: Arc::new(CapsuleInner {
                name: name.into(),
                native_type: TypeId::of::<T>(),
                native_type_name: std::any::type_name::<T>(),
                ops,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn native_type(&self) -> TypeId {
        self.inner.native_type
    }

    pub fn native_type_name(&self) -> &'static str {
        self.inner.native_type_name
    }

    pub fn ops(&self) -> &CapsuleOps {
        &self.inner.ops
    }

    /// Check if a host value has the wrapped native type
    pub fn accepts(&self, value: &CapsuleValue) -> bool {
        (**value).type_id() == self.inner.native_type
    }

    /// Compare two wrapped values, via the equality hook when present and
    /// by pointer identity otherwise
    pub fn values_equal(&self, a: &CapsuleValue, b: &CapsuleValue) -> bool {
        match &self.inner.ops.equal {
            Some(equal) => equal(a, b),
            None => Arc::ptr_eq(a, b),
        }
    }

    /// Hash a wrapped value consistently with [`CapsuleType::values_equal`]
    pub fn hash_value<H: Hasher>(&self, value: &CapsuleValue, state: &mut H) {
        match (&self.inner.ops.hash, &self.inner.ops.equal) {
            (Some(hash), _) => hash(value).hash(state),
            // A custom equality without a hash leaves nothing safe to mix in.
            (None, Some(_)) => {}
            (None, None) => value_identity(value).hash(state),
        }
    }

    /// Total order over wrapped values; equal values compare equal
    pub fn compare_values(&self, a: &CapsuleValue, b: &CapsuleValue) -> Ordering {
        if self.values_equal(a, b) {
            return Ordering::Equal;
        }
        let hashed = self
            .inner
            .ops
            .hash
            .as_ref()
            .map(|hash| hash(a).cmp(&hash(b)))
            .unwrap_or(Ordering::Equal);
        hashed.then_with(|| value_identity(a).cmp(&value_identity(b)))
    }

    fn identity_key(&self) -> (&str, TypeId, [usize; 3]) {
        (
            &self.inner.name,
            self.inner.native_type,
            self.inner.ops.identities(),
        )
    }
}

impl PartialEq for CapsuleType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.identity_key() == other.identity_key()
    }
}

impl Eq for CapsuleType {}

impl Hash for CapsuleType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity_key().hash(state);
    }
}

impl PartialOrd for CapsuleType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CapsuleType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity_key().cmp(&other.identity_key())
    }
}

impl fmt::Debug for CapsuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapsuleType")
            .field("name", &self.inner.name)
            .field("native_type", &self.inner.native_type_name)
            .field("equal", &self.inner.ops.equal.is_some())
            .field("hash", &self.inner.ops.hash.is_some())
            .field("convert", &self.inner.ops.convert.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Handle(u32);

    #[test]
    fn test_capsule_nominal_equality() {
        let a = CapsuleType::new::<Handle>("Handle");
        let b = CapsuleType::new::<Handle>("Handle");
        assert_eq!(a, b);
        assert_ne!(a, CapsuleType::new::<String>("Handle"));
        assert_ne!(a, CapsuleType::new::<Handle>("Other"));
    }

    #[test]
    fn test_capsule_hooks_compared_by_identity() {
        let make = || CapsuleOps::new().with_equal(|_, _| true);
        let a = CapsuleType::with_ops::<Handle>("Handle", make());
        let b = CapsuleType::with_ops::<Handle>("Handle", make());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());

        let shared = make();
        let c = CapsuleType::with_ops::<Handle>("Handle", shared.clone());
        let d = CapsuleType::with_ops::<Handle>("Handle", shared);
        assert_eq!(c, d);
    }

    #[test]
    fn test_capsule_accepts_native_type() {
        let cap = CapsuleType::new::<Handle>("Handle");
        let good: CapsuleValue = Arc::new(Handle(1));
        let bad: CapsuleValue = Arc::new(7u32);
        assert!(cap.accepts(&good));
        assert!(!cap.accepts(&bad));
    }

    #[test]
    fn test_equal_hook_drives_value_equality() {
        let cap = CapsuleType::with_ops::<Handle>(
            "Handle",
            CapsuleOps::new().with_equal(|a, b| {
                let a = a.downcast_ref::<Handle>().map(|h| h.0);
                let b = b.downcast_ref::<Handle>().map(|h| h.0);
                a == b
            }),
        );
        let x: CapsuleValue = Arc::new(Handle(5));
        let y: CapsuleValue = Arc::new(Handle(5));
        assert!(cap.values_equal(&x, &y));
        assert_eq!(cap.compare_values(&x, &y), Ordering::Equal);
    }
}
