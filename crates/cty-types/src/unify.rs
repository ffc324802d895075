//! Type unification
//!
//! Computes the least upper bound of types under `usable_as`. The pairwise
//! join is commutative and associative, so folding left to right gives the
//! same result for any input order. Unification never fails; incompatible
//! inputs unify to the dynamic type.

use crate::{CtyType, ObjectType};

/// Unify zero or more types
///
/// An empty input unifies to the dynamic type and a single input is returned
/// unchanged.
pub fn unify<'a>(types: impl IntoIterator<Item = &'a CtyType>) -> CtyType {
    let mut types = types.into_iter();
    let Some(first) = types.next() else {
        return CtyType::Dynamic;
    };
    types.fold(first.clone(), |acc, ty| unify_pair(&acc, ty))
}

/// Join of two types
pub fn unify_pair(a: &CtyType, b: &CtyType) -> CtyType {
    if a == b {
        return a.clone();
    }
    match (a, b) {
        (CtyType::List(x), CtyType::List(y)) => CtyType::list_of(unify_pair(x, y)),
        (CtyType::Set(x), CtyType::Set(y)) => CtyType::set_of(unify_pair(x, y)),
        (CtyType::Map(x), CtyType::Map(y)) => CtyType::map_of(unify_pair(x, y)),
        (CtyType::Tuple(x), CtyType::Tuple(y)) if x.len() == y.len() => {
            CtyType::tuple_of(x.iter().zip(y).map(|(p, q)| unify_pair(p, q)).collect())
        }
        (CtyType::Object(x), CtyType::Object(y)) if x.same_names(y) => unify_objects(x, y),
        _ => CtyType::Dynamic,
    }
}

/// An attribute optional in either input is optional in the result
fn unify_objects(a: &ObjectType, b: &ObjectType) -> CtyType {
    let attrs = a
        .attributes()
        .iter()
        .zip(b.attributes().values())
        .map(|((name, x), y)| (name.clone(), unify_pair(x, y)));
    let optional = a.optional().union(b.optional()).cloned();
    CtyType::object_with_optional(attrs, optional).unwrap_or(CtyType::Dynamic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unify_trivial() {
        let none: [CtyType; 0] = [];
        assert_eq!(unify(&none), CtyType::Dynamic);
        assert_eq!(unify([&CtyType::Number]), CtyType::Number);
        assert_eq!(unify([&CtyType::Number, &CtyType::Number]), CtyType::Number);
        assert_eq!(unify([&CtyType::Number, &CtyType::String]), CtyType::Dynamic);
    }

    #[test]
    fn test_unify_collections() {
        let a = CtyType::list_of(CtyType::String);
        let b = CtyType::list_of(CtyType::Number);
        assert_eq!(unify([&a, &b]), CtyType::list_of(CtyType::Dynamic));
        assert_eq!(unify([&a, &CtyType::set_of(CtyType::String)]), CtyType::Dynamic);
    }

    #[test]
    fn test_unify_tuples() {
        let a = CtyType::tuple_of(vec![CtyType::String, CtyType::Number]);
        let b = CtyType::tuple_of(vec![CtyType::String, CtyType::Bool]);
        assert_eq!(
            unify([&a, &b]),
            CtyType::tuple_of(vec![CtyType::String, CtyType::Dynamic])
        );
        let short = CtyType::tuple_of(vec![CtyType::String]);
        assert_eq!(unify([&a, &short]), CtyType::Dynamic);
    }

    #[test]
    fn test_unify_objects_merges_optional() {
        let required = CtyType::object([("a", CtyType::String)]);
        let optional = CtyType::object_with_optional([("a", CtyType::String)], ["a"]).unwrap();
        assert_eq!(unify([&required, &optional]), optional);
        assert_eq!(unify([&optional, &required]), optional);

        let wider = CtyType::object([("a", CtyType::String), ("b", CtyType::Number)]);
        assert_eq!(unify([&required, &wider]), CtyType::Dynamic);
    }
}
