//! Flat relation tuples: `(Obj{ns,key,pred}, Sub{ns,key,pred})`.
//! Checks are exact-match only — there is no transitive closure, unlike a
//! real Zanzibar-style graph evaluator.

use std::cmp::Ordering;

/// One side of a relation tuple. `ns` and `key` together name an entity
/// (e.g. `ns="role", key="mod:g1"`); `pred` is the predicate/relation name
/// (e.g. `"member"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef {
    pub ns: String,
    pub key: String,
    pub pred: String,
}

impl ObjRef {
    pub fn new(ns: impl Into<String>, key: impl Into<String>, pred: impl Into<String>) -> Self {
        ObjRef {
            ns: ns.into(),
            key: key.into(),
            pred: pred.into(),
        }
    }
}

/// A single stored tuple: `obj` has `sub` in the `pred` relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    pub obj: ObjRef,
    pub sub: ObjRef,
}

impl Relation {
    pub fn new(obj: ObjRef, sub: ObjRef) -> Self {
        Relation { obj, sub }
    }
}

/// Total order over `(ns, key, pred)` that `Read` paginates by.
impl PartialOrd for Relation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Relation {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.obj, &self.sub).cmp(&(&other.obj, &other.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relations_order_lexicographically_by_obj_then_sub() {
        let a = Relation::new(ObjRef::new("role", "mod:g1", "member"), ObjRef::new("user", "u1", "self"));
        let b = Relation::new(ObjRef::new("role", "mod:g2", "member"), ObjRef::new("user", "u0", "self"));
        assert!(a < b);
    }
}
