use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;
use std::sync::Arc;

/// One-level structural equality.
///
/// Scalars and strings compare by value; `Arc`/`Rc` compare by pointer
/// identity; containers compare their entries one level deep. Nested
/// recursion terminates at the first reference boundary, so a selector
/// output built from shared pieces compares in O(top-level entries).
///
/// Implement by hand for state or selector-output types: compare each
/// field with `ShallowEq` (or `==` for plain values).
pub trait ShallowEq {
    /// Whether `self` and `other` are equal one level deep.
    fn shallow_eq(&self, other: &Self) -> bool;
}

macro_rules! impl_shallow_eq_value {
    ($($t:ty),* $(,)?) => {$(
        impl ShallowEq for $t {
            fn shallow_eq(&self, other: &Self) -> bool {
                self == other
            }
        }
    )*};
}

impl_shallow_eq_value!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
    &str,
);

impl<T: ?Sized> ShallowEq for Arc<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> ShallowEq for Rc<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ShallowEq> ShallowEq for Option<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.shallow_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ShallowEq> ShallowEq for Vec<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| a.shallow_eq(b))
    }
}

impl<K: Eq + Hash, V: ShallowEq> ShallowEq for HashMap<K, V> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| v.shallow_eq(o)))
    }
}

impl<A: ShallowEq, B: ShallowEq> ShallowEq for (A, B) {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.0.shallow_eq(&other.0) && self.1.shallow_eq(&other.1)
    }
}

impl<A: ShallowEq, B: ShallowEq, C: ShallowEq> ShallowEq for (A, B, C) {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.0.shallow_eq(&other.0) && self.1.shallow_eq(&other.1) && self.2.shallow_eq(&other.2)
    }
}

impl<A: ShallowEq, B: ShallowEq, C: ShallowEq, D: ShallowEq> ShallowEq for (A, B, C, D) {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.0.shallow_eq(&other.0)
            && self.1.shallow_eq(&other.1)
            && self.2.shallow_eq(&other.2)
            && self.3.shallow_eq(&other.3)
    }
}
