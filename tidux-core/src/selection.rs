//! Change detection for selector results
//!
//! A [`SelectorBinding`](crate::SelectorBinding) asks for a re-render only when
//! [`Selection::same_as`] reports a difference between the previous and next
//! selector result. The comparison is deliberately **shallow**:
//!
//! - sequences (`Vec`, slices, arrays, `VecDeque`, tuples) are the same when
//!   they have the same length and every element is [`Identity`]-equal
//! - keyed records (`HashMap`, `BTreeMap`, `#[derive(Selection)]` structs) are
//!   the same when every key of either side maps to `Identity`-equal values
//! - time instants are the same when they denote the same instant
//! - scalars and strings compare by value
//! - `Arc`/`Rc` are the same when they point at the same allocation, or when
//!   their contents are the same selection
//!
//! Elements are never compared recursively. `Identity` on an `Arc` is pointer
//! equality, so a selector returning `Vec<Arc<Item>>` re-renders only when an
//! item is replaced, not when an item is mutated in place. Keep selected state
//! immutable and swap whole values when something changes.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use crate::action::ActionId;

/// Identity comparison used for the elements and fields of a selection.
///
/// Pointer equality for shared pointers, value equality for scalars and
/// strings.
pub trait Identity {
    /// Whether `self` and `other` are the same value.
    fn is_identical(&self, other: &Self) -> bool;
}

/// Structural equality between two selector results.
pub trait Selection {
    /// Whether `self` and `other` are the same selection.
    fn same_as(&self, other: &Self) -> bool;

    /// Whether a consumer should re-render going from `self` to `next`.
    fn changed(&self, next: &Self) -> bool {
        !self.same_as(next)
    }
}

macro_rules! by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identity for $ty {
                #[inline]
                fn is_identical(&self, other: &Self) -> bool {
                    self == other
                }
            }

            impl Selection for $ty {
                #[inline]
                fn same_as(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

by_value!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    str,
    String,
    Duration,
    Instant,
    SystemTime,
    ActionId,
);

impl<T: ?Sized> Identity for Arc<T> {
    #[inline]
    fn is_identical(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Identity for Rc<T> {
    #[inline]
    fn is_identical(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: Identity> Identity for Option<T> {
    fn is_identical(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.is_identical(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: Selection + ?Sized> Selection for Arc<T> {
    fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other) || (**self).same_as(other)
    }
}

impl<T: Selection + ?Sized> Selection for Rc<T> {
    fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other) || (**self).same_as(other)
    }
}

impl<T: Identity> Selection for [T] {
    fn same_as(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.is_identical(b))
    }
}

impl<T: Identity> Selection for Vec<T> {
    fn same_as(&self, other: &Self) -> bool {
        self.as_slice().same_as(other.as_slice())
    }
}

impl<T: Identity, const N: usize> Selection for [T; N] {
    fn same_as(&self, other: &Self) -> bool {
        self.as_slice().same_as(other.as_slice())
    }
}

impl<T: Identity> Selection for VecDeque<T> {
    fn same_as(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.is_identical(b))
    }
}

macro_rules! tuple_selection {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: Identity),+> Selection for ($($name,)+) {
            fn same_as(&self, other: &Self) -> bool {
                true $(&& self.$idx.is_identical(&other.$idx))+
            }
        }
    };
}

tuple_selection!(A.0);
tuple_selection!(A.0, B.1);
tuple_selection!(A.0, B.1, C.2);
tuple_selection!(A.0, B.1, C.2, D.3);
tuple_selection!(A.0, B.1, C.2, D.3, E.4);
tuple_selection!(A.0, B.1, C.2, D.3, E.4, F.5);

// Equal lengths plus a one-directional lookup cover the union of keys: a key
// present on one side only is a difference.
impl<K, V, S> Selection for HashMap<K, V, S>
where
    K: Eq + Hash,
    V: Identity,
    S: BuildHasher,
{
    fn same_as(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| v.is_identical(o)))
    }
}

impl<K: Ord, V: Identity> Selection for BTreeMap<K, V> {
    fn same_as(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| v.is_identical(o)))
    }
}
