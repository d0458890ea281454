//! Dependency comparison for memoizing hooks.
//!
//! Dependency lists are compared element by element with "same value"
//! semantics: two floats are the same if both are NaN, and `0.0` is not the
//! same as `-0.0`. Shared pointers compare by identity, plain data by `==`.
//!
//! ```
//! use hookline_core::{are_inputs_equal, deps};
//!
//! assert!(are_inputs_equal(&deps![f64::NAN], &deps![f64::NAN]));
//! assert!(!are_inputs_equal(&deps![0.0_f64], &deps![-0.0_f64]));
//! ```

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

/// Equality as seen by the hook engine.
///
/// Implement this for your own types to use them as state or as
/// dependencies. Types that already implement `PartialEq` can use
/// [`same_value_by_eq!`](crate::same_value_by_eq).
pub trait SameValue {
    /// Whether `self` and `other` are the same value.
    fn same_value(&self, other: &Self) -> bool;
}

/// Implement [`SameValue`] in terms of `PartialEq`.
#[macro_export]
macro_rules! same_value_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::SameValue for $ty {
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_value_by_eq!(
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
    String,
    &'static str,
);

macro_rules! same_value_float {
    ($($ty:ty),*) => {
        $(
            impl SameValue for $ty {
                fn same_value(&self, other: &Self) -> bool {
                    if self.is_nan() {
                        return other.is_nan();
                    }
                    self == other && self.is_sign_negative() == other.is_sign_negative()
                }
            }
        )*
    };
}

same_value_float!(f32, f64);

impl<T: ?Sized> SameValue for Rc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> SameValue for Weak<T> {
    fn same_value(&self, other: &Self) -> bool {
        Weak::ptr_eq(self, other)
    }
}

impl<T: SameValue> SameValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: SameValue> SameValue for Vec<T> {
    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_value(b))
    }
}

macro_rules! same_value_tuple {
    ($(($($name:ident : $idx:tt),+)),*) => {
        $(
            impl<$($name: SameValue),+> SameValue for ($($name,)+) {
                fn same_value(&self, other: &Self) -> bool {
                    $(self.$idx.same_value(&other.$idx))&&+
                }
            }
        )*
    };
}

same_value_tuple!((A: 0, B: 1), (A: 0, B: 1, C: 2), (A: 0, B: 1, C: 2, D: 3));

/// Object-safe view of a dependency value.
///
/// `Rc<dyn DepValue>` is itself `SameValue` and so also gets the blanket
/// impl. Always call these through the inner trait object.
trait DepValue {
    fn dep_any(&self) -> &dyn Any;
    fn dep_same(&self, other: &dyn DepValue) -> bool;
    fn dep_type_name(&self) -> &'static str;
}

impl<T: SameValue + 'static> DepValue for T {
    fn dep_any(&self) -> &dyn Any {
        self
    }

    fn dep_same(&self, other: &dyn DepValue) -> bool {
        other
            .dep_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self.same_value(other))
    }

    fn dep_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Marker allocated by [`Dep::identity`].
struct Identity;

/// A single type-erased dependency value.
#[derive(Clone)]
pub struct Dep(Rc<dyn DepValue>);

impl Dep {
    /// Wrap a value as a dependency.
    pub fn new<T: SameValue + 'static>(value: T) -> Self {
        Self(Rc::new(value))
    }

    /// A dependency that is only ever the same as its own clones.
    ///
    /// Every call produces a value unequal to all previous ones.
    pub fn identity() -> Self {
        Self::new(Rc::new(Identity))
    }

    /// Whether `self` and `other` hold the same value of the same type.
    pub fn same(&self, other: &Dep) -> bool {
        let value: &dyn DepValue = &*self.0;
        value.dep_same(&*other.0)
    }

    /// Name of the wrapped value's type.
    pub fn type_name(&self) -> &'static str {
        let value: &dyn DepValue = &*self.0;
        value.dep_type_name()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dep").field(&self.type_name()).finish()
    }
}

/// An ordered dependency list.
pub type Deps = Vec<Dep>;

/// Build a [`Deps`] list from values.
///
/// ```
/// use hookline_core::deps;
///
/// let name = String::from("ada");
/// let inputs = deps![1_u32, name, 2.5_f64];
/// assert_eq!(inputs.len(), 3);
/// ```
#[macro_export]
macro_rules! deps {
    ($($dep:expr),* $(,)?) => {{
        let deps: $crate::Deps = ::std::vec![$($crate::Dep::new($dep)),*];
        deps
    }};
}

/// Compare two dependency lists from consecutive renders.
///
/// Lists of different length are never equal. Comparison stops at the
/// first mismatching pair.
pub fn are_inputs_equal(inputs: &[Dep], prev_inputs: &[Dep]) -> bool {
    inputs.len() == prev_inputs.len()
        && inputs
            .iter()
            .zip(prev_inputs)
            .all(|(next, prev)| next.same(prev))
}

/// Whether a hook with dependencies `inputs` must re-run.
///
/// A missing previous list always counts as a change.
pub fn inputs_changed(prev_inputs: Option<&[Dep]>, inputs: &[Dep]) -> bool {
    match prev_inputs {
        Some(prev) => !are_inputs_equal(inputs, prev),
        None => true,
    }
}
