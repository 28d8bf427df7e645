//! Type-erased argument values.
//!
//! Registration calls and runs both traffic in argument lists whose element
//! types are only known to the caller. [`Arg`] erases the value behind an
//! `Arc` so the same list can be handed to every entry of a run without
//! copying the values themselves.

use core::any::{Any, TypeId};
use core::fmt;
use std::sync::Arc;

/// A single type-erased argument.
///
/// Cloning an `Arg` clones the handle, not the value.
///
/// # Example
///
/// ```
/// use precede_call::Arg;
///
/// let arg = Arg::new(42_i32);
/// assert!(arg.is::<i32>());
/// assert_eq!(arg.downcast_ref::<i32>(), Some(&42));
/// assert_eq!(arg.downcast_ref::<u8>(), None);
/// ```
#[derive(Clone)]
pub struct Arg {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Arg {
    /// Wraps a value.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns a reference to the value if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Returns true if the value is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Returns the [`TypeId`] of the wrapped value.
    #[must_use]
    pub fn value_type_id(&self) -> TypeId {
        // Deref first: `type_id` on the `Arc` itself would name the Arc.
        Any::type_id(&*self.value)
    }

    /// Returns the type name of the wrapped value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Arg").field(&self.type_name).finish()
    }
}

/// Builds a `Vec<Arg>` from a heterogeneous list of values.
///
/// ```
/// use precede_call::args;
///
/// let list = args![1_u32, "two", String::from("three")];
/// assert_eq!(list.len(), 3);
/// assert!(list[1].is::<&'static str>());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Arg>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Arg::new($value)),+]
    };
}
