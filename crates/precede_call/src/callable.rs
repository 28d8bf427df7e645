//! Direct function payloads.
//!
//! A [`Callable`] is a plain Rust closure whose parameter types were erased
//! at registration time. The parameter types survive as a [`Signature`],
//! which typed chains compare against their required signature, and every
//! call downcasts the supplied [`Arg`]s back to those types.
//!
//! # Example
//!
//! ```
//! use precede_call::{args, Callable, Signature};
//!
//! let add = Callable::new(|a: &i32, b: &i32| assert_eq!(a + b, 5));
//! assert_eq!(add.signature(), &Signature::of::<(i32, i32)>());
//! add.call(&args![2_i32, 3_i32]).unwrap();
//!
//! // Wrong argument types are reported, not panicked on.
//! assert!(add.call(&args![2_i32, "three"]).is_err());
//! ```

use core::any::Any;
use core::fmt;
use core::iter::Enumerate;
use core::ops::Deref;
use core::slice::Iter;
use std::sync::Arc;

use variadics_please::all_tuples;

use crate::arg::Arg;
use crate::error::InvokeError;
use crate::signature::Signature;

type ErasedFn = dyn Fn(&[Arg]) -> Result<(), InvokeError> + Send + Sync;

/// A type-erased function payload with a known [`Signature`].
#[derive(Clone)]
pub struct Callable {
    func: Arc<ErasedFn>,
    signature: Arc<Signature>,
    name: &'static str,
}

impl Callable {
    /// Converts a closure (or an existing `Callable`) into a `Callable`.
    #[must_use]
    pub fn new<M, F: IntoCallable<M>>(func: F) -> Self {
        func.into_callable()
    }

    /// Builds a `Callable` from an already-erased function.
    ///
    /// The caller is responsible for `signature` describing what `func`
    /// actually accepts.
    #[must_use]
    pub fn from_erased(
        signature: Signature,
        name: &'static str,
        func: impl Fn(&[Arg]) -> Result<(), InvokeError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            func: Arc::new(func),
            signature: Arc::new(signature),
            name,
        }
    }

    /// Returns the parameter signature.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Returns the type name of the wrapped function.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Calls the function with the given arguments.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::Arity`] or [`InvokeError::ArgumentType`] if the
    /// arguments do not fit the signature.
    pub fn call(&self, args: &[Arg]) -> Result<(), InvokeError> {
        (self.func)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("signature", &self.signature.to_string())
            .finish()
    }
}

/// Trailing variadic parameter of a callable.
///
/// A closure taking `Rest<T>` as its last parameter receives every argument
/// past the fixed ones, each downcast to `T` and cloned.
///
/// ```
/// use precede_call::{args, Callable, Rest};
///
/// let join = Callable::new(|sep: &char, words: Rest<&'static str>| {
///     assert_eq!(words.join(&*sep.to_string()), "a-b-c");
/// });
/// join.call(&args!['-', "a", "b", "c"]).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rest<T>(pub Vec<T>);

impl<T> Rest<T> {
    /// Returns the collected values.
    #[must_use]
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Deref for Rest<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> IntoIterator for Rest<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Converts a type into a [`Callable`].
///
/// Implemented for closures taking references to 0 to 6 parameters, for
/// closures ending in a [`Rest`] tail after 0 to 5 fixed parameters, and for
/// `Callable` itself.
///
/// # Marker Types
///
/// The `Marker` parameter keeps the per-arity implementations apart; it is
/// always inferred.
pub trait IntoCallable<Marker>: Sized {
    /// Performs the conversion.
    fn into_callable(self) -> Callable;
}

/// Marker for the identity conversion.
pub struct CallableMarker;

impl IntoCallable<CallableMarker> for Callable {
    fn into_callable(self) -> Callable {
        self
    }
}

type ArgIter<'a> = Enumerate<Iter<'a, Arg>>;

fn downcast<'a, T: Any>(index: usize, arg: &'a Arg) -> Result<&'a T, InvokeError> {
    arg.downcast_ref::<T>().ok_or(InvokeError::ArgumentType {
        index,
        expected: core::any::type_name::<T>(),
        got: arg.type_name(),
    })
}

fn next_param<'a, T: Any>(
    params: &mut ArgIter<'a>,
    arity: usize,
    supplied: usize,
) -> Result<&'a T, InvokeError> {
    let (index, arg) = params.next().ok_or(InvokeError::Arity {
        expected: arity,
        got: supplied,
    })?;
    downcast(index, arg)
}

fn rest_params<T: Any + Clone>(args: &mut ArgIter<'_>) -> Result<Rest<T>, InvokeError> {
    args.map(|(index, arg)| downcast::<T>(index, arg).cloned())
        .collect::<Result<Vec<_>, _>>()
        .map(Rest)
}

macro_rules! impl_into_callable {
    ($(($P:ident, $p:ident)),*) => {
        impl<Func, $($P),*> IntoCallable<fn($(&$P),*)> for Func
        where
            Func: Fn($(&$P),*) + Send + Sync + 'static,
            $($P: Any + Send + Sync,)*
        {
            fn into_callable(self) -> Callable {
                let signature = Signature::of::<($($P,)*)>();
                let arity = signature.arity();
                Callable::from_erased(
                    signature,
                    core::any::type_name::<Func>(),
                    move |args: &[Arg]| {
                        if args.len() != arity {
                            return Err(InvokeError::Arity {
                                expected: arity,
                                got: args.len(),
                            });
                        }
                        let _params = &mut args.iter().enumerate();
                        $(let $p = next_param::<$P>(_params, arity, args.len())?;)*
                        self($($p),*);
                        Ok(())
                    },
                )
            }
        }
    };
}

all_tuples!(impl_into_callable, 0, 6, P, p);

macro_rules! impl_into_variadic_callable {
    ($(($P:ident, $p:ident)),*) => {
        impl<Func, $($P,)* R> IntoCallable<fn($(&$P,)* Rest<R>)> for Func
        where
            Func: Fn($(&$P,)* Rest<R>) + Send + Sync + 'static,
            $($P: Any + Send + Sync,)*
            R: Any + Send + Sync + Clone,
        {
            fn into_callable(self) -> Callable {
                let signature = Signature::variadic::<($($P,)*), R>();
                let arity = signature.arity();
                Callable::from_erased(
                    signature,
                    core::any::type_name::<Func>(),
                    move |args: &[Arg]| {
                        if args.len() < arity {
                            return Err(InvokeError::Arity {
                                expected: arity,
                                got: args.len(),
                            });
                        }
                        let params = &mut args.iter().enumerate();
                        $(let $p = next_param::<$P>(params, arity, args.len())?;)*
                        let rest = rest_params::<R>(params)?;
                        self($($p,)* rest);
                        Ok(())
                    },
                )
            }
        }
    };
}

all_tuples!(impl_into_variadic_callable, 0, 5, P, p);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use std::sync::Mutex;

    #[test]
    fn zero_arity_callable() {
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        let callable = Callable::new(move || *counter.lock().unwrap() += 1);

        assert_eq!(callable.signature(), &Signature::of::<()>());
        callable.call(&[]).unwrap();
        callable.call(&[]).unwrap();
        assert_eq!(*hits.lock().unwrap(), 2);
    }

    #[test]
    fn fixed_arity_rejects_extra_arguments() {
        let callable = Callable::new(|_: &u8| {});
        let err = callable.call(&args![1_u8, 2_u8]).unwrap_err();
        assert_eq!(
            err,
            InvokeError::Arity {
                expected: 1,
                got: 2
            }
        );
    }

    #[test]
    fn wrong_argument_type_names_position() {
        let callable = Callable::new(|_: &u8, _: &String| {});
        let err = callable.call(&args![1_u8, 2_u8]).unwrap_err();
        assert_eq!(
            err,
            InvokeError::ArgumentType {
                index: 1,
                expected: "alloc::string::String",
                got: "u8",
            }
        );
    }

    #[test]
    fn variadic_collects_tail() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callable = Callable::new(move |first: &u32, rest: Rest<String>| {
            let mut sink = sink.lock().unwrap();
            sink.push(first.to_string());
            sink.extend(rest);
        });

        assert_eq!(
            callable.signature(),
            &Signature::variadic::<(u32,), String>()
        );
        callable
            .call(&args![7_u32, String::from("a"), String::from("b")])
            .unwrap();
        callable.call(&args![8_u32]).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["7", "a", "b", "8"]);
    }

    #[test]
    fn variadic_requires_fixed_prefix() {
        let callable = Callable::new(|_: &u32, _: Rest<u8>| {});
        assert_eq!(
            callable.call(&[]).unwrap_err(),
            InvokeError::Arity {
                expected: 1,
                got: 0
            }
        );
    }

    #[test]
    fn variadic_checks_tail_types() {
        let callable = Callable::new(|_: Rest<u8>| {});
        let err = callable.call(&args![1_u8, 2_u16]).unwrap_err();
        assert!(matches!(err, InvokeError::ArgumentType { index: 1, .. }));
    }

    #[test]
    fn callable_into_callable_is_identity() {
        let callable = Callable::new(|_: &u8| {});
        let same = Callable::new(callable.clone());
        assert_eq!(same.name(), callable.name());
        assert_eq!(same.signature(), callable.signature());
    }
}
