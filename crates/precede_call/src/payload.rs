//! Stored entry payloads and the shapes registration accepts.
//!
//! A [`Payload`] is what a chain actually stores for an entry: either a
//! [`Callable`] whose parameters are checked against typed chains, or a
//! [`CallProxy`] that receives the raw argument list and dispatches on its
//! own.

use core::fmt;
use std::sync::Arc;

use downcast_rs::{DowncastSync, impl_downcast};

use crate::arg::Arg;
use crate::callable::{Callable, IntoCallable};
use crate::error::{ChainError, InvokeError};
use crate::signature::Signature;

/// An adapter payload that performs its own dispatch.
///
/// Proxies are typically produced by an admission transform that binds
/// extra call-site state to a function before storage. They are exempt from
/// typed-chain signature checks.
///
/// # Example
///
/// ```
/// use precede_call::{args, Arg, CallProxy, Callable, InvokeError};
///
/// /// Prepends a fixed score to every call.
/// struct Scored {
///     score: i32,
///     target: Callable,
/// }
///
/// impl CallProxy for Scored {
///     fn call(&self, args: &[Arg]) -> Result<(), InvokeError> {
///         let mut full = vec![Arg::new(self.score)];
///         full.extend_from_slice(args);
///         self.target.call(&full)
///     }
/// }
///
/// let proxy = Scored {
///     score: 3,
///     target: Callable::new(|score: &i32| assert_eq!(*score, 3)),
/// };
/// proxy.call(&args![]).unwrap();
/// ```
pub trait CallProxy: DowncastSync {
    /// Performs the call with the run's argument list.
    ///
    /// # Errors
    ///
    /// Returns an [`InvokeError`] if the proxy cannot complete the call.
    fn call(&self, args: &[Arg]) -> Result<(), InvokeError>;

    /// Name used in logs and events.
    fn name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

impl_downcast!(sync CallProxy);

/// A stored entry payload.
#[derive(Clone)]
pub enum Payload {
    /// A direct function with a known signature.
    Function(Callable),
    /// An adapter receiving the raw argument list.
    Proxy(Arc<dyn CallProxy>),
}

impl Payload {
    /// Wraps a function payload.
    #[must_use]
    pub fn function<M>(func: impl IntoCallable<M>) -> Self {
        Self::Function(func.into_callable())
    }

    /// Wraps a proxy payload.
    #[must_use]
    pub fn proxy(proxy: impl CallProxy) -> Self {
        Self::Proxy(Arc::new(proxy))
    }

    /// Resolves a raw registration argument into a payload.
    ///
    /// An argument holding a [`Callable`] or a `Payload` resolves; anything
    /// else is not invokable.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::NotCallable`] for any other value.
    pub fn from_arg(arg: &Arg) -> Result<Self, ChainError> {
        if let Some(payload) = arg.downcast_ref::<Payload>() {
            return Ok(payload.clone());
        }
        if let Some(callable) = arg.downcast_ref::<Callable>() {
            return Ok(Self::Function(callable.clone()));
        }
        Err(ChainError::NotCallable(arg.type_name()))
    }

    /// Invokes the payload with the run's arguments.
    ///
    /// # Errors
    ///
    /// Propagates the [`InvokeError`] of the function or proxy.
    pub fn invoke(&self, args: &[Arg]) -> Result<(), InvokeError> {
        match self {
            Payload::Function(callable) => callable.call(args),
            Payload::Proxy(proxy) => proxy.call(args),
        }
    }

    /// Returns the function signature, or `None` for proxies.
    #[must_use]
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Payload::Function(callable) => Some(callable.signature()),
            Payload::Proxy(_) => None,
        }
    }

    /// Returns the function or proxy name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Payload::Function(callable) => callable.name(),
            Payload::Proxy(proxy) => proxy.name(),
        }
    }

    /// Returns the proxy downcast to `T`, if this is a proxy of that type.
    #[must_use]
    pub fn downcast_proxy<T: CallProxy>(&self) -> Option<&T> {
        match self {
            Payload::Proxy(proxy) => proxy.downcast_ref::<T>(),
            Payload::Function(_) => None,
        }
    }

    /// Returns true for proxy payloads.
    #[must_use]
    pub fn is_proxy(&self) -> bool {
        matches!(self, Payload::Proxy(_))
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Function(callable) => f.debug_tuple("Function").field(callable).finish(),
            Payload::Proxy(proxy) => f.debug_tuple("Proxy").field(&proxy.name()).finish(),
        }
    }
}

impl From<Callable> for Payload {
    fn from(callable: Callable) -> Self {
        Self::Function(callable)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// IntoArgs
// ─────────────────────────────────────────────────────────────────────────────

/// Converts a registration input into the raw argument list handed to the
/// admission hook.
///
/// Implemented for functions (anything [`IntoCallable`]), for [`Payload`],
/// for a single [`Arg`] and for a raw `Vec<Arg>`.
pub trait IntoArgs<Marker> {
    /// Performs the conversion.
    fn into_args(self) -> Vec<Arg>;
}

/// Marker for function registrations.
pub struct FunctionArgs<M>(core::marker::PhantomData<fn() -> M>);

/// Marker for registrations that already are argument values.
pub struct RawArgs;

impl<F, M> IntoArgs<FunctionArgs<M>> for F
where
    F: IntoCallable<M>,
{
    fn into_args(self) -> Vec<Arg> {
        vec![Arg::new(self.into_callable())]
    }
}

impl IntoArgs<RawArgs> for Vec<Arg> {
    fn into_args(self) -> Vec<Arg> {
        self
    }
}

impl IntoArgs<RawArgs> for Arg {
    fn into_args(self) -> Vec<Arg> {
        vec![self]
    }
}

impl IntoArgs<RawArgs> for Payload {
    fn into_args(self) -> Vec<Arg> {
        vec![Arg::new(self)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    struct Echo;

    impl CallProxy for Echo {
        fn call(&self, args: &[Arg]) -> Result<(), InvokeError> {
            if args.is_empty() {
                Err(InvokeError::failed("nothing to echo"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn from_arg_accepts_callables_and_payloads() {
        let callable = Callable::new(|_: &u8| {});
        assert!(matches!(
            Payload::from_arg(&Arg::new(callable)),
            Ok(Payload::Function(_))
        ));
        assert!(matches!(
            Payload::from_arg(&Arg::new(Payload::proxy(Echo))),
            Ok(Payload::Proxy(_))
        ));
    }

    #[test]
    fn from_arg_rejects_plain_data() {
        let err = Payload::from_arg(&Arg::new(5_u64)).unwrap_err();
        assert_eq!(err, ChainError::NotCallable("u64"));
    }

    #[test]
    fn proxies_have_no_signature() {
        let payload = Payload::proxy(Echo);
        assert!(payload.signature().is_none());
        assert!(payload.is_proxy());
        assert!(payload.downcast_proxy::<Echo>().is_some());
    }

    #[test]
    fn proxy_errors_propagate() {
        let payload = Payload::proxy(Echo);
        assert!(payload.invoke(&[]).is_err());
        assert!(payload.invoke(&args![1_u8]).is_ok());
    }

    #[test]
    fn function_registration_yields_single_arg() {
        let args = (|_: &u8| {}).into_args();
        assert_eq!(args.len(), 1);
        assert!(args[0].is::<Callable>());
    }
}
