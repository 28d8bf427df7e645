//! The admission hook consulted on every registration.
//!
//! Admission decides whether a registration is accepted and what payload is
//! actually stored:
//!
//! 1. the [`Validator`] sees the raw registration arguments and accepts or
//!    refuses them;
//! 2. if it also exposes a [`Transform`], the transform builds the stored
//!    payload from the same arguments, otherwise the first argument is used;
//! 3. on a typed chain the payload's signature must equal the required one.
//!
//! Chains without a validator fall back to [`DEFAULT_VALIDATION`].
//!
//! # Example
//!
//! ```
//! use precede_call::{admit, Arg, ChainError, Callable, ValidationFilter};
//!
//! let only_pairs = ValidationFilter::new(|args: &[Arg]| Ok(args.len() == 2));
//!
//! let callable = Arg::new(Callable::new(|| {}));
//! assert!(admit(Some(&only_pairs), None, &[callable.clone(), Arg::new(1_u8)]).is_ok());
//! assert_eq!(
//!     admit(Some(&only_pairs), None, &[callable]).unwrap_err(),
//!     ChainError::InvalidEntry,
//! );
//! ```

use core::fmt;

use crate::arg::Arg;
use crate::error::ChainError;
use crate::payload::Payload;
use crate::signature::Signature;

/// Accepts or refuses raw registration arguments.
///
/// Implemented for closures `Fn(&[Arg]) -> Result<bool, ChainError>`.
/// Validators may have side effects; admission calls them exactly once per
/// registration attempt.
pub trait Validator: Send + Sync + 'static {
    /// Returns `Ok(true)` to accept, `Ok(false)` to refuse without a reason,
    /// or an error that is returned to the registering caller unchanged.
    ///
    /// # Errors
    ///
    /// Any [`ChainError`] the validator wants to surface.
    fn validate(&self, args: &[Arg]) -> Result<bool, ChainError>;

    /// Returns the transform capability, if this validator has one.
    fn transformer(&self) -> Option<&dyn Transform> {
        None
    }
}

/// Builds the stored payload from accepted registration arguments.
///
/// Implemented for closures `Fn(&[Arg]) -> Result<Payload, ChainError>`.
pub trait Transform: Send + Sync + 'static {
    /// Produces the payload to store.
    ///
    /// # Errors
    ///
    /// Any [`ChainError`]; it aborts the registration.
    fn transform(&self, args: &[Arg]) -> Result<Payload, ChainError>;
}

impl<F> Validator for F
where
    F: Fn(&[Arg]) -> Result<bool, ChainError> + Send + Sync + 'static,
{
    fn validate(&self, args: &[Arg]) -> Result<bool, ChainError> {
        self(args)
    }
}

impl<F> Transform for F
where
    F: Fn(&[Arg]) -> Result<Payload, ChainError> + Send + Sync + 'static,
{
    fn transform(&self, args: &[Arg]) -> Result<Payload, ChainError> {
        self(args)
    }
}

type BoxedValidate = Box<dyn Fn(&[Arg]) -> Result<bool, ChainError> + Send + Sync>;
type BoxedTransform = Box<dyn Fn(&[Arg]) -> Result<Payload, ChainError> + Send + Sync>;

/// A validator closure optionally paired with a transform closure.
pub struct ValidationFilter {
    validate: BoxedValidate,
    transform: Option<BoxedTransform>,
}

impl ValidationFilter {
    /// Creates a filter that only validates.
    #[must_use]
    pub fn new(
        validate: impl Fn(&[Arg]) -> Result<bool, ChainError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            validate: Box::new(validate),
            transform: None,
        }
    }

    /// Adds a transform.
    #[must_use]
    pub fn with_transform(
        mut self,
        transform: impl Fn(&[Arg]) -> Result<Payload, ChainError> + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }
}

impl fmt::Debug for ValidationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationFilter")
            .field("has_transform", &self.transform.is_some())
            .finish_non_exhaustive()
    }
}

impl Validator for ValidationFilter {
    fn validate(&self, args: &[Arg]) -> Result<bool, ChainError> {
        (self.validate)(args)
    }

    fn transformer(&self) -> Option<&dyn Transform> {
        self.transform.as_ref().map(|t| t as &dyn Transform)
    }
}

/// The admission used by chains with no validator configured.
///
/// Accepts any non-empty argument list and stores its first argument.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValidation;

impl Validator for DefaultValidation {
    fn validate(&self, args: &[Arg]) -> Result<bool, ChainError> {
        Ok(!args.is_empty())
    }

    fn transformer(&self) -> Option<&dyn Transform> {
        Some(self)
    }
}

impl Transform for DefaultValidation {
    fn transform(&self, args: &[Arg]) -> Result<Payload, ChainError> {
        first_payload(args)
    }
}

/// Process-wide default admission.
pub static DEFAULT_VALIDATION: DefaultValidation = DefaultValidation;

fn first_payload(args: &[Arg]) -> Result<Payload, ChainError> {
    args.first()
        .ok_or(ChainError::InvalidEntry)
        .and_then(Payload::from_arg)
}

/// Runs the admission steps for one registration and returns the payload
/// to store.
///
/// `validator` of `None` means [`DEFAULT_VALIDATION`]. `signature` is the
/// typed chain's required signature, if any; proxies are exempt from it.
///
/// # Errors
///
/// - the validator's own error, unchanged;
/// - [`ChainError::InvalidEntry`] if the validator refuses without a reason
///   or there is no payload argument;
/// - [`ChainError::NotCallable`] if the stored value is not invokable;
/// - [`ChainError::TypeMismatch`] if the function does not match
///   `signature`.
pub fn admit(
    validator: Option<&dyn Validator>,
    signature: Option<&Signature>,
    args: &[Arg],
) -> Result<Payload, ChainError> {
    let validator = validator.unwrap_or(&DEFAULT_VALIDATION);

    if !validator.validate(args)? {
        return Err(ChainError::InvalidEntry);
    }

    let payload = match validator.transformer() {
        Some(transform) => transform.transform(args)?,
        None => first_payload(args)?,
    };

    if let (Some(expected), Some(found)) = (signature, payload.signature())
        && !expected.accepts(found)
    {
        return Err(ChainError::TypeMismatch {
            expected: expected.clone(),
            found: found.clone(),
        });
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::callable::Callable;
    use crate::error::InvokeError;
    use crate::payload::CallProxy;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tester;

    struct Bound(Callable);

    impl CallProxy for Bound {
        fn call(&self, args: &[Arg]) -> Result<(), InvokeError> {
            let mut full = args![Tester];
            full.extend_from_slice(args);
            self.0.call(&full)
        }
    }

    fn callable_arg<M>(f: impl crate::IntoCallable<M>) -> Arg {
        Arg::new(f.into_callable())
    }

    fn refuse(_: &[Arg]) -> Result<bool, ChainError> {
        Err(ChainError::rejected("closed"))
    }

    fn non_empty(args: &[Arg]) -> Result<bool, ChainError> {
        Ok(!args.is_empty())
    }

    fn bind_tester(args: &[Arg]) -> Result<Payload, ChainError> {
        match Payload::from_arg(&args[0])? {
            Payload::Function(callable) => Ok(Payload::proxy(Bound(callable))),
            proxy @ Payload::Proxy(_) => Ok(proxy),
        }
    }

    #[test]
    fn default_rejects_empty_lists() {
        let err = admit(None, None, &[]).unwrap_err();
        assert_eq!(err, ChainError::InvalidEntry);
    }

    #[test]
    fn default_stores_first_argument() {
        let payload = admit(None, None, &[callable_arg(|_: &u8| {}), Arg::new(9)]).unwrap();
        assert_eq!(payload.signature(), Some(&Signature::of::<(u8,)>()));
    }

    #[test]
    fn non_callable_first_argument() {
        let err = admit(None, None, &args!["nope"]).unwrap_err();
        assert_eq!(err, ChainError::NotCallable("&str"));
    }

    #[test]
    fn validator_errors_pass_through() {
        let err = admit(Some(&refuse), None, &[callable_arg(|| {})]).unwrap_err();
        assert_eq!(err, ChainError::Rejected("closed".into()));
    }

    #[test]
    fn validator_is_called_once_per_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let counting = move |_: &[Arg]| -> Result<bool, ChainError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        };

        admit(Some(&counting), None, &[callable_arg(|| {})]).unwrap();
        let _ = admit(Some(&counting), None, &[]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn typed_mismatch_is_distinct_from_invalid_entry() {
        let required = Signature::of::<(Tester,)>();
        let mismatched = callable_arg(|_: &Tester, _: &u8| {});
        let err = admit(None, Some(&required), &[mismatched]).unwrap_err();
        assert!(matches!(err, ChainError::TypeMismatch { .. }));
        let matching = callable_arg(|_: &Tester| {});
        assert!(admit(None, Some(&required), &[matching]).is_ok());
    }

    #[test]
    fn transform_output_replaces_payload_and_skips_signature_check() {
        let wrap = ValidationFilter::new(non_empty).with_transform(bind_tester);
        let required = Signature::of::<()>();
        let target = callable_arg(|_: &Tester, n: &u32| assert_eq!(*n, 4));

        let payload = admit(Some(&wrap), Some(&required), &[target]).unwrap();

        assert!(payload.is_proxy());
        payload.invoke(&args![4_u32]).unwrap();
    }
}
