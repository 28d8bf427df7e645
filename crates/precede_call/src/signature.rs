//! Structural signatures of callable payloads.
//!
//! A typed chain stores a required [`Signature`] and rejects any function
//! payload whose signature differs. Signatures are derived from the static
//! parameter types of the function, so the check happens once at
//! registration instead of on every call.

use core::any::{Any, TypeId};
use core::fmt;

use variadics_please::all_tuples;

/// One parameter type of a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamType {
    type_id: TypeId,
    type_name: &'static str,
}

impl ParamType {
    /// Returns the parameter type for `T`.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// The parameter list of a callable: fixed parameters plus an optional
/// variadic tail.
///
/// # Example
///
/// ```
/// use precede_call::Signature;
///
/// struct Tester;
///
/// let fixed = Signature::of::<(Tester,)>();
/// let variadic = Signature::variadic::<(Tester,), String>();
///
/// assert_eq!(fixed.arity(), 1);
/// assert!(variadic.is_variadic());
/// assert_ne!(fixed, variadic);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    params: Vec<ParamType>,
    rest: Option<ParamType>,
}

impl Signature {
    /// Signature with the fixed parameters of the tuple `P`.
    #[must_use]
    pub fn of<P: ParamList>() -> Self {
        Self {
            params: P::param_types(),
            rest: None,
        }
    }

    /// Signature with the fixed parameters of `P` followed by any number of
    /// `R` arguments.
    #[must_use]
    pub fn variadic<P: ParamList, R: Any>() -> Self {
        Self {
            params: P::param_types(),
            rest: Some(ParamType::of::<R>()),
        }
    }

    /// Returns the fixed parameter types.
    #[must_use]
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Returns the variadic tail type, if any.
    #[must_use]
    pub fn rest(&self) -> Option<ParamType> {
        self.rest
    }

    /// Number of fixed parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Returns true if the signature ends in a variadic tail.
    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.rest.is_some()
    }

    /// Returns true if a payload with signature `other` may be stored in a
    /// chain requiring `self`.
    #[must_use]
    pub fn accepts(&self, other: &Signature) -> bool {
        self == other
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "&{}", param.type_name)?;
        }
        if let Some(rest) = self.rest {
            if !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...{}", rest.type_name)?;
        }
        write!(f, ")")
    }
}

/// Tuples of parameter types usable with [`Signature::of`].
pub trait ParamList: 'static {
    /// Returns the parameter types in order.
    fn param_types() -> Vec<ParamType>;
}

macro_rules! impl_param_list {
    ($($P:ident),*) => {
        impl<$($P: Any),*> ParamList for ($($P,)*) {
            fn param_types() -> Vec<ParamType> {
                vec![$(ParamType::of::<$P>()),*]
            }
        }
    };
}

all_tuples!(impl_param_list, 0, 6, P);

#[cfg(test)]
mod tests {
    use super::*;

    struct Printer;

    #[test]
    fn empty_signature_display() {
        assert_eq!(Signature::of::<()>().to_string(), "fn()");
    }

    #[test]
    fn display_lists_params_and_tail() {
        let sig = Signature::variadic::<(u8, u16), String>();
        assert_eq!(sig.to_string(), "fn(&u8, &u16, ...alloc::string::String)");

        let tail_only = Signature::variadic::<(), u32>();
        assert_eq!(tail_only.to_string(), "fn(...u32)");
    }

    #[test]
    fn parameter_order_matters() {
        assert_ne!(Signature::of::<(u8, u16)>(), Signature::of::<(u16, u8)>());
    }

    #[test]
    fn accepts_only_identical_signatures() {
        let required = Signature::of::<(Printer,)>();
        assert!(required.accepts(&Signature::of::<(Printer,)>()));
        assert!(!required.accepts(&Signature::of::<(Printer, u8)>()));
        assert!(!required.accepts(&Signature::variadic::<(Printer,), u8>()));
    }
}
