//! Error types for registration and invocation.

use crate::signature::Signature;

/// Errors returned synchronously by registration and chain lookups.
///
/// Registration errors never affect entries that were already admitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// The admission hook refused the registration without giving a reason,
    /// or the registration carried no payload at all.
    #[error("attempt to register an invalid entry")]
    InvalidEntry,

    /// The payload does not match the typed chain's required signature.
    #[error("{found} is not compatible with {expected}")]
    TypeMismatch {
        /// The signature the chain requires.
        expected: Signature,
        /// The signature of the rejected payload.
        found: Signature,
    },

    /// The requested group has no waiter in this chain.
    #[error("chain group has no waiter")]
    NoWaiter,

    /// The payload is neither a function nor a call proxy.
    #[error("attempt to register a non-callable value of type {0}")]
    NotCallable(&'static str),

    /// A group handle does not belong to this chain.
    #[error("group not found: group_{0}")]
    GroupNotFound(usize),

    /// The admission hook rejected the registration with its own reason.
    #[error("registration rejected: {0}")]
    Rejected(String),
}

impl ChainError {
    /// Creates a [`Rejected`](Self::Rejected) error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

/// Errors raised while invoking a stored payload.
///
/// These are reported through logs and hooks; they never abort a run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    /// The argument list has the wrong length for the function.
    #[error("expected {expected} arguments, got {got}")]
    Arity {
        /// Number of arguments the function needs (the minimum for variadics).
        expected: usize,
        /// Number of arguments supplied.
        got: usize,
    },

    /// An argument has the wrong type.
    #[error("argument {index} should be {expected}, got {got}")]
    ArgumentType {
        /// Position of the offending argument.
        index: usize,
        /// The parameter type the function declares.
        expected: &'static str,
        /// The type that was supplied.
        got: &'static str,
    },

    /// A call proxy reported a failure.
    #[error("call failed: {0}")]
    Failed(String),

    /// The payload panicked.
    #[error("payload panicked: {0}")]
    Panicked(String),
}

impl InvokeError {
    /// Creates a [`Failed`](Self::Failed) error.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}
