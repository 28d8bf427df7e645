//! Entry payloads and admission for precede (Layer 1).
//!
//! `precede_call` defines what a chain stores and how it gets there:
//!
//! - [`arg`] - Type-erased argument values and the [`args!`] macro
//! - [`signature`] - Structural signatures compared by typed chains
//! - [`callable`] - Direct function payloads built from plain closures
//! - [`payload`] - The stored [`Payload`] union and [`CallProxy`] adapters
//! - [`admission`] - Validators, transforms and the [`admit`] pipeline
//! - [`error`] - Registration and invocation errors
//!
//! # Architecture
//!
//! - **Layer 1** (`precede_call`): payloads and admission (this crate)
//! - **Layer 2** (`precede_graph`): the ordering chain and its executor
//! - **Layer 3** (`precede_core_plugins`): tracing and diagnostics plugins
//!
//! # Example
//!
//! ```
//! use precede_call::prelude::*;
//!
//! struct Counter(std::sync::atomic::AtomicUsize);
//!
//! let payload = admit(None, None, &args![Callable::new(|c: &Counter| {
//!     c.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
//! })])
//! .unwrap();
//!
//! payload.invoke(&args![Counter(Default::default())]).unwrap();
//! ```

/// Validators, transforms and admission.
pub mod admission;

/// Type-erased arguments.
pub mod arg;

/// Direct function payloads.
pub mod callable;

/// Error types.
pub mod error;

/// Stored payloads and call proxies.
pub mod payload;

/// Payload signatures.
pub mod signature;

pub use admission::{
    DEFAULT_VALIDATION, DefaultValidation, Transform, ValidationFilter, Validator, admit,
};
pub use arg::Arg;
pub use callable::{Callable, IntoCallable, Rest};
pub use error::{ChainError, InvokeError};
pub use payload::{CallProxy, IntoArgs, Payload};
pub use signature::{ParamType, Signature};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::admission::{DEFAULT_VALIDATION, Transform, ValidationFilter, Validator, admit};
    pub use crate::arg::Arg;
    pub use crate::args;
    pub use crate::callable::{Callable, IntoCallable, Rest};
    pub use crate::error::{ChainError, InvokeError};
    pub use crate::payload::{CallProxy, IntoArgs, Payload};
    pub use crate::signature::Signature;
}
