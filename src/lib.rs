//! Ordered execution chains for Rust.
//!
//! Callbacks are registered into groups; groups form a chain and run one
//! after another, while the callbacks inside a group run concurrently.
//!
//! ```
//! use precede::prelude::*;
//!
//! # fn main() -> Result<(), ChainError> {
//! let mut chain = Chain::new();
//! let startup = chain.register(|| println!("startup"))?;
//! chain.before_at(startup, || println!("before startup"))?;
//! chain.last(|| println!("shutdown"))?;
//!
//! let report = ChainExecutor::new().run_blocking(&chain, args![]).unwrap();
//! assert_eq!(report.invoked, 3);
//! # Ok(())
//! # }
//! ```

pub use precede_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use precede_internal::prelude::*;
}
