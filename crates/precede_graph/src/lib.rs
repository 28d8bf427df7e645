//! Ordering chains and their concurrent executor for precede (Layer 2).
//!
//! `precede_graph` arranges admitted payloads into an ordered sequence of
//! execution groups and runs them: groups strictly in chain order, the
//! entries of one group concurrently.
//!
//! # Core Concepts
//!
//! - [`Chain`] - Doubly linked groups with a registration builder API
//! - [`Group`] - One execution group and its completion barrier
//! - [`Barrier`] - Completion barrier behind every [`Waiter`]
//! - [`ChainExecutor`] - Runtime engine dispatching groups in order
//! - [`hooks`] - Lifecycle observers and plugins
//!
//! # Example
//!
//! ```
//! use precede_call::args;
//! use precede_graph::{Chain, ChainExecutor};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), precede_graph::ChainError> {
//! let mut chain = Chain::new();
//! chain.register(|name: &String| println!("hello, {name}"))?;
//! chain.last(|name: &String| println!("goodbye, {name}"))?;
//!
//! let report = ChainExecutor::new()
//!     .run(&chain, args![String::from("world")])
//!     .await;
//! assert_eq!(report.invoked, 2);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! This crate is Layer 2 of precede:
//!
//! - **Layer 1** (`precede_call`): payloads and admission
//! - **Layer 2** (`precede_graph`): the ordering chain and its executor (this crate)
//! - **Layer 3** (`precede_core_plugins`): tracing and diagnostics plugins

/// Chain structure and builder API.
pub mod chain;

/// Chain execution engine.
pub mod executor;

/// Execution groups and entries.
pub mod group;

/// Lifecycle hooks for chain runs.
pub mod hooks;

/// Completion barriers, slots and gates.
pub mod sync;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::chain::{Chain, Groups, Link};
    pub use crate::executor::{
        ChainExecutor, DirectInvoke, ExecutorConfig, Invoke, RunId, RunReport,
    };
    pub use crate::group::{Entry, EntryId, Group, GroupId};
    pub use crate::hooks::{ChainEvent, HookRegistrationError, HooksAPI, Plugin};
    pub use crate::sync::{Barrier, NULL_WAITER, NullWaiter, Waiter};
}

// Re-export key types at crate root for convenience
pub use chain::{Chain, Groups, Link};
pub use executor::{ChainExecutor, DirectInvoke, ExecutorConfig, Invoke, RunId, RunReport};
pub use group::{Entry, EntryId, Group, GroupId};
pub use precede_call::{ChainError, InvokeError};
pub use sync::{Barrier, NULL_WAITER, NullWaiter, Waiter};
