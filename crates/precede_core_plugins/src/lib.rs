//! Core plugins for precede chain runs.
//!
//! This crate provides hook plugins most applications want on their
//! executors:
//!
//! - [`TracingPlugin`] - Subscriber installation and logging of every run event
//! - [`RunStatsPlugin`] - Aggregate counters across runs
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use precede_core_plugins::{RunStatsPlugin, TracingPlugin};
//! use precede_graph::ChainExecutor;
//! use precede_graph::hooks::HooksAPI;
//! use tracing::Level;
//!
//! let stats = RunStatsPlugin::new();
//! let hooks = HooksAPI::new();
//! hooks
//!     .add_plugin(TracingPlugin::default().with_level(Level::DEBUG))?
//!     .add_plugin(stats.clone())?;
//!
//! let executor = ChainExecutor::new().with_hooks(Arc::new(hooks));
//! # let _ = executor;
//! # Ok::<(), precede_graph::hooks::HookRegistrationError>(())
//! ```
//!
//! # Architecture
//!
//! This crate is Layer 3 of precede:
//!
//! - **Layer 1** (`precede_call`): payloads and admission
//! - **Layer 2** (`precede_graph`): the ordering chain and its executor
//! - **Layer 3** (`precede_core_plugins`): tracing and diagnostics plugins (this crate)

mod run_stats;
mod tracing_plugin;

// Re-export plugins
pub use run_stats::RunStatsPlugin;
pub use tracing_plugin::{TRACING_HOOK, TracingFormat, TracingPlugin};

// Re-export plugin state
pub use run_stats::{RunStats, RunStatsSnapshot};
pub use tracing_plugin::TracingConfig;
