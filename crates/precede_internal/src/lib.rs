//! # precede Internal Library
//!
//! Re-exports the core precede crates for convenience.

/// Layer 1: Entry payloads and admission.
pub use precede_call;

/// Layer 2: Ordering chains and their executor.
pub use precede_graph;

/// Layer 3: Tracing and diagnostics plugins.
pub use precede_core_plugins;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use precede_call::prelude::*;
    pub use precede_core_plugins::{RunStatsPlugin, TracingFormat, TracingPlugin};
    pub use precede_graph::prelude::*;
}
