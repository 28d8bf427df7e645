//! Lifecycle hooks for chain runs.
//!
//! Plugins extend the executor with observers that fire at fixed points of
//! a run: run start and completion, each group handoff, and each entry's
//! start, completion, failure or skip. Abandoned handoffs are reported here
//! too, which makes this module the diagnostic channel for stuck consumers.
//!
//! # Architecture
//!
//! - **Schedule markers** ([`schedule`]): empty types that identify hook points
//! - **Events** ([`events`]): the `ChainEvent` enum carrying context to hooks
//! - **API** ([`api`]): registration and invocation
//! - **Plugins** ([`plugin`]): bundles of hooks
//!
//! Hooks run synchronously on the task that reached the hook point, in
//! registration order.

pub mod api;
pub mod events;
pub mod plugin;
pub mod schedule;

pub use api::{BoxedHook, HookRegistrationError, HooksAPI};
pub use events::ChainEvent;
pub use plugin::Plugin;
pub use schedule::{IntoScheduleIds, Schedule, ScheduleId};
