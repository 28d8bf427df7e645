//! Hook registration API for chain runs.
//!
//! [`HooksAPI`] is a registry of observers keyed by schedule. The executor
//! invokes it at every lifecycle point of a run; hooks execute in
//! registration order on whatever task reached that point, so they must be
//! cheap and must not block.
//!
//! # Multi-Schedule Registration
//!
//! ```
//! use precede_graph::hooks::HooksAPI;
//! use precede_graph::hooks::events::ChainEvent;
//! use precede_graph::hooks::schedule::{OnEntryComplete, OnEntryFailed};
//!
//! let hooks = HooksAPI::new();
//! hooks.register_observer::<(OnEntryComplete, OnEntryFailed), _>(
//!     "outcomes",
//!     |event: &ChainEvent| match event {
//!         ChainEvent::EntryComplete { name, .. } => tracing::debug!(name, "done"),
//!         ChainEvent::EntryFailed { name, error, .. } => tracing::warn!(name, %error, "failed"),
//!         _ => {}
//!     },
//! )?;
//! # Ok::<(), precede_graph::hooks::HookRegistrationError>(())
//! ```

use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use super::events::ChainEvent;
use super::plugin::Plugin;
use super::schedule::{IntoScheduleIds, ScheduleId};

// ─────────────────────────────────────────────────────────────────────────────
// BoxedHook
// ─────────────────────────────────────────────────────────────────────────────

/// Type-erased hook receiving `&ChainEvent`.
///
/// Most users should use [`HooksAPI::register_observer`] instead.
pub struct BoxedHook {
    handler: Box<dyn Fn(&ChainEvent) + Send + Sync>,
}

impl BoxedHook {
    /// Wraps a hook function.
    #[must_use]
    pub fn new(handler: impl Fn(&ChainEvent) + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
        }
    }

    /// Invokes the hook.
    pub fn invoke(&self, event: &ChainEvent) {
        (self.handler)(event);
    }
}

impl fmt::Debug for BoxedHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedHook").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HookRegistrationError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during hook registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookRegistrationError {
    /// A hook with this name already exists on the schedule.
    #[error("hook '{name}' already registered for schedule '{}'", .schedule.type_name())]
    DuplicateName {
        /// The schedule where the duplicate was found.
        schedule: ScheduleId,
        /// The duplicate hook name.
        name: String,
    },
}

struct HookEntry {
    name: String,
    hook: BoxedHook,
}

// ─────────────────────────────────────────────────────────────────────────────
// HooksAPI
// ─────────────────────────────────────────────────────────────────────────────

/// Registry of run lifecycle hooks.
///
/// Registration and invocation both take `&self`; the registry is shared
/// with executors through an `Arc`.
#[derive(Default)]
pub struct HooksAPI {
    hooks: RwLock<HashMap<ScheduleId, Vec<HookEntry>>>,
}

impl HooksAPI {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hooks: RwLock::new(HashMap::new()),
        }
    }

    /// Registers an observer for one schedule or a tuple of schedules.
    ///
    /// With more than one schedule the hook is registered once per schedule
    /// as `name@ScheduleType`.
    ///
    /// # Errors
    ///
    /// [`HookRegistrationError::DuplicateName`] if the name is taken on one
    /// of the schedules. Schedules before the duplicate keep the hook.
    pub fn register_observer<S, F>(
        &self,
        name: impl Into<String>,
        hook: F,
    ) -> Result<&Self, HookRegistrationError>
    where
        S: IntoScheduleIds,
        F: Fn(&ChainEvent) + Send + Sync + 'static,
    {
        let schedules = S::schedule_ids();
        let name = name.into();
        let hook = Arc::new(hook);

        for schedule in &schedules {
            let hook_name = if schedules.len() > 1 {
                format!("{}@{}", name, schedule.type_name())
            } else {
                name.clone()
            };
            let hook = Arc::clone(&hook);
            let boxed = BoxedHook::new(move |event| hook(event));
            self.register_boxed(*schedule, hook_name, boxed)?;
        }
        Ok(self)
    }

    /// Registers a pre-built hook for one schedule.
    ///
    /// # Errors
    ///
    /// [`HookRegistrationError::DuplicateName`] if the name is taken.
    pub fn register_boxed(
        &self,
        schedule: ScheduleId,
        name: impl Into<String>,
        hook: BoxedHook,
    ) -> Result<(), HookRegistrationError> {
        let name = name.into();

        let mut hooks = self.hooks.write();
        let entries = hooks.entry(schedule).or_default();

        if entries.iter().any(|entry| entry.name == name) {
            return Err(HookRegistrationError::DuplicateName { schedule, name });
        }

        entries.push(HookEntry { name, hook });
        Ok(())
    }

    /// Lets a plugin register its hooks.
    ///
    /// # Errors
    ///
    /// Whatever the plugin's [`Plugin::build`] returns.
    pub fn add_plugin(&self, plugin: impl Plugin) -> Result<&Self, HookRegistrationError> {
        tracing::debug!(plugin = plugin.name(), "adding hooks plugin");
        plugin.build(self)?;
        Ok(self)
    }

    /// Invokes every hook registered for `schedule`, in registration order.
    pub fn invoke(&self, schedule: ScheduleId, event: &ChainEvent) {
        let hooks = self.hooks.read();

        if let Some(entries) = hooks.get(&schedule) {
            for entry in entries {
                entry.hook.invoke(event);
            }
        }
    }

    /// Invokes the hooks of the event's own schedule.
    pub fn emit(&self, event: &ChainEvent) {
        self.invoke(event.schedule(), event);
    }

    /// Returns the number of hooks registered for `schedule`.
    #[must_use]
    pub fn hook_count(&self, schedule: ScheduleId) -> usize {
        self.hooks.read().get(&schedule).map_or(0, Vec::len)
    }

    /// Checks if a hook named `name` exists on `schedule`.
    #[must_use]
    pub fn contains_hook(&self, schedule: ScheduleId, name: &str) -> bool {
        self.hooks
            .read()
            .get(&schedule)
            .is_some_and(|entries| entries.iter().any(|entry| entry.name == name))
    }
}

impl fmt::Debug for HooksAPI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks = self.hooks.read();
        let mut map = f.debug_map();
        for (schedule, entries) in hooks.iter() {
            let names: Vec<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();
            map.entry(&schedule.type_name(), &names);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RunId;
    use crate::hooks::schedule::{OnEntrySkipped, OnRunComplete, OnRunStart};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn run_start() -> ChainEvent {
        ChainEvent::RunStart {
            run_id: RunId::new(),
            groups: 1,
            entries: 0,
        }
    }

    #[test]
    fn register_increments_count() {
        let api = HooksAPI::new();
        let schedule = ScheduleId::of::<OnRunStart>();

        api.register_observer::<OnRunStart, _>("a", |_: &ChainEvent| {})
            .unwrap()
            .register_observer::<OnRunStart, _>("b", |_: &ChainEvent| {})
            .unwrap();

        assert_eq!(api.hook_count(schedule), 2);
        assert!(api.contains_hook(schedule, "a"));
        assert!(!api.contains_hook(schedule, "c"));
    }

    #[test]
    fn hooks_run_in_registration_order() {
        let api = HooksAPI::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            api.register_observer::<OnRunStart, _>(name, move |_: &ChainEvent| {
                order.lock().unwrap().push(name);
            })
            .unwrap();
        }

        api.emit(&run_start());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn duplicate_names_rejected_per_schedule() {
        let api = HooksAPI::new();
        api.register_observer::<OnRunStart, _>("logger", |_: &ChainEvent| {})
            .unwrap();

        let err = api
            .register_observer::<OnRunStart, _>("logger", |_: &ChainEvent| {})
            .unwrap_err();
        let HookRegistrationError::DuplicateName { name, .. } = err;
        assert_eq!(name, "logger");

        api.register_observer::<OnRunComplete, _>("logger", |_: &ChainEvent| {})
            .expect("same name on a different schedule is allowed");
    }

    #[test]
    fn multi_schedule_observer_gets_suffixed_names() {
        let api = HooksAPI::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        api.register_observer::<(OnRunStart, OnEntrySkipped), _>("tracker", move |_: &ChainEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let start = ScheduleId::of::<OnRunStart>();
        let suffixed = format!("tracker@{}", start.type_name());
        assert!(api.contains_hook(start, &suffixed));
        assert_eq!(api.hook_count(ScheduleId::of::<OnEntrySkipped>()), 1);

        api.emit(&run_start());
        api.invoke(ScheduleId::of::<OnRunComplete>(), &run_start());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
