//! Aggregate counters across runs.
//!
//! [`RunStatsPlugin`] observes every run of the executors sharing its hook
//! registry and keeps running totals, plus the report of the most recent
//! run. Useful for health endpoints and for spotting consumers that stall
//! often enough to abandon entries.
//!
//! ```
//! use std::sync::Arc;
//! use precede_call::args;
//! use precede_core_plugins::RunStatsPlugin;
//! use precede_graph::{Chain, ChainExecutor};
//! use precede_graph::hooks::HooksAPI;
//!
//! let plugin = RunStatsPlugin::new();
//! let stats = plugin.stats();
//!
//! let hooks = HooksAPI::new();
//! hooks.add_plugin(plugin)?;
//!
//! let mut chain = Chain::new();
//! chain.register(|| {}).unwrap();
//! ChainExecutor::new()
//!     .with_hooks(Arc::new(hooks))
//!     .run_blocking(&chain, args![])
//!     .unwrap();
//!
//! assert_eq!(stats.snapshot().runs, 1);
//! assert_eq!(stats.snapshot().entries_completed, 1);
//! # Ok::<(), precede_graph::hooks::HookRegistrationError>(())
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use precede_graph::RunReport;
use precede_graph::hooks::events::ChainEvent;
use precede_graph::hooks::schedule::{
    OnEntriesAbandoned, OnEntryComplete, OnEntryFailed, OnEntrySkipped, OnEntryStart,
    OnGroupDispatch, OnRunComplete, OnRunStart,
};
use precede_graph::hooks::{HookRegistrationError, HooksAPI, Plugin};

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatsSnapshot {
    /// Runs started.
    pub runs: usize,
    /// Runs finished.
    pub runs_completed: usize,
    /// Groups handed off.
    pub groups_dispatched: usize,
    /// Entries that passed their gate.
    pub entries_started: usize,
    /// Entries invoked successfully.
    pub entries_completed: usize,
    /// Entries that failed or panicked.
    pub entries_failed: usize,
    /// Entries rejected by a run filter.
    pub entries_skipped: usize,
    /// Entries dropped by a timed-out handoff.
    pub entries_abandoned: usize,
}

/// Shared counters updated by [`RunStatsPlugin`].
#[derive(Debug, Default)]
pub struct RunStats {
    runs: AtomicUsize,
    runs_completed: AtomicUsize,
    groups_dispatched: AtomicUsize,
    entries_started: AtomicUsize,
    entries_completed: AtomicUsize,
    entries_failed: AtomicUsize,
    entries_skipped: AtomicUsize,
    entries_abandoned: AtomicUsize,
    last_report: Mutex<Option<RunReport>>,
}

impl RunStats {
    /// Reads every counter.
    #[must_use]
    pub fn snapshot(&self) -> RunStatsSnapshot {
        let read = |counter: &AtomicUsize| counter.load(Ordering::Acquire);
        RunStatsSnapshot {
            runs: read(&self.runs),
            runs_completed: read(&self.runs_completed),
            groups_dispatched: read(&self.groups_dispatched),
            entries_started: read(&self.entries_started),
            entries_completed: read(&self.entries_completed),
            entries_failed: read(&self.entries_failed),
            entries_skipped: read(&self.entries_skipped),
            entries_abandoned: read(&self.entries_abandoned),
        }
    }

    /// Report of the most recently completed run.
    #[must_use]
    pub fn last_report(&self) -> Option<RunReport> {
        self.last_report.lock().clone()
    }

    /// Zeroes every counter and forgets the last report.
    pub fn reset(&self) {
        for counter in [
            &self.runs,
            &self.runs_completed,
            &self.groups_dispatched,
            &self.entries_started,
            &self.entries_completed,
            &self.entries_failed,
            &self.entries_skipped,
            &self.entries_abandoned,
        ] {
            counter.store(0, Ordering::Release);
        }
        *self.last_report.lock() = None;
    }

    fn record(&self, event: &ChainEvent) {
        let bump = |counter: &AtomicUsize, by: usize| {
            counter.fetch_add(by, Ordering::AcqRel);
        };
        match event {
            ChainEvent::RunStart { .. } => bump(&self.runs, 1),
            ChainEvent::RunComplete { report } => {
                bump(&self.runs_completed, 1);
                *self.last_report.lock() = Some(report.clone());
            }
            ChainEvent::GroupDispatch { .. } => bump(&self.groups_dispatched, 1),
            ChainEvent::EntriesAbandoned { count, .. } => bump(&self.entries_abandoned, *count),
            ChainEvent::EntryStart { .. } => bump(&self.entries_started, 1),
            ChainEvent::EntryComplete { .. } => bump(&self.entries_completed, 1),
            ChainEvent::EntryFailed { .. } => bump(&self.entries_failed, 1),
            ChainEvent::EntrySkipped { .. } => bump(&self.entries_skipped, 1),
        }
    }
}

/// Collects [`RunStats`] from every observed run.
#[derive(Debug, Clone, Default)]
pub struct RunStatsPlugin {
    stats: Arc<RunStats>,
}

impl RunStatsPlugin {
    /// Creates the plugin with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the counters; stays valid after the plugin is added.
    #[must_use]
    pub fn stats(&self) -> Arc<RunStats> {
        Arc::clone(&self.stats)
    }
}

impl Plugin for RunStatsPlugin {
    fn build(&self, hooks: &HooksAPI) -> Result<(), HookRegistrationError> {
        let stats = Arc::clone(&self.stats);
        hooks.register_observer::<(
            OnRunStart,
            OnRunComplete,
            OnGroupDispatch,
            OnEntriesAbandoned,
            OnEntryStart,
            OnEntryComplete,
            OnEntryFailed,
            OnEntrySkipped,
        ), _>("precede::run_stats", move |event: &ChainEvent| {
            stats.record(event);
        })?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "precede::run_stats"
    }
}
