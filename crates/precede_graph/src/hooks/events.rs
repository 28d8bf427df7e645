//! Unified event enum for run hooks.
//!
//! All hooks receive `&ChainEvent` and match on the variants they care
//! about.
//!
//! ```
//! use precede_graph::hooks::events::ChainEvent;
//!
//! fn describe(event: &ChainEvent) -> Option<String> {
//!     match event {
//!         ChainEvent::EntryFailed { entry, error, .. } => Some(format!("{entry}: {error}")),
//!         ChainEvent::EntriesAbandoned { group, count, .. } => {
//!             Some(format!("{count} entries of {group} abandoned"))
//!         }
//!         _ => None,
//!     }
//! }
//! # let _ = describe;
//! ```

use core::fmt;
use core::time::Duration;

use crate::executor::{RunId, RunReport};
use crate::group::{EntryId, GroupId};
use crate::hooks::schedule::{
    OnEntriesAbandoned, OnEntryComplete, OnEntryFailed, OnEntrySkipped, OnEntryStart,
    OnGroupDispatch, OnRunComplete, OnRunStart, ScheduleId,
};

/// Event passed to every hook.
#[derive(Debug, Clone)]
pub enum ChainEvent {
    // ─────────────────────────────────────────────────────────────────────────
    // Run Events
    // ─────────────────────────────────────────────────────────────────────────
    /// A run is about to dispatch its first group.
    RunStart {
        /// The run.
        run_id: RunId,
        /// Number of groups in the chain.
        groups: usize,
        /// Number of entries in the chain.
        entries: usize,
    },

    /// A run finished.
    RunComplete {
        /// Final counters of the run.
        report: RunReport,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Group Events
    // ─────────────────────────────────────────────────────────────────────────
    /// A group's entries are being handed off.
    GroupDispatch {
        /// The run.
        run_id: RunId,
        /// The group.
        group: GroupId,
        /// Zero-based position of the group in the run.
        position: usize,
        /// Number of entries in the group.
        entries: usize,
    },

    /// A handoff timed out; the rest of the group was dropped for this run.
    EntriesAbandoned {
        /// The run.
        run_id: RunId,
        /// The group.
        group: GroupId,
        /// Number of entries not handed off.
        count: usize,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Entry Events
    // ─────────────────────────────────────────────────────────────────────────
    /// An entry passed its gate and is about to be invoked.
    EntryStart {
        /// The run.
        run_id: RunId,
        /// The entry.
        entry: EntryId,
        /// The payload's name.
        name: &'static str,
    },

    /// An entry was invoked successfully.
    EntryComplete {
        /// The run.
        run_id: RunId,
        /// The entry.
        entry: EntryId,
        /// The payload's name.
        name: &'static str,
        /// How long the invocation took.
        duration: Duration,
    },

    /// An invocation returned an error or panicked.
    EntryFailed {
        /// The run.
        run_id: RunId,
        /// The entry.
        entry: EntryId,
        /// The payload's name.
        name: &'static str,
        /// The error message.
        error: String,
    },

    /// The run filter rejected an entry.
    EntrySkipped {
        /// The run.
        run_id: RunId,
        /// The entry.
        entry: EntryId,
        /// The payload's name.
        name: &'static str,
    },
}

impl ChainEvent {
    /// Returns the schedule this event is delivered on.
    #[must_use]
    pub fn schedule(&self) -> ScheduleId {
        match self {
            ChainEvent::RunStart { .. } => ScheduleId::of::<OnRunStart>(),
            ChainEvent::RunComplete { .. } => ScheduleId::of::<OnRunComplete>(),
            ChainEvent::GroupDispatch { .. } => ScheduleId::of::<OnGroupDispatch>(),
            ChainEvent::EntriesAbandoned { .. } => ScheduleId::of::<OnEntriesAbandoned>(),
            ChainEvent::EntryStart { .. } => ScheduleId::of::<OnEntryStart>(),
            ChainEvent::EntryComplete { .. } => ScheduleId::of::<OnEntryComplete>(),
            ChainEvent::EntryFailed { .. } => ScheduleId::of::<OnEntryFailed>(),
            ChainEvent::EntrySkipped { .. } => ScheduleId::of::<OnEntrySkipped>(),
        }
    }

    /// Returns the schedule marker name for this event variant.
    #[must_use]
    pub fn schedule_name(&self) -> &'static str {
        match self {
            ChainEvent::RunStart { .. } => "OnRunStart",
            ChainEvent::RunComplete { .. } => "OnRunComplete",
            ChainEvent::GroupDispatch { .. } => "OnGroupDispatch",
            ChainEvent::EntriesAbandoned { .. } => "OnEntriesAbandoned",
            ChainEvent::EntryStart { .. } => "OnEntryStart",
            ChainEvent::EntryComplete { .. } => "OnEntryComplete",
            ChainEvent::EntryFailed { .. } => "OnEntryFailed",
            ChainEvent::EntrySkipped { .. } => "OnEntrySkipped",
        }
    }

    /// Returns the run the event belongs to.
    #[must_use]
    pub fn run_id(&self) -> &RunId {
        match self {
            ChainEvent::RunComplete { report } => &report.run_id,
            ChainEvent::RunStart { run_id, .. }
            | ChainEvent::GroupDispatch { run_id, .. }
            | ChainEvent::EntriesAbandoned { run_id, .. }
            | ChainEvent::EntryStart { run_id, .. }
            | ChainEvent::EntryComplete { run_id, .. }
            | ChainEvent::EntryFailed { run_id, .. }
            | ChainEvent::EntrySkipped { run_id, .. } => run_id,
        }
    }

    /// Returns the entry for entry-level events.
    #[must_use]
    pub fn entry(&self) -> Option<EntryId> {
        match self {
            ChainEvent::EntryStart { entry, .. }
            | ChainEvent::EntryComplete { entry, .. }
            | ChainEvent::EntryFailed { entry, .. }
            | ChainEvent::EntrySkipped { entry, .. } => Some(*entry),
            ChainEvent::RunStart { .. }
            | ChainEvent::RunComplete { .. }
            | ChainEvent::GroupDispatch { .. }
            | ChainEvent::EntriesAbandoned { .. } => None,
        }
    }
}

impl fmt::Display for ChainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainEvent::RunStart {
                run_id,
                groups,
                entries,
            } => write!(
                f,
                "RunStart({run_id}, groups: {groups}, entries: {entries})"
            ),
            ChainEvent::RunComplete { report } => write!(f, "RunComplete({report})"),
            ChainEvent::GroupDispatch {
                run_id,
                group,
                position,
                entries,
            } => write!(
                f,
                "GroupDispatch({run_id}, {group} @ {position}, entries: {entries})"
            ),
            ChainEvent::EntriesAbandoned {
                run_id,
                group,
                count,
            } => write!(f, "EntriesAbandoned({run_id}, {group}, count: {count})"),
            ChainEvent::EntryStart {
                run_id,
                entry,
                name,
            } => write!(f, "EntryStart({run_id}, {name} @ {entry})"),
            ChainEvent::EntryComplete {
                run_id,
                entry,
                name,
                duration,
            } => write!(
                f,
                "EntryComplete({run_id}, {name} @ {entry}, duration: {duration:?})"
            ),
            ChainEvent::EntryFailed {
                run_id,
                entry,
                name,
                error,
            } => write!(f, "EntryFailed({run_id}, {name} @ {entry}, error: {error})"),
            ChainEvent::EntrySkipped {
                run_id,
                entry,
                name,
            } => write!(f, "EntrySkipped({run_id}, {name} @ {entry})"),
        }
    }
}
