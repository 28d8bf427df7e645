//! Schedule identifiers and the run lifecycle markers.
//!
//! A schedule is identified by a marker type wrapped in a [`ScheduleId`].
//! Hooks register against one or more schedules and receive the matching
//! [`ChainEvent`](super::events::ChainEvent) when the executor reaches that
//! point of a run.

use core::any::TypeId;

use variadics_please::all_tuples;

/// Identifier for a hook schedule, derived from a marker type.
///
/// ```
/// use precede_graph::hooks::schedule::{OnRunStart, ScheduleId};
///
/// let schedule = ScheduleId::of::<OnRunStart>();
/// assert!(schedule.type_name().ends_with("OnRunStart"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleId {
    type_id: TypeId,
    type_name: &'static str,
}

impl ScheduleId {
    /// Creates a `ScheduleId` for the given marker type.
    #[must_use]
    pub fn of<S: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            type_name: core::any::type_name::<S>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for debugging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Marker trait for schedule types.
pub trait Schedule: 'static {}

/// Types that name one or more schedules: a single marker or a tuple of
/// markers.
pub trait IntoScheduleIds {
    /// Returns the schedule IDs for this type.
    fn schedule_ids() -> Vec<ScheduleId>;
}

impl<S: Schedule> IntoScheduleIds for S {
    fn schedule_ids() -> Vec<ScheduleId> {
        vec![ScheduleId::of::<S>()]
    }
}

macro_rules! impl_into_schedule_ids_for_tuple {
    ($($S:ident),*) => {
        impl<$($S: Schedule),*> IntoScheduleIds for ($($S,)*) {
            fn schedule_ids() -> Vec<ScheduleId> {
                vec![$(ScheduleId::of::<$S>()),*]
            }
        }
    };
}

all_tuples!(impl_into_schedule_ids_for_tuple, 2, 8, S);

// ─────────────────────────────────────────────────────────────────────────────
// Run Schedules
// ─────────────────────────────────────────────────────────────────────────────

/// Fired once before the first group is dispatched.
///
/// Event data: [`ChainEvent::RunStart`](super::events::ChainEvent::RunStart)
pub struct OnRunStart;
impl Schedule for OnRunStart {}

/// Fired once after every entry of the run has completed, been skipped,
/// been abandoned or been cancelled.
///
/// Event data: [`ChainEvent::RunComplete`](super::events::ChainEvent::RunComplete)
pub struct OnRunComplete;
impl Schedule for OnRunComplete {}

// ─────────────────────────────────────────────────────────────────────────────
// Group Schedules
// ─────────────────────────────────────────────────────────────────────────────

/// Fired when the executor starts handing a group's entries off.
///
/// Event data: [`ChainEvent::GroupDispatch`](super::events::ChainEvent::GroupDispatch)
pub struct OnGroupDispatch;
impl Schedule for OnGroupDispatch {}

/// Fired when a group's handoff timed out and its remaining entries were
/// dropped for this run.
///
/// Event data: [`ChainEvent::EntriesAbandoned`](super::events::ChainEvent::EntriesAbandoned)
pub struct OnEntriesAbandoned;
impl Schedule for OnEntriesAbandoned {}

// ─────────────────────────────────────────────────────────────────────────────
// Entry Schedules
// ─────────────────────────────────────────────────────────────────────────────

/// Fired after an entry passed its gate, right before it is invoked.
///
/// Event data: [`ChainEvent::EntryStart`](super::events::ChainEvent::EntryStart)
pub struct OnEntryStart;
impl Schedule for OnEntryStart {}

/// Fired after an entry was invoked successfully.
///
/// Event data: [`ChainEvent::EntryComplete`](super::events::ChainEvent::EntryComplete)
pub struct OnEntryComplete;
impl Schedule for OnEntryComplete {}

/// Fired when an invocation returned an error or panicked.
///
/// Event data: [`ChainEvent::EntryFailed`](super::events::ChainEvent::EntryFailed)
pub struct OnEntryFailed;
impl Schedule for OnEntryFailed {}

/// Fired when the run filter rejected an entry.
///
/// Event data: [`ChainEvent::EntrySkipped`](super::events::ChainEvent::EntrySkipped)
pub struct OnEntrySkipped;
impl Schedule for OnEntrySkipped {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_id_equality() {
        assert_eq!(
            ScheduleId::of::<OnRunStart>(),
            ScheduleId::of::<OnRunStart>()
        );
        assert_ne!(
            ScheduleId::of::<OnRunStart>(),
            ScheduleId::of::<OnRunComplete>()
        );
        assert_eq!(
            ScheduleId::of::<OnEntryStart>().type_id(),
            TypeId::of::<OnEntryStart>()
        );
    }

    #[test]
    fn into_schedule_ids_single_and_tuple() {
        assert_eq!(
            OnEntryFailed::schedule_ids(),
            vec![ScheduleId::of::<OnEntryFailed>()]
        );

        let ids = <(OnEntryStart, OnEntryComplete, OnEntrySkipped)>::schedule_ids();
        assert_eq!(
            ids,
            vec![
                ScheduleId::of::<OnEntryStart>(),
                ScheduleId::of::<OnEntryComplete>(),
                ScheduleId::of::<OnEntrySkipped>(),
            ]
        );
    }
}
