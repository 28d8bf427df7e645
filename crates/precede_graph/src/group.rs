//! Execution groups and their entries.
//!
//! A [`Group`] is one tier of a chain: its entries have no order among
//! themselves, and the whole group is ordered relative to its neighbours.

use core::fmt;
use std::sync::Arc;

use precede_call::{Payload, Signature, Validator};

use crate::sync::Barrier;

/// Stable handle to a group of a [`Chain`](crate::Chain).
///
/// Handles are arena indices; a group keeps its handle for the lifetime of
/// the chain no matter how many groups are spliced around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) usize);

impl GroupId {
    /// Creates a group ID.
    #[must_use]
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group_{}", self.0)
    }
}

/// Identifies one entry: its group and its registration index there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId {
    group: GroupId,
    index: usize,
}

impl EntryId {
    /// Returns the owning group.
    #[must_use]
    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Returns the position within the group.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/entry_{}", self.group, self.index)
    }
}

/// A registered unit of work.
///
/// Entries are immutable once admitted.
#[derive(Debug, Clone)]
pub struct Entry {
    id: EntryId,
    payload: Payload,
}

impl Entry {
    /// Returns the entry's ID.
    #[must_use]
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Returns the stored payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the payload's name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.payload.name()
    }
}

/// One tier of the chain.
pub struct Group {
    id: GroupId,
    entries: Vec<Entry>,
    pub(crate) prev: Option<GroupId>,
    pub(crate) next: Option<GroupId>,
    barrier: Arc<Barrier>,
    pub(crate) validator: Option<Arc<dyn Validator>>,
    signature: Option<Arc<Signature>>,
}

impl Group {
    pub(crate) fn new(
        id: GroupId,
        validator: Option<Arc<dyn Validator>>,
        signature: Option<Arc<Signature>>,
    ) -> Self {
        Self {
            id,
            entries: Vec::new(),
            prev: None,
            next: None,
            barrier: Arc::new(Barrier::new()),
            validator,
            signature,
        }
    }

    /// New unlinked group carrying this group's admission hook and signature.
    pub(crate) fn derive(&self, id: GroupId) -> Self {
        Self::new(id, self.validator.clone(), self.signature.clone())
    }

    pub(crate) fn push(&mut self, payload: Payload) {
        let id = EntryId {
            group: self.id,
            index: self.entries.len(),
        };
        self.entries.push(Entry { id, payload });
    }

    /// Returns the group's ID.
    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Returns the entries in registration order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the group has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the preceding group.
    #[must_use]
    pub fn prev(&self) -> Option<GroupId> {
        self.prev
    }

    /// Returns the following group.
    #[must_use]
    pub fn next(&self) -> Option<GroupId> {
        self.next
    }

    /// Returns the barrier counting this group's in-flight entries across
    /// all runs.
    #[must_use]
    pub fn barrier(&self) -> &Arc<Barrier> {
        &self.barrier
    }

    /// Returns the admission hook, if any.
    #[must_use]
    pub fn validator(&self) -> Option<&dyn Validator> {
        self.validator.as_deref()
    }

    /// Returns the required payload signature on typed chains.
    #[must_use]
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_deref()
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let signature = self.signature.as_deref().map(ToString::to_string);
        f.debug_struct("Group")
            .field("id", &self.id)
            .field("entries", &self.entries.len())
            .field("prev", &self.prev)
            .field("next", &self.next)
            .field("in_flight", &self.barrier.in_flight())
            .field("validating", &self.validator.is_some())
            .field("signature", &signature)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use precede_call::Callable;

    #[test]
    fn group_id_display() {
        assert_eq!(GroupId::new(3).to_string(), "group_3");
    }

    #[test]
    fn entry_ids_follow_registration_order() {
        let mut group = Group::new(GroupId::new(2), None, None);
        group.push(Payload::Function(Callable::new(|| {})));
        group.push(Payload::Function(Callable::new(|| {})));

        let ids: Vec<String> = group
            .entries()
            .iter()
            .map(|entry| entry.id().to_string())
            .collect();
        assert_eq!(ids, vec!["group_2/entry_0", "group_2/entry_1"]);
    }

    #[test]
    fn derived_group_inherits_signature_but_not_entries() {
        let signature = Arc::new(Signature::of::<(u8,)>());
        let mut group = Group::new(GroupId::new(0), None, Some(signature));
        group.push(Payload::Function(Callable::new(|_: &u8| {})));

        let derived = group.derive(GroupId::new(1));
        assert!(derived.is_empty());
        assert_eq!(derived.signature(), Some(&Signature::of::<(u8,)>()));
        assert!(derived.prev().is_none() && derived.next().is_none());
    }
}
