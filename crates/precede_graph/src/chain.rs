//! The ordering chain and its builder API.
//!
//! A [`Chain`] is a doubly linked sequence of [`Group`]s stored in an arena.
//! Registration either appends to an existing group (`register`) or splices
//! a new group next to one (`before`, `after`) or at either end of the chain
//! (`first`, `last`). Groups run strictly one after another; entries inside
//! a group run concurrently.
//!
//! # Example
//!
//! ```
//! use precede_graph::Chain;
//!
//! let mut chain = Chain::new();
//! let startup = chain.register(|| {})?;
//! let before = chain.before_at(startup, || {})?;
//! let last = chain.last(|| {})?;
//!
//! assert_eq!(chain.len(), 3);
//! assert_eq!(chain.head(), before);
//! assert_eq!(chain.tail(), last);
//! # Ok::<(), precede_graph::ChainError>(())
//! ```

use std::sync::Arc;

use precede_call::{ChainError, IntoArgs, Signature, Validator, admit};

use crate::group::{Entry, Group, GroupId};
use crate::sync::Barrier;

/// An ordering graph of execution groups.
///
/// The chain is mutated only while it is being built. Runs borrow it
/// immutably, so any number of concurrent runs may share one chain.
#[derive(Debug)]
pub struct Chain {
    groups: Vec<Group>,
    origin: GroupId,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    /// Creates a chain with one empty group and no admission hook.
    #[must_use]
    pub fn new() -> Self {
        Self::with_hooks(None, None)
    }

    /// Creates a typed chain: every function payload must have `signature`.
    #[must_use]
    pub fn typed(signature: Signature) -> Self {
        Self::with_hooks(None, Some(Arc::new(signature)))
    }

    /// Creates a chain whose registrations pass through `validator`.
    #[must_use]
    pub fn validating(validator: impl Validator) -> Self {
        Self::with_hooks(Some(Arc::new(validator)), None)
    }

    /// Combination of [`typed`](Self::typed) and
    /// [`validating`](Self::validating).
    #[must_use]
    pub fn typed_validating(signature: Signature, validator: impl Validator) -> Self {
        Self::with_hooks(Some(Arc::new(validator)), Some(Arc::new(signature)))
    }

    fn with_hooks(
        validator: Option<Arc<dyn Validator>>,
        signature: Option<Arc<Signature>>,
    ) -> Self {
        let origin = GroupId(0);
        Self {
            groups: vec![Group::new(origin, validator, signature)],
            origin,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────

    /// The group the chain was created with.
    #[must_use]
    pub fn origin(&self) -> GroupId {
        self.origin
    }

    /// Returns the group with the given ID.
    ///
    /// # Errors
    ///
    /// [`ChainError::GroupNotFound`] if `id` is not a group of this chain.
    pub fn group(&self, id: GroupId) -> Result<&Group, ChainError> {
        self.groups.get(id.0).ok_or(ChainError::GroupNotFound(id.0))
    }

    fn group_mut(&mut self, id: GroupId) -> Result<&mut Group, ChainError> {
        self.groups
            .get_mut(id.0)
            .ok_or(ChainError::GroupNotFound(id.0))
    }

    /// Returns a group's entries in registration order.
    ///
    /// # Errors
    ///
    /// [`ChainError::GroupNotFound`] for an unknown handle.
    pub fn entries(&self, id: GroupId) -> Result<&[Entry], ChainError> {
        self.group(id).map(Group::entries)
    }

    /// Returns the barrier tracking a group's in-flight entries.
    ///
    /// # Errors
    ///
    /// [`ChainError::NoWaiter`] if `id` is not a group of this chain.
    pub fn waiter(&self, id: GroupId) -> Result<Arc<Barrier>, ChainError> {
        self.groups
            .get(id.0)
            .map(|group| Arc::clone(group.barrier()))
            .ok_or(ChainError::NoWaiter)
    }

    /// Zero-based position of a group in execution order.
    ///
    /// # Errors
    ///
    /// [`ChainError::GroupNotFound`] for an unknown handle.
    pub fn position(&self, id: GroupId) -> Result<usize, ChainError> {
        self.groups()
            .position(|group| group.id() == id)
            .ok_or(ChainError::GroupNotFound(id.0))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Traversal
    // ─────────────────────────────────────────────────────────────────────

    /// The first group in execution order.
    #[must_use]
    pub fn head(&self) -> GroupId {
        self.walk(self.origin, |group| group.prev)
    }

    /// The last group in execution order.
    #[must_use]
    pub fn tail(&self) -> GroupId {
        self.walk(self.origin, |group| group.next)
    }

    /// Follows `step` from `from` until it runs out. Bounded by the arena
    /// size, so a corrupted link can never spin forever.
    fn walk(&self, from: GroupId, step: impl Fn(&Group) -> Option<GroupId>) -> GroupId {
        let mut current = from;
        for _ in 0..self.groups.len() {
            match self.groups.get(current.0).and_then(&step) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if no entry has been registered anywhere in the chain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(Group::is_empty)
    }

    /// Total number of entries across all groups.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }

    /// The group at position `len / 2` in execution order.
    #[must_use]
    pub fn middle(&self) -> GroupId {
        self.groups()
            .nth(self.len() / 2)
            .map_or(self.origin, Group::id)
    }

    /// Iterates groups from head to tail.
    ///
    /// The iterator reflects the chain as it is when `groups` is called.
    #[must_use]
    pub fn groups(&self) -> Groups<'_> {
        Groups {
            chain: self,
            next: Some(self.head()),
            remaining: self.groups.len(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Admission hook
    // ─────────────────────────────────────────────────────────────────────

    /// The origin group's admission hook.
    #[must_use]
    pub fn validator(&self) -> Option<&dyn Validator> {
        self.groups.get(self.origin.0).and_then(Group::validator)
    }

    /// The required payload signature, if this is a typed chain.
    #[must_use]
    pub fn signature(&self) -> Option<&Signature> {
        self.groups.get(self.origin.0).and_then(Group::signature)
    }

    /// Replaces the admission hook of every group currently in the chain.
    ///
    /// Groups created later inherit the hook of the group they are spliced
    /// next to.
    pub fn set_validator(&mut self, validator: impl Validator) {
        let validator: Arc<dyn Validator> = Arc::new(validator);
        let mut current = Some(self.head());
        for _ in 0..self.groups.len() {
            let Some(group) = current.and_then(|id| self.groups.get_mut(id.0)) else {
                break;
            };
            group.validator = Some(Arc::clone(&validator));
            current = group.next;
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────

    /// Admits `input` into group `at`. No group is created.
    ///
    /// # Errors
    ///
    /// Any admission error, or [`ChainError::GroupNotFound`].
    pub fn register_at<M>(
        &mut self,
        at: GroupId,
        input: impl IntoArgs<M>,
    ) -> Result<GroupId, ChainError> {
        let payload = self.admit_with(at, input)?;
        self.group_mut(at)?.push(payload);
        Ok(at)
    }

    /// Creates a group immediately before `at` and admits `input` there.
    ///
    /// # Errors
    ///
    /// Any admission error, or [`ChainError::GroupNotFound`]. The chain is
    /// unchanged on error.
    pub fn before_at<M>(
        &mut self,
        at: GroupId,
        input: impl IntoArgs<M>,
    ) -> Result<GroupId, ChainError> {
        let payload = self.admit_with(at, input)?;
        let id = self.insert_before(at)?;
        self.group_mut(id)?.push(payload);
        Ok(id)
    }

    /// Creates a group immediately after `at` and admits `input` there.
    ///
    /// # Errors
    ///
    /// Any admission error, or [`ChainError::GroupNotFound`]. The chain is
    /// unchanged on error.
    pub fn after_at<M>(
        &mut self,
        at: GroupId,
        input: impl IntoArgs<M>,
    ) -> Result<GroupId, ChainError> {
        let payload = self.admit_with(at, input)?;
        let id = self.insert_after(at)?;
        self.group_mut(id)?.push(payload);
        Ok(id)
    }

    /// Creates a new head group and admits `input` there.
    ///
    /// Only the most recent call is truly first: a later `first` lands
    /// before this one.
    ///
    /// # Errors
    ///
    /// Any admission error, or [`ChainError::GroupNotFound`]. The chain is
    /// unchanged on error.
    pub fn first_at<M>(
        &mut self,
        at: GroupId,
        input: impl IntoArgs<M>,
    ) -> Result<GroupId, ChainError> {
        self.group(at)?;
        let head = self.walk(at, |group| group.prev);
        self.before_at(head, input)
    }

    /// Creates a new tail group and admits `input` there.
    ///
    /// # Errors
    ///
    /// Any admission error, or [`ChainError::GroupNotFound`]. The chain is
    /// unchanged on error.
    pub fn last_at<M>(
        &mut self,
        at: GroupId,
        input: impl IntoArgs<M>,
    ) -> Result<GroupId, ChainError> {
        self.group(at)?;
        let tail = self.walk(at, |group| group.next);
        self.after_at(tail, input)
    }

    /// [`register_at`](Self::register_at) on the origin group.
    ///
    /// # Errors
    ///
    /// Any admission error.
    pub fn register<M>(&mut self, input: impl IntoArgs<M>) -> Result<GroupId, ChainError> {
        self.register_at(self.origin, input)
    }

    /// [`before_at`](Self::before_at) the origin group.
    ///
    /// # Errors
    ///
    /// Any admission error.
    pub fn before<M>(&mut self, input: impl IntoArgs<M>) -> Result<GroupId, ChainError> {
        self.before_at(self.origin, input)
    }

    /// [`after_at`](Self::after_at) the origin group.
    ///
    /// # Errors
    ///
    /// Any admission error.
    pub fn after<M>(&mut self, input: impl IntoArgs<M>) -> Result<GroupId, ChainError> {
        self.after_at(self.origin, input)
    }

    /// [`first_at`](Self::first_at) from the origin group.
    ///
    /// # Errors
    ///
    /// Any admission error.
    pub fn first<M>(&mut self, input: impl IntoArgs<M>) -> Result<GroupId, ChainError> {
        self.first_at(self.origin, input)
    }

    /// [`last_at`](Self::last_at) from the origin group.
    ///
    /// # Errors
    ///
    /// Any admission error.
    pub fn last<M>(&mut self, input: impl IntoArgs<M>) -> Result<GroupId, ChainError> {
        self.last_at(self.origin, input)
    }

    /// Fluent cursor positioned at `id`.
    ///
    /// # Errors
    ///
    /// [`ChainError::GroupNotFound`] for an unknown handle.
    pub fn link(&mut self, id: GroupId) -> Result<Link<'_>, ChainError> {
        self.group(id)?;
        Ok(Link {
            chain: self,
            at: id,
        })
    }

    /// Fluent cursor positioned at the origin group.
    #[must_use]
    pub fn origin_link(&mut self) -> Link<'_> {
        let at = self.origin;
        Link { chain: self, at }
    }

    fn admit_with<M>(
        &self,
        at: GroupId,
        input: impl IntoArgs<M>,
    ) -> Result<precede_call::Payload, ChainError> {
        let group = self.group(at)?;
        let args = input.into_args();
        admit(group.validator(), group.signature(), &args)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Splicing
    // ─────────────────────────────────────────────────────────────────────

    fn insert_before(&mut self, at: GroupId) -> Result<GroupId, ChainError> {
        let id = GroupId(self.groups.len());
        let anchor = self.group(at)?;
        let mut group = anchor.derive(id);
        let prev = anchor.prev;

        group.prev = prev;
        group.next = Some(at);
        if let Some(prev) = prev {
            self.group_mut(prev)?.next = Some(id);
        }
        self.group_mut(at)?.prev = Some(id);
        self.groups.push(group);
        Ok(id)
    }

    fn insert_after(&mut self, at: GroupId) -> Result<GroupId, ChainError> {
        let id = GroupId(self.groups.len());
        let anchor = self.group(at)?;
        let mut group = anchor.derive(id);
        let next = anchor.next;

        group.prev = Some(at);
        group.next = next;
        if let Some(next) = next {
            self.group_mut(next)?.prev = Some(id);
        }
        self.group_mut(at)?.next = Some(id);
        self.groups.push(group);
        Ok(id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Groups iterator
// ─────────────────────────────────────────────────────────────────────────────

/// Head-to-tail iterator over a chain's groups.
///
/// The successor is read before each group is yielded.
#[derive(Debug, Clone)]
pub struct Groups<'a> {
    chain: &'a Chain,
    next: Option<GroupId>,
    remaining: usize,
}

impl<'a> Iterator for Groups<'a> {
    type Item = &'a Group;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let group = self.chain.groups.get(self.next?.0)?;
        self.next = group.next;
        self.remaining -= 1;
        Some(group)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Link
// ─────────────────────────────────────────────────────────────────────────────

/// Fluent registration cursor.
///
/// Every operation consumes the cursor and returns one positioned at the
/// group the entry landed in.
///
/// ```
/// use precede_graph::Chain;
///
/// let mut chain = Chain::new();
/// let tail = chain
///     .origin_link()
///     .register(|| {})?
///     .after(|| {})?
///     .register(|| {})?
///     .id();
///
/// assert_eq!(chain.len(), 2);
/// assert_eq!(chain.entries(tail)?.len(), 2);
/// # Ok::<(), precede_graph::ChainError>(())
/// ```
#[derive(Debug)]
pub struct Link<'a> {
    chain: &'a mut Chain,
    at: GroupId,
}

impl<'a> Link<'a> {
    /// The group this cursor is positioned at.
    #[must_use]
    pub fn id(&self) -> GroupId {
        self.at
    }

    /// Admits `input` into the current group.
    ///
    /// # Errors
    ///
    /// Any admission error.
    pub fn register<M>(self, input: impl IntoArgs<M>) -> Result<Link<'a>, ChainError> {
        let at = self.chain.register_at(self.at, input)?;
        Ok(Link {
            chain: self.chain,
            at,
        })
    }

    /// Admits `input` into a new group before the current one.
    ///
    /// # Errors
    ///
    /// Any admission error.
    pub fn before<M>(self, input: impl IntoArgs<M>) -> Result<Link<'a>, ChainError> {
        let at = self.chain.before_at(self.at, input)?;
        Ok(Link {
            chain: self.chain,
            at,
        })
    }

    /// Admits `input` into a new group after the current one.
    ///
    /// # Errors
    ///
    /// Any admission error.
    pub fn after<M>(self, input: impl IntoArgs<M>) -> Result<Link<'a>, ChainError> {
        let at = self.chain.after_at(self.at, input)?;
        Ok(Link {
            chain: self.chain,
            at,
        })
    }

    /// Admits `input` into a new head group.
    ///
    /// # Errors
    ///
    /// Any admission error.
    pub fn first<M>(self, input: impl IntoArgs<M>) -> Result<Link<'a>, ChainError> {
        let at = self.chain.first_at(self.at, input)?;
        Ok(Link {
            chain: self.chain,
            at,
        })
    }

    /// Admits `input` into a new tail group.
    ///
    /// # Errors
    ///
    /// Any admission error.
    pub fn last<M>(self, input: impl IntoArgs<M>) -> Result<Link<'a>, ChainError> {
        let at = self.chain.last_at(self.at, input)?;
        Ok(Link {
            chain: self.chain,
            at,
        })
    }
}
