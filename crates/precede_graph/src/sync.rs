//! Barriers, slots and gates.
//!
//! Every dispatched entry holds one [`Slot`] on a set of [`Barrier`]s for as
//! long as it is pending. Slots release on drop, so an entry that is
//! invoked, skipped, abandoned, cancelled or panics gives its unit back
//! exactly once.
//!
//! A [`Gate`] is the per-run barrier of the previous group. That barrier
//! keeps one extra latch slot until the gate in front of it passes, so
//! waiting on a group's gate waits for all groups before it, even when an
//! intermediate group was empty or had all of its entries skipped.

use core::fmt;
use core::pin::pin;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use tokio::sync::Notify;

// ─────────────────────────────────────────────────────────────────────────────
// Waiter
// ─────────────────────────────────────────────────────────────────────────────

/// Anything that can be waited on until its condition holds.
pub trait Waiter: Send + Sync {
    /// Resolves once the condition is satisfied.
    fn wait(&self) -> BoxFuture<'_, ()>;
}

/// A [`Waiter`] that is always ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullWaiter;

impl Waiter for NullWaiter {
    fn wait(&self) -> BoxFuture<'_, ()> {
        Box::pin(future::ready(()))
    }
}

/// Process-wide always-ready waiter, used before any group has run.
pub static NULL_WAITER: NullWaiter = NullWaiter;

// ─────────────────────────────────────────────────────────────────────────────
// Barrier
// ─────────────────────────────────────────────────────────────────────────────

/// Counter of in-flight units with "wait until zero".
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use precede_graph::sync::Barrier;
///
/// let barrier = Arc::new(Barrier::new());
/// let slot = barrier.acquire();
/// assert_eq!(barrier.in_flight(), 1);
///
/// slot.release();
/// assert_eq!(barrier.in_flight(), 0);
/// ```
#[derive(Default)]
pub struct Barrier {
    in_flight: AtomicUsize,
    drained: Notify,
}

impl Barrier {
    /// Creates a barrier at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one pending unit.
    pub fn acquire(self: &Arc<Self>) -> Slot {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        Slot {
            barriers: vec![Arc::clone(self)],
        }
    }

    /// Number of units currently pending.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Resolves once no unit is pending.
    pub async fn drained(&self) {
        loop {
            let mut notified = pin!(self.drained.notified());
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn release(&self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }
}

impl Waiter for Barrier {
    fn wait(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.drained())
    }
}

impl fmt::Debug for Barrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Barrier")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Slot
// ─────────────────────────────────────────────────────────────────────────────

/// One pending unit on one or more barriers.
///
/// Released on [`release`](Self::release) or drop, whichever comes first.
/// Barriers are released in reverse acquisition order.
#[must_use = "dropping a slot releases it immediately"]
pub struct Slot {
    barriers: Vec<Arc<Barrier>>,
}

impl Slot {
    /// Releases the unit.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        for barrier in self.barriers.drain(..).rev() {
            barrier.release();
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("barriers", &self.barriers.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BarrierSet
// ─────────────────────────────────────────────────────────────────────────────

/// Barriers that are acquired and released together.
#[derive(Debug, Clone, Default)]
pub struct BarrierSet {
    barriers: Vec<Arc<Barrier>>,
}

impl BarrierSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a barrier to the set.
    #[must_use]
    pub fn with(mut self, barrier: Arc<Barrier>) -> Self {
        self.barriers.push(barrier);
        self
    }

    /// Registers one pending unit on every barrier of the set.
    pub fn acquire(&self) -> Slot {
        for barrier in &self.barriers {
            barrier.in_flight.fetch_add(1, Ordering::AcqRel);
        }
        Slot {
            barriers: self.barriers.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gate
// ─────────────────────────────────────────────────────────────────────────────

/// The per-run barrier of the previous group, waited on before an entry
/// executes.
///
/// Each per-run barrier holds a latch until the gate in front of its own
/// group has passed (see [`release_after`](Self::release_after)), so a gate
/// drains only once every earlier group has. Waiting costs one barrier no
/// matter how long the chain is.
///
/// The open gate (the default) is passed immediately.
#[derive(Clone, Default)]
pub struct Gate(Option<Arc<Barrier>>);

impl Gate {
    /// The gate of the first group.
    #[must_use]
    pub fn open() -> Self {
        Self(None)
    }

    /// A gate that passes once `barrier` has drained.
    #[must_use]
    pub fn behind(barrier: Arc<Barrier>) -> Self {
        Self(Some(barrier))
    }

    /// Whether the gate has already passed.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.0
            .as_ref()
            .is_none_or(|barrier| barrier.in_flight() == 0)
    }

    /// Resolves once the barrier behind this gate has drained.
    pub async fn passed(&self) {
        if let Some(barrier) = &self.0 {
            barrier.drained().await;
        }
    }

    /// Holds `latch` until this gate has passed.
    pub async fn release_after(self, latch: Slot) {
        self.passed().await;
        latch.release();
    }
}

impl Waiter for Gate {
    fn wait(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.passed())
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(barrier) => f.debug_tuple("Gate").field(barrier).finish(),
            None => f.write_str("Gate(open)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use tokio::time::timeout;

    const SHORT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn null_waiter_is_ready() {
        timeout(SHORT, NULL_WAITER.wait()).await.unwrap();
    }

    #[tokio::test]
    async fn fresh_barrier_is_drained() {
        let barrier = Barrier::new();
        assert_eq!(barrier.in_flight(), 0);
        timeout(SHORT, barrier.drained()).await.unwrap();
    }

    #[tokio::test]
    async fn barrier_waits_for_every_slot() {
        let barrier = Arc::new(Barrier::new());
        let first = barrier.acquire();
        let second = barrier.acquire();

        first.release();
        assert!(timeout(SHORT, barrier.drained()).await.is_err());

        drop(second);
        timeout(SHORT, barrier.drained()).await.unwrap();
    }

    #[tokio::test]
    async fn waiter_woken_by_release_on_another_task() {
        let barrier = Arc::new(Barrier::new());
        let slot = barrier.acquire();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            slot.release();
        });

        timeout(Duration::from_secs(1), barrier.drained())
            .await
            .unwrap();
        handle.await.unwrap();
    }

    #[test]
    fn slot_released_on_panic() {
        let barrier = Arc::new(Barrier::new());
        let held = Arc::clone(&barrier);

        let result = std::thread::spawn(move || {
            let _slot = held.acquire();
            panic!("payload failed");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(barrier.in_flight(), 0);
    }

    #[test]
    fn barrier_set_acquires_all() {
        let a = Arc::new(Barrier::new());
        let b = Arc::new(Barrier::new());
        let set = BarrierSet::new().with(Arc::clone(&a)).with(Arc::clone(&b));

        let slot = set.acquire();
        let other = set.acquire();
        assert_eq!((a.in_flight(), b.in_flight()), (2, 2));

        slot.release();
        assert_eq!((a.in_flight(), b.in_flight()), (1, 1));
        drop(other);
        assert_eq!((a.in_flight(), b.in_flight()), (0, 0));
    }

    #[tokio::test]
    async fn gate_waits_on_earlier_groups_too() {
        let first = Arc::new(Barrier::new());
        let second = Arc::new(Barrier::new());

        // The second group's barrier keeps a latch until the first drains.
        let latch = second.acquire();
        let relay = tokio::spawn(Gate::behind(Arc::clone(&first)).release_after(latch));
        let gate = Gate::behind(Arc::clone(&second));

        // The second group finished (or was skipped) but the first has not.
        let pending = first.acquire();
        assert!(!gate.is_passed());
        assert!(timeout(SHORT, gate.passed()).await.is_err());

        pending.release();
        timeout(SHORT, gate.passed()).await.unwrap();
        relay.await.unwrap();
        assert!(gate.is_passed());
    }

    #[tokio::test]
    async fn open_gate_passes() {
        timeout(SHORT, Gate::open().wait()).await.unwrap();
    }
}
