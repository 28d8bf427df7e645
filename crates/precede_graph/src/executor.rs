//! Concurrent chain execution.
//!
//! The [`ChainExecutor`] walks a [`Chain`] from head to tail. For every
//! group it:
//!
//! 1. spawns a handoff task feeding the group's entries into a bounded
//!    channel, each with a [`Slot`] held on the run, group and per-run
//!    barriers;
//! 2. drains that channel, dropping the slot of every entry the run filter
//!    rejects and spawning one task per remaining entry;
//! 3. makes the group's per-run barrier the [`Gate`] of the next group.
//!
//! A per-run barrier also holds a latch until the gate in front of its own
//! group has passed. Every entry task first waits on the gate it was spawned
//! with, so no entry of group N+1 is invoked before all of groups 0..=N have
//! completed. Entries of the same group run concurrently on the blocking
//! pool.
//!
//! A handoff that cannot complete within
//! [`handoff_timeout`](ExecutorConfig::handoff_timeout) abandons the rest of
//! its group for this run. This is a liveness valve: it is logged, counted in
//! the [`RunReport`] and reported through the `OnEntriesAbandoned` hook, and
//! the run carries on.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use precede_call::args;
//! use precede_graph::{Chain, ChainExecutor};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), precede_graph::ChainError> {
//! #[derive(Clone, Default)]
//! struct Log(Arc<Mutex<Vec<&'static str>>>);
//!
//! let mut chain = Chain::new();
//! chain.register(|log: &Log| log.0.lock().unwrap().push("second"))?;
//! chain.first(|log: &Log| log.0.lock().unwrap().push("first"))?;
//!
//! let log = Log::default();
//! let report = ChainExecutor::new().run(&chain, args![log.clone()]).await;
//!
//! assert_eq!(report.invoked, 2);
//! assert_eq!(*log.0.lock().unwrap(), vec!["first", "second"]);
//! # Ok(())
//! # }
//! ```

use core::fmt;
use core::time::Duration;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use precede_call::{Arg, InvokeError, Payload};
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, trace, warn};

use crate::chain::Chain;
use crate::group::Entry;
use crate::hooks::{ChainEvent, HooksAPI};
use crate::sync::{Barrier, BarrierSet, Gate, Slot};

/// Default deadline for handing one entry off to the dispatcher.
pub const DEFAULT_HANDOFF_TIMEOUT: Duration = Duration::from_secs(10);

// ─────────────────────────────────────────────────────────────────────────────
// RunId
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identifier of one run, attached to every event and log span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(Arc<str>);

impl RunId {
    /// Generates a fresh run ID.
    #[must_use]
    pub fn new() -> Self {
        Self(nanoid::nanoid!().into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run_{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Executor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    handoff_timeout: Duration,
    handoff_capacity: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            handoff_timeout: DEFAULT_HANDOFF_TIMEOUT,
            handoff_capacity: None,
        }
    }
}

impl ExecutorConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the deadline for each entry handoff.
    #[must_use]
    pub fn with_handoff_timeout(mut self, timeout: Duration) -> Self {
        self.handoff_timeout = timeout;
        self
    }

    /// Sets the handoff queue capacity. By default each group's queue holds
    /// the whole group. A capacity of zero is treated as one.
    #[must_use]
    pub fn with_handoff_capacity(mut self, capacity: usize) -> Self {
        self.handoff_capacity = Some(capacity);
        self
    }

    /// Deadline for each entry handoff.
    #[must_use]
    pub fn handoff_timeout(&self) -> Duration {
        self.handoff_timeout
    }

    /// Configured handoff queue capacity, if fixed.
    #[must_use]
    pub fn handoff_capacity(&self) -> Option<usize> {
        self.handoff_capacity
    }

    fn capacity_for(&self, group_len: usize) -> usize {
        self.handoff_capacity.unwrap_or(group_len).max(1)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RunReport
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome counters of one run.
///
/// Every entry of the chain ends up in exactly one of `invoked`, `failed`,
/// `skipped`, `abandoned` or `cancelled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// The run.
    pub run_id: RunId,
    /// Groups whose entries were handed off.
    pub groups: usize,
    /// Entries that made it through the handoff.
    pub dispatched: usize,
    /// Entries invoked successfully.
    pub invoked: usize,
    /// Entries rejected by the run filter.
    pub skipped: usize,
    /// Entries whose invocation returned an error or panicked.
    pub failed: usize,
    /// Entries dropped because their handoff timed out.
    pub abandoned: usize,
    /// Entries not run because the run was cancelled.
    pub cancelled: usize,
    /// Wall time of the run.
    pub duration: Duration,
}

impl RunReport {
    /// Number of entries accounted for.
    #[must_use]
    pub fn total(&self) -> usize {
        self.invoked + self.failed + self.skipped + self.abandoned + self.cancelled
    }

    /// Returns true if every entry was either invoked successfully or
    /// skipped by the filter.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.abandoned == 0 && self.cancelled == 0
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, invoked: {}", self.run_id, self.invoked)?;
        write!(f, ", skipped: {}, failed: {}", self.skipped, self.failed)?;
        write!(f, ", abandoned: {}", self.abandoned)?;
        write!(f, ", cancelled: {}", self.cancelled)?;
        write!(f, ", duration: {:?}", self.duration)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Invoke
// ─────────────────────────────────────────────────────────────────────────────

/// Performs the actual call of a stored payload with the run's arguments.
///
/// Implemented for closures `Fn(&Payload, &[Arg]) -> Result<(), InvokeError>`.
/// Invocations run on tokio's blocking pool.
pub trait Invoke: Send + Sync + 'static {
    /// Invokes `payload`.
    ///
    /// # Errors
    ///
    /// Any [`InvokeError`]; it is logged and counted, never propagated.
    fn invoke(&self, payload: &Payload, args: &[Arg]) -> Result<(), InvokeError>;
}

impl<F> Invoke for F
where
    F: Fn(&Payload, &[Arg]) -> Result<(), InvokeError> + Send + Sync + 'static,
{
    fn invoke(&self, payload: &Payload, args: &[Arg]) -> Result<(), InvokeError> {
        self(payload, args)
    }
}

/// Calls the payload directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectInvoke;

impl Invoke for DirectInvoke {
    fn invoke(&self, payload: &Payload, args: &[Arg]) -> Result<(), InvokeError> {
        payload.invoke(args)
    }
}

fn accept_all(_: &Payload, _: &[Arg]) -> bool {
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// ChainExecutor
// ─────────────────────────────────────────────────────────────────────────────

/// Runs chains.
///
/// An executor holds no per-run state; one executor can drive any number of
/// concurrent runs over the same or different chains.
#[derive(Debug, Clone, Default)]
pub struct ChainExecutor {
    config: ExecutorConfig,
    hooks: Option<Arc<HooksAPI>>,
}

impl ChainExecutor {
    /// Creates an executor with the default configuration and no hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches a hook registry.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<HooksAPI>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Returns the hook registry, if any.
    #[must_use]
    pub fn hooks(&self) -> Option<&Arc<HooksAPI>> {
        self.hooks.as_ref()
    }

    /// Runs every entry of `chain` with `args`.
    ///
    /// Returns once every entry has completed, failed or been abandoned.
    pub async fn run(&self, chain: &Chain, args: Vec<Arg>) -> RunReport {
        self.run_with(chain, accept_all, DirectInvoke, args).await
    }

    /// Runs the entries of `chain` for which `filter` returns true.
    ///
    /// Rejected entries count as completed immediately and never hold up
    /// later groups.
    pub async fn run_filtered<F>(&self, chain: &Chain, filter: F, args: Vec<Arg>) -> RunReport
    where
        F: Fn(&Payload, &[Arg]) -> bool + Send + Sync,
    {
        self.run_with(chain, filter, DirectInvoke, args).await
    }

    /// Runs `chain` with a filter and a custom invocation strategy.
    pub async fn run_with<F, I>(
        &self,
        chain: &Chain,
        filter: F,
        invoker: I,
        args: Vec<Arg>,
    ) -> RunReport
    where
        F: Fn(&Payload, &[Arg]) -> bool + Send + Sync,
        I: Invoke,
    {
        self.run_until_cancelled(chain, filter, invoker, args, CancellationToken::new())
            .await
    }

    /// Like [`run_with`](Self::run_with), but stops early once `token` is
    /// cancelled.
    ///
    /// Cancellation stops pending handoffs and gate waits; entries already
    /// being invoked finish. The call still returns only after every spawned
    /// task has let go of its slot.
    pub async fn run_until_cancelled<F, I>(
        &self,
        chain: &Chain,
        filter: F,
        invoker: I,
        args: Vec<Arg>,
        token: CancellationToken,
    ) -> RunReport
    where
        F: Fn(&Payload, &[Arg]) -> bool + Send + Sync,
        I: Invoke,
    {
        let run = Arc::new(RunContext {
            run_id: RunId::new(),
            args: args.into(),
            invoker: Arc::new(invoker),
            hooks: self.hooks.clone(),
            counters: Counters::default(),
            token,
        });
        let span = info_span!("chain_run", run_id = %run.run_id, groups = chain.len());
        self.drive(chain, &filter, run).instrument(span).await
    }

    /// Runs `chain` to completion on a fresh multi-thread runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be built.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime.
    pub fn run_blocking(&self, chain: &Chain, args: Vec<Arg>) -> std::io::Result<RunReport> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(self.run(chain, args)))
    }

    async fn drive<F, I>(&self, chain: &Chain, filter: &F, run: Arc<RunContext<I>>) -> RunReport
    where
        F: Fn(&Payload, &[Arg]) -> bool + Send + Sync,
        I: Invoke,
    {
        let started = Instant::now();
        run.emit(|| ChainEvent::RunStart {
            run_id: run.run_id.clone(),
            groups: chain.len(),
            entries: chain.entry_count(),
        });

        let global = Arc::new(Barrier::new());
        let mut gate = Gate::open();
        let mut groups = 0;

        for (position, group) in chain.groups().enumerate() {
            if run.token.is_cancelled() {
                add(&run.counters.cancelled, group.len());
                continue;
            }
            groups += 1;

            debug!(group = %group.id(), position, entries = group.len(), "dispatching group");
            run.emit(|| ChainEvent::GroupDispatch {
                run_id: run.run_id.clone(),
                group: group.id(),
                position,
                entries: group.len(),
            });

            let group_barrier = Arc::new(Barrier::new());
            let latch = BarrierSet::new()
                .with(Arc::clone(&global))
                .with(Arc::clone(&group_barrier))
                .acquire();
            // A drained gate never refills once its handoff has returned.
            if gate.is_passed() {
                latch.release();
            } else {
                tokio::spawn(gate.clone().release_after(latch));
            }

            let barriers = BarrierSet::new()
                .with(Arc::clone(&global))
                .with(Arc::clone(group.barrier()))
                .with(Arc::clone(&group_barrier));

            let (tx, mut rx) = mpsc::channel(self.config.capacity_for(group.len()));
            let producer = tokio::spawn(
                handoff(
                    group.entries().to_vec(),
                    tx,
                    barriers,
                    self.config.handoff_timeout,
                    run.token.clone(),
                )
                .in_current_span(),
            );

            while let Some(Dispatch { entry, slot }) = rx.recv().await {
                add(&run.counters.dispatched, 1);

                if !filter(entry.payload(), &run.args) {
                    trace!(entry = %entry.id(), name = entry.name(), "skipped by filter");
                    add(&run.counters.skipped, 1);
                    run.emit(|| ChainEvent::EntrySkipped {
                        run_id: run.run_id.clone(),
                        entry: entry.id(),
                        name: entry.name(),
                    });
                    slot.release();
                    continue;
                }

                let task = execute(Arc::clone(&run), entry, slot, gate.clone());
                tokio::spawn(task.in_current_span());
            }

            match producer.await {
                Ok(Handoff::Complete) => {}
                Ok(Handoff::TimedOut(count)) => {
                    warn!(
                        group = %group.id(),
                        count,
                        timeout = ?self.config.handoff_timeout,
                        "handoff timed out, abandoning remaining entries"
                    );
                    add(&run.counters.abandoned, count);
                    run.emit(|| ChainEvent::EntriesAbandoned {
                        run_id: run.run_id.clone(),
                        group: group.id(),
                        count,
                    });
                }
                Ok(Handoff::Cancelled(count)) => {
                    add(&run.counters.cancelled, count);
                }
                Err(err) => warn!(group = %group.id(), %err, "handoff task failed"),
            }

            gate = Gate::behind(group_barrier);
        }

        global.drained().await;

        let report = run.report(groups, started.elapsed());
        debug!(
            invoked = report.invoked,
            skipped = report.skipped,
            failed = report.failed,
            abandoned = report.abandoned,
            cancelled = report.cancelled,
            duration = ?report.duration,
            "run complete"
        );
        run.emit(|| ChainEvent::RunComplete {
            report: report.clone(),
        });
        report
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Run internals
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Counters {
    dispatched: AtomicUsize,
    invoked: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    abandoned: AtomicUsize,
    cancelled: AtomicUsize,
}

fn add(counter: &AtomicUsize, by: usize) {
    counter.fetch_add(by, Ordering::Relaxed);
}

/// State shared by the run loop and every entry task of one run.
struct RunContext<I> {
    run_id: RunId,
    args: Arc<[Arg]>,
    invoker: Arc<I>,
    hooks: Option<Arc<HooksAPI>>,
    counters: Counters,
    token: CancellationToken,
}

impl<I> RunContext<I> {
    fn emit(&self, event: impl FnOnce() -> ChainEvent) {
        if let Some(hooks) = &self.hooks {
            hooks.emit(&event());
        }
    }

    fn report(&self, groups: usize, duration: Duration) -> RunReport {
        let count = |counter: &AtomicUsize| counter.load(Ordering::Acquire);
        RunReport {
            run_id: self.run_id.clone(),
            groups,
            dispatched: count(&self.counters.dispatched),
            invoked: count(&self.counters.invoked),
            skipped: count(&self.counters.skipped),
            failed: count(&self.counters.failed),
            abandoned: count(&self.counters.abandoned),
            cancelled: count(&self.counters.cancelled),
            duration,
        }
    }
}

struct Dispatch {
    entry: Entry,
    slot: Slot,
}

enum Handoff {
    Complete,
    TimedOut(usize),
    Cancelled(usize),
}

/// Feeds one group's entries to the run loop.
///
/// Holds a slot of its own until it returns, so the group's gate cannot
/// open while entries are still being handed off.
async fn handoff(
    entries: Vec<Entry>,
    tx: mpsc::Sender<Dispatch>,
    barriers: BarrierSet,
    timeout: Duration,
    token: CancellationToken,
) -> Handoff {
    let _feeding = barriers.acquire();
    let total = entries.len();

    for (sent, entry) in entries.into_iter().enumerate() {
        let dispatch = Dispatch {
            entry,
            slot: barriers.acquire(),
        };
        tokio::select! {
            result = tx.send_timeout(dispatch, timeout) => match result {
                Ok(()) => {}
                Err(SendTimeoutError::Timeout(_) | SendTimeoutError::Closed(_)) => {
                    return Handoff::TimedOut(total - sent);
                }
            },
            () = token.cancelled() => return Handoff::Cancelled(total - sent),
        }
    }
    Handoff::Complete
}

/// Waits for the gate, then invokes one entry.
async fn execute<I: Invoke>(run: Arc<RunContext<I>>, entry: Entry, slot: Slot, gate: Gate) {
    let _slot = slot;

    tokio::select! {
        biased;
        () = run.token.cancelled() => {
            trace!(entry = %entry.id(), "cancelled before gate opened");
            add(&run.counters.cancelled, 1);
            return;
        }
        () = gate.passed() => {}
    }

    trace!(entry = %entry.id(), name = entry.name(), "invoking");
    run.emit(|| ChainEvent::EntryStart {
        run_id: run.run_id.clone(),
        entry: entry.id(),
        name: entry.name(),
    });

    let started = Instant::now();
    let invoker = Arc::clone(&run.invoker);
    let payload = entry.payload().clone();
    let args = Arc::clone(&run.args);
    let outcome = tokio::task::spawn_blocking(move || invoker.invoke(&payload, &args))
        .await
        .unwrap_or_else(|err| Err(InvokeError::Panicked(panic_message(err))));

    match outcome {
        Ok(()) => {
            add(&run.counters.invoked, 1);
            run.emit(|| ChainEvent::EntryComplete {
                run_id: run.run_id.clone(),
                entry: entry.id(),
                name: entry.name(),
                duration: started.elapsed(),
            });
        }
        Err(error) => {
            warn!(entry = %entry.id(), name = entry.name(), %error, "entry failed");
            add(&run.counters.failed, 1);
            run.emit(|| ChainEvent::EntryFailed {
                run_id: run.run_id.clone(),
                entry: entry.id(),
                name: entry.name(),
                error: error.to_string(),
            });
        }
    }
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let config = ExecutorConfig::default();
        assert_eq!(config.handoff_timeout(), Duration::from_secs(10));
        assert_eq!(config.handoff_capacity(), None);
        assert_eq!(config.capacity_for(4), 4);
        assert_eq!(config.capacity_for(0), 1);
    }

    #[test]
    fn config_builders() {
        let config = ExecutorConfig::new()
            .with_handoff_timeout(Duration::from_millis(5))
            .with_handoff_capacity(0);
        assert_eq!(config.handoff_timeout(), Duration::from_millis(5));
        assert_eq!(config.capacity_for(10), 1);
    }

    #[test]
    fn run_ids_are_unique() {
        let a = RunId::new();
        let b = RunId::new();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("run_"));
        assert_eq!(a.as_str().len(), 21);
    }

    #[test]
    fn report_totals() {
        let report = RunReport {
            run_id: RunId::new(),
            groups: 2,
            dispatched: 4,
            invoked: 2,
            skipped: 1,
            failed: 1,
            abandoned: 3,
            cancelled: 0,
            duration: Duration::ZERO,
        };
        assert_eq!(report.total(), 7);
        assert!(!report.is_clean());

        let shown = report.to_string();
        let counts = "invoked: 2, skipped: 1, failed: 1, abandoned: 3, cancelled: 0";
        assert!(shown.starts_with(&report.run_id.to_string()));
        assert!(shown.ends_with(&format!("{counts}, duration: 0ns")));
    }

    fn boom() {
        panic!("boom");
    }

    fn formatted() {
        panic!("code {}", 7);
    }

    #[tokio::test]
    async fn panic_messages_are_extracted() {
        let err = tokio::task::spawn_blocking(boom).await.unwrap_err();
        assert_eq!(panic_message(err), "boom");

        let err = tokio::task::spawn_blocking(formatted).await.unwrap_err();
        assert_eq!(panic_message(err), "code 7");
    }

    #[tokio::test]
    async fn handoff_abandons_when_nobody_drains() {
        let chain = {
            let mut chain = Chain::new();
            chain.register(|| {}).unwrap();
            chain.register(|| {}).unwrap();
            chain.register(|| {}).unwrap();
            chain
        };
        let barrier = Arc::new(Barrier::new());
        let (tx, _rx) = mpsc::channel(1);

        let outcome = handoff(
            chain.entries(chain.origin()).unwrap().to_vec(),
            tx,
            BarrierSet::new().with(Arc::clone(&barrier)),
            Duration::from_millis(10),
            CancellationToken::new(),
        )
        .await;

        // One entry fits the queue, the second times out.
        assert!(matches!(outcome, Handoff::TimedOut(2)));
        // Only the queued entry still holds a slot.
        assert_eq!(barrier.in_flight(), 1);
    }
}
