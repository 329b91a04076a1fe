//! The maintenance scheduler: submit, blocking pull, and the worker pool.
//!
//! # Design
//!
//! - **One lock, one condition**: the registry and the stopping flag live
//!   behind a single `parking_lot::Mutex`; the wake `Condvar` is paired with
//!   it and always signalled while that mutex is held, so no wakeup is lost.
//! - **Shared scan**: selection and purge happen in the same insertion-order
//!   pass, so no sweeper thread is needed. The bounded wait keeps purging
//!   alive with zero submission traffic.
//! - **Lock never held across execution**: action bodies run after the claim
//!   is released, on a pool thread or on the submitting thread.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::audit::{build_audit_event, AuditEvent, AuditKind, AuditSink};
use super::{
    ActionDescription, ActionFactory, ActionId, ActionRegistry, ActionSnapshot, ActionState,
    MaintenanceAction, MaintenanceError, MaintenanceResult, MaintenanceWorker,
};
use super::worker::panic_message;
use crate::util::clock::now_ms;

/// Timing and sizing values the scheduler enforces.
#[derive(Debug, Clone)]
pub struct SchedulerLimits {
    /// Number of pool threads started by [`MaintenanceScheduler::start`].
    pub worker_count: usize,
    /// A finished action keeps blocking identical submissions this long.
    pub block: Duration,
    /// A finished action stays in the registry at least this long.
    pub linger: Duration,
    /// Upper bound on one idle wait in `find_ready_action`.
    pub wake_interval: Duration,
    /// Stack size for pool threads.
    pub thread_stack_size: usize,
}

impl Default for SchedulerLimits {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get() / 4 + 1,
            block: Duration::from_secs(30),
            linger: Duration::from_secs(300),
            wake_interval: Duration::from_secs(1),
            thread_stack_size: 2 * 1024 * 1024,
        }
    }
}

/// Statistics about registry contents and scheduler throughput.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Configured pool size.
    pub worker_count: usize,
    /// Actions currently in the registry.
    pub registered: usize,
    /// Registered actions waiting for a worker.
    pub waiting: usize,
    /// Registered actions currently executing.
    pub executing: usize,
    /// Total actions accepted.
    pub submitted_actions: u64,
    /// Total submissions refused (duplicate, unknown kind, bad parameters, shutdown).
    pub rejected_actions: u64,
    /// Total actions completed successfully.
    pub completed_actions: u64,
    /// Total actions that failed.
    pub failed_actions: u64,
    /// Total actions purged after lingering.
    pub purged_actions: u64,
}

/// Internal counters for scheduler statistics (thread-safe).
#[derive(Debug, Default)]
struct SchedulerCounters {
    submitted: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    purged: AtomicU64,
}

/// Everything guarded by the scheduler lock.
#[derive(Debug, Default)]
struct SchedulerState {
    registry: ActionRegistry,
    shutting_down: bool,
}

/// State shared between the façade and its pool threads.
struct Shared {
    limits: SchedulerLimits,
    factory: ActionFactory,
    state: Mutex<SchedulerState>,
    wake: Condvar,
    next_id: AtomicU64,
    counters: SchedulerCounters,
    audit: Mutex<Option<Box<dyn AuditSink>>>,
}

impl Shared {
    fn submit(&self, description: ActionDescription, execute_now: bool) -> MaintenanceResult<ActionId> {
        let hash = description.hash();
        let name = description.name().to_string();

        let registered =
            panic::catch_unwind(AssertUnwindSafe(|| self.register(description, execute_now)));
        let action = match registered {
            Ok(Ok(action)) => action,
            Ok(Err(e)) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                debug!(hash = %format_args!("{hash:#018x}"), name = %name, error = %e, "action rejected");
                self.record_rejection(hash, &name, &e);
                return Err(e);
            }
            Err(_) => {
                error!(name = %name, "submit caught an unexpected panic");
                return Err(MaintenanceError::Internal(
                    "submit experienced an unexpected panic".into(),
                ));
            }
        };

        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        self.record(&action, AuditKind::Submitted, None);

        if execute_now {
            debug!(action_id = action.id(), name = %name, "executing action on submitting thread");
            self.record(&action, AuditKind::Claimed, None);
            return self.execute(&action).map(|()| action.id());
        }
        Ok(action.id())
    }

    /// Dedup check, construction, and insertion as one locked transaction.
    fn register(
        &self,
        description: ActionDescription,
        execute_now: bool,
    ) -> MaintenanceResult<Arc<MaintenanceAction>> {
        let mut state = self.state.lock();
        if state.shutting_down && !execute_now {
            return Err(MaintenanceError::ShuttingDown);
        }
        state
            .registry
            .check_duplicate(description.hash(), Instant::now(), self.limits.block)?;

        let body = self.factory.create(&description)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let action = Arc::new(MaintenanceAction::new(id, description, body));

        // Executing before insertion keeps pool threads from claiming it.
        action.set_state(if execute_now {
            ActionState::Executing
        } else {
            ActionState::Waiting
        });
        state.registry.insert(Arc::clone(&action))?;

        if !execute_now {
            self.wake.notify_one();
        }
        debug!(
            action_id = id,
            hash = %format_args!("{:#018x}", action.hash()),
            name = action.name(),
            execute_now,
            "action registered"
        );
        Ok(action)
    }

    fn find_ready_action(&self) -> Option<Arc<MaintenanceAction>> {
        let mut state = self.state.lock();
        loop {
            if state.shutting_down {
                return None;
            }

            let outcome = state.registry.scan(Instant::now(), self.limits.linger);
            if let Some(action) = outcome.claimed {
                drop(state);
                self.record_purged(&outcome.purged);
                debug!(action_id = action.id(), name = action.name(), "claimed action");
                self.record(&action, AuditKind::Claimed, None);
                return Some(action);
            }
            if !outcome.purged.is_empty() {
                // Audit runs unlocked; rescan so a submit made meanwhile is not slept through.
                MutexGuard::unlocked(&mut state, || self.record_purged(&outcome.purged));
                continue;
            }

            self.wake.wait_for(&mut state, self.limits.wake_interval);
        }
    }

    fn record_purged(&self, purged: &[Arc<MaintenanceAction>]) {
        for action in purged {
            self.counters.purged.fetch_add(1, Ordering::Relaxed);
            debug!(action_id = action.id(), state = %action.state(), "purged finished action");
            self.record(action, AuditKind::Purged, None);
        }
    }

    fn execute(&self, action: &Arc<MaintenanceAction>) -> MaintenanceResult<()> {
        let mut worker = MaintenanceWorker::new(Arc::clone(action));
        worker.run();
        let result = worker.result();
        match &result {
            Ok(()) => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                info!(action_id = action.id(), name = action.name(), "maintenance action complete");
                self.record(action, AuditKind::Completed, None);
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(action_id = action.id(), name = action.name(), error = %e, "maintenance action failed");
                self.record(action, AuditKind::Failed, Some(e.to_string()));
            }
        }
        result
    }

    /// Returns false if shutdown had already begun.
    fn begin_shutdown(&self) -> bool {
        let mut state = self.state.lock();
        if state.shutting_down {
            return false;
        }
        state.shutting_down = true;
        self.wake.notify_all();
        true
    }

    fn record(&self, action: &MaintenanceAction, kind: AuditKind, detail: Option<String>) {
        self.emit(kind, || build_audit_event(action, kind, detail));
    }

    fn record_rejection(&self, hash: u64, name: &str, reason: &MaintenanceError) {
        self.emit(AuditKind::Rejected, || AuditEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            action_id: None,
            hash,
            name: name.to_string(),
            kind: AuditKind::Rejected,
            created_at_ms: now_ms(),
            detail: Some(reason.to_string()),
        });
    }

    /// Hand one event to the sink. A panicking sink loses the event and
    /// nothing else.
    fn emit(&self, kind: AuditKind, event: impl FnOnce() -> AuditEvent) {
        let recorded = panic::catch_unwind(AssertUnwindSafe(|| {
            if let Some(sink) = self.audit.lock().as_mut() {
                sink.record(event());
            }
        }));
        if let Err(payload) = recorded {
            error!(
                kind = %kind,
                panic = %panic_message(payload.as_ref()),
                "audit sink panicked; event dropped"
            );
        }
    }
}

/// Deduplicating maintenance action scheduler with a dedicated thread pool.
///
/// Producers call [`submit`](Self::submit); pool threads started by
/// [`start`](Self::start) loop on [`find_ready_action`](Self::find_ready_action)
/// and run what they claim.
///
/// ```rust,ignore
/// let scheduler = MaintenanceScheduler::new(SchedulerLimits::default(), ActionFactory::with_builtins());
/// scheduler.start()?;
/// let description = ActionDescription::from_pairs([("name", "noop"), ("collection", "c1")])?;
/// let id = scheduler.submit(description, false)?;
/// ```
pub struct MaintenanceScheduler {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl MaintenanceScheduler {
    /// Create a scheduler. No threads are spawned until `start`.
    ///
    /// A `block` window longer than `linger` is clamped to `linger`: an
    /// action cannot block duplicates after it has been purged.
    #[must_use]
    pub fn new(mut limits: SchedulerLimits, factory: ActionFactory) -> Self {
        if limits.block > limits.linger {
            warn!(
                block_ms = limits.block.as_millis(),
                linger_ms = limits.linger.as_millis(),
                "block window exceeds linger window; clamping to linger"
            );
            limits.block = limits.linger;
        }
        Self {
            shared: Arc::new(Shared {
                limits,
                factory,
                state: Mutex::new(SchedulerState::default()),
                wake: Condvar::new(),
                next_id: AtomicU64::new(1),
                counters: SchedulerCounters::default(),
                audit: Mutex::new(None),
            }),
            workers: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(self, audit: Box<dyn AuditSink>) -> Self {
        *self.shared.audit.lock() = Some(audit);
        self
    }

    /// Configured limits.
    #[must_use]
    pub fn limits(&self) -> &SchedulerLimits {
        &self.shared.limits
    }

    /// Spawn the worker pool. A second call is a no-op.
    ///
    /// # Errors
    ///
    /// - `MaintenanceError::ShuttingDown` if shutdown has begun
    /// - `MaintenanceError::Internal` if a thread cannot be spawned; threads
    ///   already started are told to stop
    pub fn start(&self) -> MaintenanceResult<()> {
        if self.is_shutting_down() {
            return Err(MaintenanceError::ShuttingDown);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let limits = &self.shared.limits;
        let mut workers = self.workers.lock();
        for worker_id in 0..limits.worker_count {
            match spawn_worker(worker_id, Arc::clone(&self.shared), limits.thread_stack_size) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!(worker_id, error = %e, "failed to spawn maintenance worker");
                    self.shared.begin_shutdown();
                    return Err(MaintenanceError::Internal(format!(
                        "failed to spawn maintenance worker {worker_id}: {e}"
                    )));
                }
            }
        }

        info!(
            worker_count = limits.worker_count,
            block_secs = limits.block.as_secs(),
            linger_secs = limits.linger.as_secs(),
            "maintenance scheduler started"
        );
        Ok(())
    }

    /// Submit an action.
    ///
    /// With `execute_now == false` the action is queued for the pool and the
    /// call returns its id immediately. With `execute_now == true` the action
    /// runs on the calling thread and the call returns once it is finished.
    ///
    /// # Errors
    ///
    /// - `MaintenanceError::DuplicateAction` if an identical action is in
    ///   flight or finished inside the block window
    /// - `MaintenanceError::UnknownActionKind` if the name is not registered
    /// - `MaintenanceError::InvalidParameter` if the kind rejects the parameters
    /// - `MaintenanceError::ShuttingDown` for a queued submission after shutdown began
    /// - `MaintenanceError::ExecutionFailure` if a synchronous action failed
    /// - `MaintenanceError::Internal` if the scheduler itself faulted
    pub fn submit(
        &self,
        description: ActionDescription,
        execute_now: bool,
    ) -> MaintenanceResult<ActionId> {
        self.shared.submit(description, execute_now)
    }

    /// Build a description from raw properties and submit it.
    ///
    /// # Errors
    ///
    /// `MaintenanceError::InvalidParameter` if `name` is missing, otherwise as
    /// [`submit`](Self::submit).
    pub fn submit_properties(
        &self,
        properties: BTreeMap<String, String>,
        execute_now: bool,
    ) -> MaintenanceResult<ActionId> {
        let description = ActionDescription::new(properties).inspect_err(|e| {
            self.shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
            debug!(error = %e, "rejected malformed description");
        })?;
        self.submit(description, execute_now)
    }

    /// Block until an action is claimed, or return `None` once shutdown begins.
    ///
    /// The returned action is already `Executing`; run it with a
    /// [`MaintenanceWorker`] or [`run_claimed`](Self::run_claimed).
    #[must_use]
    pub fn find_ready_action(&self) -> Option<Arc<MaintenanceAction>> {
        self.shared.find_ready_action()
    }

    /// Run an action obtained from `find_ready_action` on this thread,
    /// updating statistics and audit.
    ///
    /// # Errors
    ///
    /// `MaintenanceError::ExecutionFailure` if the action failed.
    pub fn run_claimed(&self, action: &Arc<MaintenanceAction>) -> MaintenanceResult<()> {
        self.shared.execute(action)
    }

    /// Stop handing out actions and wake every blocked worker. Idempotent.
    /// In-flight actions run to completion.
    pub fn begin_shutdown(&self) {
        if self.shared.begin_shutdown() {
            info!("maintenance scheduler shutting down");
        }
    }

    /// Whether shutdown has begun.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shared.state.lock().shutting_down
    }

    /// Begin shutdown and join pool threads.
    ///
    /// Each thread gets up to 2 seconds; a thread still running an action
    /// after that is detached.
    pub fn shutdown(&self) {
        self.begin_shutdown();

        let mut workers = self.workers.lock();
        let worker_count = workers.len();
        for (idx, worker) in workers.drain(..).enumerate() {
            let (tx, rx) = crossbeam_channel::bounded(1);
            let join_thread = thread::spawn(move || {
                let joined = worker.join();
                let _ = tx.send(joined.is_ok());
            });

            match rx.recv_timeout(Duration::from_secs(2)) {
                Ok(true) => debug!(worker_id = idx, "maintenance worker joined"),
                Ok(false) => warn!(worker_id = idx, "maintenance worker panicked"),
                Err(_) => {
                    warn!(worker_id = idx, "maintenance worker did not exit within timeout - detaching");
                    continue;
                }
            }
            let _ = join_thread.join();
        }
        if worker_count > 0 {
            info!(worker_count, "maintenance scheduler shut down");
        }
    }

    /// Action with `id`, if it has not been purged.
    #[must_use]
    pub fn find_action_by_id(&self, id: ActionId) -> Option<Arc<MaintenanceAction>> {
        self.shared.state.lock().registry.find_by_id(id)
    }

    /// Most recent action for `hash`, if it has not been purged.
    #[must_use]
    pub fn find_action_by_hash(&self, hash: u64) -> Option<Arc<MaintenanceAction>> {
        self.shared.state.lock().registry.find_by_hash(hash)
    }

    /// Number of actions in the registry.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.shared.state.lock().registry.len()
    }

    /// Status of every registered action in submission order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ActionSnapshot> {
        self.shared.state.lock().registry.snapshot()
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let (registered, waiting, executing) = {
            let state = self.shared.state.lock();
            (
                state.registry.len(),
                state.registry.count_in(ActionState::Waiting),
                state.registry.count_in(ActionState::Executing),
            )
        };
        let counters = &self.shared.counters;
        SchedulerStats {
            worker_count: self.shared.limits.worker_count,
            registered,
            waiting,
            executing,
            submitted_actions: counters.submitted.load(Ordering::Relaxed),
            rejected_actions: counters.rejected.load(Ordering::Relaxed),
            completed_actions: counters.completed.load(Ordering::Relaxed),
            failed_actions: counters.failed.load(Ordering::Relaxed),
            purged_actions: counters.purged.load(Ordering::Relaxed),
        }
    }
}

impl Drop for MaintenanceScheduler {
    fn drop(&mut self) {
        // Signal only; joining here could hang on a long-running action.
        if self.shared.begin_shutdown() {
            debug!("MaintenanceScheduler dropped without explicit shutdown - workers will be detached");
        }
    }
}

/// Spawn one pool thread.
fn spawn_worker(
    worker_id: usize,
    shared: Arc<Shared>,
    stack_size: usize,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("maint-worker-{worker_id}"))
        .stack_size(stack_size)
        .spawn(move || {
            debug!(worker_id, "maintenance worker started");
            while let Some(action) = shared.find_ready_action() {
                debug!(worker_id, action_id = action.id(), "worker executing action");
                // Outcome is recorded on the action; nothing to propagate.
                let _ = shared.execute(&action);
            }
            debug!(worker_id, "maintenance worker exiting");
        })
}
