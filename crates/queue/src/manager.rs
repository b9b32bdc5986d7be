//! Queue manager: the single-flight dispatch loop and its recovery registry.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use relayq_core::ErrorCode;

use crate::job::{DispatchJob, Job, RetryableJob};
use crate::recovery::{Recovery, RecoveryJob};

/// Queue manager configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Name carried as the `queue` field on every log event.
    pub name: String,
    /// Attempt budget applied to jobs without an override.
    pub default_max_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: "relayq".to_string(),
            default_max_attempts: 3,
        }
    }
}

impl QueueConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_default_max_attempts(mut self, max_attempts: u32) -> Self {
        self.default_max_attempts = max_attempts;
        self
    }
}

/// Queue runtime counters.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct QueueStats {
    pub jobs_processed: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub recoveries_run: u64,
    pub recoveries_failed: u64,
    pub jobs_flushed: u64,
}

/// Single-flight FIFO job dispatcher.
///
/// Construct one per process at startup (inside the async runtime — the
/// current handle is captured) and clone it into producers; clones share
/// state. Enqueued jobs are dispatched to completion in strict enqueue
/// order, one at a time. A failure whose code has a registered recovery
/// triggers the recovery and, if it succeeds, a transparent retry of the
/// same job within its attempt budget.
///
/// The queue and the dispatching flag live under one lock that is never
/// held across an await or a hook invocation, so hooks and operations may
/// freely call [`enqueue`](Self::enqueue) or [`flush`](Self::flush)
/// themselves.
#[derive(Clone)]
pub struct QueueManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: QueueConfig,
    runtime: Handle,
    state: Mutex<QueueState>,
    recoveries: Mutex<HashMap<ErrorCode, Box<dyn RecoveryJob>>>,
    stats: Mutex<QueueStats>,
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<Box<dyn DispatchJob>>,
    /// True iff a dispatch loop currently owns the queue.
    dispatching: bool,
}

impl QueueManager {
    /// Create a manager with the default configuration.
    ///
    /// Panics outside a tokio runtime context.
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    pub fn with_config(config: QueueConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                runtime: Handle::current(),
                state: Mutex::new(QueueState::default()),
                recoveries: Mutex::new(HashMap::new()),
                stats: Mutex::new(QueueStats::default()),
            }),
        }
    }

    /// Append a job to the queue tail and start the dispatch loop if idle.
    ///
    /// The job's attempt budget is its own override or the configured
    /// default (3). Re-entrant calls while a loop is running are plain
    /// pushes; the running loop reaches the new tail item.
    pub fn enqueue<T: Clone + Send + 'static>(&self, job: Job<T>) {
        let queued = RetryableJob::new(job, self.inner.config.default_max_attempts);
        let job_id = queued.id();

        let mut state = self.inner.state.lock().unwrap();
        state.queue.push_back(Box::new(queued));
        debug!(
            queue = %self.inner.config.name,
            %job_id,
            depth = state.queue.len(),
            "job enqueued"
        );

        if !state.dispatching {
            state.dispatching = true;
            drop(state);

            let inner = self.inner.clone();
            self.inner.runtime.spawn(async move {
                inner.dispatch().await;
            });
        }
    }

    /// Register the recovery for an error code, silently replacing any
    /// previous registration (last writer wins).
    ///
    /// The recovery runs exactly once per failure cycle; its `on_settled`
    /// hook and any attempt-budget override are ignored. Registering a
    /// recovery for [`ErrorCode::MaxAttempts`] that always succeeds makes
    /// the budget refusal retry forever — the queue does not guard against
    /// that pairing.
    pub fn register_recovery<T: Send + 'static>(&self, code: ErrorCode, job: Job<T>) {
        let mut recoveries = self.inner.recoveries.lock().unwrap();
        if recoveries.insert(code, Box::new(Recovery::new(job))).is_some() {
            debug!(
                queue = %self.inner.config.name,
                %code,
                "recovery replaced"
            );
        }
    }

    /// Drop every waiting job immediately, firing none of their hooks.
    ///
    /// Explicit, observable data loss (e.g. on session termination). A job
    /// already mid-execution is unaffected and runs to completion,
    /// including any recovery cycle it triggers.
    pub fn flush(&self) {
        let dropped = {
            let mut state = self.inner.state.lock().unwrap();
            let dropped = state.queue.len();
            state.queue.clear();
            dropped
        };

        if dropped > 0 {
            self.inner
                .bump(|stats| stats.jobs_flushed += dropped as u64);
        }
        info!(queue = %self.inner.config.name, dropped, "queue flushed");
    }

    /// Snapshot of the runtime counters.
    pub fn stats(&self) -> QueueStats {
        self.inner.stats.lock().unwrap().clone()
    }

    /// Number of jobs waiting (excludes the one in flight, if any).
    pub fn len(&self) -> usize {
        self.inner.state.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for QueueManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for QueueManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock().unwrap();
        f.debug_struct("QueueManager")
            .field("name", &self.inner.config.name)
            .field("depth", &state.queue.len())
            .field("dispatching", &state.dispatching)
            .finish()
    }
}

impl Inner {
    /// The dispatch loop. At most one instance runs at a time; the
    /// `dispatching` flag flips under the same lock as queue pops, so an
    /// enqueue racing the final empty check either lands before the pop or
    /// observes an idle queue and spawns a fresh loop.
    async fn dispatch(self: Arc<Self>) {
        debug!(queue = %self.config.name, "dispatch loop started");

        loop {
            let job = {
                let mut state = self.state.lock().unwrap();
                match state.queue.pop_front() {
                    Some(job) => job,
                    None => {
                        state.dispatching = false;
                        break;
                    }
                }
            };

            self.dispatch_one(job).await;
        }

        debug!(queue = %self.config.name, "dispatch loop idle");
    }

    /// Drives one job to its terminal outcome, including recovery cycles.
    ///
    /// An explicit loop rather than recursion: a long run of
    /// recovery-succeeds/attempt-fails cycles must not grow the stack.
    async fn dispatch_one(&self, mut job: Box<dyn DispatchJob>) {
        let job_id = job.id();
        debug!(
            queue = %self.config.name,
            %job_id,
            enqueued_at = %job.enqueued_at(),
            "dispatching job"
        );

        loop {
            match job.attempt().await {
                Ok(()) => {
                    debug!(
                        queue = %self.config.name,
                        %job_id,
                        attempts = job.attempts(),
                        "job succeeded"
                    );
                    job.fire_success();
                    self.bump(|stats| stats.jobs_succeeded += 1);
                    break;
                }
                Err(error) => match self.take_recovery(error.code) {
                    Some(mut recovery) => {
                        debug!(
                            queue = %self.config.name,
                            %job_id,
                            code = %error.code,
                            "running recovery"
                        );
                        let recovered = recovery.run().await;
                        self.restore_recovery(error.code, recovery);
                        self.bump(|stats| {
                            stats.recoveries_run += 1;
                            if !recovered {
                                stats.recoveries_failed += 1;
                            }
                        });

                        if recovered {
                            // Re-attempt the same job; it keeps its queue
                            // position and its attempt counter.
                            continue;
                        }

                        // Recovery failed: only the recovery's own failure
                        // hook has fired. The job's failure hook stays
                        // silent on this path.
                        warn!(
                            queue = %self.config.name,
                            %job_id,
                            code = %error.code,
                            "recovery failed, job dropped"
                        );
                        self.bump(|stats| stats.jobs_failed += 1);
                        break;
                    }
                    None => {
                        warn!(
                            queue = %self.config.name,
                            %job_id,
                            code = %error.code,
                            attempts = job.attempts(),
                            "job failed"
                        );
                        job.fire_failure();
                        self.bump(|stats| stats.jobs_failed += 1);
                        break;
                    }
                },
            }
        }

        // Terminal path only: the settled hook sees the raw result of the
        // last attempt, exactly once per job.
        job.fire_settled();
        self.bump(|stats| stats.jobs_processed += 1);
    }

    fn take_recovery(&self, code: ErrorCode) -> Option<Box<dyn RecoveryJob>> {
        self.recoveries.lock().unwrap().remove(&code)
    }

    /// Put a recovery back unless a new one was registered for the code
    /// while it ran (keeps last-writer-wins without holding the registry
    /// lock across the run).
    fn restore_recovery(&self, code: ErrorCode, recovery: Box<dyn RecoveryJob>) {
        self.recoveries
            .lock()
            .unwrap()
            .entry(code)
            .or_insert(recovery);
    }

    fn bump(&self, update: impl FnOnce(&mut QueueStats)) {
        update(&mut self.stats.lock().unwrap());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use relayq_core::{Error, OpResult};
    use tokio::sync::mpsc;

    use super::*;

    /// Job whose settled hook reports on a channel, so tests can await the
    /// terminal outcome without polling.
    fn reporting_job<T: Clone + Send + 'static>(
        result: OpResult<T>,
        settled: mpsc::UnboundedSender<OpResult<T>>,
    ) -> Job<T> {
        Job::new(move || {
            let result = result.clone();
            async move { result }
        })
        .on_settled(move |r| {
            let _ = settled.send(r);
        })
    }

    #[tokio::test]
    async fn enqueue_dispatches_and_returns_to_idle() {
        let queue = QueueManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        queue.enqueue(reporting_job(Ok(42u32), tx));
        assert_eq!(rx.recv().await.unwrap(), Ok(42));

        // Loop wound down; a later enqueue starts a fresh one.
        let (tx, mut rx) = mpsc::unbounded_channel();
        queue.enqueue(reporting_job(Ok(7u32), tx));
        assert_eq!(rx.recv().await.unwrap(), Ok(7));

        let stats = queue.stats();
        assert_eq!(stats.jobs_processed, 2);
        assert_eq!(stats.jobs_succeeded, 2);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn failure_without_recovery_fires_failure_then_settled() {
        let queue = QueueManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let job: Job<()> = Job::new(|| async { Err(Error::conflict("stale write")) })
            .on_success({
                let tx = tx.clone();
                move |_| {
                    let _ = tx.send("success".into());
                }
            })
            .on_failure({
                let tx = tx.clone();
                move |e| {
                    let _ = tx.send(format!("failure:{}", e.code));
                }
            })
            .on_settled(move |r| {
                let _ = tx.send(format!("settled:{}", r.unwrap_err().code));
            });

        queue.enqueue(job);

        assert_eq!(rx.recv().await.unwrap(), "failure:conflict");
        assert_eq!(rx.recv().await.unwrap(), "settled:conflict");
        // First attempt fails terminally: the budget is not consumed further.
        let stats = queue.stats();
        assert_eq!(stats.jobs_failed, 1);
        assert_eq!(stats.recoveries_run, 0);
    }

    #[tokio::test]
    async fn flush_drops_waiting_jobs_without_hooks() {
        let queue = QueueManager::new();
        let (settled_tx, mut settled_rx) = mpsc::unbounded_channel();
        let gate = Arc::new(tokio::sync::Notify::new());

        // Blocker holds the loop while we mutate the waiting queue.
        let blocker = {
            let gate = gate.clone();
            let tx = settled_tx.clone();
            Job::new(move || {
                let gate = gate.clone();
                async move {
                    gate.notified().await;
                    Ok("blocker")
                }
            })
            .on_settled(move |_| {
                let _ = tx.send("blocker settled");
            })
        };
        queue.enqueue(blocker);

        let doomed = Job::new(|| async { Ok("doomed") })
            .on_success(|_| panic!("flushed job must not fire hooks"))
            .on_settled(|_| panic!("flushed job must not fire hooks"));
        queue.enqueue(doomed);

        // Wait for the blocker to be in flight (queue drained to the doomed job).
        while queue.len() > 1 {
            tokio::task::yield_now().await;
        }
        queue.flush();
        assert!(queue.is_empty());

        gate.notify_one();
        assert_eq!(settled_rx.recv().await.unwrap(), "blocker settled");

        // Sentinel proves the loop is healthy after the flush.
        let sentinel = {
            let tx = settled_tx.clone();
            Job::new(|| async { Ok("sentinel") }).on_settled(move |_| {
                let _ = tx.send("sentinel settled");
            })
        };
        queue.enqueue(sentinel);
        assert_eq!(settled_rx.recv().await.unwrap(), "sentinel settled");

        let stats = queue.stats();
        assert_eq!(stats.jobs_flushed, 1);
        assert_eq!(stats.jobs_processed, 2);
    }

    #[tokio::test]
    async fn register_recovery_is_last_writer_wins() {
        let queue = QueueManager::new();
        let first_runs = Arc::new(AtomicU32::new(0));
        let second_runs = Arc::new(AtomicU32::new(0));

        let first = {
            let runs = first_runs.clone();
            Job::new(move || {
                let runs = runs.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
        };
        let second = {
            let runs = second_runs.clone();
            Job::new(move || {
                let runs = runs.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
        };

        queue.register_recovery(ErrorCode::NotAuthenticated, first);
        queue.register_recovery(ErrorCode::NotAuthenticated, second);

        let failures = Arc::new(AtomicU32::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let job: Job<()> = {
            let failures = failures.clone();
            Job::new(move || {
                let failures = failures.clone();
                async move {
                    if failures.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(Error::not_authenticated("token expired"))
                    } else {
                        Ok(())
                    }
                }
            })
            .on_settled(move |r| {
                let _ = tx.send(r);
            })
        };
        queue.enqueue(job);

        assert_eq!(rx.recv().await.unwrap(), Ok(()));
        assert_eq!(first_runs.load(Ordering::SeqCst), 0);
        assert_eq!(second_runs.load(Ordering::SeqCst), 1);
    }
}
