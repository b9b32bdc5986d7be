//! Job types: deferred asynchronous work and its bounded-retry wrapper.

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use relayq_core::{Error, OpResult};

/// Boxed zero-argument asynchronous operation.
pub type Operation<T> = Box<dyn FnMut() -> BoxFuture<'static, OpResult<T>> + Send>;

/// Hook fired with the success value of an attempt.
pub type SuccessHook<T> = Box<dyn FnMut(T) + Send>;

/// Hook fired with a classified failure.
pub type FailureHook = Box<dyn FnMut(Error) + Send>;

/// Hook fired with the raw result of a job's final attempt.
pub type SettledHook<T> = Box<dyn FnMut(OpResult<T>) + Send>;

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Uses UUIDv7 (time-ordered), so ids sort by enqueue time in logs.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of deferred asynchronous work.
///
/// The operation is a zero-argument closure producing a future that resolves
/// to an [`OpResult`]. Hooks are optional and attached with the consuming
/// builder methods; whoever enqueues the job owns it until then, after which
/// the queue manager drives it to a terminal outcome and discards it.
///
/// The same type describes recovery jobs handed to
/// [`QueueManager::register_recovery`](crate::QueueManager::register_recovery);
/// for those, `on_settled` and `with_max_attempts` have no effect (a recovery
/// runs exactly once per failure cycle).
pub struct Job<T> {
    operation: Operation<T>,
    on_success: Option<SuccessHook<T>>,
    on_failure: Option<FailureHook>,
    on_settled: Option<SettledHook<T>>,
    max_attempts: Option<u32>,
}

impl<T> Job<T> {
    pub fn new<F, Fut>(mut operation: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = OpResult<T>> + Send + 'static,
    {
        Self {
            operation: Box::new(move || operation().boxed()),
            on_success: None,
            on_failure: None,
            on_settled: None,
            max_attempts: None,
        }
    }

    /// Hook invoked with the success value of an attempt.
    pub fn on_success<F>(mut self, hook: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        self.on_success = Some(Box::new(hook));
        self
    }

    /// Hook invoked when the job fails terminally with no recovery registered
    /// for the failure code. For a recovery job: invoked each time the
    /// recovery itself fails.
    pub fn on_failure<F>(mut self, hook: F) -> Self
    where
        F: FnMut(Error) + Send + 'static,
    {
        self.on_failure = Some(Box::new(hook));
        self
    }

    /// Hook invoked exactly once per enqueued job, on the terminal path,
    /// with the raw result of the final attempt. Intervening recovery cycles
    /// do not fire it.
    pub fn on_settled<F>(mut self, hook: F) -> Self
    where
        F: FnMut(OpResult<T>) + Send + 'static,
    {
        self.on_settled = Some(Box::new(hook));
        self
    }

    /// Override the queue's default attempt budget for this job.
    ///
    /// Floored at 1 when enqueued. Ignored for recovery jobs.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub(crate) fn max_attempts_override(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Runs the operation once and returns its result unchanged.
    pub(crate) async fn call(&mut self) -> OpResult<T> {
        (self.operation)().await
    }

    pub(crate) fn fire_success(&mut self, value: T) {
        if let Some(hook) = self.on_success.as_mut() {
            hook(value);
        }
    }

    pub(crate) fn fire_failure(&mut self, error: Error) {
        if let Some(hook) = self.on_failure.as_mut() {
            hook(error);
        }
    }

    pub(crate) fn fire_settled(&mut self, result: OpResult<T>) {
        if let Some(hook) = self.on_settled.as_mut() {
            hook(result);
        }
    }
}

impl<T> std::fmt::Debug for Job<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .field("on_settled", &self.on_settled.is_some())
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

/// A queued job with a bounded attempt counter.
///
/// `attempts` increments exactly once per execution attempt and never exceeds
/// `max_attempts`; recovery executions do not touch it.
pub(crate) struct RetryableJob<T> {
    id: JobId,
    job: Job<T>,
    attempts: u32,
    max_attempts: u32,
    enqueued_at: DateTime<Utc>,
    /// Raw result of the most recent attempt; what the terminal hooks see.
    last: Option<OpResult<T>>,
}

impl<T> RetryableJob<T> {
    pub(crate) fn new(job: Job<T>, default_max_attempts: u32) -> Self {
        let max_attempts = job
            .max_attempts_override()
            .unwrap_or(default_max_attempts)
            .max(1);
        Self {
            id: JobId::new(),
            job,
            attempts: 0,
            max_attempts,
            enqueued_at: Utc::now(),
            last: None,
        }
    }
}

/// Object-safe view of a [`RetryableJob`], so jobs with different success
/// types share one queue. The wrapper records each attempt's raw result;
/// the dispatch loop only ever branches on success/failure and the code.
#[async_trait]
pub(crate) trait DispatchJob: Send {
    fn id(&self) -> JobId;

    fn attempts(&self) -> u32;

    fn enqueued_at(&self) -> DateTime<Utc>;

    /// Runs one attempt. Once the budget is spent this refuses to invoke the
    /// operation and synthesizes the `max_attempts` failure instead — the
    /// only error the queue produces on its own.
    async fn attempt(&mut self) -> Result<(), Error>;

    fn fire_success(&mut self);

    fn fire_failure(&mut self);

    fn fire_settled(&mut self);
}

#[async_trait]
impl<T: Clone + Send + 'static> DispatchJob for RetryableJob<T> {
    fn id(&self) -> JobId {
        self.id
    }

    fn attempts(&self) -> u32 {
        self.attempts
    }

    fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    async fn attempt(&mut self) -> Result<(), Error> {
        if self.attempts >= self.max_attempts {
            let error = Error::max_attempts(format!("max attempts reached for job {}", self.id));
            self.last = Some(Err(error.clone()));
            return Err(error);
        }

        self.attempts += 1;
        let result = self.job.call().await;
        let view = match &result {
            Ok(_) => Ok(()),
            Err(error) => Err(error.clone()),
        };
        self.last = Some(result);
        view
    }

    fn fire_success(&mut self) {
        if let Some(Ok(value)) = &self.last {
            let value = value.clone();
            self.job.fire_success(value);
        }
    }

    fn fire_failure(&mut self) {
        if let Some(Err(error)) = &self.last {
            let error = error.clone();
            self.job.fire_failure(error);
        }
    }

    fn fire_settled(&mut self) {
        if let Some(result) = self.last.take() {
            self.job.fire_settled(result);
        }
    }
}
