//! Recovery jobs: remediation run in place of the caller before a retry.

use async_trait::async_trait;

use crate::job::Job;

/// Object-safe recovery runner.
///
/// A recovery is a plain [`Job`] — never retry-tracked. It runs exactly once
/// per failure cycle and is re-run only as often as the failing job's own
/// attempt budget permits.
#[async_trait]
pub(crate) trait RecoveryJob: Send {
    /// Runs the recovery operation once and fires the recovery's own hooks.
    /// Returns true when the original job should be retried.
    async fn run(&mut self) -> bool;
}

pub(crate) struct Recovery<T> {
    job: Job<T>,
}

impl<T> Recovery<T> {
    pub(crate) fn new(job: Job<T>) -> Self {
        Self { job }
    }
}

#[async_trait]
impl<T: Send + 'static> RecoveryJob for Recovery<T> {
    async fn run(&mut self) -> bool {
        match self.job.call().await {
            Ok(value) => {
                self.job.fire_success(value);
                true
            }
            Err(error) => {
                self.job.fire_failure(error);
                false
            }
        }
    }
}
