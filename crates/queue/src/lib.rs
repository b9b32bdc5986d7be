//! `relayq-queue` — single-flight FIFO job dispatch with error-class recovery.
//!
//! ## Design
//!
//! - One job (or recovery) in flight at a time, system-wide
//! - Strict FIFO across jobs; a job's recovery/retry sub-cycle never
//!   interleaves with sibling jobs
//! - Failures are classified by [`relayq_core::ErrorCode`]; a recovery job
//!   registered for a code runs transparently before the failed job is
//!   retried, within the job's own attempt budget
//! - `flush()` drops waiting jobs without firing any of their hooks
//!
//! ## Dispatch flow
//!
//! ```text
//! enqueue ─▶ queue (FIFO) ─▶ attempt ─▶ Ok ───────────────▶ on_success ─▶ on_settled
//!                              ▲          │
//!                              │          ▼ Err(code)
//!                              │      recovery registered?
//!                              │          │no ────────────▶ on_failure ─▶ on_settled
//!                              │          ▼ yes
//!                              │      run recovery once
//!                              └──────────┤Ok (retry, budget permitting)
//!                                         ▼ Err
//!                                  recovery.on_failure ──────────────────▶ on_settled
//! ```
//!
//! ## Components
//!
//! - [`Job`]: a unit of deferred asynchronous work plus optional outcome hooks
//! - [`QueueManager`]: the process-wide dispatcher (construct once, clone into
//!   producers)
//! - [`QueueConfig`] / [`QueueStats`]: tuning and runtime counters

pub mod job;
pub mod manager;
mod recovery;

pub use job::{FailureHook, Job, JobId, Operation, SettledHook, SuccessHook};
pub use manager::{QueueConfig, QueueManager, QueueStats};
