//! # Executor Module
//!
//! The executor-service abstraction that the thread utilities drive, plus a
//! fixed-size [`ThreadPool`] implementation.
//!
//! ## Lifecycle
//! ```text
//! Running ──shutdown()──────► Shutdown ──queue drained, workers exit──► Terminated
//!    │                            │
//!    └──shutdown_now()──► Stop ◄──┘ (queued jobs returned, workers interrupted)
//!                          └──────workers exit──────────────────────► Terminated
//! ```

mod pool;

use std::fmt;
use std::time::Duration;

use super::error::ExecutorError;

pub use pool::{PoolMetrics, PoolState, ThreadPool};

/// A unit of work accepted by an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Common interface for executors that can be shut down gracefully.
pub trait ExecutorService: fmt::Debug + Send + Sync {
    /// Queues a job. Fails with [`ExecutorError::Rejected`] once shutdown has begun.
    fn execute(&self, job: Job) -> Result<(), ExecutorError>;

    /// Stops accepting new jobs. Already queued jobs still run.
    fn shutdown(&self);

    /// Stops accepting new jobs, interrupts running ones and returns the
    /// queued jobs that never started.
    fn shutdown_now(&self) -> Vec<Job>;

    fn is_shutdown(&self) -> bool;

    /// Whether all workers have exited after a shutdown.
    fn is_terminated(&self) -> bool;

    /// Blocks until terminated or `timeout` elapses, returning whether termination was observed.
    ///
    /// Fails with [`ExecutorError::Interrupted`] if the calling thread is
    /// interrupted on entry or while waiting.
    fn await_termination(&self, timeout: Duration) -> Result<bool, ExecutorError>;
}
