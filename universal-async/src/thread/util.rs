//! # Thread Utilities
//!
//! Stateless helpers for callers that manage their own executors and latches.
//!
//! | Function                   | Blocks | Failure behavior                                       |
//! |----------------------------|--------|--------------------------------------------------------|
//! | [`sleep`]                  | yes    | interruption re-signaled on the calling thread         |
//! | [`count_down`]             | no     | `NullArgument` for a missing latch                     |
//! | [`suitable_thread_count`]  | no     | never fails                                            |
//! | [`shutdown_thread_pool`]   | yes    | never fails; forces termination after the drain budget |
//! | [`add_shutdown_hook`]      | no     | `ShutdownInProgress` once hooks are running            |

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::config::ShutdownConfig;
use super::error::{ExecutorError, ThreadUtilError};
use super::executor::ExecutorService;
use super::interrupt;
use super::latch::CountDownLatch;

pub use super::hooks::{add_shutdown_hook, remove_shutdown_hook, run_shutdown_hooks, HookId};

/// Default multiple of the core count used to size thread pools.
pub const THREAD_MULTIPLE: usize = 2;

/// Suspends the calling thread for `millis` milliseconds.
///
/// If the thread is interrupted while sleeping, returns early and sets the
/// interrupt flag again so the caller can still observe it.
pub fn sleep(millis: u64) {
    if interrupt::sleep(Duration::from_millis(millis)).is_err() {
        interrupt::interrupt_current();
    }
}

/// Decrements `latch`.
pub fn count_down(latch: Option<&CountDownLatch>) -> Result<(), ThreadUtilError> {
    let latch = latch.ok_or(ThreadUtilError::NullArgument("latch"))?;
    latch.count_down();
    Ok(())
}

/// Thread count for this host with the default multiplier.
pub fn suitable_thread_count() -> usize {
    suitable_thread_count_with(THREAD_MULTIPLE)
}

/// Thread count for this host: the core count times `multiplier`, rounded up to a power of two.
pub fn suitable_thread_count_with(multiplier: usize) -> usize {
    suitable_thread_count_for(num_cpus::get(), multiplier)
}

/// Smallest power of two that is at least `cores * multiplier`, and at least 1.
pub fn suitable_thread_count_for(cores: usize, multiplier: usize) -> usize {
    let bound = cores.saturating_mul(multiplier);
    let mut workers: usize = 1;
    while workers < bound {
        match workers.checked_mul(2) {
            Some(next) => workers = next,
            None => break,
        }
    }
    workers
}

/// Receives unexpected errors raised while waiting for an executor to terminate.
pub trait ShutdownErrorSink: Send + Sync {
    fn report(&self, attempt: usize, error: &ExecutorError);
}

/// Default sink, logging through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ShutdownErrorSink for TracingErrorSink {
    fn report(&self, attempt: usize, error: &ExecutorError) {
        error!(attempt, error = %error, "thread pool shutdown hit an error while awaiting termination");
    }
}

/// How a graceful shutdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The executor terminated within the drain budget.
    Terminated,
    /// The budget ran out and remaining work was force-cancelled.
    Forced,
    /// The calling thread was interrupted; work was force-cancelled and the
    /// interrupt flag re-signaled.
    Interrupted,
}

/// Bounded graceful-shutdown policy.
#[derive(Clone)]
pub struct GracefulShutdown {
    config: ShutdownConfig,
    sink: Arc<dyn ShutdownErrorSink>,
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new(ShutdownConfig::default())
    }
}

impl GracefulShutdown {
    pub fn new(config: ShutdownConfig) -> Self {
        Self {
            config,
            sink: Arc::new(TracingErrorSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ShutdownErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &ShutdownConfig {
        &self.config
    }

    /// Shuts `executor` down, waiting up to `attempts * wait` before forcing it.
    pub fn shutdown<E>(&self, executor: &E) -> ShutdownOutcome
    where
        E: ExecutorService + ?Sized,
    {
        executor.shutdown();

        for attempt in 1..=self.config.attempts {
            match executor.await_termination(self.config.wait) {
                Ok(true) => {
                    debug!(attempt, "executor terminated gracefully");
                    return ShutdownOutcome::Terminated;
                }
                Ok(false) => {
                    debug!(attempt, max_attempts = self.config.attempts, "executor still draining");
                }
                Err(ExecutorError::Interrupted) => {
                    let discarded = executor.shutdown_now();
                    interrupt::interrupt_current();
                    warn!(attempt, discarded = discarded.len(), "interrupted while awaiting executor termination");
                    return ShutdownOutcome::Interrupted;
                }
                Err(e) => self.sink.report(attempt, &e),
            }
        }

        let discarded = executor.shutdown_now();
        warn!(
            budget_ms = self.config.budget().as_millis() as u64,
            discarded = discarded.len(),
            "executor did not terminate in time, forcing shutdown"
        );
        ShutdownOutcome::Forced
    }
}

impl std::fmt::Debug for GracefulShutdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GracefulShutdown").field("config", &self.config).finish()
    }
}

/// Shuts `executor` down gracefully: stop intake, wait up to three times one
/// second for running work, then force-cancel whatever remains.
///
/// Never fails. If the calling thread is interrupted while waiting, remaining
/// work is force-cancelled and the interrupt flag is set again.
pub fn shutdown_thread_pool<E>(executor: &E) -> ShutdownOutcome
where
    E: ExecutorService + ?Sized,
{
    GracefulShutdown::default().shutdown(executor)
}

/// [`shutdown_thread_pool`] with a custom drain budget or error sink.
pub fn shutdown_thread_pool_with<E>(executor: &E, policy: &GracefulShutdown) -> ShutdownOutcome
where
    E: ExecutorService + ?Sized,
{
    policy.shutdown(executor)
}
