use std::time::Duration;

use super::error::ExecutorError;
use super::util;

/// Number of termination waits before a graceful shutdown is forced.
pub const DEFAULT_SHUTDOWN_ATTEMPTS: usize = 3;

/// Length of each termination wait.
pub const DEFAULT_SHUTDOWN_WAIT: Duration = Duration::from_secs(1);

pub const DEFAULT_THREAD_NAME_PREFIX: &str = "universal-pool-";

// --- Shutdown Configuration ---

/// Bounded drain policy applied by [`util::shutdown_thread_pool`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShutdownConfig {
    /// How many times to wait for termination before forcing it.
    pub attempts: usize,

    /// How long each wait lasts.
    pub wait: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_SHUTDOWN_ATTEMPTS,
            wait: DEFAULT_SHUTDOWN_WAIT,
        }
    }
}

impl ShutdownConfig {
    /// Upper bound on the graceful drain, `attempts * wait`.
    pub fn budget(&self) -> Duration {
        let attempts = u32::try_from(self.attempts).unwrap_or(u32::MAX);
        self.wait.saturating_mul(attempts)
    }
}

// --- Pool Configuration ---

/// Configuration for a [`super::executor::ThreadPool`].
#[derive(Clone, Debug)]
pub struct ThreadPoolConfig {
    /// Number of worker threads.
    pub pool_size: usize,

    /// Worker threads are named `<prefix><index>`.
    pub thread_name_prefix: String,

    /// Capacity of the job queue. `None` means unbounded.
    pub queue_capacity: Option<usize>,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: util::suitable_thread_count(),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            queue_capacity: None,
        }
    }
}

impl ThreadPoolConfig {
    pub fn with_pool_size(pool_size: usize) -> Self {
        Self {
            pool_size,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ExecutorError> {
        if self.pool_size == 0 {
            return Err(ExecutorError::InvalidConfig("pool_size must be at least 1".to_string()));
        }
        if self.queue_capacity == Some(0) {
            return Err(ExecutorError::InvalidConfig("queue_capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}
