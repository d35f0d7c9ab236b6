#![doc = " Thread helpers and the concurrency primitives they operate on."]

pub mod config;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod interrupt;
pub mod latch;
pub mod util;

// Re-export key types for easier usage
pub use config::{ShutdownConfig, ThreadPoolConfig};
pub use error::{ExecutorError, Interrupted, ThreadUtilError};
pub use executor::{ExecutorService, Job, PoolMetrics, PoolState, ThreadPool};
pub use hooks::{HookId, ShutdownHookGuard, ShutdownHooks};
pub use interrupt::InterruptHandle;
pub use latch::CountDownLatch;
pub use util::{GracefulShutdown, ShutdownErrorSink, ShutdownOutcome, TracingErrorSink};
