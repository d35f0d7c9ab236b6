use std::any::Any;

use thiserror::Error;

/// Raised by a blocking call when the waiting thread's interrupt flag was set.
///
/// Returning this error clears the flag; callers that cannot propagate it are
/// expected to re-signal with [`crate::thread::interrupt::interrupt_current`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Thread was interrupted while waiting")]
pub struct Interrupted;

/// Errors raised by the thread utility functions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThreadUtilError {
    #[error("Required argument is missing: {0}")]
    NullArgument(&'static str),
    #[error("Shutdown is already in progress")]
    ShutdownInProgress,
}

/// Errors related to executor operations.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Interrupted while waiting for the executor")]
    Interrupted,
    #[error("Task rejected: {0}")]
    Rejected(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Executor error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<Interrupted> for ExecutorError {
    fn from(_: Interrupted) -> Self {
        ExecutorError::Interrupted
    }
}

/// Renders a caught panic payload for logging.
pub(crate) fn describe_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
