use std::fmt;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use super::error::Interrupted;
use super::interrupt;

/// A synchronization aid that blocks waiters until its counter reaches zero.
///
/// The counter only moves down; once it hits zero every current and future
/// wait returns immediately.
pub struct CountDownLatch {
    count: Mutex<usize>,
    zero: Condvar,
}

impl CountDownLatch {
    pub fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            zero: Condvar::new(),
        }
    }

    /// Decrements the counter, waking all waiters when it reaches zero.
    /// Has no effect once the counter is already zero.
    pub fn count_down(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        if *count == 0 {
            return;
        }
        *count -= 1;
        if *count == 0 {
            self.zero.notify_all();
        }
    }

    pub fn count(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until the counter reaches zero or the calling thread is interrupted.
    pub fn wait(&self) -> Result<(), Interrupted> {
        interrupt::wait_on(&self.count, &self.zero, None, |count| *count == 0).map(|_| ())
    }

    /// Like [`Self::wait`], giving up after `timeout`. Returns whether the counter reached zero.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool, Interrupted> {
        interrupt::wait_on(&self.count, &self.zero, Some(timeout), |count| *count == 0)
    }
}

impl fmt::Debug for CountDownLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountDownLatch").field("count", &self.count()).finish()
    }
}
