//! # Thread Interruption
//!
//! Cooperative interruption for OS threads. Every thread owns an interrupt
//! flag that other threads can set through an [`InterruptHandle`]. Blocking
//! calls in this crate ([`sleep`], latch waits, executor termination waits)
//! observe the flag, clear it, and fail with [`Interrupted`].
//!
//! Long-running jobs should poll [`is_interrupted`] or block through these
//! calls so that a forced executor shutdown can stop them.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use super::error::Interrupted;

/// Granularity at which condition-variable waits re-check the interrupt flag.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(10);

struct Inner {
    flag: AtomicBool,
    thread: Thread,
}

/// Handle used to interrupt a specific thread.
#[derive(Clone)]
pub struct InterruptHandle {
    inner: Arc<Inner>,
}

impl InterruptHandle {
    fn for_thread(thread: Thread) -> Self {
        Self {
            inner: Arc::new(Inner {
                flag: AtomicBool::new(false),
                thread,
            }),
        }
    }

    /// Sets the thread's interrupt flag and wakes it if it is parked.
    pub fn interrupt(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.thread.unpark();
    }

    /// Whether the flag is set. Does not clear it.
    pub fn is_interrupted(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    pub fn thread_name(&self) -> Option<&str> {
        self.inner.thread.name()
    }

    fn take(&self) -> bool {
        self.inner.flag.swap(false, Ordering::SeqCst)
    }
}

impl fmt::Debug for InterruptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptHandle")
            .field("thread", &self.inner.thread.id())
            .field("name", &self.inner.thread.name())
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

thread_local! {
    static CURRENT: InterruptHandle = InterruptHandle::for_thread(thread::current());
}

/// Handle for the calling thread.
pub fn current() -> InterruptHandle {
    CURRENT.with(InterruptHandle::clone)
}

/// Whether the calling thread has been interrupted. Does not clear the flag.
pub fn is_interrupted() -> bool {
    CURRENT.with(InterruptHandle::is_interrupted)
}

/// Tests and clears the calling thread's interrupt flag.
pub fn interrupted() -> bool {
    CURRENT.with(InterruptHandle::take)
}

/// Sets the calling thread's interrupt flag.
pub fn interrupt_current() {
    CURRENT.with(InterruptHandle::interrupt);
}

/// Parks the calling thread for `duration`.
///
/// Fails immediately if the flag is already set, or as soon as it is set
/// while sleeping. The flag is cleared in both cases.
pub fn sleep(duration: Duration) -> Result<(), Interrupted> {
    if interrupted() {
        return Err(Interrupted);
    }
    let deadline = Instant::now().checked_add(duration);
    loop {
        match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(());
                }
                thread::park_timeout(deadline - now);
            }
            None => thread::park(),
        }
        if interrupted() {
            return Err(Interrupted);
        }
    }
}

/// Waits on `condvar` until `done` holds for the guarded value.
///
/// Returns `Ok(false)` once `timeout` elapses (`None` waits forever). The
/// interrupt flag is checked on entry and every [`POLL_INTERVAL`]; a poisoned
/// mutex is recovered since callers only guard plain counters and states.
pub(crate) fn wait_on<T, F>(
    mutex: &Mutex<T>,
    condvar: &Condvar,
    timeout: Option<Duration>,
    mut done: F,
) -> Result<bool, Interrupted>
where
    F: FnMut(&T) -> bool,
{
    if interrupted() {
        return Err(Interrupted);
    }
    let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
    let mut guard = mutex.lock().unwrap_or_else(PoisonError::into_inner);
    loop {
        if done(&*guard) {
            return Ok(true);
        }
        let slice = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(false);
                }
                (deadline - now).min(POLL_INTERVAL)
            }
            None => POLL_INTERVAL,
        };
        guard = match condvar.wait_timeout(guard, slice) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        };
        if interrupted() {
            return Err(Interrupted);
        }
    }
}
