use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use flume::{Receiver, Sender, TrySendError};
use tracing::{debug, info, warn};

use crate::logging;
use crate::thread::config::ThreadPoolConfig;
use crate::thread::error::{describe_panic, ExecutorError};
use crate::thread::interrupt::{self, InterruptHandle};

use super::{ExecutorService, Job};

/// Lifecycle states of a [`ThreadPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Accepting and running jobs
    Running,
    /// No longer accepting jobs, draining the queue
    Shutdown,
    /// No longer accepting jobs, queue discarded, workers interrupted
    Stop,
    /// All workers have exited
    Terminated,
}

/// Metrics about the pool state
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub pool_size: usize,
    pub live_workers: usize,
    pub active_jobs: usize,
    pub queued_jobs: usize,
    /// Jobs that returned normally
    pub completed_jobs: usize,
    /// Jobs that panicked
    pub panicked_jobs: usize,
    pub state: PoolState,
}

struct Lifecycle {
    state: PoolState,
    live_workers: usize,
}

struct Shared {
    name: String,
    lifecycle: Mutex<Lifecycle>,
    terminated: Condvar,
    sender: Mutex<Option<Sender<Job>>>,
    receiver: Receiver<Job>,
    workers: Mutex<Vec<InterruptHandle>>,
    active_jobs: AtomicUsize,
    completed_jobs: AtomicUsize,
    panicked_jobs: AtomicUsize,
}

impl Shared {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> PoolState {
        self.lifecycle().state
    }

    fn close_queue(&self) {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Moves to `Terminated` once no worker is left. Caller holds the lifecycle lock.
    fn try_terminate(&self, lifecycle: &mut Lifecycle) {
        if lifecycle.live_workers == 0 && lifecycle.state != PoolState::Terminated {
            lifecycle.state = PoolState::Terminated;
            self.terminated.notify_all();
            info!(pool = %self.name, "thread pool terminated");
        }
    }

    fn worker_loop(&self, worker_id: usize) {
        debug!(pool = %self.name, worker_id, "worker started");

        // Ends once the queue is closed and empty
        while let Ok(job) = self.receiver.recv() {
            if self.state() == PoolState::Stop {
                debug!(pool = %self.name, worker_id, "discarding job dequeued during forced shutdown");
                break;
            }

            self.active_jobs.fetch_add(1, Ordering::SeqCst);
            let outcome = panic::catch_unwind(AssertUnwindSafe(job));
            self.active_jobs.fetch_sub(1, Ordering::SeqCst);

            if let Err(payload) = outcome {
                self.panicked_jobs.fetch_add(1, Ordering::SeqCst);
                warn!(
                    pool = %self.name,
                    worker_id,
                    panic = %describe_panic(payload.as_ref()),
                    "job panicked"
                );
            } else {
                self.completed_jobs.fetch_add(1, Ordering::SeqCst);
            }

            if self.state() == PoolState::Stop {
                break;
            }
            // An interrupt aimed at the finished job must not leak into the next one.
            interrupt::interrupted();
        }

        let mut lifecycle = self.lifecycle();
        lifecycle.live_workers -= 1;
        debug!(pool = %self.name, worker_id, remaining = lifecycle.live_workers, "worker exited");
        if lifecycle.state != PoolState::Running {
            self.try_terminate(&mut lifecycle);
        }
    }
}

/// Fixed-size pool of named OS threads fed from a shared job queue.
///
/// # Thread Safety
/// - Jobs are dispatched through a `flume` MPMC channel
/// - Lifecycle state is guarded by a mutex with a condition variable for termination waits
/// - Each worker's interrupt handle is kept so a forced shutdown can signal running jobs
///
/// # Worker Behavior
/// 1. Takes the next job from the queue
/// 2. Runs it, catching and logging any panic
/// 3. Exits when the queue is closed and empty, or after a forced shutdown
///
/// Dropping the pool performs a graceful [`ExecutorService::shutdown`]; queued
/// jobs still run on the detached workers.
pub struct ThreadPool {
    shared: Arc<Shared>,
    pool_size: usize,
}

impl ThreadPool {
    /// Create a pool and start all of its workers.
    pub fn new(config: ThreadPoolConfig) -> Result<Self, ExecutorError> {
        config.validate()?;

        let (sender, receiver) = match config.queue_capacity {
            Some(capacity) => flume::bounded(capacity),
            None => flume::unbounded(),
        };
        let name = config.thread_name_prefix.trim_end_matches('-').to_string();

        let pool = Self {
            shared: Arc::new(Shared {
                name,
                lifecycle: Mutex::new(Lifecycle {
                    state: PoolState::Running,
                    live_workers: 0,
                }),
                terminated: Condvar::new(),
                sender: Mutex::new(Some(sender)),
                receiver,
                workers: Mutex::new(Vec::with_capacity(config.pool_size)),
                active_jobs: AtomicUsize::new(0),
                completed_jobs: AtomicUsize::new(0),
                panicked_jobs: AtomicUsize::new(0),
            }),
            pool_size: config.pool_size,
        };

        for worker_id in 0..config.pool_size {
            // On failure, Drop shuts down the workers started so far.
            pool.spawn_worker(worker_id, &config.thread_name_prefix)?;
        }

        info!(pool = %pool.shared.name, pool_size = pool.pool_size, "thread pool started");
        Ok(pool)
    }

    fn spawn_worker(&self, worker_id: usize, prefix: &str) -> Result<(), ExecutorError> {
        let shared = Arc::clone(&self.shared);
        let dispatch = logging::current_subscriber();
        let (handle_tx, handle_rx) = flume::bounded(1);

        self.shared.lifecycle().live_workers += 1;
        let spawned = thread::Builder::new()
            .name(format!("{prefix}{worker_id}"))
            .spawn(move || {
                let _ = handle_tx.send(interrupt::current());
                tracing::dispatcher::with_default(&dispatch, || {
                    let _span = crate::pool_span!(shared.name, worker_id).entered();
                    shared.worker_loop(worker_id);
                });
            });

        match spawned {
            Ok(_detached) => {
                if let Ok(handle) = handle_rx.recv() {
                    self.shared
                        .workers
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(handle);
                }
                Ok(())
            }
            Err(e) => {
                self.shared.lifecycle().live_workers -= 1;
                Err(ExecutorError::Spawn(e))
            }
        }
    }

    /// Queues a closure. Shorthand for [`ExecutorService::execute`].
    pub fn spawn<F>(&self, task: F) -> Result<(), ExecutorError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.execute(Box::new(task))
    }

    /// Queues a closure and returns a channel that yields its result.
    ///
    /// The channel disconnects without a value if the job panics or is
    /// discarded by [`ExecutorService::shutdown_now`].
    pub fn submit<F, T>(&self, task: F) -> Result<Receiver<T>, ExecutorError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = flume::bounded(1);
        self.spawn(move || {
            let _ = tx.send(task());
        })?;
        Ok(rx)
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn state(&self) -> PoolState {
        self.shared.state()
    }

    pub fn metrics(&self) -> PoolMetrics {
        let lifecycle = self.shared.lifecycle();
        PoolMetrics {
            pool_size: self.pool_size,
            live_workers: lifecycle.live_workers,
            active_jobs: self.shared.active_jobs.load(Ordering::SeqCst),
            queued_jobs: self.shared.receiver.len(),
            completed_jobs: self.shared.completed_jobs.load(Ordering::SeqCst),
            panicked_jobs: self.shared.panicked_jobs.load(Ordering::SeqCst),
            state: lifecycle.state,
        }
    }
}

impl ExecutorService for ThreadPool {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        let sender = self.shared.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender.as_ref() else {
            return Err(ExecutorError::Rejected(format!("{} is shut down", self.shared.name)));
        };
        sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => ExecutorError::Rejected(format!("{} queue is full", self.shared.name)),
            TrySendError::Disconnected(_) => ExecutorError::Rejected(format!("{} is shut down", self.shared.name)),
        })
    }

    fn shutdown(&self) {
        let mut lifecycle = self.shared.lifecycle();
        if lifecycle.state == PoolState::Running {
            lifecycle.state = PoolState::Shutdown;
            debug!(pool = %self.shared.name, "thread pool shutting down");
        }
        self.shared.close_queue();
        self.shared.try_terminate(&mut lifecycle);
    }

    fn shutdown_now(&self) -> Vec<Job> {
        let pending: Vec<Job> = {
            let mut lifecycle = self.shared.lifecycle();
            if matches!(lifecycle.state, PoolState::Running | PoolState::Shutdown) {
                lifecycle.state = PoolState::Stop;
            }
            self.shared.close_queue();
            let pending = self.shared.receiver.drain().collect();
            self.shared.try_terminate(&mut lifecycle);
            pending
        };

        let workers = self.shared.workers.lock().unwrap_or_else(PoisonError::into_inner);
        for worker in workers.iter() {
            debug!(pool = %self.shared.name, worker = worker.thread_name().unwrap_or("unnamed"), "interrupting worker");
            worker.interrupt();
        }
        warn!(
            pool = %self.shared.name,
            discarded = pending.len(),
            "thread pool forced to stop"
        );
        pending
    }

    fn is_shutdown(&self) -> bool {
        self.state() != PoolState::Running
    }

    fn is_terminated(&self) -> bool {
        self.state() == PoolState::Terminated
    }

    fn await_termination(&self, timeout: Duration) -> Result<bool, ExecutorError> {
        interrupt::wait_on(&self.shared.lifecycle, &self.shared.terminated, Some(timeout), |lifecycle| {
            lifecycle.state == PoolState::Terminated
        })
        .map_err(ExecutorError::from)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metrics = self.metrics();
        f.debug_struct("ThreadPool")
            .field("name", &self.shared.name)
            .field("pool_size", &metrics.pool_size)
            .field("live_workers", &metrics.live_workers)
            .field("state", &metrics.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn small_pool(size: usize) -> ThreadPool {
        ThreadPool::new(ThreadPoolConfig::with_pool_size(size)).unwrap()
    }

    #[test]
    fn test_rejects_zero_workers() {
        let result = ThreadPool::new(ThreadPoolConfig::with_pool_size(0));
        assert!(matches!(result, Err(ExecutorError::InvalidConfig(_))));
    }

    #[test]
    fn test_submit_returns_result() {
        let pool = small_pool(2);
        let rx = pool.submit(|| 6 * 7).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }

    #[test]
    fn test_worker_threads_are_named() {
        let mut config = ThreadPoolConfig::with_pool_size(1);
        config.thread_name_prefix = "naming-test-".to_string();
        let pool = ThreadPool::new(config).unwrap();

        let rx = pool.submit(|| thread::current().name().map(str::to_string)).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap().as_deref(), Some("naming-test-0"));
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let pool = small_pool(1);
        pool.spawn(|| panic!("job failure")).unwrap();
        let rx = pool.submit(|| "still alive").unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "still alive");
        assert_eq!(pool.metrics().live_workers, 1);

        pool.shutdown();
        assert!(pool.await_termination(Duration::from_secs(5)).unwrap());
        let metrics = pool.metrics();
        assert_eq!(metrics.completed_jobs, 1);
        assert_eq!(metrics.panicked_jobs, 1);
    }

    #[test]
    fn test_execute_after_shutdown_is_rejected() {
        let pool = small_pool(1);
        pool.shutdown();
        assert!(pool.is_shutdown());
        assert!(matches!(pool.spawn(|| {}), Err(ExecutorError::Rejected(_))));
    }

    #[test]
    fn test_bounded_queue_rejects_when_full() {
        let config = ThreadPoolConfig {
            pool_size: 1,
            queue_capacity: Some(1),
            ..Default::default()
        };
        let pool = ThreadPool::new(config).unwrap();
        let (release_tx, release_rx) = flume::bounded::<()>(0);
        let (started_tx, started_rx) = flume::bounded::<()>(1);

        pool.spawn(move || {
            let _ = started_tx.send(());
            let _ = release_rx.recv();
        })
        .unwrap();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        pool.spawn(|| {}).unwrap();
        assert!(matches!(pool.spawn(|| {}), Err(ExecutorError::Rejected(_))));
        drop(release_tx);
    }

    #[test]
    fn test_graceful_shutdown_drains_queue() {
        let pool = small_pool(1);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let counter = Arc::clone(&counter);
            pool.spawn(move || {
                thread::sleep(Duration::from_millis(5));
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.shutdown();
        assert!(pool.await_termination(Duration::from_secs(5)).unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert_eq!(pool.state(), PoolState::Terminated);
    }

    #[test]
    fn test_shutdown_now_returns_pending_and_interrupts() {
        let pool = small_pool(1);
        let (started_tx, started_rx) = flume::bounded::<()>(1);

        pool.spawn(move || {
            let _ = started_tx.send(());
            while interrupt::sleep(Duration::from_secs(60)).is_ok() {}
        })
        .unwrap();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        pool.spawn(|| {}).unwrap();
        pool.spawn(|| {}).unwrap();

        let started = Instant::now();
        let pending = pool.shutdown_now();
        assert_eq!(pending.len(), 2);
        assert!(pool.await_termination(Duration::from_secs(5)).unwrap());
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(pool.metrics().active_jobs, 0);
    }

    #[test]
    fn test_await_termination_times_out_while_running() {
        let pool = small_pool(1);
        assert!(!pool.await_termination(Duration::from_millis(20)).unwrap());
    }
}
