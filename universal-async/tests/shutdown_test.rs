// Integration tests for bounded graceful executor shutdown

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use universal_async::thread::executor::{ExecutorService, Job, PoolState, ThreadPool};
use universal_async::thread::{
    interrupt, ExecutorError, GracefulShutdown, ShutdownConfig, ShutdownErrorSink, ShutdownOutcome,
    ThreadPoolConfig,
};
use universal_async::{shutdown_thread_pool, shutdown_thread_pool_with};

fn pool(size: usize) -> ThreadPool {
    ThreadPool::new(ThreadPoolConfig::with_pool_size(size)).unwrap()
}

/// Runs until the worker thread is interrupted.
fn endless_job() -> impl FnOnce() + Send + 'static {
    || {
        while interrupt::sleep(Duration::from_millis(20)).is_ok() {}
    }
}

#[test]
fn test_quick_tasks_terminate_gracefully() {
    let pool = pool(4);
    let done = Arc::new(AtomicUsize::new(0));
    for _ in 0..8 {
        let done = Arc::clone(&done);
        pool.spawn(move || {
            thread::sleep(Duration::from_millis(10));
            done.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    let started = Instant::now();
    let outcome = shutdown_thread_pool(&pool);

    assert_eq!(outcome, ShutdownOutcome::Terminated);
    assert!(started.elapsed() < Duration::from_millis(1500));
    assert_eq!(done.load(Ordering::SeqCst), 8);
    assert!(pool.is_terminated());
    assert_eq!(pool.state(), PoolState::Terminated);
}

#[test]
fn test_idle_pool_terminates_immediately() {
    let pool = pool(2);
    let started = Instant::now();
    assert_eq!(shutdown_thread_pool(&pool), ShutdownOutcome::Terminated);
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_endless_task_is_forced_after_default_budget() {
    let pool = pool(1);
    pool.spawn(endless_job()).unwrap();

    let started = Instant::now();
    let outcome = shutdown_thread_pool(&pool);
    let elapsed = started.elapsed();

    assert_eq!(outcome, ShutdownOutcome::Forced);
    assert!(elapsed >= Duration::from_millis(2900), "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "returned after {elapsed:?}");

    assert!(pool.await_termination(Duration::from_secs(2)).unwrap());
    assert_eq!(pool.metrics().active_jobs, 0);
}

#[test]
fn test_custom_budget_forces_sooner() {
    let pool = pool(2);
    pool.spawn(endless_job()).unwrap();
    pool.spawn(endless_job()).unwrap();
    // Never dequeued: both workers are busy
    let skipped = Arc::new(AtomicBool::new(false));
    {
        let skipped = Arc::clone(&skipped);
        pool.spawn(move || skipped.store(true, Ordering::SeqCst)).unwrap();
    }

    let policy = GracefulShutdown::new(ShutdownConfig {
        attempts: 2,
        wait: Duration::from_millis(50),
    });

    let started = Instant::now();
    let outcome = shutdown_thread_pool_with(&pool, &policy);

    assert_eq!(outcome, ShutdownOutcome::Forced);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(pool.await_termination(Duration::from_secs(2)).unwrap());
    assert!(!skipped.load(Ordering::SeqCst));
}

#[test]
fn test_interrupted_caller_forces_and_resignals() {
    let pool = Arc::new(pool(1));
    pool.spawn(endless_job()).unwrap();

    let caller = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            let handle = interrupt::current();
            let waker = thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                handle.interrupt();
            });

            let started = Instant::now();
            let outcome = shutdown_thread_pool(pool.as_ref());
            let elapsed = started.elapsed();
            waker.join().unwrap();

            let flag_set = interrupt::interrupted();
            (outcome, elapsed, flag_set)
        })
    };

    let (outcome, elapsed, flag_set) = caller.join().unwrap();
    assert_eq!(outcome, ShutdownOutcome::Interrupted);
    assert!(elapsed < Duration::from_secs(2), "returned after {elapsed:?}");
    assert!(flag_set);
    assert!(pool.await_termination(Duration::from_secs(2)).unwrap());
}

/// Executor whose termination wait always fails with an unexpected error.
#[derive(Default)]
struct FailingExecutor {
    shutdown_called: AtomicBool,
    shutdown_now_called: AtomicBool,
    waits: AtomicUsize,
}

impl fmt::Debug for FailingExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailingExecutor").finish()
    }
}

impl ExecutorService for FailingExecutor {
    fn execute(&self, _job: Job) -> Result<(), ExecutorError> {
        Err(ExecutorError::Rejected("failing executor".to_string()))
    }

    fn shutdown(&self) {
        self.shutdown_called.store(true, Ordering::SeqCst);
    }

    fn shutdown_now(&self) -> Vec<Job> {
        self.shutdown_now_called.store(true, Ordering::SeqCst);
        Vec::new()
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown_called.load(Ordering::SeqCst)
    }

    fn is_terminated(&self) -> bool {
        false
    }

    fn await_termination(&self, _timeout: Duration) -> Result<bool, ExecutorError> {
        let attempt = self.waits.fetch_add(1, Ordering::SeqCst) + 1;
        Err(ExecutorError::Other(anyhow!("wait {attempt} failed")))
    }
}

#[derive(Default)]
struct RecordingSink {
    reports: Mutex<Vec<(usize, String)>>,
}

impl ShutdownErrorSink for RecordingSink {
    fn report(&self, attempt: usize, error: &ExecutorError) {
        self.reports.lock().unwrap().push((attempt, error.to_string()));
    }
}

#[test]
fn test_unexpected_errors_reach_sink_and_loop_continues() {
    let executor = FailingExecutor::default();
    let sink = Arc::new(RecordingSink::default());
    let policy = GracefulShutdown::default().with_sink(sink.clone());

    let outcome = shutdown_thread_pool_with(&executor, &policy);

    assert_eq!(outcome, ShutdownOutcome::Forced);
    assert!(executor.shutdown_called.load(Ordering::SeqCst));
    assert!(executor.shutdown_now_called.load(Ordering::SeqCst));
    assert_eq!(executor.waits.load(Ordering::SeqCst), 3);

    let reports = sink.reports.lock().unwrap();
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0], (1, "Executor error: wait 1 failed".to_string()));
    assert_eq!(reports[2].0, 3);
}

#[test]
fn test_shutdown_through_trait_object() {
    let pool: Box<dyn ExecutorService> = Box::new(pool(2));
    assert_eq!(shutdown_thread_pool(pool.as_ref()), ShutdownOutcome::Terminated);
    assert!(pool.is_shutdown());
    assert!(pool.execute(Box::new(|| {})).is_err());
}
