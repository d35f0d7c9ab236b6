//! # Shutdown Hooks
//!
//! Callbacks that run once during orderly process exit, each on its own
//! dedicated thread.
//!
//! Rust has no runtime-level exit hook, so the process-wide registry is run
//! from one of these triggers:
//! - an explicit [`run_shutdown_hooks`] call
//! - dropping a [`ShutdownHookGuard`] held at the top of `main`
//! - [`wait_for_shutdown_signal_and_run_hooks`] on SIGINT, SIGTERM or SIGQUIT (Ctrl-C elsewhere)

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use lazy_static::lazy_static;
use tracing::{debug, error, info, warn};

use crate::logging;

use super::error::{describe_panic, ThreadUtilError};

/// Callback run at shutdown.
pub type HookFn = Box<dyn FnOnce() + Send + 'static>;

/// Identifier returned on registration, usable to remove the hook again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HookId(u64);

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    hooks: BTreeMap<HookId, HookFn>,
    running: bool,
}

/// A registry of shutdown hooks.
///
/// Once [`ShutdownHooks::run`] starts, the registry is closed: further
/// registrations fail and later runs are no-ops, so each hook runs at most once.
#[derive(Default)]
pub struct ShutdownHooks {
    registry: Mutex<Registry>,
}

impl ShutdownHooks {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add<F>(&self, action: F) -> Result<HookId, ThreadUtilError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut registry = self.registry();
        if registry.running {
            return Err(ThreadUtilError::ShutdownInProgress);
        }
        let id = HookId(registry.next_id);
        registry.next_id += 1;
        registry.hooks.insert(id, Box::new(action));
        debug!(hook = %id, "shutdown hook registered");
        Ok(id)
    }

    /// Unregisters a hook. Returns `false` if it is unknown or hooks already ran.
    pub fn remove(&self, id: HookId) -> bool {
        let mut registry = self.registry();
        !registry.running && registry.hooks.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.registry().hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_running(&self) -> bool {
        self.registry().running
    }

    /// Runs every registered hook on its own thread and waits for all of them.
    ///
    /// Hooks run concurrently in no particular order. A panicking hook is
    /// logged and does not affect the others. Returns how many hooks ran.
    pub fn run(&self) -> usize {
        let hooks = {
            let mut registry = self.registry();
            if registry.running {
                return 0;
            }
            registry.running = true;
            std::mem::take(&mut registry.hooks)
        };
        if hooks.is_empty() {
            return 0;
        }

        info!(count = hooks.len(), "running shutdown hooks");
        let dispatch = logging::current_subscriber();
        let mut handles = Vec::with_capacity(hooks.len());

        for (id, hook) in hooks {
            let dispatch = dispatch.clone();
            // The hook is moved into the thread; if spawning fails it is
            // lost with the closure, so log and continue with the others.
            let spawned = thread::Builder::new()
                .name(format!("shutdown-hook-{id}"))
                .spawn(move || tracing::dispatcher::with_default(&dispatch, hook));
            match spawned {
                Ok(handle) => handles.push((id, handle)),
                Err(e) => error!(hook = %id, error = %e, "failed to spawn shutdown hook thread"),
            }
        }

        let ran = handles.len();
        for (id, handle) in handles {
            if let Err(payload) = handle.join() {
                warn!(hook = %id, panic = %describe_panic(payload.as_ref()), "shutdown hook panicked");
            }
        }
        ran
    }
}

impl fmt::Debug for ShutdownHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry();
        f.debug_struct("ShutdownHooks")
            .field("registered", &registry.hooks.len())
            .field("running", &registry.running)
            .finish()
    }
}

lazy_static! {
    static ref GLOBAL_HOOKS: ShutdownHooks = ShutdownHooks::new();
}

/// The process-wide registry used by the free functions.
pub fn global() -> &'static ShutdownHooks {
    &GLOBAL_HOOKS
}

/// Registers a callback in the process-wide registry.
pub fn add_shutdown_hook<F>(action: F) -> Result<HookId, ThreadUtilError>
where
    F: FnOnce() + Send + 'static,
{
    global().add(action)
}

pub fn remove_shutdown_hook(id: HookId) -> bool {
    global().remove(id)
}

/// Runs the process-wide hooks. Subsequent calls do nothing.
pub fn run_shutdown_hooks() -> usize {
    global().run()
}

/// Runs the process-wide hooks when dropped.
///
/// ```rust,no_run
/// use universal_async::thread::hooks::{add_shutdown_hook, ShutdownHookGuard};
///
/// fn main() {
///     let _hooks = ShutdownHookGuard::new();
///     add_shutdown_hook(|| println!("flushing state")).unwrap();
///     // ... application body; hooks run when `main` returns
/// }
/// ```
#[derive(Debug, Default)]
#[must_use = "hooks run when the guard is dropped"]
pub struct ShutdownHookGuard {
    _private: (),
}

impl ShutdownHookGuard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Drop for ShutdownHookGuard {
    fn drop(&mut self) {
        run_shutdown_hooks();
    }
}

/// Waits for a termination signal.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Returns `Ok(())` when Ctrl-C is received, or `Err` if signal registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Waits for a termination signal, then runs the process-wide hooks on a
/// blocking thread. Returns how many hooks ran; the caller decides how to exit.
pub async fn wait_for_shutdown_signal_and_run_hooks() -> io::Result<usize> {
    wait_for_shutdown_signal().await?;
    info!("termination signal received");
    tokio::task::spawn_blocking(run_shutdown_hooks)
        .await
        .map_err(io::Error::other)
}
