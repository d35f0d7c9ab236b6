// Universal Async
//
// Thread helpers for applications that manage their own executors: interruptible
// sleep, countdown-latch signaling, thread-count sizing, bounded graceful
// executor shutdown and process shutdown hooks.

pub mod logging;
pub mod thread;

// Re-export the helper functions at the crate root
pub use thread::util::{
    add_shutdown_hook, count_down, remove_shutdown_hook, run_shutdown_hooks, shutdown_thread_pool,
    shutdown_thread_pool_with, sleep, suitable_thread_count, suitable_thread_count_for,
    suitable_thread_count_with,
};
