// Logging setup for Universal Async
//
// The crate logs through the `tracing` macros. This module installs a global
// subscriber for applications (and tests) that do not bring their own.
//
// # Usage Examples
//
// ## Basic Initialization
//
// ```rust
// use universal_async::logging;
//
// // INFO level, console output
// logging::init_default();
//
// // Or custom settings
// let config = logging::LogConfig {
//     level: tracing::Level::DEBUG,
//     json_format: false,
//     ..Default::default()
// };
// logging::init(config);
// ```
//
// ## Development / Production
//
// ```rust
// use universal_async::logging;
//
// // DEBUG level, file/line info
// logging::init_development();
//
// // INFO level, JSON lines, no file/line info
// logging::init_production();
// ```
//
// ## File Logging
//
// ```rust
// use universal_async::logging;
//
// let config = logging::LogConfig::default();
// logging::init_with_file(config, "/var/log/universal/app.log").unwrap();
// ```

use std::fs::OpenOptions;
use std::io;
use std::sync::{Mutex, Once};

use tracing::{Level, Subscriber};
use tracing_subscriber::{fmt, prelude::*, registry::LookupSpan, EnvFilter, Layer};

/// Configuration for the logging subscriber
///
/// # Examples
///
/// ```rust
/// use universal_async::logging::LogConfig;
/// use tracing::Level;
///
/// let custom_config = LogConfig {
///     level: Level::DEBUG,
///     json_format: true,
///     show_file_line: false,
///     show_thread_info: true,
///     show_time: true,
///     target_filters: Some("universal_async=debug,universal_async::thread::executor=trace".to_string()),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: Level,
    /// Whether to use JSON format for logs
    pub json_format: bool,
    /// Whether to include file and line information
    pub show_file_line: bool,
    /// Whether to include thread name/id
    pub show_thread_info: bool,
    /// Whether to include timestamps
    pub show_time: bool,
    /// Target filter expressions (format: "target=level,target2=level2,...")
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            show_file_line: true,
            show_thread_info: true,
            show_time: true,
            target_filters: None,
        }
    }
}

// Initialization guard to ensure we only initialize once
static INIT: Once = Once::new();

/// Builds the level filter: `RUST_LOG`, then the configured level and target directives.
pub fn build_filter(config: &LogConfig) -> EnvFilter {
    let mut env_filter = EnvFilter::from_default_env().add_directive(config.level.into());

    if let Some(filters) = &config.target_filters {
        for filter in filters.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            match filter.parse() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(e) => eprintln!("Ignoring invalid log filter `{}`: {}", filter, e),
            }
        }
    }
    env_filter
}

fn console_layer<S>(config: &LogConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_ansi(atty::is(atty::Stream::Stdout))
        .with_file(config.show_file_line)
        .with_line_number(config.show_file_line)
        .with_thread_names(config.show_thread_info)
        .with_thread_ids(config.show_thread_info);

    match (config.json_format, config.show_time) {
        (true, true) => layer.json().flatten_event(true).boxed(),
        (true, false) => layer.json().flatten_event(true).without_time().boxed(),
        (false, true) => layer.boxed(),
        (false, false) => layer.without_time().boxed(),
    }
}

// Helper function to set the global subscriber
fn set_global_subscriber<S>(subscriber: S)
where
    S: Subscriber + Send + Sync + 'static,
{
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error setting global tracing subscriber: {}", err);
    }
}

/// Initialize the logging system with the given configuration
///
/// It's safe to call multiple times; only the first call will take effect.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::registry()
            .with(build_filter(&config))
            .with(console_layer(&config));

        set_global_subscriber(subscriber);
    });
}

/// Initialize logging with both console and file output
///
/// The file is opened in append mode, created if missing, and always written
/// without ANSI colors. If logging is already initialized this does nothing
/// and the file is not touched.
///
/// # Errors
/// Returns an error if the file cannot be opened or created; logging then
/// stays uninitialized.
pub fn init_with_file(config: LogConfig, log_file: &str) -> io::Result<()> {
    let mut result = Ok(());

    INIT.call_once(|| {
        let file = match OpenOptions::new().create(true).append(true).open(log_file) {
            Ok(file) => file,
            Err(e) => {
                result = Err(e);
                return;
            }
        };

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_thread_ids(true);

        let subscriber = tracing_subscriber::registry()
            .with(build_filter(&config))
            .with(console_layer(&config))
            .with(file_layer);

        set_global_subscriber(subscriber);
    });

    result
}

/// INFO level with human-readable console output.
pub fn init_default() {
    init(LogConfig::default());
}

/// Initialize logging optimized for development environments
///
/// - DEBUG level for all modules
/// - TRACE level for the executor
/// - Colorized console output with file/line information
pub fn init_development() {
    let config = LogConfig {
        level: Level::DEBUG,
        json_format: false,
        show_file_line: true,
        show_thread_info: true,
        show_time: true,
        target_filters: Some("universal_async=debug,universal_async::thread::executor=trace".to_string()),
    };
    init(config);
}

/// Initialize logging optimized for production environments
///
/// JSON lines for log aggregators, no file/line information.
pub fn init_production() {
    let config = LogConfig {
        level: Level::INFO,
        json_format: true,
        show_file_line: false,
        show_thread_info: true,
        show_time: true,
        target_filters: None,
    };
    init(config);
}

/// Initialize logging for testing
///
/// Only shows warnings and errors by default to keep test output clean.
///
/// ```rust,ignore
/// use universal_async::logging;
///
/// #[test]
/// fn my_test() {
///     logging::init_test();
///     // Your test code...
/// }
/// ```
pub fn init_test() {
    let config = LogConfig {
        level: Level::WARN,
        json_format: false,
        show_file_line: true,
        show_thread_info: false,
        show_time: false,
        target_filters: None,
    };
    init(config);
}

/// Create a span for work running on a pool worker
///
/// ```rust
/// use universal_async::pool_span;
///
/// let span = pool_span!("universal-pool", 3);
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! pool_span {
    ($pool:expr, $worker_id:expr) => {
        tracing::debug_span!("pool_worker", pool = %$pool, worker_id = $worker_id)
    };
}

/// Get the current tracing dispatcher
///
/// Threads spawned by this crate install it so their logs reach the same
/// subscriber as the thread that created them, including scoped test
/// subscribers.
#[inline]
pub fn current_subscriber() -> tracing::Dispatch {
    tracing::dispatcher::get_default(|d| d.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.json_format);
        assert!(config.target_filters.is_none());
    }

    #[test]
    fn test_filter_skips_empty_directives() {
        let config = LogConfig {
            target_filters: Some("universal_async=debug, ,".to_string()),
            ..Default::default()
        };
        let filter = build_filter(&config);
        assert!(filter.to_string().contains("universal_async=debug"));
    }

    #[test]
    fn test_file_logging_after_init_leaves_file_alone() {
        init_test();

        let path = std::env::temp_dir().join(format!("universal-async-log-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);

        init_with_file(LogConfig::default(), path.to_str().unwrap()).unwrap();
        assert!(!path.exists());
    }
}
