//! Tracing setup.
//!
//! Library code only emits `tracing` events; a binary or test harness calls
//! one of the init functions once at startup to decide where they go.
//!
//! # Example
//!
//! ```no_run
//! use synthmatch_core::logging::{init_tracing_with_file, LogLevel};
//!
//! // Keep the guard alive until exit so the file writer flushes
//! let _guard = init_tracing_with_file(LogLevel::Debug, "logs").unwrap();
//! tracing::info!("ready");
//! ```

mod types;

pub use types::LogLevel;

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{Builder, LevelFilter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingSettings;

/// Name of the log file written by [`init_tracing_with_file`].
pub const LOG_FILE_NAME: &str = "synthmatch.log";

/// Initialize global tracing subscriber writing to stderr.
///
/// - Respects the `RUST_LOG` environment variable
/// - Falls back to the provided default level
///
/// Should be called once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(env_filter(default_level))
        .init();
}

/// Initialize tracing to stderr and to `dir/synthmatch.log`.
///
/// The returned guard flushes the file writer when dropped; hold it for the
/// lifetime of the program.
pub fn init_tracing_with_file(
    default_level: LogLevel,
    dir: impl AsRef<Path>,
) -> io::Result<WorkerGuard> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(env_filter(default_level))
        .init();

    Ok(guard)
}

/// Initialize tracing from the `[logging]` settings section.
///
/// Returns the file writer guard when `log_dir` is set.
pub fn init_from_settings(settings: &LoggingSettings) -> io::Result<Option<WorkerGuard>> {
    match settings.log_dir.as_deref() {
        Some(dir) if !dir.trim().is_empty() => {
            init_tracing_with_file(settings.level, dir).map(Some)
        }
        _ => {
            init_tracing(settings.level);
            Ok(None)
        }
    }
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

fn env_filter(default_level: LogLevel) -> EnvFilter {
    filter_builder(default_level).from_env_lossy()
}

/// `RUST_LOG` directives win; `default_level` applies when none are given.
fn filter_builder(default_level: LogLevel) -> Builder {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(default_level.to_tracing_level()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_can_be_installed_twice() {
        init_test_tracing();
        init_test_tracing();
        tracing::warn!("visible in test output");
    }

    #[test]
    fn default_level_applies_without_directives() {
        let filter = filter_builder(LogLevel::Warn).parse_lossy("");
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn explicit_directives_override_default_level() {
        let filter = filter_builder(LogLevel::Warn).parse_lossy("synthmatch_core=trace");
        assert_eq!(filter.to_string(), "synthmatch_core=trace");
    }
}
