//! Logging infrastructure for wavnorm.
//!
//! This module provides:
//! - Per-task loggers that prefix every line with the file being processed
//! - Compact mode: external tool output is kept in a tail buffer
//! - Tail dump for error diagnosis when a task fails
//! - Global `tracing` subscriber setup with an optional log file
//!
//! # Example
//!
//! ```no_run
//! use wavnorm_core::logging::{TaskLogger, LogConfig};
//!
//! let logger = TaskLogger::new("take01.wav", LogConfig::default());
//! logger.phase("Analyzing");
//! logger.command("ffmpeg -i take01.wav -af volumedetect -f null -");
//! logger.success("Replaced original");
//! ```

mod task_logger;
mod types;

pub use task_logger::TaskLogger;
pub use types::{LogConfig, LogLevel, MessagePrefix};

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Name of the run log file written inside the configured log directory.
pub const LOG_FILE_NAME: &str = "wavnorm.log";

/// Install the process-wide subscriber. Call once, at startup.
///
/// `RUST_LOG` wins over `default_level`. Output goes to stderr and, with
/// a `log_dir`, also to `log_dir/wavnorm.log`; keep the returned guard
/// alive until exit or buffered file lines are lost.
pub fn init_tracing(default_level: LogLevel, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter()));

    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = fmt::layer().with_ansi(false).with_writer(writer);

            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .init();
            None
        }
    }
}

/// Warnings only, captured by the test harness.
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
