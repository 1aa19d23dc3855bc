//! Per-task logger.
//!
//! Each task gets its own logger that:
//! - Prefixes every message with the file being processed
//! - Emits through `tracing` so the global subscriber decides where lines go
//! - Supports compact mode, where external tool output is only buffered
//! - Maintains a tail buffer for error diagnosis

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::types::{LogConfig, LogLevel, MessagePrefix};

/// Logger bound to one processing task.
pub struct TaskLogger {
    /// File name used as the line prefix.
    file_name: String,
    /// Logging configuration.
    config: LogConfig,
    /// Recent external tool output lines.
    tail_buffer: Mutex<VecDeque<String>>,
}

impl TaskLogger {
    /// Create a logger for the given file.
    pub fn new(file_name: impl Into<String>, config: LogConfig) -> Self {
        let capacity = config.error_tail;
        Self {
            file_name: file_name.into(),
            config,
            tail_buffer: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Get the file name this logger reports for.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        let file = self.file_name.as_str();
        match level {
            LogLevel::Trace => tracing::trace!("[{}] {}", file, message),
            LogLevel::Debug => tracing::debug!("[{}] {}", file, message),
            LogLevel::Info => tracing::info!("[{}] {}", file, message),
            LogLevel::Warn => tracing::warn!("[{}] {}", file, message),
            LogLevel::Error => tracing::error!("[{}] {}", file, message),
        }
    }

    /// Log an info message.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Log a debug message.
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Log a warning message.
    pub fn warn(&self, message: &str) {
        let msg = MessagePrefix::Warning.format(message);
        self.log(LogLevel::Warn, &msg);
    }

    /// Log an error message.
    pub fn error(&self, message: &str) {
        let msg = MessagePrefix::Error.format(message);
        self.log(LogLevel::Error, &msg);
    }

    /// Log a command being executed.
    pub fn command(&self, command: &str) {
        let msg = MessagePrefix::Command.format(command);
        self.log(LogLevel::Debug, &msg);
    }

    /// Log a state/phase marker.
    pub fn phase(&self, phase_name: &str) {
        let msg = MessagePrefix::Phase.format(phase_name);
        self.log(LogLevel::Debug, &msg);
    }

    /// Log a success message.
    pub fn success(&self, message: &str) {
        let msg = MessagePrefix::Success.format(message);
        self.log(LogLevel::Info, &msg);
    }

    /// Record one line of external tool output.
    ///
    /// In compact mode, these are only added to the tail buffer.
    pub fn output_line(&self, line: &str) {
        {
            let mut buffer = self.tail_buffer.lock();
            if buffer.len() >= self.config.error_tail {
                buffer.pop_front();
            }
            buffer.push_back(line.to_string());
        }

        if self.config.compact {
            return;
        }

        self.log(LogLevel::Debug, &format!("[tool] {}", line));
    }

    /// Record a whole block of tool output, line by line.
    pub fn output_block(&self, text: &str) {
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            self.output_line(line);
        }
    }

    /// Snapshot of the tail buffer.
    pub fn tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    /// Dump the tail buffer (typically after an error).
    pub fn show_tail(&self, header: &str) {
        let lines = self.tail();
        if lines.is_empty() {
            return;
        }

        self.log(
            LogLevel::Warn,
            &format!("--- {} (last {} lines) ---", header, lines.len()),
        );
        for line in &lines {
            self.log(LogLevel::Warn, line);
        }
    }
}
