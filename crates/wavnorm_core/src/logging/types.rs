//! Log levels, per-task log options and line markers.

use serde::{Deserialize, Serialize};

use crate::config::LoggingSettings;

/// Verbosity, ordered from most to least chatty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// What a [`TaskLogger`](super::TaskLogger) prints and keeps.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Lines below this level are dropped.
    pub level: LogLevel,
    /// Tool output goes to the tail buffer only, not the log.
    pub compact: bool,
    /// Tool output lines kept for the failure dump.
    pub error_tail: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig::from(&LoggingSettings::default())
    }
}

impl From<&LoggingSettings> for LogConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level,
            compact: settings.compact,
            error_tail: settings.error_tail.max(1),
        }
    }
}

/// Marker put in front of a task log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePrefix {
    Command,
    Phase,
    Success,
    Warning,
    Error,
    None,
}

impl MessagePrefix {
    pub fn format(&self, message: &str) -> String {
        let tag = match self {
            MessagePrefix::Command => "$",
            MessagePrefix::Success => "[SUCCESS]",
            MessagePrefix::Warning => "[WARNING]",
            MessagePrefix::Error => "[ERROR]",
            MessagePrefix::Phase => return format!("=== {} ===", message),
            MessagePrefix::None => return message.to_string(),
        };
        format!("{} {}", tag, message)
    }
}
