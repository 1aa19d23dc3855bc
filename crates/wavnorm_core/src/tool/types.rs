//! Types shared by tool backends.

use std::io;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use crate::filters::FilterChain;

/// Error from invoking an external tool.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The executable could not be found.
    #[error("{tool} not found (looked for '{program}')")]
    Missing { tool: String, program: String },

    /// The process could not be started for another reason.
    #[error("Failed to run {tool}: {source}")]
    SpawnFailed {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The invocation ran past its deadline and was killed.
    #[error("{tool} did not finish within {}s", .limit.as_secs())]
    Timeout { tool: String, limit: Duration },

    /// The process exited abnormally.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// The output did not contain what was asked for.
    #[error("Failed to parse {tool} output: {message}")]
    ParseError { tool: String, message: String },

    /// File I/O error around the invocation.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl ToolError {
    pub fn missing(tool: impl Into<String>, program: impl Into<String>) -> Self {
        Self::Missing {
            tool: tool.into(),
            program: program.into(),
        }
    }

    pub fn spawn_failed(tool: impl Into<String>, source: io::Error) -> Self {
        Self::SpawnFailed {
            tool: tool.into(),
            source,
        }
    }

    pub fn timeout(tool: impl Into<String>, limit: Duration) -> Self {
        Self::Timeout {
            tool: tool.into(),
            limit,
        }
    }

    pub fn command_failed(
        tool: impl Into<String>,
        exit_code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    pub fn parse_error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Tool output worth keeping for a failure dump.
    pub fn output(&self) -> Option<&str> {
        match self {
            ToolError::CommandFailed { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Inputs for one transform invocation.
#[derive(Debug, Clone, Copy)]
pub struct TransformRequest<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub chain: &'a FilterChain,
    /// Output codec to request, when the input's should be preserved.
    pub codec: Option<&'a str>,
}

/// What a transform actually did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformReport {
    /// Offset the stream was cut at, in seconds.
    pub trimmed_at_secs: Option<f64>,
    /// The trim stage found nothing but silence and was not applied.
    pub whole_file_silent: bool,
    /// Tool diagnostics, for the task's tail buffer.
    pub output: String,
}
