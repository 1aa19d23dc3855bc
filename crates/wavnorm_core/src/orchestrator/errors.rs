//! Error types for the orchestrator.
//!
//! Errors carry context that chains through layers:
//! Run → Task (file) → Tool invocation → Detail

use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::temp::RetryError;
use crate::tool::ToolError;

/// Fatal error that stops the whole run before or between tasks.
#[derive(Error, Debug)]
pub enum RunError {
    /// The external tool cannot be run. No file is touched.
    #[error("External tool unavailable: {0}")]
    ToolMissing(#[source] ToolError),

    /// The working directory could not be listed.
    #[error("Cannot read directory {}: {source}", .path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    Pool(String),

    /// Settings failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RunError {
    pub fn discovery(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Discovery {
            path: path.into(),
            source,
        }
    }
}

/// Which part of a task an external invocation belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStage {
    Probe,
    Analysis,
    Transform,
    Verify,
}

impl fmt::Display for ToolStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolStage::Probe => "probe",
            ToolStage::Analysis => "analysis",
            ToolStage::Transform => "transform",
            ToolStage::Verify => "verification",
        };
        write!(f, "{}", name)
    }
}

/// Error kind recorded in task outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ToolMissing,
    Analysis,
    Transform,
    Replace,
    Timeout,
    Probe,
    UnsupportedChannels,
    Io,
}

/// Error that fails a single task. Never escapes the task boundary.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The tool disappeared mid-run.
    #[error("{tool} is not available: {message}")]
    ToolMissing { tool: String, message: String },

    /// A measurement could not be taken or parsed.
    #[error("Analysis of '{file}' failed: {message}")]
    Analysis { file: String, message: String },

    /// The transform failed or left no usable output.
    #[error("Transform of '{file}' failed: {message}")]
    Transform { file: String, message: String },

    /// The atomic swap did not complete.
    #[error("Could not replace '{file}' after {attempts} attempt(s): {source}")]
    Replace {
        file: String,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    /// A bounded invocation ran past its deadline.
    #[error("'{file}' timed out during {stage} after {secs}s")]
    Timeout {
        file: String,
        stage: String,
        secs: u64,
    },

    /// The channel count could not be read.
    #[error("Could not read channel count of '{file}': {message}")]
    Probe { file: String, message: String },

    /// The probe reported a channel layout the pipeline cannot process.
    #[error("'{file}' reports {channels} audio channels")]
    UnsupportedChannels { file: String, channels: u16 },

    /// File I/O error.
    #[error("I/O error on '{file}' in {operation}: {source}")]
    Io {
        file: String,
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl TaskError {
    /// Map a tool failure to the task taxonomy.
    ///
    /// Missing tools and timeouts keep their own kind; anything else is
    /// charged to the stage that made the call.
    pub fn from_tool(file: impl Into<String>, stage: ToolStage, err: ToolError) -> Self {
        let file = file.into();
        match err {
            ToolError::Missing { tool, program } => Self::ToolMissing {
                tool,
                message: format!("'{}' could not be found", program),
            },
            ToolError::Timeout { limit, .. } => Self::Timeout {
                file,
                stage: stage.to_string(),
                secs: limit.as_secs(),
            },
            other => {
                let message = other.to_string();
                match stage {
                    ToolStage::Probe => Self::Probe { file, message },
                    ToolStage::Analysis => Self::Analysis { file, message },
                    ToolStage::Transform | ToolStage::Verify => Self::Transform { file, message },
                }
            }
        }
    }

    pub fn analysis(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Analysis {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn transform(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn replace(file: impl Into<String>, err: RetryError) -> Self {
        Self::Replace {
            file: file.into(),
            attempts: err.attempts,
            source: err.source,
        }
    }

    pub fn io(file: impl Into<String>, operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            file: file.into(),
            operation: operation.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TaskError::ToolMissing { .. } => ErrorKind::ToolMissing,
            TaskError::Analysis { .. } => ErrorKind::Analysis,
            TaskError::Transform { .. } => ErrorKind::Transform,
            TaskError::Replace { .. } => ErrorKind::Replace,
            TaskError::Timeout { .. } => ErrorKind::Timeout,
            TaskError::Probe { .. } => ErrorKind::Probe,
            TaskError::UnsupportedChannels { .. } => ErrorKind::UnsupportedChannels,
            TaskError::Io { .. } => ErrorKind::Io,
        }
    }
}

/// Result type for task steps.
pub type TaskResult<T> = Result<T, TaskError>;
