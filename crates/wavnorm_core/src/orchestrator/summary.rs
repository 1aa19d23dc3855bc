//! Per-file outcomes and the run summary.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::models::{GainPlan, GainSet, TaskState, Variant};

use super::errors::{ErrorKind, TaskError};
use super::types::ProcessingTask;

/// Final record of one task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub file: String,
    pub path: PathBuf,
    pub final_state: TaskState,
    pub history: Vec<TaskState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<GainPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trimmed_at_secs: Option<f64>,
    pub silent_source: bool,
    /// Trim requested but the whole file is silence, so nothing was cut.
    pub whole_file_silent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub elapsed_ms: u64,
}

impl TaskOutcome {
    /// Consume a finished task.
    pub fn from_task(task: ProcessingTask, error: Option<&TaskError>) -> Self {
        let elapsed_ms = task.elapsed_ms();
        Self {
            file: task.name(),
            final_state: task.state(),
            history: task.history().to_vec(),
            channels: task.file.channels,
            silent_source: task.plan.map(|p| p.is_silent_source()).unwrap_or(false),
            plan: task.plan,
            chain: task.chain.as_ref().map(|c| c.to_string()),
            trimmed_at_secs: task.transform.as_ref().and_then(|t| t.trimmed_at_secs),
            whole_file_silent: task
                .transform
                .as_ref()
                .map_or(false, |t| t.whole_file_silent),
            error: error.map(|e| e.to_string()),
            error_kind: error.map(TaskError::kind),
            failed_step: task.failed_step,
            warnings: task.warnings,
            path: task.file.path,
            elapsed_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.final_state.is_success()
    }

    /// One-line description of what happened.
    pub fn detail(&self) -> String {
        if let Some(err) = &self.error {
            return err.clone();
        }

        let mut parts = Vec::new();
        if self.silent_source {
            parts.push("silent source".to_string());
        } else if let Some(plan) = &self.plan {
            match plan.gains {
                GainSet::Whole(g) => parts.push(format!("gain {:+.2} dB", g.gain_db)),
                GainSet::Stereo { left, right } => parts.push(format!(
                    "gain L {:+.2} dB, R {:+.2} dB",
                    left.gain_db, right.gain_db
                )),
            }
        }
        if let Some(at) = self.trimmed_at_secs {
            parts.push(format!("trimmed at {:.2}s", at));
        }
        if self.whole_file_silent {
            parts.push("silent throughout, not trimmed".to_string());
        }
        if self.final_state == TaskState::Unchanged {
            parts.push("left untouched".to_string());
        }
        parts.join(", ")
    }
}

/// Summary of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub directory: PathBuf,
    pub variant: Variant,
    pub target_peak_db: f64,
    pub workers: usize,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub outcomes: Vec<TaskOutcome>,
    /// Leftover temp files removed before discovery.
    pub swept_before: usize,
    /// Temp files removed after the pool drained.
    pub swept_after: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sweep_failures: Vec<String>,
}

impl RunSummary {
    pub fn replaced(&self) -> usize {
        self.count(TaskState::Replaced)
    }

    pub fn unchanged(&self) -> usize {
        self.count(TaskState::Unchanged)
    }

    pub fn failed(&self) -> Vec<&TaskOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success()).collect()
    }

    fn count(&self, state: TaskState) -> usize {
        self.outcomes.iter().filter(|o| o.final_state == state).count()
    }

    /// Every task ended in `Replaced` or `Unchanged`.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(TaskOutcome::is_success)
    }

    pub fn elapsed_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// Human-readable report, one line per file.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} file(s) in {} [{}, target {:.1} dB, {} worker(s)]",
            self.outcomes.len(),
            self.directory.display(),
            self.variant,
            self.target_peak_db,
            self.workers
        );

        for outcome in &self.outcomes {
            let _ = writeln!(
                out,
                "  {:<10} {}  {}",
                outcome.final_state.to_string(),
                outcome.file,
                outcome.detail()
            );
            for warning in &outcome.warnings {
                let _ = writeln!(out, "  {:<10} {}  warning: {}", "", outcome.file, warning);
            }
        }

        if self.swept_before + self.swept_after > 0 {
            let _ = writeln!(
                out,
                "Removed {} leftover temp file(s)",
                self.swept_before + self.swept_after
            );
        }
        for failure in &self.sweep_failures {
            let _ = writeln!(out, "warning: {}", failure);
        }

        let _ = write!(
            out,
            "Result: {} replaced, {} unchanged, {} failed ({:.2}s)",
            self.replaced(),
            self.unchanged(),
            self.failed().len(),
            self.elapsed_secs()
        );
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the JSON report to `path`.
    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(io::Error::other)?;
        fs::write(path, json)
    }
}
