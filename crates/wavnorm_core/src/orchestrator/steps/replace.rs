//! Replace step: atomic swap over the original.

use std::io;

use crate::models::TaskState;
use crate::orchestrator::errors::{TaskError, TaskResult};
use crate::orchestrator::step::TaskStep;
use crate::orchestrator::types::{Context, ProcessingTask, StepOutcome};

/// Renames the verified artifact over the original, retrying while the
/// target is locked.
pub struct ReplaceStep;

impl ReplaceStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReplaceStep {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStep for ReplaceStep {
    fn name(&self) -> &str {
        "Replace"
    }

    fn state(&self) -> TaskState {
        TaskState::Verifying
    }

    fn description(&self) -> &str {
        "Swap the verified artifact over the original"
    }

    fn validate_input(&self, _ctx: &Context, task: &ProcessingTask) -> TaskResult<()> {
        if !task.artifact.exists() {
            return Err(TaskError::transform(task.name(), "artifact vanished before replace"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, task: &mut ProcessingTask) -> TaskResult<StepOutcome> {
        ctx.temp
            .replace(&task.artifact, task.file.path())
            .map_err(|e| TaskError::replace(task.name(), e))?;
        Ok(StepOutcome::Continue)
    }

    fn validate_output(&self, _ctx: &Context, task: &ProcessingTask) -> TaskResult<()> {
        if task.artifact.exists() || !task.file.path().exists() {
            return Err(TaskError::io(
                task.name(),
                "checking replaced file",
                io::Error::other("artifact still present after rename"),
            ));
        }
        Ok(())
    }
}
