//! Transform step: write the temp artifact.

use crate::models::TaskState;
use crate::orchestrator::errors::{TaskError, TaskResult, ToolStage};
use crate::orchestrator::step::TaskStep;
use crate::orchestrator::types::{Context, ProcessingTask, StepOutcome};
use crate::tool::TransformRequest;

/// Runs the chain from the original into the task's temp slot.
pub struct TransformStep;

impl TransformStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TransformStep {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStep for TransformStep {
    fn name(&self) -> &str {
        "Transform"
    }

    fn state(&self) -> TaskState {
        TaskState::Transforming
    }

    fn description(&self) -> &str {
        "Apply the filter chain into a temp artifact"
    }

    fn validate_input(&self, ctx: &Context, task: &ProcessingTask) -> TaskResult<()> {
        if task.chain.is_none() {
            return Err(TaskError::transform(task.name(), "no filter chain"));
        }
        // A slot left behind by a crashed task with the same pid and index.
        if task.artifact.exists() {
            ctx.temp
                .discard(&task.artifact)
                .map_err(|e| TaskError::io(task.name(), "clearing temp slot", e.source))?;
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, task: &mut ProcessingTask) -> TaskResult<StepOutcome> {
        let name = task.name();
        let chain = task
            .chain
            .as_ref()
            .ok_or_else(|| TaskError::transform(&name, "no filter chain"))?;

        let codec = task
            .probe
            .as_ref()
            .and_then(|p| p.preserved_codec())
            .map(str::to_string);
        let request = TransformRequest {
            input: task.file.path(),
            output: task.artifact.path(),
            chain,
            codec: codec.as_deref(),
        };

        task.logger.command(&format!(
            "{} transform -> {}",
            ctx.tool.name(),
            task.artifact.path().display()
        ));

        match ctx.tool.transform(&request) {
            Ok(report) => {
                task.logger.output_block(&report.output);
                if report.whole_file_silent {
                    task.logger
                        .warn("Whole file is below the silence threshold, nothing trimmed");
                }
                if let Some(at) = report.trimmed_at_secs {
                    task.logger
                        .info(&format!("Trailing silence cut at {:.3}s", at));
                }
                task.transform = Some(report);
                Ok(StepOutcome::Continue)
            }
            Err(e) => {
                if let Some(output) = e.output() {
                    task.logger.output_block(output);
                }
                Err(TaskError::from_tool(name, ToolStage::Transform, e))
            }
        }
    }

    fn validate_output(&self, _ctx: &Context, task: &ProcessingTask) -> TaskResult<()> {
        if task.transform.is_none() {
            return Err(TaskError::transform(task.name(), "transform not recorded"));
        }
        Ok(())
    }
}
