//! Compose step: build the filter chain.

use crate::analysis::gain_stage;
use crate::filters::FilterChain;
use crate::models::TaskState;
use crate::orchestrator::errors::{TaskError, TaskResult};
use crate::orchestrator::step::TaskStep;
use crate::orchestrator::types::{Context, ProcessingTask, StepOutcome};

/// Turns the gain plan and the variant's trim setting into a chain.
///
/// An empty chain means there is nothing to do: the task finishes as
/// `Unchanged` and the original is never rewritten.
pub struct ComposeStep;

impl ComposeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ComposeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStep for ComposeStep {
    fn name(&self) -> &str {
        "Compose"
    }

    fn state(&self) -> TaskState {
        TaskState::GainComputed
    }

    fn description(&self) -> &str {
        "Build the gain and trim filter chain"
    }

    fn validate_input(&self, ctx: &Context, task: &ProcessingTask) -> TaskResult<()> {
        if ctx.variant.normalizes() && task.plan.is_none() {
            return Err(TaskError::analysis(task.name(), "no gain plan to compose"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, task: &mut ProcessingTask) -> TaskResult<StepOutcome> {
        let mut chain = FilterChain::new();
        let silent = task.plan.map(|p| p.is_silent_source()).unwrap_or(false);

        if let Some(stage) = task.plan.as_ref().and_then(gain_stage) {
            chain.push(stage);
        }
        if let Some(trimmer) = ctx.trimmer() {
            if !trimmer.apply(&mut chain, silent) {
                task.logger
                    .warn("Source is digital silence, trailing-silence trim skipped");
            }
        }

        if chain.is_empty() {
            task.logger.info("Nothing to apply");
            task.chain = Some(chain);
            return Ok(StepOutcome::Finish(TaskState::Unchanged));
        }

        task.logger.info(&format!("Chain: {}", chain));
        task.chain = Some(chain);
        Ok(StepOutcome::Continue)
    }

    fn validate_output(&self, _ctx: &Context, task: &ProcessingTask) -> TaskResult<()> {
        match &task.chain {
            Some(chain) if !chain.is_empty() => Ok(()),
            _ => Err(TaskError::transform(task.name(), "filter chain not composed")),
        }
    }
}
