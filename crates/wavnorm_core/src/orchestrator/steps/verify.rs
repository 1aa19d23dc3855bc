//! Verify step: the artifact is usable and hits the target.

use crate::models::TaskState;
use crate::orchestrator::errors::{TaskError, TaskResult, ToolStage};
use crate::orchestrator::step::TaskStep;
use crate::orchestrator::types::{Context, ProcessingTask, StepOutcome};

/// Slack for float noise when comparing a re-measured peak.
const LEVEL_EPSILON_DB: f64 = 1e-9;

/// Checks the artifact before it may replace the original.
///
/// The artifact must exist and be non-empty. With `verify_levels`, each
/// non-silent gain is re-measured on the artifact and must land within
/// tolerance of the target.
pub struct VerifyStep;

impl VerifyStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for VerifyStep {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStep for VerifyStep {
    fn name(&self) -> &str {
        "Verify"
    }

    fn state(&self) -> TaskState {
        TaskState::Verifying
    }

    fn description(&self) -> &str {
        "Check the temp artifact before replacing the original"
    }

    fn validate_input(&self, ctx: &Context, task: &ProcessingTask) -> TaskResult<()> {
        let size = ctx
            .temp
            .verify_output(&task.artifact)
            .map_err(|e| TaskError::transform(task.name(), e.to_string()))?;
        task.logger.debug(&format!("Artifact is {} bytes", size));
        Ok(())
    }

    fn execute(&self, ctx: &Context, task: &mut ProcessingTask) -> TaskResult<StepOutcome> {
        let Some(plan) = task.plan else {
            return Ok(StepOutcome::Continue);
        };
        if !ctx.settings.normalize.verify_levels {
            task.logger.debug("Level verification disabled");
            return Ok(StepOutcome::Continue);
        }

        let name = task.name();
        let analyzer = ctx.analyzer();
        for gain in plan.iter().filter(|g| !g.silent_source) {
            let measured = match gain.channel {
                Some(ch) => analyzer.channel(task.artifact.path(), ch),
                None => analyzer.whole(task.artifact.path()),
            }
            .map_err(|e| TaskError::from_tool(&name, ToolStage::Verify, e))?;

            let miss = (measured.peak_db - plan.target_peak_db).abs();
            let side = gain.channel.map(|c| format!(" ({})", c)).unwrap_or_default();
            if miss > plan.tolerance_db + LEVEL_EPSILON_DB {
                return Err(TaskError::transform(
                    &name,
                    format!(
                        "output peak{} {:.2} dB misses target {:.2} dB by {:.2} dB",
                        side, measured.peak_db, plan.target_peak_db, miss
                    ),
                ));
            }
            task.logger
                .info(&format!("Output peak{}: {:.2} dB", side, measured.peak_db));
        }

        Ok(StepOutcome::Continue)
    }

    fn validate_output(&self, _ctx: &Context, _task: &ProcessingTask) -> TaskResult<()> {
        Ok(())
    }
}
