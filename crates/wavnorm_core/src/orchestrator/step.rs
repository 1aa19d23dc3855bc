//! Task step trait definition.
//!
//! All pipeline steps implement this trait, providing a consistent
//! interface for validation and execution.

use crate::models::TaskState;

use super::errors::TaskResult;
use super::types::{Context, ProcessingTask, StepOutcome};

/// Trait for pipeline steps.
///
/// The pipeline moves the task into `state()` and then calls:
///
/// 1. `validate_input` - Check preconditions before execution
/// 2. `execute` - Perform the step's work
/// 3. `validate_output` - Verify the step produced valid output
///
/// `validate_output` only runs when `execute` returned
/// `StepOutcome::Continue`.
pub trait TaskStep: Send + Sync {
    /// Get the step name (for logging and error context).
    fn name(&self) -> &str;

    /// State the task is in while this step runs.
    fn state(&self) -> TaskState;

    /// Validate inputs before execution.
    fn validate_input(&self, ctx: &Context, task: &ProcessingTask) -> TaskResult<()>;

    /// Execute the step's main work and record results on the task.
    fn execute(&self, ctx: &Context, task: &mut ProcessingTask) -> TaskResult<StepOutcome>;

    /// Validate outputs after execution.
    fn validate_output(&self, ctx: &Context, task: &ProcessingTask) -> TaskResult<()>;

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}
