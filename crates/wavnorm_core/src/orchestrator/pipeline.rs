//! Pipeline runner that drives one task through its steps.

use crate::models::TaskState;

use super::errors::{TaskError, TaskResult};
use super::step::TaskStep;
use super::summary::TaskOutcome;
use super::types::{Context, ProcessingTask, StepOutcome};

/// Pipeline that runs a sequence of steps against one task.
///
/// Before each step the task is moved into the step's state, so the
/// state history always follows the state machine. Any error moves the
/// task straight to `Failed` and discards its temp artifact.
pub struct Pipeline {
    steps: Vec<Box<dyn TaskStep>>,
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Add a step to the pipeline.
    pub fn add_step<S: TaskStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: TaskStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Get the number of steps in the pipeline.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Get step names in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run the steps and return the terminal success state.
    ///
    /// On error the task is left in the state where it failed, with
    /// `failed_step` set; use [`Pipeline::process`] for the full failure
    /// handling.
    pub fn run(&self, ctx: &Context, task: &mut ProcessingTask) -> TaskResult<TaskState> {
        for step in &self.steps {
            if task.state() != step.state() {
                task.advance(step.state());
            }

            match self.run_step(step.as_ref(), ctx, task) {
                Ok(StepOutcome::Continue) => {}
                Ok(StepOutcome::Finish(state)) => {
                    task.advance(state);
                    return Ok(state);
                }
                Err(err) => {
                    task.failed_step = Some(step.name().to_string());
                    return Err(err);
                }
            }
        }

        task.advance(TaskState::Replaced);
        Ok(TaskState::Replaced)
    }

    fn run_step(
        &self,
        step: &dyn TaskStep,
        ctx: &Context,
        task: &mut ProcessingTask,
    ) -> TaskResult<StepOutcome> {
        let step_name = step.name();
        task.logger
            .debug(&format!("{}: {}", step_name, step.description()));

        step.validate_input(ctx, task)?;
        let outcome = step.execute(ctx, task)?;
        if outcome == StepOutcome::Continue {
            task.logger
                .debug(&format!("Validating output for '{}'", step_name));
            step.validate_output(ctx, task)?;
        }
        Ok(outcome)
    }

    /// Run a task to a terminal state and record its outcome.
    ///
    /// Failures stay inside the task: the artifact is discarded, a delete
    /// that keeps failing is kept as a warning, and the original file is
    /// never touched.
    pub fn process(&self, ctx: &Context, mut task: ProcessingTask) -> TaskOutcome {
        task.logger.info(&format!("Processing ({})", ctx.variant));

        match self.run(ctx, &mut task) {
            Ok(TaskState::Unchanged) => {
                task.logger.success("Already at target, left untouched");
                TaskOutcome::from_task(task, None)
            }
            Ok(_) => {
                task.logger.success("Replaced original");
                TaskOutcome::from_task(task, None)
            }
            Err(err) => {
                self.fail(ctx, &mut task, &err);
                TaskOutcome::from_task(task, Some(&err))
            }
        }
    }

    fn fail(&self, ctx: &Context, task: &mut ProcessingTask, err: &TaskError) {
        let step = task.failed_step.as_deref().unwrap_or("pipeline");
        task.logger.error(&format!(
            "Failed in step '{}' while {}: {}",
            step,
            task.state(),
            err
        ));
        task.advance(TaskState::Failed);
        task.logger.show_tail("tool output");

        match ctx.temp.discard(&task.artifact) {
            Ok(true) => task.logger.debug("Removed temp artifact"),
            Ok(false) => {}
            Err(cleanup) => {
                task.logger.warn(&cleanup.to_string());
                task.warnings.push(cleanup.to_string());
            }
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
