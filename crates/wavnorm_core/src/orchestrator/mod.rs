//! Pipeline orchestration.
//!
//! Every discovered file becomes a [`ProcessingTask`] that a [`Pipeline`]
//! drives through a strict state machine:
//!
//! ```text
//! Discovered → Analyzing → GainComputed → Transforming → Verifying → Replaced
//!                               └──────→ Unchanged
//! (any non-terminal state) → Failed
//! ```
//!
//! The [`Normalizer`] fans tasks out over a bounded [`WorkerPool`] and
//! collects a [`RunSummary`]. Tasks share nothing but the read-only
//! [`Context`]; a failed task never affects its siblings.

mod errors;
mod normalizer;
mod pipeline;
mod pool;
mod step;
pub mod steps;
mod summary;
mod types;

pub use errors::{ErrorKind, RunError, TaskError, TaskResult, ToolStage};
pub use normalizer::Normalizer;
pub use pipeline::Pipeline;
pub use pool::{resolve_workers, WorkerPool};
pub use step::TaskStep;
pub use summary::{RunSummary, TaskOutcome};
pub use types::{Context, ProcessingTask, StepOutcome};

use steps::{AnalyzeStep, ComposeStep, ReplaceStep, TransformStep, VerifyStep};

/// Create the standard processing pipeline.
///
/// Steps:
/// 1. Analyze - probe channels, measure peaks, plan gains
/// 2. Compose - build the filter chain (may finish as Unchanged)
/// 3. Transform - write the temp artifact
/// 4. Verify - artifact exists, is non-empty, hits the target
/// 5. Replace - atomic swap over the original
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(AnalyzeStep::new())
        .with_step(ComposeStep::new())
        .with_step(TransformStep::new())
        .with_step(VerifyStep::new())
        .with_step(ReplaceStep::new())
}
