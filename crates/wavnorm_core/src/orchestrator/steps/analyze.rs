//! Analyze step: probe, measure, plan gains.

use std::fs;

use crate::analysis::ChannelProcessor;
use crate::models::TaskState;
use crate::orchestrator::errors::{TaskError, TaskResult, ToolStage};
use crate::orchestrator::step::TaskStep;
use crate::orchestrator::types::{Context, ProcessingTask, StepOutcome};

/// Reads the channel count, measures the peaks the variant needs and
/// records the gain plan.
pub struct AnalyzeStep;

impl AnalyzeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AnalyzeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStep for AnalyzeStep {
    fn name(&self) -> &str {
        "Analyze"
    }

    fn state(&self) -> TaskState {
        TaskState::Analyzing
    }

    fn description(&self) -> &str {
        "Probe channels and measure peak levels"
    }

    fn validate_input(&self, _ctx: &Context, task: &ProcessingTask) -> TaskResult<()> {
        fs::metadata(task.file.path())
            .map(|_| ())
            .map_err(|e| TaskError::io(task.name(), "reading input", e))
    }

    fn execute(&self, ctx: &Context, task: &mut ProcessingTask) -> TaskResult<StepOutcome> {
        let name = task.name();
        let path = task.file.path().to_path_buf();

        let probe = ctx
            .prober
            .probe(&path)
            .map_err(|e| TaskError::from_tool(&name, ToolStage::Probe, e))?;
        if probe.channels == 0 {
            return Err(TaskError::UnsupportedChannels {
                file: name,
                channels: 0,
            });
        }
        task.logger.info(&format!(
            "{} channel(s), codec {}",
            probe.channels,
            probe.codec.as_deref().unwrap_or("unknown")
        ));
        task.file.channels = Some(probe.channels);
        let channels = probe.channels;
        task.probe = Some(probe);

        if !ctx.variant.normalizes() {
            task.logger.debug("No gain in this mode, skipping measurement");
            return Ok(StepOutcome::Continue);
        }

        let analyzer = ctx.analyzer();
        let calculator = ctx.calculator();
        let to_task_err = |e| TaskError::from_tool(&name, ToolStage::Analysis, e);

        let plan = if ChannelProcessor::engaged(ctx.variant, channels) {
            let processor = ChannelProcessor::new(analyzer, calculator);
            let measured = processor.analyze(&path).map_err(to_task_err)?;
            task.logger.info(&format!(
                "Peaks: left {:.2} dB, right {:.2} dB",
                measured[0].peak_db, measured[1].peak_db
            ));
            task.analysis.extend(measured);
            processor.plan(&measured)
        } else {
            if ctx.variant.independent_channels() {
                task.logger
                    .info("Not stereo, normalizing the whole file instead");
            }
            let measured = analyzer.whole(&path).map_err(to_task_err)?;
            task.logger
                .info(&format!("Peak: {:.2} dB", measured.peak_db));
            task.analysis.push(measured);
            calculator.plan_whole(&measured)
        };

        for gain in plan.iter() {
            let side = gain.channel.map(|c| format!(" ({})", c)).unwrap_or_default();
            if gain.silent_source {
                task.logger.warn(&format!("Digital silence{}, no gain applied", side));
            } else if gain.is_noop() {
                task.logger.info(&format!(
                    "Within {} dB of target{}, gain 0",
                    plan.tolerance_db, side
                ));
            } else {
                task.logger
                    .info(&format!("Gain{}: {:+.2} dB", side, gain.gain_db));
            }
        }
        task.plan = Some(plan);

        Ok(StepOutcome::Continue)
    }

    fn validate_output(&self, ctx: &Context, task: &ProcessingTask) -> TaskResult<()> {
        if task.probe.is_none() {
            return Err(TaskError::analysis(task.name(), "channel count not recorded"));
        }
        if ctx.variant.normalizes() && task.plan.is_none() {
            return Err(TaskError::analysis(task.name(), "gain plan not recorded"));
        }
        Ok(())
    }
}
