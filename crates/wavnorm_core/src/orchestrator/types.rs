//! Core types for the task pipeline.

use std::sync::Arc;
use std::time::Instant;

use crate::analysis::{GainCalculator, LevelAnalyzer};
use crate::config::Settings;
use crate::filters::{FilterChain, SilenceTrimmer};
use crate::logging::{LogConfig, TaskLogger};
use crate::models::{AnalysisResult, AudioFile, GainPlan, ProbeInfo, TaskState, Variant};
use crate::temp::{RetryPolicy, TempArtifact, TempFileManager};
use crate::tool::{AudioTool, Prober, TransformReport};

/// Read-only context shared by every task of a run.
///
/// Built once before the pool starts and never mutated afterwards.
pub struct Context {
    /// Frozen settings.
    pub settings: Arc<Settings>,
    /// Pipeline variant for this run.
    pub variant: Variant,
    /// Measure/transform backend.
    pub tool: Arc<dyn AudioTool>,
    /// Channel count backend.
    pub prober: Arc<dyn Prober>,
    /// Rename/delete with retry.
    pub temp: TempFileManager,
}

impl Context {
    pub fn new(
        settings: Arc<Settings>,
        variant: Variant,
        tool: Arc<dyn AudioTool>,
        prober: Arc<dyn Prober>,
    ) -> Self {
        let temp = TempFileManager::new(RetryPolicy::from_settings(&settings.workers));
        Self {
            settings,
            variant,
            tool,
            prober,
            temp,
        }
    }

    pub fn analyzer(&self) -> LevelAnalyzer<'_> {
        LevelAnalyzer::new(self.tool.as_ref())
    }

    pub fn calculator(&self) -> GainCalculator {
        GainCalculator::from_settings(&self.settings.normalize)
    }

    /// Trimmer for variants that cut trailing silence.
    pub fn trimmer(&self) -> Option<SilenceTrimmer> {
        self.variant
            .trims_silence()
            .then(|| SilenceTrimmer::from_settings(&self.settings.silence))
    }
}

/// What a step tells the pipeline after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Proceed to the next step.
    Continue,
    /// Stop here in the given terminal state.
    Finish(TaskState),
}

/// One file moving through the pipeline.
///
/// Owns its temp artifact slot and everything the steps record. Nothing
/// in here is shared with other tasks.
pub struct ProcessingTask {
    /// Position in the discovery order; also keys the temp slot.
    pub index: usize,
    pub file: AudioFile,
    pub artifact: TempArtifact,
    pub logger: TaskLogger,
    state: TaskState,
    history: Vec<TaskState>,
    /// Stream info (Analyze step).
    pub probe: Option<ProbeInfo>,
    /// Measurements (Analyze step).
    pub analysis: Vec<AnalysisResult>,
    /// Gains (Analyze step). `None` for variants without gain.
    pub plan: Option<GainPlan>,
    /// Composed stages (Compose step).
    pub chain: Option<FilterChain>,
    /// Transform details (Transform step).
    pub transform: Option<TransformReport>,
    /// Non-fatal problems, such as a temp file that would not delete.
    pub warnings: Vec<String>,
    /// Name of the step that failed the task.
    pub failed_step: Option<String>,
    started: Instant,
}

impl ProcessingTask {
    pub fn new(index: usize, file: AudioFile, variant: Variant, log_config: LogConfig) -> Self {
        let artifact = TempArtifact::for_task(file.path(), variant, index);
        let logger = TaskLogger::new(file.file_name(), log_config);
        Self {
            index,
            file,
            artifact,
            logger,
            state: TaskState::Discovered,
            history: vec![TaskState::Discovered],
            probe: None,
            analysis: Vec::new(),
            plan: None,
            chain: None,
            transform: None,
            warnings: Vec::new(),
            failed_step: None,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Every state the task has been in, in order.
    pub fn history(&self) -> &[TaskState] {
        &self.history
    }

    /// Move to `next`. Only edges of the state machine are allowed.
    pub fn advance(&mut self, next: TaskState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        self.logger.phase(&next.to_string());
        self.state = next;
        self.history.push(next);
    }

    pub fn name(&self) -> String {
        self.file.file_name()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}
