//! Run driver: sweep, discover, fan out, sweep again.

use std::path::Path;
use std::sync::Arc;

use chrono::Local;

use crate::config::Settings;
use crate::discovery::discover_wav_files;
use crate::logging::LogConfig;
use crate::models::Variant;
use crate::temp::TempFileManager;
use crate::tool::{AudioTool, Prober};

use super::errors::RunError;
use super::pipeline::Pipeline;
use super::pool::WorkerPool;
use super::summary::RunSummary;
use super::types::{Context, ProcessingTask};
use super::create_standard_pipeline;

/// Normalizes every WAV file of a directory.
///
/// The Normalizer is responsible for:
/// - Checking the external tool once before touching anything
/// - Removing temp artifacts left by earlier runs
/// - Building one task per discovered file
/// - Running the tasks on the worker pool and collecting outcomes
pub struct Normalizer {
    ctx: Context,
    pool: WorkerPool,
    pipeline: Pipeline,
    log_config: LogConfig,
}

impl Normalizer {
    /// Validate settings and build the pool.
    pub fn new(
        settings: Arc<Settings>,
        variant: Variant,
        tool: Arc<dyn AudioTool>,
        prober: Arc<dyn Prober>,
    ) -> Result<Self, RunError> {
        settings.validate().map_err(RunError::InvalidConfig)?;
        let pool = WorkerPool::new(settings.workers.max_workers)?;
        let log_config = LogConfig::from(&settings.logging);

        Ok(Self {
            ctx: Context::new(settings, variant, tool, prober),
            pool,
            pipeline: create_standard_pipeline(),
            log_config,
        })
    }

    /// Use `temp` for every rename and delete of this run.
    pub fn with_temp_manager(mut self, temp: TempFileManager) -> Self {
        self.ctx.temp = temp;
        self
    }

    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Process `dir` and return the per-file outcomes.
    ///
    /// Only run-level problems are errors; a failed file is an outcome.
    pub fn run(&self, dir: &Path) -> Result<RunSummary, RunError> {
        let started_at = Local::now();

        self.ctx
            .tool
            .ensure_available()
            .map_err(RunError::ToolMissing)?;

        let before = self
            .ctx
            .temp
            .sweep(dir)
            .map_err(|e| RunError::discovery(dir, e))?;
        let files = discover_wav_files(dir).map_err(|e| RunError::discovery(dir, e))?;

        let mut summary = RunSummary {
            directory: dir.to_path_buf(),
            variant: self.ctx.variant,
            target_peak_db: self.ctx.settings.normalize.target_peak_db,
            workers: self.workers(),
            started_at,
            finished_at: started_at,
            outcomes: Vec::new(),
            swept_before: before.removed,
            swept_after: 0,
            sweep_failures: before.failed.iter().map(|e| e.to_string()).collect(),
        };

        if files.is_empty() {
            tracing::info!("No WAV files found in {}", dir.display());
            summary.finished_at = Local::now();
            return Ok(summary);
        }

        tracing::info!(
            "Processing {} file(s) with {} worker(s) [{}]",
            files.len(),
            self.workers(),
            self.ctx.variant
        );

        let tasks: Vec<ProcessingTask> = files
            .into_iter()
            .enumerate()
            .map(|(index, file)| {
                ProcessingTask::new(index, file, self.ctx.variant, self.log_config.clone())
            })
            .collect();

        summary.outcomes = self
            .pool
            .run(tasks, |task| self.pipeline.process(&self.ctx, task));

        match self.ctx.temp.sweep(dir) {
            Ok(after) => {
                summary.swept_after = after.removed;
                summary
                    .sweep_failures
                    .extend(after.failed.iter().map(|e| e.to_string()));
            }
            Err(e) => {
                tracing::warn!("Final temp sweep of {} failed: {}", dir.display(), e);
                summary.sweep_failures.push(e.to_string());
            }
        }

        summary.finished_at = Local::now();
        tracing::info!(
            "Done: {} replaced, {} unchanged, {} failed",
            summary.replaced(),
            summary.unchanged(),
            summary.failed().len()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    use tempfile::{tempdir, TempDir};

    use crate::filters::{FilterStage, SilenceTrim};
    use crate::models::{Channel, TaskState};
    use crate::orchestrator::ErrorKind;
    use crate::temp::{is_temp_name, RetryPolicy};
    use crate::testing::{Call, FakeTool, LockedFiles};

    fn settings(target: f64) -> Settings {
        let mut s = Settings::default();
        s.normalize.target_peak_db = target;
        s.workers.max_workers = 2;
        s.workers.retry_delay_ms = 1;
        s
    }

    fn normalizer(tool: &Arc<FakeTool>, variant: Variant, settings: Settings) -> Normalizer {
        Normalizer::new(Arc::new(settings), variant, tool.clone(), tool.clone()).unwrap()
    }

    fn dir_with(files: &[(&str, &[u8])]) -> TempDir {
        let dir = tempdir().unwrap();
        for (name, bytes) in files {
            fs::write(dir.path().join(name), bytes).unwrap();
        }
        dir
    }

    fn temp_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter(|e| is_temp_name(&e.as_ref().unwrap().file_name().to_string_lossy()))
            .count()
    }

    fn transforms(tool: &FakeTool) -> Vec<crate::filters::FilterChain> {
        tool.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Transform { chain, .. } => Some(chain),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn normalizes_whole_file_to_target() {
        crate::logging::init_test_tracing();
        let dir = dir_with(&[("a.wav", b"RIFF-a")]);
        let tool = Arc::new(FakeTool::new().with_peak("a.wav", None, -9.0));

        let summary = normalizer(&tool, Variant::Normalize, settings(-3.0))
            .run(dir.path())
            .unwrap();

        assert!(summary.is_success());
        let outcome = &summary.outcomes[0];
        assert_eq!(outcome.final_state, TaskState::Replaced);
        assert_eq!(
            outcome.history,
            vec![
                TaskState::Discovered,
                TaskState::Analyzing,
                TaskState::GainComputed,
                TaskState::Transforming,
                TaskState::Verifying,
                TaskState::Replaced,
            ]
        );
        assert_eq!(
            transforms(&tool)[0].stages(),
            &[FilterStage::Gain { gain_db: 6.0 }]
        );
        assert_eq!(fs::read(dir.path().join("a.wav")).unwrap(), b"RIFF-a");
        assert_eq!(temp_files(dir.path()), 0);
    }

    #[test]
    fn within_tolerance_is_left_untouched() {
        let dir = dir_with(&[("a.wav", b"RIFF-a")]);
        let tool = Arc::new(FakeTool::new().with_peak("a.wav", None, -3.05));

        let summary = normalizer(&tool, Variant::Normalize, settings(-3.0))
            .run(dir.path())
            .unwrap();

        assert!(summary.is_success());
        assert_eq!(summary.outcomes[0].final_state, TaskState::Unchanged);
        assert_eq!(tool.transform_count(), 0);
    }

    #[test]
    fn transform_failure_keeps_original_and_cleans_up() {
        let dir = dir_with(&[("bad.wav", b"original"), ("good.wav", b"fine")]);
        let tool = Arc::new(
            FakeTool::new()
                .with_peak("bad.wav", None, -9.0)
                .with_peak("good.wav", None, -9.0)
                .failing_transform("bad.wav"),
        );

        let summary = normalizer(&tool, Variant::Normalize, settings(-1.0))
            .run(dir.path())
            .unwrap();

        assert!(!summary.is_success());
        let failed = summary.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].file, "bad.wav");
        assert_eq!(failed[0].error_kind, Some(ErrorKind::Transform));
        assert_eq!(failed[0].failed_step.as_deref(), Some("Transform"));
        assert_eq!(summary.replaced(), 1);
        assert_eq!(fs::read(dir.path().join("bad.wav")).unwrap(), b"original");
        assert_eq!(temp_files(dir.path()), 0);
    }

    #[test]
    fn empty_output_fails_the_task() {
        let dir = dir_with(&[("a.wav", b"original")]);
        let tool = Arc::new(
            FakeTool::new()
                .with_peak("a.wav", None, -9.0)
                .empty_output("a.wav"),
        );

        let summary = normalizer(&tool, Variant::Normalize, settings(-1.0))
            .run(dir.path())
            .unwrap();

        let outcome = &summary.outcomes[0];
        assert_eq!(outcome.final_state, TaskState::Failed);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Transform));
        assert_eq!(outcome.failed_step.as_deref(), Some("Verify"));
        assert!(outcome.history.contains(&TaskState::Verifying));
        assert_eq!(fs::read(dir.path().join("a.wav")).unwrap(), b"original");
        assert_eq!(temp_files(dir.path()), 0);
    }

    #[test]
    fn timeout_is_its_own_kind() {
        let dir = dir_with(&[("a.wav", b"original")]);
        let tool = Arc::new(
            FakeTool::new()
                .with_peak("a.wav", None, -9.0)
                .timing_out("a.wav"),
        );

        let summary = normalizer(&tool, Variant::Normalize, settings(-1.0))
            .run(dir.path())
            .unwrap();

        assert_eq!(summary.outcomes[0].error_kind, Some(ErrorKind::Timeout));
        assert_eq!(fs::read(dir.path().join("a.wav")).unwrap(), b"original");
        assert_eq!(temp_files(dir.path()), 0);
    }

    #[test]
    fn output_off_target_is_rejected() {
        let dir = dir_with(&[("a.wav", b"original")]);
        let tool = Arc::new(
            FakeTool::new()
                .with_peak("a.wav", None, -9.0)
                .skewed_output("a.wav", 0.5),
        );

        let summary = normalizer(&tool, Variant::Normalize, settings(-1.0))
            .run(dir.path())
            .unwrap();
        assert_eq!(summary.outcomes[0].final_state, TaskState::Failed);
        assert!(summary.outcomes[0]
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("misses target"));
        assert_eq!(fs::read(dir.path().join("a.wav")).unwrap(), b"original");

        let mut lax = settings(-1.0);
        lax.normalize.verify_levels = false;
        let summary = normalizer(&tool, Variant::Normalize, lax)
            .run(dir.path())
            .unwrap();
        assert_eq!(summary.outcomes[0].final_state, TaskState::Replaced);
    }

    #[test]
    fn probe_problems_fail_only_their_file() {
        let dir = dir_with(&[("x.wav", b"x"), ("z.wav", b"z"), ("ok.wav", b"ok")]);
        let tool = Arc::new(
            FakeTool::new()
                .failing_probe("x.wav")
                .with_probe("z.wav", 0, None)
                .with_peak("ok.wav", None, -9.0),
        );

        let summary = normalizer(&tool, Variant::Normalize, settings(-1.0))
            .run(dir.path())
            .unwrap();

        let kind = |name: &str| {
            summary
                .outcomes
                .iter()
                .find(|o| o.file == name)
                .and_then(|o| o.error_kind)
        };
        assert_eq!(kind("x.wav"), Some(ErrorKind::Probe));
        assert_eq!(kind("z.wav"), Some(ErrorKind::UnsupportedChannels));
        assert_eq!(kind("ok.wav"), None);
        assert_eq!(summary.replaced(), 1);
    }

    #[test]
    fn analysis_failure_is_analysis_error() {
        let dir = dir_with(&[("a.wav", b"a")]);
        let tool = Arc::new(FakeTool::new().failing_measure("a.wav"));

        let summary = normalizer(&tool, Variant::Normalize, settings(-1.0))
            .run(dir.path())
            .unwrap();
        assert_eq!(summary.outcomes[0].error_kind, Some(ErrorKind::Analysis));
        assert_eq!(tool.transform_count(), 0);
    }

    #[test]
    fn missing_tool_stops_before_any_file() {
        let dir = dir_with(&[("a.wav", b"a"), ("___temp_v1_p1_t0_a.wav", b"old")]);
        let tool = Arc::new(FakeTool::new().missing());

        let err = normalizer(&tool, Variant::Normalize, settings(-1.0))
            .run(dir.path())
            .unwrap_err();

        assert!(matches!(err, RunError::ToolMissing(_)));
        assert!(tool.calls().is_empty());
        assert_eq!(temp_files(dir.path()), 1);
    }

    #[test]
    fn empty_directory_succeeds_with_no_outcomes() {
        let dir = tempdir().unwrap();
        let tool = Arc::new(FakeTool::new());
        let summary = normalizer(&tool, Variant::Normalize, settings(-1.0))
            .run(dir.path())
            .unwrap();
        assert!(summary.outcomes.is_empty());
        assert!(summary.is_success());
    }

    #[test]
    fn stale_artifacts_are_swept_and_never_processed() {
        let dir = dir_with(&[("a.wav", b"a"), ("___temp_v4_thread_9_a.wav_norm.wav", b"old")]);
        let tool = Arc::new(FakeTool::new().with_peak("a.wav", None, -1.0));

        let summary = normalizer(&tool, Variant::Normalize, settings(-1.0))
            .run(dir.path())
            .unwrap();

        assert_eq!(summary.swept_before, 1);
        assert_eq!(summary.outcomes.len(), 1);
        assert_eq!(temp_files(dir.path()), 0);
    }

    #[test]
    fn eight_files_four_workers() {
        let names: Vec<String> = (1..=8).map(|i| format!("t{}.wav", i)).collect();
        let dir = tempdir().unwrap();
        let mut tool = FakeTool::new().with_delay(Duration::from_millis(15));
        for name in &names {
            fs::write(dir.path().join(name), b"RIFF").unwrap();
            tool = tool.with_peak(name, None, -12.0);
        }
        let tool = Arc::new(tool.failing_transform("t3.wav"));

        let mut s = settings(-1.0);
        s.workers.max_workers = 4;
        let normalizer = normalizer(&tool, Variant::Normalize, s);
        assert_eq!(normalizer.workers(), 4);

        let summary = normalizer.run(dir.path()).unwrap();

        assert_eq!(summary.outcomes.len(), 8);
        assert!(summary.outcomes.iter().all(|o| o.final_state.is_terminal()));
        assert_eq!(summary.replaced(), 7);
        assert_eq!(summary.failed().len(), 1);
        assert!(tool.max_in_flight() <= 4);
        let order: Vec<&str> = summary.outcomes.iter().map(|o| o.file.as_str()).collect();
        assert_eq!(order, names.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn channel_mode_splits_stereo_and_not_mono() {
        let dir = dir_with(&[("lr.wav", b"stereo"), ("mono.wav", b"mono")]);
        let tool = Arc::new(
            FakeTool::new()
                .with_stereo("lr.wav", -3.0, -9.0)
                .with_probe("mono.wav", 1, Some("pcm_s24le"))
                .with_peak("mono.wav", None, -7.0),
        );

        let summary = normalizer(&tool, Variant::ChannelNormalize, settings(-1.0))
            .run(dir.path())
            .unwrap();
        assert!(summary.is_success(), "{}", summary.render_text());

        let calls = tool.calls();
        let chain_for = |name: &str| {
            calls.iter().find_map(|c| match c {
                Call::Transform { input, chain, codec, .. } if input == name => {
                    Some((chain.clone(), codec.clone()))
                }
                _ => None,
            })
        };

        let (stereo, _) = chain_for("lr.wav").unwrap();
        assert_eq!(
            stereo.stages(),
            &[FilterStage::SplitGain {
                left_db: 2.0,
                right_db: 8.0
            }]
        );
        let (mono, codec) = chain_for("mono.wav").unwrap();
        assert_eq!(mono.stages(), &[FilterStage::Gain { gain_db: 6.0 }]);
        assert_eq!(codec.as_deref(), Some("pcm_s24le"));

        assert!(calls.contains(&Call::Measure(
            "lr.wav".to_string(),
            Some(Channel::Left)
        )));
        assert!(!calls.contains(&Call::Measure("mono.wav".to_string(), Some(Channel::Left))));
    }

    #[test]
    fn trim_removes_only_the_tail() {
        let audio = b"0123456789SSSS";
        let dir = dir_with(&[("a.wav", audio)]);
        let tool = Arc::new(
            FakeTool::new()
                .with_peak("a.wav", None, -9.0)
                .with_trailing_silence("a.wav", 4),
        );

        let summary = normalizer(&tool, Variant::NormalizeTrim, settings(-1.0))
            .run(dir.path())
            .unwrap();

        assert_eq!(summary.outcomes[0].final_state, TaskState::Replaced);
        assert_eq!(summary.outcomes[0].trimmed_at_secs, Some(10.0));
        assert_eq!(fs::read(dir.path().join("a.wav")).unwrap(), b"0123456789");

        let chain = &transforms(&tool)[0];
        assert_eq!(chain.stages()[0], FilterStage::Gain { gain_db: 8.0 });
        assert_eq!(
            chain.trailing_silence(),
            Some(&SilenceTrim {
                min_duration_secs: 1.0,
                threshold_db: -50.0
            })
        );
    }

    #[test]
    fn trim_only_skips_measurement() {
        let dir = dir_with(&[("a.wav", b"abcSS")]);
        let tool = Arc::new(FakeTool::new().with_trailing_silence("a.wav", 2));

        let summary = normalizer(&tool, Variant::TrimOnly, settings(-1.0))
            .run(dir.path())
            .unwrap();

        assert_eq!(summary.outcomes[0].final_state, TaskState::Replaced);
        assert!(!tool.calls().iter().any(|c| matches!(c, Call::Measure(..))));
        assert_eq!(fs::read(dir.path().join("a.wav")).unwrap(), b"abc");
    }

    #[test]
    fn silent_source_is_never_trimmed_to_nothing() {
        let dir = dir_with(&[("quiet.wav", b"SSSS")]);
        let tool = Arc::new(
            FakeTool::new()
                .with_peak("quiet.wav", None, f64::NEG_INFINITY)
                .with_trailing_silence("quiet.wav", 4),
        );

        let summary = normalizer(&tool, Variant::NormalizeTrim, settings(-1.0))
            .run(dir.path())
            .unwrap();

        let outcome = &summary.outcomes[0];
        assert_eq!(outcome.final_state, TaskState::Unchanged);
        assert!(outcome.silent_source);
        assert_eq!(fs::read(dir.path().join("quiet.wav")).unwrap(), b"SSSS");
    }

    #[test]
    fn invalid_settings_are_rejected_up_front() {
        let tool = Arc::new(FakeTool::new());
        let mut s = settings(-1.0);
        s.normalize.tolerance_db = -1.0;
        let err = Normalizer::new(Arc::new(s), Variant::Normalize, tool.clone(), tool)
            .err()
            .unwrap();
        assert!(matches!(err, RunError::InvalidConfig(_)));
    }

    fn locked(settings: &Settings, files: &Arc<LockedFiles>) -> TempFileManager {
        TempFileManager::with_ops(RetryPolicy::from_settings(&settings.workers), files.clone())
    }

    #[test]
    fn sweep_spares_user_files_with_the_marker() {
        let stale = format!("___temp_v1_p{}_t0_a.wav", u32::MAX - 1);
        let dir = dir_with(&[
            ("a.wav", b"a"),
            ("___temp_notes.txt", b"notes"),
            ("___temp_take.wav", b"take"),
            (stale.as_str(), b"old"),
        ]);
        let tool = Arc::new(FakeTool::new().with_peak("a.wav", None, -1.0));

        let summary = normalizer(&tool, Variant::Normalize, settings(-1.0))
            .run(dir.path())
            .unwrap();

        assert_eq!(summary.swept_before, 1);
        assert_eq!(fs::read(dir.path().join("___temp_notes.txt")).unwrap(), b"notes");
        assert_eq!(fs::read(dir.path().join("___temp_take.wav")).unwrap(), b"take");
        assert!(!dir.path().join(&stale).exists());
        assert_eq!(summary.outcomes.len(), 1);
    }

    #[test]
    fn locked_original_fails_replace_and_keeps_its_bytes() {
        let dir = dir_with(&[("a.wav", b"original")]);
        let tool = Arc::new(FakeTool::new().with_peak("a.wav", None, -9.0));
        let mut s = settings(-1.0);
        s.workers.retry_attempts = 3;
        let files = Arc::new(LockedFiles::new().locking_replace_of("a.wav"));
        let temp = locked(&s, &files);

        let summary = normalizer(&tool, Variant::Normalize, s)
            .with_temp_manager(temp)
            .run(dir.path())
            .unwrap();

        let outcome = &summary.outcomes[0];
        assert_eq!(outcome.final_state, TaskState::Failed);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Replace));
        assert_eq!(outcome.failed_step.as_deref(), Some("Replace"));
        assert!(outcome.error.as_deref().unwrap_or_default().contains("3 attempt"));
        assert_eq!(files.rename_attempts(), 3);
        assert_eq!(fs::read(dir.path().join("a.wav")).unwrap(), b"original");
        assert_eq!(temp_files(dir.path()), 0);
    }

    #[test]
    fn undeletable_artifact_is_a_warning() {
        let dir = dir_with(&[("bad.wav", b"original"), ("good.wav", b"fine")]);
        let tool = Arc::new(
            FakeTool::new()
                .with_peak("bad.wav", None, -9.0)
                .with_peak("good.wav", None, -9.0)
                .failing_transform("bad.wav"),
        );
        let s = settings(-1.0);
        let files = Arc::new(LockedFiles::new().locking_artifacts_of("bad.wav"));
        let temp = locked(&s, &files);

        let summary = normalizer(&tool, Variant::Normalize, s)
            .with_temp_manager(temp)
            .run(dir.path())
            .unwrap();

        let bad = summary.outcomes.iter().find(|o| o.file == "bad.wav").unwrap();
        assert_eq!(bad.final_state, TaskState::Failed);
        assert_eq!(bad.error_kind, Some(ErrorKind::Transform));
        assert_eq!(bad.warnings.len(), 1);
        assert!(bad.warnings[0].contains("could not delete"));

        let good = summary.outcomes.iter().find(|o| o.file == "good.wav").unwrap();
        assert_eq!(good.final_state, TaskState::Replaced);
        assert!(good.warnings.is_empty());

        assert_eq!(summary.sweep_failures.len(), 1);
        assert_eq!(fs::read(dir.path().join("bad.wav")).unwrap(), b"original");
        assert_eq!(temp_files(dir.path()), 1);
    }

    #[test]
    fn silent_throughout_is_flagged_and_kept_whole() {
        let dir = dir_with(&[("hiss.wav", b"SSSS")]);
        let tool = Arc::new(
            FakeTool::new()
                .with_peak("hiss.wav", None, -60.0)
                .with_trailing_silence("hiss.wav", 4),
        );

        let summary = normalizer(&tool, Variant::NormalizeTrim, settings(-1.0))
            .run(dir.path())
            .unwrap();

        let outcome = &summary.outcomes[0];
        assert_eq!(outcome.final_state, TaskState::Replaced);
        assert!(outcome.whole_file_silent);
        assert_eq!(outcome.trimmed_at_secs, None);
        assert!(outcome.detail().contains("not trimmed"));
        assert_eq!(fs::read(dir.path().join("hiss.wav")).unwrap(), b"SSSS");
        assert!(summary
            .to_json()
            .unwrap()
            .contains("\"whole_file_silent\": true"));
    }
}
