//! wavnorm - batch peak normalization of a folder of WAV files
//!
//! Usage:
//!   wavnorm [DIR] --target -1.0 --mode channel-trim
//!   wavnorm [DIR] --check
//!   wavnorm [DIR] --move-silent

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use wavnorm_core::config::{ConfigManager, Settings};
use wavnorm_core::logging::{init_tracing, LogLevel};
use wavnorm_core::models::Variant;
use wavnorm_core::orchestrator::Normalizer;
use wavnorm_core::report::{PeakChecker, SilentSorter};
use wavnorm_core::tool::FfmpegTool;

/// Command-line arguments for wavnorm
#[derive(Parser, Debug)]
#[command(name = "wavnorm")]
#[command(about = "Peak-normalize every WAV file in a folder using ffmpeg")]
#[command(version)]
struct Args {
    /// Folder containing the WAV files
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Settings file (created with defaults if missing)
    #[arg(short, long, env = "WAVNORM_CONFIG")]
    config: Option<PathBuf>,

    /// Target peak level in dBFS
    #[arg(short, long, allow_hyphen_values = true)]
    target: Option<f64>,

    /// Deviation from the target below which a file is left as is
    #[arg(long)]
    tolerance: Option<f64>,

    /// Pipeline: normalize, normalize-trim, channel, channel-trim, trim-only
    #[arg(short, long)]
    mode: Option<Variant>,

    /// Files processed at once (0 = one per core)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Minimum trailing silence length in seconds
    #[arg(long)]
    silence_duration: Option<f64>,

    /// Silence threshold in dBFS
    #[arg(long, allow_hyphen_values = true)]
    silence_threshold: Option<f64>,

    /// ffmpeg executable
    #[arg(long, env = "WAVNORM_FFMPEG")]
    ffmpeg: Option<String>,

    /// ffprobe executable
    #[arg(long, env = "WAVNORM_FFPROBE")]
    ffprobe: Option<String>,

    /// Skip re-measuring the output before replacing the original
    #[arg(long)]
    no_verify: bool,

    /// Only report peak levels, change nothing
    #[arg(long, conflicts_with = "move_silent")]
    check: bool,

    /// Move silent files into a subfolder instead of normalizing
    #[arg(long)]
    move_silent: bool,

    /// Mean level in dBFS at or below which a file counts as silent
    #[arg(long, allow_hyphen_values = true)]
    silent_mean: Option<f64>,

    /// Write the run summary as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Also write wavnorm.log into this folder
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Debug output including full tool output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("wavnorm: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether every file ended well.
fn run(args: &Args) -> Result<bool> {
    let mut settings = load_settings(args.config.as_deref())?;
    apply_overrides(args, &mut settings);

    let log_dir = match &args.log_dir {
        Some(dir) => Some(dir.clone()),
        None if !settings.logging.log_dir.is_empty() => {
            Some(PathBuf::from(&settings.logging.log_dir))
        }
        None => None,
    };
    let _guard = init_tracing(settings.logging.level, log_dir.as_deref());

    info!("wavnorm {}", wavnorm_core::version());
    if let Some(path) = &args.config {
        info!("Settings from {}", path.display());
    }

    let tool = Arc::new(FfmpegTool::from_settings(&settings.tools));
    let dir = args.dir.as_path();

    if args.check {
        let checker = PeakChecker::new(settings.workers.max_workers, tool.clone(), tool)
            .context("Failed to set up peak check")?;
        let report = checker
            .run(dir)
            .with_context(|| format!("Peak check of {} failed", dir.display()))?;
        print!("{}", report.render_text());
        if let Some(path) = &args.report_json {
            let json = report.to_json().context("Failed to serialize report")?;
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        return Ok(report.failed() == 0);
    }

    if args.move_silent {
        let sorter = SilentSorter::new(&settings, tool).context("Failed to set up silent sort")?;
        let report = sorter
            .run(dir)
            .with_context(|| format!("Silent sort of {} failed", dir.display()))?;
        print!("{}", report.render_text());
        if let Some(path) = &args.report_json {
            let json = report.to_json().context("Failed to serialize report")?;
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        return Ok(report.failed() == 0);
    }

    let variant = settings_variant(args);
    let normalizer = Normalizer::new(Arc::new(settings), variant, tool.clone(), tool)
        .context("Failed to set up the run")?;
    let summary = normalizer
        .run(dir)
        .with_context(|| format!("Run on {} aborted", dir.display()))?;

    print!("{}", summary.render_text());
    if let Some(path) = &args.report_json {
        summary
            .write_json(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(summary.is_success())
}

fn settings_variant(args: &Args) -> Variant {
    args.mode.unwrap_or_default()
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let mut manager = ConfigManager::new(path);
    manager
        .load_or_create()
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    Ok(manager.into_settings())
}

/// Command-line values win over the settings file.
fn apply_overrides(args: &Args, settings: &mut Settings) {
    if let Some(v) = args.target {
        settings.normalize.target_peak_db = v;
    }
    if let Some(v) = args.tolerance {
        settings.normalize.tolerance_db = v;
    }
    if let Some(v) = args.workers {
        settings.workers.max_workers = v;
    }
    if let Some(v) = args.silence_duration {
        settings.silence.stop_duration_secs = v;
    }
    if let Some(v) = args.silence_threshold {
        settings.silence.stop_threshold_db = v;
    }
    if let Some(v) = args.silent_mean {
        settings.silence.silent_mean_db = v;
    }
    if let Some(v) = &args.ffmpeg {
        settings.tools.ffmpeg_path = v.clone();
    }
    if let Some(v) = &args.ffprobe {
        settings.tools.ffprobe_path = v.clone();
    }
    if args.no_verify {
        settings.normalize.verify_levels = false;
    }
    if args.verbose {
        settings.logging.level = LogLevel::Debug;
        settings.logging.compact = false;
    }
}
