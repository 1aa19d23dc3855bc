//! Run settings, one TOML table per section.
//!
//! Every field has a default so a partial file loads.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;

/// Everything a run can be configured with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// External tool locations and deadlines.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Peak normalization targets.
    #[serde(default)]
    pub normalize: NormalizeSettings,

    /// Trailing-silence trim parameters.
    #[serde(default)]
    pub silence: SilenceSettings,

    /// Worker pool and retry policy.
    #[serde(default)]
    pub workers: WorkerSettings,

    /// Log level, tool output handling, log file.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Check values that serde cannot check on its own.
    pub fn validate(&self) -> Result<(), String> {
        let n = &self.normalize;
        if !n.target_peak_db.is_finite() {
            return Err(format!("target_peak_db must be finite, got {}", n.target_peak_db));
        }
        if n.target_peak_db > 0.0 {
            return Err(format!(
                "target_peak_db must be at or below 0 dBFS, got {}",
                n.target_peak_db
            ));
        }
        if !n.tolerance_db.is_finite() || n.tolerance_db < 0.0 {
            return Err(format!("tolerance_db must be >= 0, got {}", n.tolerance_db));
        }

        let s = &self.silence;
        if !s.stop_duration_secs.is_finite() || s.stop_duration_secs <= 0.0 {
            return Err(format!(
                "stop_duration_secs must be > 0, got {}",
                s.stop_duration_secs
            ));
        }
        if !s.stop_threshold_db.is_finite() {
            return Err(format!(
                "stop_threshold_db must be finite, got {}",
                s.stop_threshold_db
            ));
        }
        if !s.silent_mean_db.is_finite() {
            return Err(format!("silent_mean_db must be finite, got {}", s.silent_mean_db));
        }
        let dir = s.silent_dir.trim();
        if dir.is_empty() || matches!(dir, "." | "..") || dir.contains(['/', '\\']) {
            return Err(format!(
                "silent_dir must be a plain folder name, got '{}'",
                s.silent_dir
            ));
        }

        let w = &self.workers;
        if w.retry_attempts == 0 {
            return Err("retry_attempts must be at least 1".to_string());
        }
        if !w.retry_backoff.is_finite() || w.retry_backoff < 1.0 {
            return Err(format!("retry_backoff must be >= 1.0, got {}", w.retry_backoff));
        }

        if self.tools.ffmpeg_path.trim().is_empty() || self.tools.ffprobe_path.trim().is_empty() {
            return Err("tool paths must not be empty".to_string());
        }

        Ok(())
    }
}

/// External tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// ffmpeg executable (name on PATH or absolute path).
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,

    /// ffprobe executable (name on PATH or absolute path).
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,

    /// Deadline for one measurement, in seconds. 0 disables the bound.
    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_secs: u64,

    /// Deadline for one transform, in seconds. 0 disables the bound.
    #[serde(default = "default_transform_timeout")]
    pub transform_timeout_secs: u64,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_analysis_timeout() -> u64 {
    60
}

fn default_transform_timeout() -> u64 {
    300
}

impl ToolSettings {
    /// Measurement deadline, if bounded.
    pub fn analysis_timeout(&self) -> Option<Duration> {
        bound(self.analysis_timeout_secs)
    }

    /// Transform deadline, if bounded.
    pub fn transform_timeout(&self) -> Option<Duration> {
        bound(self.transform_timeout_secs)
    }
}

fn bound(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            analysis_timeout_secs: default_analysis_timeout(),
            transform_timeout_secs: default_transform_timeout(),
        }
    }
}

/// Peak normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeSettings {
    /// Target peak in dBFS (e.g., -1, -3, -6).
    #[serde(default = "default_target_peak")]
    pub target_peak_db: f64,

    /// Deviation from the target that counts as already normalized.
    #[serde(default = "default_tolerance")]
    pub tolerance_db: f64,

    /// Re-measure the temp artifact before it replaces the original.
    #[serde(default = "default_true")]
    pub verify_levels: bool,
}

fn default_target_peak() -> f64 {
    -1.0
}

fn default_tolerance() -> f64 {
    0.1
}

fn default_true() -> bool {
    true
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self {
            target_peak_db: default_target_peak(),
            tolerance_db: default_tolerance(),
            verify_levels: default_true(),
        }
    }
}

/// Trailing-silence trim settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SilenceSettings {
    /// Minimum length of the trailing region, in seconds.
    #[serde(default = "default_stop_duration")]
    pub stop_duration_secs: f64,

    /// Level below which audio counts as silence, in dBFS.
    #[serde(default = "default_stop_threshold")]
    pub stop_threshold_db: f64,

    /// Files whose mean level is at or below this are silent takes.
    #[serde(default = "default_silent_mean")]
    pub silent_mean_db: f64,

    /// Subfolder silent takes are moved into.
    #[serde(default = "default_silent_dir")]
    pub silent_dir: String,
}

fn default_stop_duration() -> f64 {
    1.0
}

fn default_stop_threshold() -> f64 {
    -50.0
}

fn default_silent_mean() -> f64 {
    -80.0
}

fn default_silent_dir() -> String {
    "SilentAudio".to_string()
}

impl Default for SilenceSettings {
    fn default() -> Self {
        Self {
            stop_duration_secs: default_stop_duration(),
            stop_threshold_db: default_stop_threshold(),
            silent_mean_db: default_silent_mean(),
            silent_dir: default_silent_dir(),
        }
    }
}

/// Worker pool and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Maximum concurrent tasks. 0 uses the logical core count.
    #[serde(default)]
    pub max_workers: usize,

    /// Attempts for a locked rename or delete before giving up.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay before the second attempt, in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Multiplier applied to the delay after each failed attempt.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff: f64,
}

fn default_retry_attempts() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    100
}

fn default_retry_backoff() -> f64 {
    2.0
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            max_workers: 0,
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay(),
            retry_backoff: default_retry_backoff(),
        }
    }
}

/// `[logging]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level written to the console.
    #[serde(default)]
    pub level: LogLevel,

    /// Keep external tool output out of the log unless a task fails.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines shown when a task fails.
    #[serde(default = "default_error_tail")]
    pub error_tail: usize,

    /// Directory for a run log file. Empty disables file logging.
    #[serde(default)]
    pub log_dir: String,
}

fn default_error_tail() -> usize {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: default_true(),
            error_tail: default_error_tail(),
            log_dir: String::new(),
        }
    }
}
