//! Silent take sorting: move WAVs whose mean level says "nothing
//! recorded" into a subfolder, leaving the rest in place.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::analysis::LevelAnalyzer;
use crate::config::Settings;
use crate::discovery::discover_wav_files;
use crate::models::AudioFile;
use crate::orchestrator::{RunError, WorkerPool};
use crate::temp::{RetryPolicy, TempFileManager};
use crate::tool::{AudioTool, ToolResult};

use super::format_db;

/// Mean level and fate of one file.
#[derive(Debug, Clone, Serialize)]
pub struct SilentEntry {
    pub file: String,
    pub mean_db: Option<f64>,
    pub silent: bool,
    pub moved_to: Option<PathBuf>,
    pub error: Option<String>,
}

impl SilentEntry {
    fn line(&self, folder: &str) -> String {
        if let Some(err) = &self.error {
            return format!("{}: error: {}", self.file, err);
        }
        let fate = if self.moved_to.is_some() {
            format!("moved to {}/", folder)
        } else {
            "kept".to_string()
        };
        format!("{}: mean {}, {}", self.file, format_db(self.mean_db), fate)
    }
}

/// Result of a silent sort run, in natural name order.
#[derive(Debug, Clone, Serialize)]
pub struct SilentReport {
    pub directory: PathBuf,
    pub folder: String,
    pub threshold_db: f64,
    pub entries: Vec<SilentEntry>,
}

impl SilentReport {
    pub fn moved(&self) -> usize {
        self.entries.iter().filter(|e| e.moved_to.is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|e| e.error.is_some()).count()
    }

    pub fn render_text(&self) -> String {
        let mut out = format!("Silent sort: {}\n", self.directory.display());
        if self.entries.is_empty() {
            out.push_str("No WAV files found\n");
            return out;
        }
        for (i, entry) in self.entries.iter().enumerate() {
            let _ = writeln!(out, "{:03}. {}", i + 1, entry.line(&self.folder));
        }
        let _ = writeln!(
            out,
            "Moved {} of {} file(s) to {}/",
            self.moved(),
            self.entries.len(),
            self.folder
        );
        if self.failed() > 0 {
            let _ = writeln!(out, "{} file(s) could not be checked or moved", self.failed());
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// No reading at all, digital silence, or a mean at or below `threshold_db`.
pub fn is_silent(mean_db: Option<f64>, threshold_db: f64) -> bool {
    mean_db.map_or(true, |db| db <= threshold_db)
}

/// Measures mean levels on the worker pool, then moves silent files.
pub struct SilentSorter {
    tool: Arc<dyn AudioTool>,
    pool: WorkerPool,
    temp: TempFileManager,
    threshold_db: f64,
    folder: String,
}

impl SilentSorter {
    pub fn new(settings: &Settings, tool: Arc<dyn AudioTool>) -> Result<Self, RunError> {
        settings.validate().map_err(RunError::InvalidConfig)?;
        Ok(Self {
            tool,
            pool: WorkerPool::new(settings.workers.max_workers)?,
            temp: TempFileManager::new(RetryPolicy::from_settings(&settings.workers)),
            threshold_db: settings.silence.silent_mean_db,
            folder: settings.silence.silent_dir.trim().to_string(),
        })
    }

    /// Use `temp` for moving files.
    pub fn with_temp_manager(mut self, temp: TempFileManager) -> Self {
        self.temp = temp;
        self
    }

    /// Measure every discovered WAV in `dir` and move the silent ones.
    ///
    /// Measuring runs in parallel. Moves run one at a time afterwards so
    /// the destination folder is only created when something goes there.
    pub fn run(&self, dir: &Path) -> Result<SilentReport, RunError> {
        self.tool.ensure_available().map_err(RunError::ToolMissing)?;
        let files = discover_wav_files(dir).map_err(|e| RunError::discovery(dir, e))?;
        tracing::info!(
            "Checking mean level of {} file(s), silent at or below {:.1} dB",
            files.len(),
            self.threshold_db
        );

        let measured = self.pool.run(files, |file| {
            let mean = self.measure(&file);
            (file, mean)
        });

        let target = dir.join(&self.folder);
        let entries = measured
            .into_iter()
            .map(|(file, mean)| self.sort_file(&file, mean, &target))
            .collect();

        let report = SilentReport {
            directory: dir.to_path_buf(),
            folder: self.folder.clone(),
            threshold_db: self.threshold_db,
            entries,
        };
        tracing::info!(
            "Moved {} of {} file(s) to {}",
            report.moved(),
            report.entries.len(),
            target.display()
        );
        Ok(report)
    }

    fn measure(&self, file: &AudioFile) -> ToolResult<Option<f64>> {
        LevelAnalyzer::new(self.tool.as_ref()).mean(file.path())
    }

    fn sort_file(
        &self,
        file: &AudioFile,
        mean: ToolResult<Option<f64>>,
        target: &Path,
    ) -> SilentEntry {
        let mut entry = SilentEntry {
            file: file.file_name(),
            mean_db: None,
            silent: false,
            moved_to: None,
            error: None,
        };

        let mean = match mean {
            Ok(mean) => mean,
            Err(e) => {
                tracing::warn!("{}: {}", entry.file, e);
                entry.error = Some(e.to_string());
                return entry;
            }
        };
        entry.mean_db = mean;
        entry.silent = is_silent(mean, self.threshold_db);
        if !entry.silent {
            return entry;
        }

        match self.move_into(file, target) {
            Ok(dest) => {
                tracing::info!("{}: mean {}, moved", entry.file, format_db(mean));
                entry.moved_to = Some(dest);
            }
            Err(message) => {
                tracing::warn!("{}: {}", entry.file, message);
                entry.error = Some(message);
            }
        }
        entry
    }

    fn move_into(&self, file: &AudioFile, target: &Path) -> Result<PathBuf, String> {
        fs::create_dir_all(target)
            .map_err(|e| format!("could not create {}: {}", target.display(), e))?;

        let dest = target.join(file.file_name());
        if dest.exists() {
            return Err(format!("{} already exists", dest.display()));
        }
        self.temp
            .move_file(file.path(), &dest)
            .map_err(|e| e.to_string())?;
        Ok(dest)
    }
}
