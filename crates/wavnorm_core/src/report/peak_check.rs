//! Peak check report: measure every WAV of a directory, change nothing.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::analysis::LevelAnalyzer;
use crate::discovery::discover_wav_files;
use crate::models::{AudioFile, Channel};
use crate::orchestrator::{RunError, WorkerPool};
use crate::tool::{AudioTool, Prober, ToolResult};

/// Peaks of one file.
#[derive(Debug, Clone, Serialize)]
pub struct PeakEntry {
    pub file: String,
    pub channels: Option<u16>,
    pub whole_db: Option<f64>,
    pub left_db: Option<f64>,
    pub right_db: Option<f64>,
    pub error: Option<String>,
}

impl PeakEntry {
    fn line(&self) -> String {
        if let Some(err) = &self.error {
            return format!("{}: error: {}", self.file, err);
        }
        let mut line = format!("{}: peak {}", self.file, format_db(self.whole_db));
        if let (Some(l), Some(r)) = (self.left_db, self.right_db) {
            let _ = write!(line, " (L {}, R {})", format_db(Some(l)), format_db(Some(r)));
        }
        line
    }
}

/// Result of a peak check run, in natural name order.
#[derive(Debug, Clone, Serialize)]
pub struct PeakReport {
    pub directory: PathBuf,
    pub entries: Vec<PeakEntry>,
}

impl PeakReport {
    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|e| e.error.is_some()).count()
    }

    pub fn render_text(&self) -> String {
        let mut out = format!("Peak check: {}\n", self.directory.display());
        if self.entries.is_empty() {
            out.push_str("No WAV files found\n");
            return out;
        }
        for (i, entry) in self.entries.iter().enumerate() {
            let _ = writeln!(out, "{:03}. {}", i + 1, entry.line());
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// `-inf` for digital silence, otherwise two decimals.
pub fn format_db(db: Option<f64>) -> String {
    match db {
        None => "n/a".to_string(),
        Some(v) if v == f64::NEG_INFINITY => "-inf dB".to_string(),
        Some(v) => format!("{:.2} dB", v),
    }
}

/// Measures peaks on the worker pool.
pub struct PeakChecker {
    tool: Arc<dyn AudioTool>,
    prober: Arc<dyn Prober>,
    pool: WorkerPool,
}

impl PeakChecker {
    pub fn new(
        max_workers: usize,
        tool: Arc<dyn AudioTool>,
        prober: Arc<dyn Prober>,
    ) -> Result<Self, RunError> {
        Ok(Self {
            tool,
            prober,
            pool: WorkerPool::new(max_workers)?,
        })
    }

    /// Measure every discovered WAV in `dir`.
    pub fn run(&self, dir: &Path) -> Result<PeakReport, RunError> {
        self.tool.ensure_available().map_err(RunError::ToolMissing)?;
        let files = discover_wav_files(dir).map_err(|e| RunError::discovery(dir, e))?;
        tracing::info!("Checking peaks of {} file(s)", files.len());

        let entries = self.pool.run(files, |file| self.check_file(file));
        Ok(PeakReport {
            directory: dir.to_path_buf(),
            entries,
        })
    }

    fn check_file(&self, file: AudioFile) -> PeakEntry {
        let mut entry = PeakEntry {
            file: file.file_name(),
            channels: None,
            whole_db: None,
            left_db: None,
            right_db: None,
            error: None,
        };
        if let Err(e) = self.measure_into(&file, &mut entry) {
            tracing::warn!("{}: {}", entry.file, e);
            entry.error = Some(e.to_string());
        }
        entry
    }

    fn measure_into(&self, file: &AudioFile, entry: &mut PeakEntry) -> ToolResult<()> {
        let analyzer = LevelAnalyzer::new(self.tool.as_ref());
        let channels = self.prober.probe(file.path())?.channels;
        entry.channels = Some(channels);
        entry.whole_db = Some(analyzer.whole(file.path())?.peak_db);
        if channels == 2 {
            entry.left_db = Some(analyzer.channel(file.path(), Channel::Left)?.peak_db);
            entry.right_db = Some(analyzer.channel(file.path(), Channel::Right)?.peak_db);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use tempfile::tempdir;

    use crate::testing::{Call, FakeTool};

    fn checker(tool: &Arc<FakeTool>) -> PeakChecker {
        PeakChecker::new(2, tool.clone(), tool.clone()).unwrap()
    }

    #[test]
    fn lists_files_in_natural_order_without_touching_them() {
        let dir = tempdir().unwrap();
        for name in ["track10.wav", "track2.wav", "mono.wav"] {
            fs::write(dir.path().join(name), b"RIFF").unwrap();
        }
        let tool = Arc::new(
            FakeTool::new()
                .with_stereo("track2.wav", -3.0, -6.5)
                .with_stereo("track10.wav", f64::NEG_INFINITY, -1.0)
                .with_probe("mono.wav", 1, None)
                .with_peak("mono.wav", None, -12.0),
        );

        let report = checker(&tool).run(dir.path()).unwrap();
        let text = report.render_text();
        let lines: Vec<&str> = text.lines().skip(1).collect();

        assert_eq!(
            lines,
            vec![
                "001. mono.wav: peak -12.00 dB",
                "002. track2.wav: peak -3.00 dB (L -3.00 dB, R -6.50 dB)",
                "003. track10.wav: peak -1.00 dB (L -inf dB, R -1.00 dB)",
            ]
        );
        assert_eq!(tool.transform_count(), 0);
        assert!(!tool
            .calls()
            .contains(&Call::Measure("mono.wav".to_string(), Some(Channel::Left))));
    }

    #[test]
    fn failures_are_listed_not_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.wav"), b"RIFF").unwrap();
        fs::write(dir.path().join("b.wav"), b"RIFF").unwrap();
        let tool = Arc::new(
            FakeTool::new()
                .failing_probe("a.wav")
                .with_stereo("b.wav", -1.0, -2.0),
        );

        let report = checker(&tool).run(dir.path()).unwrap();
        assert_eq!(report.failed(), 1);
        assert!(report.entries[0].error.is_some());
        assert_eq!(report.entries[1].whole_db, Some(-1.0));
        assert!(report.to_json().unwrap().contains("\"right_db\": -2.0"));
    }

    #[test]
    fn empty_directory_reports_nothing() {
        let dir = tempdir().unwrap();
        let tool = Arc::new(FakeTool::new());
        let report = checker(&tool).run(dir.path()).unwrap();
        assert!(report.entries.is_empty());
        assert!(report.render_text().contains("No WAV files found"));
    }

    #[test]
    fn missing_tool_is_fatal() {
        let dir = tempdir().unwrap();
        let tool = Arc::new(FakeTool::new().missing());
        let err = PeakChecker::new(1, tool.clone(), tool)
            .unwrap()
            .run(dir.path())
            .err()
            .unwrap();
        assert!(matches!(err, RunError::ToolMissing(_)));
    }
}
