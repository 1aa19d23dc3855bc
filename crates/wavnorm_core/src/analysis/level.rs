//! Level analyzer.

use std::path::Path;

use crate::models::{AnalysisResult, Channel};
use crate::tool::{AudioTool, ToolResult};

/// Measures peak levels through an [`AudioTool`].
#[derive(Clone, Copy)]
pub struct LevelAnalyzer<'a> {
    tool: &'a dyn AudioTool,
}

impl<'a> LevelAnalyzer<'a> {
    pub fn new(tool: &'a dyn AudioTool) -> Self {
        Self { tool }
    }

    /// Peak of the whole file.
    pub fn whole(&self, path: &Path) -> ToolResult<AnalysisResult> {
        let peak = self.tool.measure(path, None)?;
        tracing::trace!("{}: peak {:.2} dB", path.display(), peak);
        Ok(AnalysisResult::whole(peak))
    }

    /// Peak of one extracted channel.
    pub fn channel(&self, path: &Path, channel: Channel) -> ToolResult<AnalysisResult> {
        let peak = self.tool.measure(path, Some(channel))?;
        tracing::trace!("{} [{}]: peak {:.2} dB", path.display(), channel, peak);
        Ok(AnalysisResult::channel(channel, peak))
    }

    /// Mean level of the whole file, if the tool reports one.
    pub fn mean(&self, path: &Path) -> ToolResult<Option<f64>> {
        let mean = self.tool.mean_volume(path)?;
        match mean {
            Some(db) => tracing::trace!("{}: mean {:.2} dB", path.display(), db),
            None => tracing::trace!("{}: no mean reading", path.display()),
        }
        Ok(mean)
    }
}
