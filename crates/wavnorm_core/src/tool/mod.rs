//! External tool capabilities.
//!
//! The pipeline only depends on the [`AudioTool`] and [`Prober`] traits.
//! [`FfmpegTool`] implements both by spawning ffmpeg and ffprobe.

mod ffmpeg;
pub mod runner;
mod types;

pub use ffmpeg::FfmpegTool;
pub use types::{ToolError, ToolResult, TransformReport, TransformRequest};

use std::path::Path;

use crate::models::{Channel, ProbeInfo};

/// Measure and transform capabilities of an audio tool.
pub trait AudioTool: Send + Sync {
    /// Tool name for logs and errors.
    fn name(&self) -> &str;

    /// Check that the tool can be run at all.
    ///
    /// Called once before any file is touched.
    fn ensure_available(&self) -> ToolResult<()> {
        Ok(())
    }

    /// Peak level of the whole file, or of one channel, in dBFS.
    ///
    /// Digital silence is `f64::NEG_INFINITY`, not an error.
    fn measure(&self, input: &Path, channel: Option<Channel>) -> ToolResult<f64>;

    /// Mean level of the whole file in dBFS, `None` when the tool
    /// reports no reading.
    fn mean_volume(&self, input: &Path) -> ToolResult<Option<f64>>;

    /// Write `request.input` through `request.chain` into `request.output`.
    fn transform(&self, request: &TransformRequest<'_>) -> ToolResult<TransformReport>;
}

/// Stream inspection capability.
pub trait Prober: Send + Sync {
    /// Channel count and codec of the first audio stream.
    fn probe(&self, input: &Path) -> ToolResult<ProbeInfo>;
}
