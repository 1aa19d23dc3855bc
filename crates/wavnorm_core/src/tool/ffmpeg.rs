//! ffmpeg/ffprobe backend.
//!
//! Measurement uses the `volumedetect` filter and reads `max_volume` from
//! stderr. Transforms render the abstract chain into an `-af` graph, or a
//! `-filter_complex` graph when a channel split is involved. Trailing
//! silence is located with a `silencedetect` pre-pass over the post-gain
//! signal and removed with `atrim`, so only the tail is ever cut.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;

use crate::config::ToolSettings;
use crate::filters::{
    trailing_cut, FilterChain, FilterStage, SilenceRegion, SilenceTrim, TrimDecision,
};
use crate::models::{Channel, ProbeInfo};

use super::runner::{self, CommandOutput};
use super::types::{ToolError, ToolResult, TransformReport, TransformRequest};
use super::{AudioTool, Prober};

const FFMPEG: &str = "ffmpeg";
const FFPROBE: &str = "ffprobe";

/// Backend that shells out to ffmpeg and ffprobe.
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    ffmpeg: String,
    ffprobe: String,
    analysis_timeout: Option<Duration>,
    transform_timeout: Option<Duration>,
}

impl FfmpegTool {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            analysis_timeout: None,
            transform_timeout: None,
        }
    }

    pub fn from_settings(settings: &ToolSettings) -> Self {
        Self {
            ffmpeg: settings.ffmpeg_path.clone(),
            ffprobe: settings.ffprobe_path.clone(),
            analysis_timeout: settings.analysis_timeout(),
            transform_timeout: settings.transform_timeout(),
        }
    }

    fn ffmpeg_command(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-hide_banner").arg("-nostats");
        cmd
    }

    /// Run a filter graph into the null muxer and return the captured output.
    fn analyze_with(&self, input: &Path, graph: &str, complex: bool) -> ToolResult<CommandOutput> {
        let mut cmd = self.ffmpeg_command();
        cmd.arg("-i")
            .arg(input)
            .arg(if complex { "-filter_complex" } else { "-af" })
            .arg(graph)
            .args(["-f", "null", "-"]);
        runner::run(FFMPEG, cmd, self.analysis_timeout)?.check(FFMPEG)
    }

    /// Locate trailing silence after the chain's gain stages.
    fn detect_trailing_silence(
        &self,
        input: &Path,
        chain: &FilterChain,
        trim: &SilenceTrim,
    ) -> ToolResult<(TrimDecision, String)> {
        let mut fragments = render_gain_stages(chain);
        fragments.push(format!(
            "silencedetect=noise={}dB:d={}",
            trim.threshold_db, trim.min_duration_secs
        ));
        let output = self.analyze_with(input, &fragments.join(","), chain.has_split())?;

        let regions = parse_silence_regions(&output.stderr);
        let duration = parse_duration(&output.stderr);
        tracing::debug!(
            "{}: {} silence region(s), duration {:?}",
            input.display(),
            regions.len(),
            duration
        );

        let decision = trailing_cut(&regions, duration, trim.min_duration_secs);
        Ok((decision, runner::tail_lines(&output.stderr, 8)))
    }
}

impl AudioTool for FfmpegTool {
    fn name(&self) -> &str {
        FFMPEG
    }

    fn ensure_available(&self) -> ToolResult<()> {
        for (tool, program) in [(FFMPEG, &self.ffmpeg), (FFPROBE, &self.ffprobe)] {
            let mut cmd = Command::new(program);
            cmd.arg("-version");
            let output = runner::run(tool, cmd, self.analysis_timeout)?.check(tool)?;
            if let Some(first) = output.stdout.lines().next() {
                tracing::debug!("Found {}", first);
            }
        }
        Ok(())
    }

    fn measure(&self, input: &Path, channel: Option<Channel>) -> ToolResult<f64> {
        let graph = measure_graph(channel);
        let output = self.analyze_with(input, &graph, false)?;
        parse_max_volume(&output.stderr)
    }

    fn mean_volume(&self, input: &Path) -> ToolResult<Option<f64>> {
        let output = self.analyze_with(input, "volumedetect", false)?;
        parse_volume(&output.stderr, "mean_volume:")
    }

    fn transform(&self, request: &TransformRequest<'_>) -> ToolResult<TransformReport> {
        let mut report = TransformReport::default();
        let mut fragments = render_gain_stages(request.chain);

        if let Some(trim) = request.chain.trailing_silence() {
            let (decision, diagnostics) =
                self.detect_trailing_silence(request.input, request.chain, trim)?;
            report.output.push_str(&diagnostics);
            match decision {
                TrimDecision::CutAt(at) => {
                    fragments.push(format!("atrim=end={:.6}", at));
                    report.trimmed_at_secs = Some(at);
                }
                TrimDecision::WholeFileSilent => report.whole_file_silent = true,
                TrimDecision::Keep => {}
            }
        }

        let mut cmd = self.ffmpeg_command();
        cmd.arg("-y").arg("-i").arg(request.input);
        if !fragments.is_empty() {
            let flag = if request.chain.has_split() {
                "-filter_complex"
            } else {
                "-af"
            };
            cmd.arg(flag).arg(fragments.join(","));
        }
        if let Some(codec) = request.codec {
            cmd.arg("-c:a").arg(codec);
        }
        cmd.args(["-f", "wav"]).arg(request.output);

        let output = runner::run(FFMPEG, cmd, self.transform_timeout)?.check(FFMPEG)?;
        if !report.output.is_empty() {
            report.output.push('\n');
        }
        report.output.push_str(&runner::tail_lines(&output.stderr, 8));
        Ok(report)
    }
}

impl Prober for FfmpegTool {
    fn probe(&self, input: &Path) -> ToolResult<ProbeInfo> {
        let mut cmd = Command::new(&self.ffprobe);
        cmd.args(["-v", "error", "-select_streams", "a:0"])
            .args(["-show_entries", "stream=channels,codec_name"])
            .args(["-of", "json"])
            .arg(input);

        let output = runner::run(FFPROBE, cmd, self.analysis_timeout)?.check(FFPROBE)?;
        parse_probe_json(&output.stdout)
    }
}

fn measure_graph(channel: Option<Channel>) -> String {
    match channel {
        Some(ch) => format!("pan=mono|c0=c{},volumedetect", ch.index()),
        None => "volumedetect".to_string(),
    }
}

/// Render level-changing stages as ffmpeg filter fragments.
fn render_gain_stages(chain: &FilterChain) -> Vec<String> {
    chain
        .gain_stages()
        .filter_map(|stage| match stage {
            FilterStage::Gain { gain_db } => Some(format!("volume={:.4}dB", gain_db)),
            FilterStage::SplitGain { left_db, right_db } => Some(format!(
                "channelsplit=channel_layout=stereo[FL][FR];\
                 [FL]volume={:.4}dB[left];\
                 [FR]volume={:.4}dB[right];\
                 [left][right]amerge=inputs=2",
                left_db, right_db
            )),
            FilterStage::TrailingSilence(_) => None,
        })
        .collect()
}

/// Extract the `max_volume` reading from volumedetect output.
///
/// `-inf` is digital silence and parses to negative infinity.
fn parse_max_volume(stderr: &str) -> ToolResult<f64> {
    parse_volume(stderr, "max_volume:")?
        .ok_or_else(|| ToolError::parse_error(FFMPEG, "no max_volume line in volumedetect output"))
}

/// Reading after `key` on the first volumedetect line that has one.
fn parse_volume(stderr: &str, key: &str) -> ToolResult<Option<f64>> {
    let Some(line) = stderr.lines().find(|l| l.contains(key)) else {
        return Ok(None);
    };

    let value = line
        .split(key)
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .ok_or_else(|| ToolError::parse_error(FFMPEG, format!("malformed line: {}", line.trim())))?;

    match value {
        "-inf" => Ok(Some(f64::NEG_INFINITY)),
        v => v
            .parse::<f64>()
            .map(Some)
            .map_err(|e| ToolError::parse_error(FFMPEG, format!("bad level '{}': {}", v, e))),
    }
}

/// Collect silencedetect regions in the order they were reported.
fn parse_silence_regions(stderr: &str) -> Vec<SilenceRegion> {
    let mut regions: Vec<SilenceRegion> = Vec::new();
    for line in stderr.lines() {
        if let Some(start) = value_after(line, "silence_start:") {
            regions.push(SilenceRegion {
                start_secs: start,
                end_secs: None,
            });
        } else if let Some(end) = value_after(line, "silence_end:") {
            if let Some(open) = regions.iter_mut().rev().find(|r| r.end_secs.is_none()) {
                open.end_secs = Some(end);
            }
        }
    }
    regions
}

fn value_after(line: &str, key: &str) -> Option<f64> {
    line.split(key)
        .nth(1)?
        .split(|c: char| c.is_whitespace() || c == '|')
        .find(|s| !s.is_empty())?
        .parse()
        .ok()
}

/// Parse the input `Duration: HH:MM:SS.xx` header.
fn parse_duration(stderr: &str) -> Option<f64> {
    let raw = stderr
        .lines()
        .find_map(|l| l.trim_start().strip_prefix("Duration:"))?
        .split(',')
        .next()?
        .trim();

    let mut parts = raw.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    channels: Option<u16>,
    codec_name: Option<String>,
}

fn parse_probe_json(stdout: &str) -> ToolResult<ProbeInfo> {
    let parsed: ProbeOutput = serde_json::from_str(stdout)
        .map_err(|e| ToolError::parse_error(FFPROBE, e.to_string()))?;

    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| ToolError::parse_error(FFPROBE, "no audio stream"))?;
    let channels = stream
        .channels
        .ok_or_else(|| ToolError::parse_error(FFPROBE, "stream has no channel count"))?;

    Ok(ProbeInfo {
        channels,
        codec: stream.codec_name,
    })
}
