//! Test doubles for the tool and filesystem traits.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::filters::{FilterChain, FilterStage};
use crate::models::{Channel, ProbeInfo};
use crate::temp::{is_temp_name, FileOps};
use crate::tool::{AudioTool, Prober, ToolError, ToolResult, TransformReport, TransformRequest};

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Probe(String),
    Measure(String, Option<Channel>),
    Mean(String),
    Transform {
        input: String,
        output: String,
        chain: FilterChain,
        codec: Option<String>,
    },
}

/// In-memory tool.
///
/// Peaks are keyed by file name. A transform copies the input bytes to
/// the output and registers the output's peaks as the input's peaks
/// shifted by the chain's gains, so re-measuring an artifact behaves like
/// the real thing.
#[derive(Default)]
pub struct FakeTool {
    peaks: Mutex<HashMap<(String, Option<Channel>), f64>>,
    probes: HashMap<String, ProbeInfo>,
    probe_failures: HashSet<String>,
    measure_failures: HashSet<String>,
    transform_failures: HashSet<String>,
    empty_outputs: HashSet<String>,
    timeouts: HashSet<String>,
    skews: HashMap<String, f64>,
    trailing_silence: HashMap<String, usize>,
    means: HashMap<String, Option<f64>>,
    missing: bool,
    delay: Duration,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peak(self, name: &str, channel: Option<Channel>, peak_db: f64) -> Self {
        self.peaks.lock().insert((name.to_string(), channel), peak_db);
        self
    }

    /// Whole, left and right peaks for a stereo file.
    pub fn with_stereo(self, name: &str, left: f64, right: f64) -> Self {
        self.with_peak(name, None, left.max(right))
            .with_peak(name, Some(Channel::Left), left)
            .with_peak(name, Some(Channel::Right), right)
    }

    /// Mean level reading; `None` is a run that prints no reading.
    pub fn with_mean(mut self, name: &str, mean_db: Option<f64>) -> Self {
        self.means.insert(name.to_string(), mean_db);
        self
    }

    pub fn with_probe(mut self, name: &str, channels: u16, codec: Option<&str>) -> Self {
        self.probes.insert(
            name.to_string(),
            ProbeInfo {
                channels,
                codec: codec.map(str::to_string),
            },
        );
        self
    }

    pub fn failing_probe(mut self, name: &str) -> Self {
        self.probe_failures.insert(name.to_string());
        self
    }

    pub fn failing_measure(mut self, name: &str) -> Self {
        self.measure_failures.insert(name.to_string());
        self
    }

    pub fn failing_transform(mut self, name: &str) -> Self {
        self.transform_failures.insert(name.to_string());
        self
    }

    pub fn empty_output(mut self, name: &str) -> Self {
        self.empty_outputs.insert(name.to_string());
        self
    }

    pub fn timing_out(mut self, name: &str) -> Self {
        self.timeouts.insert(name.to_string());
        self
    }

    /// Offset the output's peaks by `db` after the chain is applied.
    pub fn skewed_output(mut self, name: &str, db: f64) -> Self {
        self.skews.insert(name.to_string(), db);
        self
    }

    /// The last `bytes` of the file are silence the trim stage removes.
    pub fn with_trailing_silence(mut self, name: &str, bytes: usize) -> Self {
        self.trailing_silence.insert(name.to_string(), bytes);
        self
    }

    pub fn missing(mut self) -> Self {
        self.missing = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn transform_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, Call::Transform { .. }))
            .count()
    }

    /// Highest number of concurrent measure/transform calls seen.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        InFlight(&self.in_flight)
    }

    fn shifted_peaks(&self, input: &str, output: &str, chain: &FilterChain) {
        let skew = self.skews.get(input).copied().unwrap_or(0.0);
        let mut peaks = self.peaks.lock();
        let mut whole = peaks.get(&(input.to_string(), None)).copied();
        let mut left = peaks.get(&(input.to_string(), Some(Channel::Left))).copied();
        let mut right = peaks.get(&(input.to_string(), Some(Channel::Right))).copied();

        for stage in chain.gain_stages() {
            match *stage {
                FilterStage::Gain { gain_db } => {
                    for p in [&mut whole, &mut left, &mut right].into_iter().flatten() {
                        *p += gain_db;
                    }
                }
                FilterStage::SplitGain { left_db, right_db } => {
                    if let Some(l) = left.as_mut() {
                        *l += left_db;
                    }
                    if let Some(r) = right.as_mut() {
                        *r += right_db;
                    }
                    if let (Some(l), Some(r)) = (left, right) {
                        whole = Some(l.max(r));
                    }
                }
                FilterStage::TrailingSilence(_) => {}
            }
        }

        for (channel, peak) in [(None, whole), (Some(Channel::Left), left), (Some(Channel::Right), right)] {
            if let Some(p) = peak {
                peaks.insert((output.to_string(), channel), p + skew);
            }
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl AudioTool for FakeTool {
    fn name(&self) -> &str {
        "fake"
    }

    fn ensure_available(&self) -> ToolResult<()> {
        if self.missing {
            return Err(ToolError::missing("ffmpeg", "ffmpeg"));
        }
        Ok(())
    }

    fn measure(&self, input: &Path, channel: Option<Channel>) -> ToolResult<f64> {
        let _guard = self.enter();
        let name = name_of(input);
        self.calls.lock().push(Call::Measure(name.clone(), channel));

        if self.measure_failures.contains(&name) {
            return Err(ToolError::parse_error("ffmpeg", "no max_volume line"));
        }
        self.peaks
            .lock()
            .get(&(name.clone(), channel))
            .copied()
            .ok_or_else(|| ToolError::parse_error("ffmpeg", format!("no peak for {}", name)))
    }

    fn mean_volume(&self, input: &Path) -> ToolResult<Option<f64>> {
        let _guard = self.enter();
        let name = name_of(input);
        self.calls.lock().push(Call::Mean(name.clone()));

        if self.measure_failures.contains(&name) {
            return Err(ToolError::command_failed("ffmpeg", 1, "Invalid data found"));
        }
        self.means
            .get(&name)
            .copied()
            .ok_or_else(|| ToolError::command_failed("ffmpeg", 1, format!("no mean for {}", name)))
    }

    fn transform(&self, request: &TransformRequest<'_>) -> ToolResult<TransformReport> {
        let _guard = self.enter();
        let input = name_of(request.input);
        let output = name_of(request.output);
        self.calls.lock().push(Call::Transform {
            input: input.clone(),
            output: output.clone(),
            chain: request.chain.clone(),
            codec: request.codec.map(str::to_string),
        });

        let write = |bytes: &[u8]| {
            fs::write(request.output, bytes).map_err(|e| ToolError::io("fake transform", e))
        };

        if self.timeouts.contains(&input) {
            write(b"partial")?;
            return Err(ToolError::timeout("ffmpeg", Duration::from_secs(1)));
        }
        if self.transform_failures.contains(&input) {
            write(b"partial")?;
            return Err(ToolError::command_failed(
                "ffmpeg",
                1,
                "Conversion failed!\nError while filtering",
            ));
        }
        if self.empty_outputs.contains(&input) {
            write(b"")?;
            return Ok(TransformReport::default());
        }

        let mut bytes = fs::read(request.input).map_err(|e| ToolError::io("fake read", e))?;
        let mut report = TransformReport {
            output: "size=1kB time=00:00:01.00".to_string(),
            ..Default::default()
        };
        if request.chain.trailing_silence().is_some() {
            if let Some(&silent) = self.trailing_silence.get(&input) {
                let keep = bytes.len().saturating_sub(silent);
                if keep == 0 {
                    report.whole_file_silent = true;
                } else {
                    bytes.truncate(keep);
                    report.trimmed_at_secs = Some(keep as f64);
                }
            }
        }
        write(&bytes)?;
        self.shifted_peaks(&input, &output, request.chain);
        Ok(report)
    }
}

impl Prober for FakeTool {
    fn probe(&self, input: &Path) -> ToolResult<ProbeInfo> {
        let name = name_of(input);
        self.calls.lock().push(Call::Probe(name.clone()));

        if self.probe_failures.contains(&name) {
            return Err(ToolError::parse_error("ffprobe", "no audio stream"));
        }
        Ok(self.probes.get(&name).cloned().unwrap_or(ProbeInfo {
            channels: 2,
            codec: Some("pcm_s16le".to_string()),
        }))
    }
}

/// Filesystem where chosen files stay locked.
///
/// A rename onto a locked original or a delete of an artifact made for a
/// locked original fails with `PermissionDenied` on every attempt.
#[derive(Default)]
pub struct LockedFiles {
    rename_targets: HashSet<String>,
    delete_artifacts_of: HashSet<String>,
    renames: AtomicUsize,
}

impl LockedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renames onto `name` fail.
    pub fn locking_replace_of(mut self, name: &str) -> Self {
        self.rename_targets.insert(name.to_string());
        self
    }

    /// Deleting any temp artifact of `name` fails.
    pub fn locking_artifacts_of(mut self, name: &str) -> Self {
        self.delete_artifacts_of.insert(name.to_string());
        self
    }

    /// Rename attempts seen, failed ones included.
    pub fn rename_attempts(&self) -> usize {
        self.renames.load(Ordering::SeqCst)
    }
}

fn locked() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "file is locked")
}

impl FileOps for LockedFiles {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.renames.fetch_add(1, Ordering::SeqCst);
        if self.rename_targets.contains(&name_of(to)) {
            return Err(locked());
        }
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let name = name_of(path);
        let locked_artifact = is_temp_name(&name)
            && self
                .delete_artifacts_of
                .iter()
                .any(|original| name.ends_with(&format!("_{}", original)));
        if locked_artifact {
            return Err(locked());
        }
        fs::remove_file(path)
    }
}
