//! Analysis results and gain plans.

use serde::{Deserialize, Serialize};

use super::enums::Channel;

/// Peak measurement of a whole file or one of its channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Measured peak in dBFS. Digital silence is `f64::NEG_INFINITY`.
    pub peak_db: f64,
    /// Channel the measurement was taken on (`None` = whole file).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
}

impl AnalysisResult {
    /// Measurement over the whole file.
    pub fn whole(peak_db: f64) -> Self {
        Self {
            peak_db,
            channel: None,
        }
    }

    /// Measurement over a single channel.
    pub fn channel(channel: Channel, peak_db: f64) -> Self {
        Self {
            peak_db,
            channel: Some(channel),
        }
    }

    /// Whether the source had no measurable peak.
    pub fn is_silent(&self) -> bool {
        self.peak_db == f64::NEG_INFINITY
    }
}

/// Gain decided for one measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gain {
    /// Channel the gain applies to (`None` = whole file).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    /// Peak the gain was derived from.
    pub measured_peak_db: f64,
    /// Adjustment in dB. Exactly `0.0` means no-op.
    pub gain_db: f64,
    /// The source was digital silence.
    pub silent_source: bool,
}

impl Gain {
    /// Whether this gain leaves the signal untouched.
    pub fn is_noop(&self) -> bool {
        self.gain_db == 0.0
    }

    /// Peak expected after applying the gain.
    pub fn expected_peak_db(&self) -> f64 {
        self.measured_peak_db + self.gain_db
    }
}

/// One gain for the whole file, or one per stereo channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GainSet {
    Whole(Gain),
    Stereo { left: Gain, right: Gain },
}

/// Gains for one file plus the target they were derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainPlan {
    /// Target peak in dBFS.
    pub target_peak_db: f64,
    /// Allowed deviation from the target in dB.
    pub tolerance_db: f64,
    /// The computed gains.
    pub gains: GainSet,
}

impl GainPlan {
    /// Iterate over the individual gains.
    pub fn iter(&self) -> impl Iterator<Item = &Gain> {
        let (first, second) = match &self.gains {
            GainSet::Whole(g) => (g, None),
            GainSet::Stereo { left, right } => (left, Some(right)),
        };
        std::iter::once(first).chain(second)
    }

    /// Whether every gain is an explicit no-op.
    pub fn is_noop(&self) -> bool {
        self.iter().all(Gain::is_noop)
    }

    /// Whether every measured source was silent.
    pub fn is_silent_source(&self) -> bool {
        self.iter().all(|g| g.silent_source)
    }

    /// Whether the plan applies independent per-channel gains.
    pub fn is_stereo(&self) -> bool {
        matches!(self.gains, GainSet::Stereo { .. })
    }
}
