//! Trailing-silence trimming.
//!
//! The trimmer only decides whether the stage goes into the chain. Where
//! the cut lands is decided from the detector's silence regions by
//! [`trailing_cut`], which only ever looks at the region touching the end
//! of the stream.

use crate::config::SilenceSettings;

use super::chain::{FilterChain, FilterStage, SilenceTrim};

/// Slack allowed between a region's end and the stream end, in seconds.
const END_SLACK_SECS: f64 = 0.05;

/// Adds the trailing-silence stage to a chain.
#[derive(Debug, Clone, Copy)]
pub struct SilenceTrimmer {
    trim: SilenceTrim,
}

impl SilenceTrimmer {
    pub fn new(trim: SilenceTrim) -> Self {
        Self { trim }
    }

    pub fn from_settings(settings: &SilenceSettings) -> Self {
        Self::new(SilenceTrim {
            min_duration_secs: settings.stop_duration_secs,
            threshold_db: settings.stop_threshold_db,
        })
    }

    pub fn params(&self) -> SilenceTrim {
        self.trim
    }

    /// Append the trim stage after any gain stage.
    ///
    /// A silent source has nothing worth keeping and nothing to trim
    /// against, so it is left alone. Returns whether the stage was added.
    pub fn apply(&self, chain: &mut FilterChain, silent_source: bool) -> bool {
        if silent_source {
            return false;
        }
        chain.push(FilterStage::TrailingSilence(self.trim));
        true
    }
}

/// A region reported by the silence detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceRegion {
    pub start_secs: f64,
    /// `None` when the region was still open at end of stream.
    pub end_secs: Option<f64>,
}

/// What to do with the tail of a stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrimDecision {
    /// No qualifying trailing region.
    Keep,
    /// Cut the stream at this offset, in seconds.
    CutAt(f64),
    /// The trailing region starts at the beginning of the stream.
    WholeFileSilent,
}

/// Decide the cut point from detected silence regions.
///
/// Only the last region is considered, and only if it reaches the end of
/// the stream and lasts at least `min_duration_secs`. Leading and interior
/// regions never produce a cut.
pub fn trailing_cut(
    regions: &[SilenceRegion],
    duration_secs: Option<f64>,
    min_duration_secs: f64,
) -> TrimDecision {
    let Some(last) = regions.last() else {
        return TrimDecision::Keep;
    };

    let reaches_end = match (last.end_secs, duration_secs) {
        (None, _) => true,
        (Some(end), Some(total)) => end >= total - END_SLACK_SECS,
        (Some(_), None) => false,
    };
    if !reaches_end {
        return TrimDecision::Keep;
    }

    if let Some(end) = last.end_secs.or(duration_secs) {
        if end - last.start_secs + END_SLACK_SECS < min_duration_secs {
            return TrimDecision::Keep;
        }
    }

    if last.start_secs <= END_SLACK_SECS {
        TrimDecision::WholeFileSilent
    } else {
        TrimDecision::CutAt(last.start_secs)
    }
}
