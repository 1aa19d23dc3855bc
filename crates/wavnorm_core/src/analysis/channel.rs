//! Channel processor: independent left/right normalization.

use std::path::Path;

use crate::filters::FilterStage;
use crate::models::{AnalysisResult, Channel, GainPlan, GainSet, Variant};
use crate::tool::ToolResult;

use super::gain::GainCalculator;
use super::level::LevelAnalyzer;

/// Measures and plans each side of a stereo file on its own.
pub struct ChannelProcessor<'a> {
    analyzer: LevelAnalyzer<'a>,
    calculator: GainCalculator,
}

impl<'a> ChannelProcessor<'a> {
    pub fn new(analyzer: LevelAnalyzer<'a>, calculator: GainCalculator) -> Self {
        Self {
            analyzer,
            calculator,
        }
    }

    /// Whether a file with `channels` channels goes through the split path.
    ///
    /// Anything that is not exactly stereo uses the whole-file path, even in
    /// channel modes.
    pub fn engaged(variant: Variant, channels: u16) -> bool {
        variant.independent_channels() && channels == 2
    }

    /// Measure left and right, in that order.
    pub fn analyze(&self, path: &Path) -> ToolResult<[AnalysisResult; 2]> {
        let left = self.analyzer.channel(path, Channel::Left)?;
        let right = self.analyzer.channel(path, Channel::Right)?;
        Ok([left, right])
    }

    /// Build the two-gain plan from a left/right pair.
    pub fn plan(&self, measured: &[AnalysisResult; 2]) -> GainPlan {
        let [left, right] = measured;
        self.calculator.plan_stereo(left, right)
    }
}

/// Level-changing stage for a plan, or `None` when every gain is a no-op.
///
/// Stereo plans split, apply left to left and right to right, then remix
/// in the original channel order.
pub fn gain_stage(plan: &GainPlan) -> Option<FilterStage> {
    if plan.is_noop() {
        return None;
    }
    Some(match plan.gains {
        GainSet::Whole(g) => FilterStage::Gain { gain_db: g.gain_db },
        GainSet::Stereo { left, right } => FilterStage::SplitGain {
            left_db: left.gain_db,
            right_db: right.gain_db,
        },
    })
}
