//! Gain calculator.

use crate::config::NormalizeSettings;
use crate::models::{AnalysisResult, Gain, GainPlan, GainSet};

/// Derives the dB adjustment that brings a peak to the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainCalculator {
    pub target_peak_db: f64,
    pub tolerance_db: f64,
}

impl GainCalculator {
    pub fn new(target_peak_db: f64, tolerance_db: f64) -> Self {
        Self {
            target_peak_db,
            tolerance_db,
        }
    }

    pub fn from_settings(settings: &NormalizeSettings) -> Self {
        Self::new(settings.target_peak_db, settings.tolerance_db)
    }

    /// Whether `peak_db` is close enough to the target to leave alone.
    pub fn within_tolerance(&self, peak_db: f64) -> bool {
        (peak_db - self.target_peak_db).abs() <= self.tolerance_db
    }

    /// Gain for one measurement.
    ///
    /// Within tolerance the gain is exactly `0.0`. Silence gets `0.0` and
    /// the silent-source flag.
    pub fn gain_for(&self, analysis: &AnalysisResult) -> Gain {
        let measured = analysis.peak_db;
        let (gain_db, silent_source) = if analysis.is_silent() {
            (0.0, true)
        } else if self.within_tolerance(measured) {
            (0.0, false)
        } else {
            (self.target_peak_db - measured, false)
        };

        Gain {
            channel: analysis.channel,
            measured_peak_db: measured,
            gain_db,
            silent_source,
        }
    }

    /// Plan with one gain for the whole file.
    pub fn plan_whole(&self, analysis: &AnalysisResult) -> GainPlan {
        self.plan(GainSet::Whole(self.gain_for(analysis)))
    }

    /// Plan with independent left and right gains.
    pub fn plan_stereo(&self, left: &AnalysisResult, right: &AnalysisResult) -> GainPlan {
        self.plan(GainSet::Stereo {
            left: self.gain_for(left),
            right: self.gain_for(right),
        })
    }

    fn plan(&self, gains: GainSet) -> GainPlan {
        GainPlan {
            target_peak_db: self.target_peak_db,
            tolerance_db: self.tolerance_db,
            gains,
        }
    }
}
