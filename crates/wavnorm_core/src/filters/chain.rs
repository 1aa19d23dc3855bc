//! Abstract filter chain.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Parameters of the trailing-silence stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SilenceTrim {
    /// Minimum length of the trailing region, in seconds.
    pub min_duration_secs: f64,
    /// Level below which audio counts as silence, in dBFS.
    pub threshold_db: f64,
}

/// One stage of a filter chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum FilterStage {
    /// Linear gain applied to every channel.
    Gain { gain_db: f64 },
    /// Split a stereo stream, apply one gain per side, remix in order.
    SplitGain { left_db: f64, right_db: f64 },
    /// Remove a trailing region below the threshold.
    TrailingSilence(SilenceTrim),
}

impl FilterStage {
    fn is_trim(&self) -> bool {
        matches!(self, FilterStage::TrailingSilence(_))
    }
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterStage::Gain { gain_db } => write!(f, "gain({:+.2} dB)", gain_db),
            FilterStage::SplitGain { left_db, right_db } => {
                write!(f, "split(L {:+.2} dB, R {:+.2} dB)", left_db, right_db)
            }
            FilterStage::TrailingSilence(t) => write!(
                f,
                "trim-tail(>= {}s below {} dB)",
                t.min_duration_secs, t.threshold_db
            ),
        }
    }
}

/// Ordered list of stages applied by one transform.
///
/// Gain stages always run before the trailing-silence stage, so the
/// threshold is evaluated against post-gain levels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterChain {
    stages: Vec<FilterStage>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stage, keeping any trailing-silence stage last.
    pub fn push(&mut self, stage: FilterStage) {
        if stage.is_trim() {
            self.stages.retain(|s| !s.is_trim());
            self.stages.push(stage);
            return;
        }

        let at = self
            .stages
            .iter()
            .position(FilterStage::is_trim)
            .unwrap_or(self.stages.len());
        self.stages.insert(at, stage);
    }

    /// Add a stage (builder pattern).
    pub fn with(mut self, stage: FilterStage) -> Self {
        self.push(stage);
        self
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Whether the chain needs a channel split.
    pub fn has_split(&self) -> bool {
        self.stages
            .iter()
            .any(|s| matches!(s, FilterStage::SplitGain { .. }))
    }

    /// Stages that change level, in order.
    pub fn gain_stages(&self) -> impl Iterator<Item = &FilterStage> {
        self.stages.iter().filter(|s| !s.is_trim())
    }

    /// The trailing-silence stage, if any.
    pub fn trailing_silence(&self) -> Option<&SilenceTrim> {
        self.stages.iter().find_map(|s| match s {
            FilterStage::TrailingSilence(t) => Some(t),
            _ => None,
        })
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stages.is_empty() {
            return write!(f, "(no stages)");
        }
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", stage)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trim() -> FilterStage {
        FilterStage::TrailingSilence(SilenceTrim {
            min_duration_secs: 1.0,
            threshold_db: -50.0,
        })
    }

    #[test]
    fn trim_stays_last() {
        let chain = FilterChain::new()
            .with(trim())
            .with(FilterStage::Gain { gain_db: 6.0 });

        assert_eq!(chain.stages().len(), 2);
        assert_eq!(chain.stages()[0], FilterStage::Gain { gain_db: 6.0 });
        assert!(chain.trailing_silence().is_some());
        assert_eq!(chain.gain_stages().count(), 1);
    }

    #[test]
    fn second_trim_replaces_first() {
        let chain = FilterChain::new().with(trim()).with(trim());
        assert_eq!(chain.stages().len(), 1);
    }

    #[test]
    fn display_lists_stages() {
        let chain = FilterChain::new().with(FilterStage::SplitGain {
            left_db: 2.0,
            right_db: -1.5,
        });
        assert!(chain.has_split());
        assert_eq!(chain.to_string(), "split(L +2.00 dB, R -1.50 dB)");
        assert_eq!(FilterChain::new().to_string(), "(no stages)");
    }
}
