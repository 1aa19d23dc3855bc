//! Peak analysis and gain planning.
//!
//! - [`LevelAnalyzer`] turns tool measurements into [`AnalysisResult`]s
//! - [`GainCalculator`] derives gains against the target peak
//! - [`ChannelProcessor`] handles independent left/right normalization
//!
//! [`AnalysisResult`]: crate::models::AnalysisResult

mod channel;
mod gain;
mod level;

pub use channel::{gain_stage, ChannelProcessor};
pub use gain::GainCalculator;
pub use level::LevelAnalyzer;
