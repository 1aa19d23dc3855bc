//! Data models for wavnorm.
//!
//! This module contains the core data structures shared by every stage:
//! - Enums for pipeline variants, channels and task states
//! - Media structures (audio files, probe results)
//! - Analysis and gain plan structures

mod enums;
mod media;
mod plan;

pub use enums::{Channel, TaskState, Variant};
pub use media::{AudioFile, ProbeInfo};
pub use plan::{AnalysisResult, Gain, GainPlan, GainSet};
