//! wavnorm core - batch peak normalization of WAV files
//!
//! This crate contains all processing logic with no CLI dependencies.
//! Audio work is delegated to an external tool (ffmpeg) behind the
//! [`tool::AudioTool`] and [`tool::Prober`] traits.

pub mod analysis;
pub mod config;
pub mod discovery;
pub mod filters;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod temp;
pub mod tool;

#[cfg(test)]
mod testing;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
