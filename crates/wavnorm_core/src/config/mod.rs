//! Configuration management for wavnorm.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Validation on load with automatic defaults
//!
//! Settings are built once before a run, frozen, and shared read-only
//! with every task.
//!
//! # Example
//!
//! ```no_run
//! use wavnorm_core::config::ConfigManager;
//!
//! let mut config = ConfigManager::new("wavnorm.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Target peak: {} dB", config.settings().normalize.target_peak_db);
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    LoggingSettings, NormalizeSettings, SilenceSettings, Settings, ToolSettings, WorkerSettings,
};
