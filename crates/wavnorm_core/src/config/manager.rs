//! Settings file handling.
//!
//! The file is TOML with one table per settings section. Missing keys fall
//! back to their defaults, values are validated on every load, and saves
//! go through a sibling `.toml.tmp` file that is renamed into place.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::settings::Settings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot access settings file: {0}")]
    Io(#[from] io::Error),

    #[error("malformed settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot encode settings: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("rejected settings value: {0}")]
    Invalid(String),

    #[error("no settings file at {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns a settings file path and the settings read from it.
///
/// Nothing is read until [`ConfigManager::load`] or
/// [`ConfigManager::load_or_create`] is called; until then the settings
/// are the defaults.
pub struct ConfigManager {
    file: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mutable access for command-line overrides.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Hand the settings over to the run.
    pub fn into_settings(self) -> Settings {
        self.settings
    }

    /// Read and validate the file. A missing file is [`ConfigError::NotFound`].
    pub fn load(&mut self) -> ConfigResult<()> {
        let text = match fs::read_to_string(&self.file) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(self.file.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        self.settings = parse_and_validate(&text)?;
        Ok(())
    }

    /// Like [`ConfigManager::load`], but writes a commented default file
    /// first when none exists.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        match self.load() {
            Err(ConfigError::NotFound(_)) => {}
            other => return other,
        }

        if let Some(dir) = self.file.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        self.settings = Settings::default();
        self.save()?;
        tracing::info!("Wrote default settings to {}", self.file.display());
        Ok(())
    }

    /// Write the current settings, replacing the file in one rename.
    pub fn save(&self) -> ConfigResult<()> {
        let text = self.render()?;
        self.write_replacing(&text)?;
        Ok(())
    }

    /// One commented table per section.
    fn render(&self) -> ConfigResult<String> {
        let sections: [(&str, &str, String); 5] = [
            (
                "External tools (0 disables a timeout)",
                "tools",
                toml::to_string_pretty(&self.settings.tools)?,
            ),
            (
                "Peak normalization",
                "normalize",
                toml::to_string_pretty(&self.settings.normalize)?,
            ),
            (
                "Trailing-silence trim",
                "silence",
                toml::to_string_pretty(&self.settings.silence)?,
            ),
            (
                "Worker pool (max_workers = 0 uses every logical core)",
                "workers",
                toml::to_string_pretty(&self.settings.workers)?,
            ),
            (
                "Logging",
                "logging",
                toml::to_string_pretty(&self.settings.logging)?,
            ),
        ];

        let mut text = String::from("# wavnorm configuration\n\n");
        for (comment, table, body) in sections {
            text.push_str(&format!("# {}\n[{}]\n{}\n", comment, table, body.trim_end()));
            text.push('\n');
        }
        Ok(text)
    }

    fn write_replacing(&self, text: &str) -> io::Result<()> {
        let staged = self.file.with_extension("toml.tmp");
        let mut out = fs::File::create(&staged)?;
        out.write_all(text.as_bytes())?;
        out.sync_all()?;
        drop(out);
        fs::rename(&staged, &self.file)
    }
}

fn parse_and_validate(content: &str) -> ConfigResult<Settings> {
    let settings: Settings = toml::from_str(content)?;
    settings.validate().map_err(ConfigError::Invalid)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gets_commented_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf").join("wavnorm.toml");

        let mut manager = ConfigManager::new(&path);
        manager.load_or_create().unwrap();

        assert!(path.exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("[tools]"));
        assert!(content.contains("[normalize]"));
        assert!(content.contains("target_peak_db = -1.0"));
    }

    #[test]
    fn generated_file_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wavnorm.toml");

        let mut manager = ConfigManager::new(&path);
        manager.settings_mut().normalize.target_peak_db = -6.0;
        manager.settings_mut().workers.max_workers = 3;
        manager.save().unwrap();

        let mut reloaded = ConfigManager::new(&path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().normalize.target_peak_db, -6.0);
        assert_eq!(reloaded.settings().workers.max_workers, 3);
    }

    #[test]
    fn partial_file_keeps_its_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wavnorm.toml");

        fs::write(&path, "[normalize]\ntarget_peak_db = -4.5\n").unwrap();

        let mut manager = ConfigManager::new(&path);
        manager.load_or_create().unwrap();

        assert_eq!(manager.settings().normalize.target_peak_db, -4.5);
        assert_eq!(manager.settings().silence.stop_threshold_db, -50.0);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wavnorm.toml");
        fs::write(&path, "[normalize]\ntolerance_db = -1.0\n").unwrap();

        let mut manager = ConfigManager::new(&path);
        assert!(matches!(manager.load(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("absent.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn save_leaves_no_staging_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("wavnorm.toml");
        ConfigManager::new(&file).save().unwrap();

        assert!(file.exists());
        assert!(!file.with_extension("toml.tmp").exists());
    }
}
