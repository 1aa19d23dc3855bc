//! Media file structures.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A WAV file discovered in the working directory.
///
/// The channel count is unknown at discovery time and filled in by the
/// probe during analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFile {
    /// Full path to the file.
    pub path: PathBuf,
    /// File size in bytes at discovery time.
    pub size_bytes: u64,
    /// Channel count reported by the probe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,
}

impl AudioFile {
    /// Create a new audio file record with an unknown channel count.
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            size_bytes,
            channels: None,
        }
    }

    /// Get the path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without directory, for log prefixes and reports.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// File name without extension.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.file_name())
    }

    /// Whether the probe reported exactly two channels.
    pub fn is_stereo(&self) -> bool {
        self.channels == Some(2)
    }
}

/// Stream properties reported by the probe tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeInfo {
    /// Number of audio channels in the first audio stream.
    pub channels: u16,
    /// Codec of the first audio stream (e.g., "pcm_s24le").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
}

impl ProbeInfo {
    /// Codec to request on output so the sample format survives the rewrite.
    ///
    /// Only PCM codecs are carried over; anything else is left to the tool's
    /// WAV default.
    pub fn preserved_codec(&self) -> Option<&str> {
        self.codec
            .as_deref()
            .filter(|c| c.starts_with("pcm_"))
    }
}
