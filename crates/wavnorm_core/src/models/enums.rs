//! Core enums used throughout the pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Pipeline variant selected for a run.
///
/// Each variant decides whether gain is applied, whether the two channels
/// of a stereo file are normalized independently, and whether trailing
/// silence is trimmed. The variant tag also namespaces temp artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Whole-file peak normalization.
    #[default]
    Normalize,
    /// Whole-file peak normalization followed by trailing-silence trim.
    NormalizeTrim,
    /// Independent left/right normalization for stereo files.
    ChannelNormalize,
    /// Independent left/right normalization plus trailing-silence trim.
    ChannelNormalizeTrim,
    /// Trailing-silence trim only, no gain.
    TrimOnly,
}

impl Variant {
    /// All variants, in CLI order.
    pub const ALL: [Variant; 5] = [
        Variant::Normalize,
        Variant::NormalizeTrim,
        Variant::ChannelNormalize,
        Variant::ChannelNormalizeTrim,
        Variant::TrimOnly,
    ];

    /// Short tag embedded in temp artifact names.
    pub fn tag(&self) -> &'static str {
        match self {
            Variant::Normalize => "v1",
            Variant::NormalizeTrim => "v2",
            Variant::ChannelNormalize => "v3",
            Variant::ChannelNormalizeTrim => "v4",
            Variant::TrimOnly => "silence",
        }
    }

    /// Name accepted on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Variant::Normalize => "normalize",
            Variant::NormalizeTrim => "normalize-trim",
            Variant::ChannelNormalize => "channel",
            Variant::ChannelNormalizeTrim => "channel-trim",
            Variant::TrimOnly => "trim-only",
        }
    }

    /// Whether this variant applies gain at all.
    pub fn normalizes(&self) -> bool {
        !matches!(self, Variant::TrimOnly)
    }

    /// Whether stereo files get one gain per channel.
    pub fn independent_channels(&self) -> bool {
        matches!(
            self,
            Variant::ChannelNormalize | Variant::ChannelNormalizeTrim
        )
    }

    /// Whether trailing silence is trimmed.
    pub fn trims_silence(&self) -> bool {
        matches!(
            self,
            Variant::NormalizeTrim | Variant::ChannelNormalizeTrim | Variant::TrimOnly
        )
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Variant::ALL
            .iter()
            .copied()
            .find(|v| v.name() == wanted || v.tag() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Variant::ALL.iter().map(|v| v.name()).collect();
                format!("unknown mode '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// One side of a stereo file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    /// Zero-based channel index inside the stream.
    pub fn index(&self) -> usize {
        match self {
            Channel::Left => 0,
            Channel::Right => 1,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Left => write!(f, "left"),
            Channel::Right => write!(f, "right"),
        }
    }
}

/// State of a processing task.
///
/// ```text
/// Discovered → Analyzing → GainComputed → Transforming → Verifying → Replaced
///                               └──────→ Unchanged
/// (any non-terminal state) → Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Discovered,
    Analyzing,
    GainComputed,
    Transforming,
    Verifying,
    /// Temp artifact swapped in place of the original.
    Replaced,
    /// Nothing to do; the original was never touched.
    Unchanged,
    /// Terminal failure; the original was never touched.
    Failed,
}

impl TaskState {
    /// Whether the task has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Replaced | TaskState::Unchanged | TaskState::Failed
        )
    }

    /// Whether this terminal state counts as a successful run for the file.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskState::Replaced | TaskState::Unchanged)
    }

    /// Whether `next` directly follows `self` in the state machine.
    pub fn can_advance_to(&self, next: TaskState) -> bool {
        use TaskState::*;
        match (self, next) {
            (s, Failed) => !s.is_terminal(),
            (Discovered, Analyzing)
            | (Analyzing, GainComputed)
            | (GainComputed, Transforming)
            | (GainComputed, Unchanged)
            | (Transforming, Verifying)
            | (Verifying, Replaced) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Discovered => "Discovered",
            TaskState::Analyzing => "Analyzing",
            TaskState::GainComputed => "GainComputed",
            TaskState::Transforming => "Transforming",
            TaskState::Verifying => "Verifying",
            TaskState::Replaced => "Replaced",
            TaskState::Unchanged => "Unchanged",
            TaskState::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}
