//! Temp artifact naming.

use std::path::{Path, PathBuf};

use crate::models::Variant;

/// Prefix shared by every temp artifact. Discovery never returns a name
/// starting with it.
pub const TEMP_MARKER: &str = "___temp_";

/// Whether a file name carries the temp marker.
///
/// Discovery skips every such name. Only names that also parse with
/// [`artifact_owner`] are ever deleted.
pub fn is_temp_name(name: &str) -> bool {
    name.starts_with(TEMP_MARKER)
}

/// Writer of a swept artifact, as far as its name tells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOwner {
    /// `___temp_<tag>_p<pid>_...`
    Process(u32),
    /// A tagged name without a process id, e.g. `___temp_v1_thread_3_a.wav`.
    Unknown,
}

/// Parse `name` as a WAV temp artifact: the marker, a variant tag, `_`,
/// and a `.wav` extension. Anything else is not ours.
pub fn artifact_owner(name: &str) -> Option<ArtifactOwner> {
    let is_wav = Path::new(name)
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("wav"));
    if !is_wav {
        return None;
    }

    let rest = name.strip_prefix(TEMP_MARKER)?;
    let rest = Variant::ALL
        .iter()
        .find_map(|v| rest.strip_prefix(v.tag())?.strip_prefix('_'))?;

    let pid = rest
        .strip_prefix('p')
        .and_then(|r| r.split_once('_'))
        .and_then(|(digits, _)| digits.parse::<u32>().ok());
    Some(pid.map_or(ArtifactOwner::Unknown, ArtifactOwner::Process))
}

/// Output slot owned by exactly one task.
///
/// The name is `___temp_<variant>_p<pid>_t<task>_<original name>`. The
/// task index is unique within a run and the pid separates concurrent
/// runs over the same directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    /// Slot for task `task_index` working on `original`.
    pub fn for_task(original: &Path, variant: Variant, task_index: usize) -> Self {
        Self::with_pid(original, variant, task_index, std::process::id())
    }

    fn with_pid(original: &Path, variant: Variant, task_index: usize, pid: u32) -> Self {
        let dir = original.parent().unwrap_or_else(|| Path::new(""));
        let name = original
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = format!(
            "{}{}_p{}_t{}_{}",
            TEMP_MARKER,
            variant.tag(),
            pid,
            task_index,
            name
        );
        Self {
            path: dir.join(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}
