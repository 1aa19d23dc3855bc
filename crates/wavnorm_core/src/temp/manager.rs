//! Verify, swap and clean up temp artifacts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::artifact::{artifact_owner, ArtifactOwner, TempArtifact};
use super::retry::{is_transient, RetryError, RetryPolicy};

/// The transform did not leave a usable artifact.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("output missing: {}", .0.display())]
    Missing(PathBuf),

    #[error("output is empty: {}", .0.display())]
    Empty(PathBuf),

    #[error("cannot inspect {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A temp artifact could not be deleted. Recorded, never fatal.
#[derive(Error, Debug)]
#[error("could not delete {} after {attempts} attempt(s): {source}", .path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    pub attempts: u32,
    #[source]
    pub source: io::Error,
}

/// Outcome of a stale-artifact sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub removed: usize,
    /// Artifacts of another running process, left alone.
    pub kept_foreign: usize,
    pub failed: Vec<CleanupError>,
}

/// Renames and deletes that may hit a locked file.
pub trait FileOps: Send + Sync {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// [`FileOps`] on `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileOps;

impl FileOps for StdFileOps {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Owns the retry policy used for every rename and delete.
#[derive(Clone)]
pub struct TempFileManager {
    policy: RetryPolicy,
    ops: Arc<dyn FileOps>,
}

impl Default for TempFileManager {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl TempFileManager {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_ops(policy, Arc::new(StdFileOps))
    }

    pub fn with_ops(policy: RetryPolicy, ops: Arc<dyn FileOps>) -> Self {
        Self { policy, ops }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Check that the artifact exists and is non-empty. Returns its size.
    pub fn verify_output(&self, artifact: &TempArtifact) -> Result<u64, ArtifactError> {
        let path = artifact.path();
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ArtifactError::Missing(path.to_path_buf()))
            }
            Err(source) => {
                return Err(ArtifactError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if !metadata.is_file() {
            return Err(ArtifactError::Missing(path.to_path_buf()));
        }
        if metadata.len() == 0 {
            return Err(ArtifactError::Empty(path.to_path_buf()));
        }
        Ok(metadata.len())
    }

    /// Rename `from` to `to`, retrying while the file is locked.
    pub fn move_file(&self, from: &Path, to: &Path) -> Result<(), RetryError> {
        self.policy
            .run("move", || self.ops.rename(from, to), is_transient)
    }

    /// Atomically move the artifact over `original`.
    ///
    /// A single rename within one directory; readers of `original` see the
    /// old file or the new one, never a partial write.
    pub fn replace(&self, artifact: &TempArtifact, original: &Path) -> Result<(), RetryError> {
        self.policy.run(
            "replace",
            || self.ops.rename(artifact.path(), original),
            is_transient,
        )
    }

    /// Delete the artifact if present. Returns whether a file was removed.
    pub fn discard(&self, artifact: &TempArtifact) -> Result<bool, CleanupError> {
        self.remove(artifact.path())
    }

    fn remove(&self, path: &Path) -> Result<bool, CleanupError> {
        self.policy
            .run(
                "delete",
                || match self.ops.remove_file(path) {
                    Ok(()) => Ok(true),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                    Err(e) => Err(e),
                },
                is_transient,
            )
            .map_err(|e| CleanupError {
                path: path.to_path_buf(),
                attempts: e.attempts,
                source: e.source,
            })
    }

    /// Delete leftover WAV artifacts in `dir`.
    ///
    /// Only names that parse as artifacts are touched. Slots named with
    /// the pid of another live process belong to a concurrent run and
    /// are kept.
    pub fn sweep(&self, dir: &Path) -> io::Result<SweepReport> {
        let mut report = SweepReport::default();
        let own_pid = std::process::id();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(owner) = artifact_owner(&name) else {
                continue;
            };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if let ArtifactOwner::Process(pid) = owner {
                if pid != own_pid && process_alive(pid) {
                    tracing::debug!("Keeping {}: process {} is still running", name, pid);
                    report.kept_foreign += 1;
                    continue;
                }
            }

            match self.remove(&entry.path()) {
                Ok(true) => report.removed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("{}", e);
                    report.failed.push(e);
                }
            }
        }

        if report.removed > 0 {
            tracing::info!(
                "Removed {} leftover temp file(s) from {}",
                report.removed,
                dir.display()
            );
        }
        Ok(report)
    }
}

/// Whether `pid` names a running process. Where this cannot be told, a
/// foreign pid is assumed alive.
fn process_alive(pid: u32) -> bool {
    #[cfg(target_os = "linux")]
    {
        Path::new("/proc").join(pid.to_string()).exists()
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = pid;
        true
    }
}
