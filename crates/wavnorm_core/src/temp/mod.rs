//! Temp artifacts and the atomic swap into place.
//!
//! Every task writes into its own marker-prefixed file next to the
//! original, so the final rename never crosses a filesystem.

mod artifact;
mod manager;
mod retry;

pub use artifact::{artifact_owner, is_temp_name, ArtifactOwner, TempArtifact, TEMP_MARKER};
pub use manager::{ArtifactError, CleanupError, FileOps, StdFileOps, SweepReport, TempFileManager};
pub use retry::{is_transient, RetryError, RetryPolicy};
