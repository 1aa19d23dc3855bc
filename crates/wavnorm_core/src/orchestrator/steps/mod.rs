//! Pipeline step implementations.
//!
//! Steps run in this order:
//! 1. Analyze - probe the stream, measure peaks, compute gains
//! 2. Compose - build the filter chain (gain, split, trailing trim)
//! 3. Transform - write the temp artifact through the chain
//! 4. Verify - check the artifact exists, is non-empty and hits the target
//! 5. Replace - swap the artifact over the original

mod analyze;
mod compose;
mod replace;
mod transform;
mod verify;

pub use analyze::AnalyzeStep;
pub use compose::ComposeStep;
pub use replace::ReplaceStep;
pub use transform::TransformStep;
pub use verify::VerifyStep;
