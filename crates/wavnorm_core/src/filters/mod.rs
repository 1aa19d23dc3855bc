//! Filter chain composition.
//!
//! The chain is an abstract list of stages. Rendering it into a concrete
//! tool syntax is the job of the tool backend.

mod chain;
mod silence;

pub use chain::{FilterChain, FilterStage, SilenceTrim};
pub use silence::{trailing_cut, SilenceRegion, SilenceTrimmer, TrimDecision};
