//! Umbrella Verdict: the wire response
//!
//! ```text
//! MergedOutputs { stage 1 result, [review result] } → format() → Verdict
//! ```
//!
//! The verdict's safety fields come from the last stage. Metrics are emitted
//! in registry category order under their canonical names, and the stage 1
//! result rides along verbatim for two-stage modalities.

pub mod formatter;
pub mod verdict;

pub use formatter::{format, FormatError, MergedOutputs};
pub use verdict::Verdict;
