//! Umbrella Stages: execution of the moderation pipeline
//!
//! # Pipeline Flow
//!
//! ```text
//! Submission → Prompt(1) → Inference → Validate → [Prompt(2) → Inference → Validate] → Verdict
//!                              ↓            ↓                       ↓            ↓
//!                         StageTrace   StageResult             StageTrace   StageResult
//! ```
//!
//! [`StageExecutor`] runs one stage, [`ModerationPipeline`] sequences them as
//! a state machine and [`ModerationService`] adds configuration checks and
//! verdict formatting on top.

pub mod executor;
pub mod pipeline;
pub mod service;

pub use executor::{StageExecutor, StageOutput};
pub use pipeline::{ModerationPipeline, PipelineError, PipelineOutcome, PipelineRun, PipelineState};
pub use service::{Analysis, ModerationService};
