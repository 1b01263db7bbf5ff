//! Umbrella Core: data model, stage identity and error model
//!
//! Shared vocabulary of the moderation pipeline. Every other crate in the
//! workspace speaks in these types: a [`Submission`] goes in, one or two
//! stages identified by [`StageKey`] run against the inference service, and
//! failures are reported as [`StageFailure`] or [`UmbrellaError`].

pub mod context;
pub mod data_model;
pub mod error;
pub mod media;
pub mod stage;

pub use context::ExecutionContext;
pub use data_model::{
    ChatMessage, MediaPayload, Metric, Modality, Payload, Role, SamplingParams, StagePrompt,
    StageTrace, Submission,
};
pub use error::UmbrellaError;
pub use stage::{FailureKind, StageFailure, StageIndex, StageKey};

/// Engine version reported by the health endpoint
pub const UMBRELLA_VERSION: &str = env!("CARGO_PKG_VERSION");
