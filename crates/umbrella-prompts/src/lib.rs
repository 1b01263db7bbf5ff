//! Umbrella Prompts: stage instructions from structured schemas
//!
//! Renders the instruction payload for each pipeline stage from a YAML file
//! of handlebars templates. The response contract inside every instruction
//! is rendered from the stage's [`umbrella_registry::StageSchema`].
//!
//! # Example
//!
//! ```ignore
//! use umbrella_core::{Modality, StageIndex, Submission};
//! use umbrella_prompts::{ModelConfig, PromptBuilder};
//!
//! let builder = PromptBuilder::standard(ModelConfig::default())?;
//! let prompt = builder.build(
//!     Modality::Text,
//!     StageIndex::First,
//!     &Submission::text("The weather is nice today"),
//!     None,
//! )?;
//! assert_eq!(prompt.messages().len(), 2);
//! ```

pub mod builder;
pub mod models;
pub mod renderer;
pub mod templates;

use thiserror::Error;
use umbrella_core::{Modality, StageKey};
use umbrella_registry::RegistryError;

pub use builder::{ChatPrompt, PromptBuilder};
pub use models::ModelConfig;
pub use templates::{PromptTemplate, TemplatesFile};

/// Template name of the chat assistant instruction
pub const CHAT_TEMPLATE: &str = "chat.assistant.v1";

/// Errors that can occur while loading templates or building prompts
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("TEMPLATE/failed to read {path}: {detail}")]
    Io { path: String, detail: String },

    #[error("TEMPLATE/{0}")]
    Parse(String),

    #[error("TEMPLATE/{name} does not compile: {detail}")]
    Compile { name: String, detail: String },

    #[error("TEMPLATE/no template for {0}")]
    MissingTemplate(String),

    #[error("RENDER/{name}: {detail}")]
    Render { name: String, detail: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("PROMPT/{stage} cannot be built from a {modality} submission")]
    SubmissionMismatch { stage: StageKey, modality: Modality },

    #[error("PROMPT/{0} needs the stage 1 result")]
    MissingPrior(StageKey),

    #[error("PROMPT/{stage} cannot review a {got} result")]
    PriorMismatch { stage: StageKey, got: StageKey },

    #[error("PROMPT/could not serialize prior result: {0}")]
    Serialize(String),

    #[error("PROMPT/conversation has no user or assistant turns")]
    EmptyConversation,
}
