//! Umbrella Inference: the one outbound capability of the pipeline
//!
//! An [`InferenceClient`] takes role-tagged messages plus sampling settings
//! and returns the raw completion text. It makes exactly one attempt per call
//! and never inspects what the text means; parsing belongs to the stage
//! executor.

pub mod http;
pub mod scripted;

use async_trait::async_trait;
use thiserror::Error;
use umbrella_core::{ChatMessage, SamplingParams};

pub use http::{ChatCompletionsClient, DEFAULT_ENDPOINT};
pub use scripted::{RecordedRequest, ScriptedClient};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    /// Credential or endpoint missing
    #[error("UPSTREAM/CONFIG {0}")]
    Misconfigured(String),

    /// Non-2xx answer; `body` is kept for the logs, never for callers
    #[error("UPSTREAM/HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("UPSTREAM/TRANSPORT {0}")]
    Transport(String),

    /// 2xx answer without a readable completion
    #[error("UPSTREAM/ENVELOPE {0}")]
    Envelope(String),
}

impl InferenceError {
    pub fn is_misconfigured(&self) -> bool {
        matches!(self, InferenceError::Misconfigured(_))
    }
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// One completion for `messages`, using the model named in `params`
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<String, InferenceError>;

    /// Whether a call could be attempted at all. Checked before any stage runs.
    fn check_configured(&self) -> Result<(), InferenceError> {
        Ok(())
    }
}
