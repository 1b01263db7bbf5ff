//! Moderation service: submission in, verdict out
//!
//! Owns the pipeline and the inference client handle. Stateless across
//! requests; everything it holds is shared read-only.

use std::sync::Arc;
use umbrella_core::{ChatMessage, ExecutionContext, StageTrace, Submission, UmbrellaError};
use umbrella_inference::{InferenceClient, InferenceError};
use umbrella_prompts::{PromptBuilder, PromptError};
use umbrella_verdict::{format, Verdict};

use crate::pipeline::ModerationPipeline;

/// A verdict and the traces of the stages that produced it
#[derive(Debug, Clone)]
pub struct Analysis {
    pub verdict: Verdict,
    pub traces: Vec<StageTrace>,
}

#[derive(Clone)]
pub struct ModerationService {
    pipeline: ModerationPipeline,
    client: Arc<dyn InferenceClient>,
}

impl ModerationService {
    pub fn new(prompts: Arc<PromptBuilder>, client: Arc<dyn InferenceClient>) -> Self {
        Self {
            pipeline: ModerationPipeline::new(prompts, client.clone()),
            client,
        }
    }

    pub fn pipeline(&self) -> &ModerationPipeline {
        &self.pipeline
    }

    pub fn is_configured(&self) -> bool {
        self.client.check_configured().is_ok()
    }

    fn ensure_configured(&self) -> Result<(), UmbrellaError> {
        self.client.check_configured().map_err(|e| {
            tracing::error!(error = %e, "inference service not configured");
            UmbrellaError::ServiceMisconfigured(e.to_string())
        })
    }

    /// Run the full pipeline for one submission
    pub async fn analyze(
        &self,
        submission: &Submission,
        ctx: &ExecutionContext,
    ) -> Result<Analysis, UmbrellaError> {
        let modality = submission.modality();
        if submission.content().is_empty() {
            return Err(UmbrellaError::InputMissing(modality.input_field()));
        }
        self.ensure_configured()?;

        tracing::info!(
            request_id = %ctx.request_id,
            modality = %modality,
            content_len = submission.content().len(),
            "analysis started"
        );

        let outcome = self.pipeline.run(submission, ctx).await?;
        let verdict = format(&outcome.merged, self.pipeline.prompts().registry()).map_err(|e| {
            tracing::error!(request_id = %ctx.request_id, error = %e, "verdict formatting failed");
            UmbrellaError::SchemaViolation {
                field: e.field().to_string(),
                detail: e.to_string(),
            }
        })?;

        tracing::info!(
            request_id = %ctx.request_id,
            modality = %modality,
            is_safe = verdict.is_safe(),
            peak_score = verdict.peak_score(),
            stages = outcome.traces.len(),
            elapsed_ms = ctx.elapsed_ms(),
            "analysis finished"
        );

        Ok(Analysis {
            verdict,
            traces: outcome.traces,
        })
    }

    /// One assistant reply for a conversation about the moderation tools
    pub async fn chat(&self, history: &[ChatMessage]) -> Result<String, UmbrellaError> {
        let prompt = self
            .pipeline
            .prompts()
            .build_chat(history)
            .map_err(|e| match e {
                PromptError::EmptyConversation => UmbrellaError::InputMissing("messages"),
                other => UmbrellaError::SchemaViolation {
                    field: "prompt".to_string(),
                    detail: other.to_string(),
                },
            })?;
        self.ensure_configured()?;

        self.client
            .complete(&prompt.messages, &prompt.sampling)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat completion failed");
                match e {
                    InferenceError::Misconfigured(detail) => {
                        UmbrellaError::ServiceMisconfigured(detail)
                    }
                    other => UmbrellaError::ServiceUnavailable(other.to_string()),
                }
            })
    }
}
