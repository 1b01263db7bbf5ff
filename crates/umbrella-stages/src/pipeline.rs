//! Pipeline Orchestrator
//!
//! One run per request, driven as an explicit state machine:
//!
//! ```text
//! Init → Stage1Running → Stage1Done ─────────────────────────────→ Merged
//!                            └→ Stage2Running → Stage2Done ──────→ Merged
//!        (any running state) ──────────────────────────────────→ Failed
//! ```
//!
//! Stage 2 is built from the stage 1 result alone. A failure anywhere ends
//! the run; there is no partial or default verdict.

use std::sync::Arc;
use thiserror::Error;
use umbrella_core::{
    ExecutionContext, Modality, StageFailure, StageIndex, StageKey, StagePrompt, StageTrace,
    Submission, UmbrellaError,
};
use umbrella_inference::InferenceClient;
use umbrella_prompts::PromptBuilder;
use umbrella_registry::StageResult;
use umbrella_verdict::MergedOutputs;

use crate::executor::StageExecutor;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Stage(#[from] StageFailure),

    /// The prompt for a stage could not be built
    #[error("PROMPT/{stage}: {detail}")]
    Prompt { stage: StageKey, detail: String },

    #[error("PIPELINE/run stopped before reaching a terminal state")]
    Incomplete,
}

impl From<PipelineError> for UmbrellaError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::Stage(failure) => failure.into(),
            PipelineError::Prompt { stage, detail } => UmbrellaError::SchemaViolation {
                field: "prompt".to_string(),
                detail: format!("{}: {}", stage, detail),
            },
            PipelineError::Incomplete => UmbrellaError::SchemaViolation {
                field: "$".to_string(),
                detail: "pipeline run stopped early".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Init,
    Stage1Running { prompt: StagePrompt },
    Stage1Done { first: StageResult },
    Stage2Running { first: StageResult, prompt: StagePrompt },
    Stage2Done { first: StageResult, review: StageResult },
    Merged(MergedOutputs),
    Failed(PipelineError),
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Init => "init",
            PipelineState::Stage1Running { .. } => "stage1-running",
            PipelineState::Stage1Done { .. } => "stage1-done",
            PipelineState::Stage2Running { .. } => "stage2-running",
            PipelineState::Stage2Done { .. } => "stage2-done",
            PipelineState::Merged(_) => "merged",
            PipelineState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Merged(_) | PipelineState::Failed(_))
    }
}

/// Finished run: merged stage outputs plus one trace per executed stage
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub merged: MergedOutputs,
    pub traces: Vec<StageTrace>,
}

/// Shared, immutable machinery for running pipelines
#[derive(Clone)]
pub struct ModerationPipeline {
    prompts: Arc<PromptBuilder>,
    executor: StageExecutor,
}

impl ModerationPipeline {
    pub fn new(prompts: Arc<PromptBuilder>, client: Arc<dyn InferenceClient>) -> Self {
        Self {
            prompts,
            executor: StageExecutor::new(client),
        }
    }

    pub fn prompts(&self) -> &PromptBuilder {
        &self.prompts
    }

    pub fn executor(&self) -> &StageExecutor {
        &self.executor
    }

    /// A run in `Init`, to be driven with [`PipelineRun::step`]
    pub fn start<'a>(
        &'a self,
        submission: &'a Submission,
        ctx: &'a ExecutionContext,
    ) -> PipelineRun<'a> {
        PipelineRun {
            pipeline: self,
            submission,
            ctx,
            state: PipelineState::Init,
            traces: Vec::new(),
        }
    }

    /// Drive a fresh run to a terminal state
    pub async fn run(
        &self,
        submission: &Submission,
        ctx: &ExecutionContext,
    ) -> Result<PipelineOutcome, PipelineError> {
        self.start(submission, ctx).finish().await
    }
}

pub struct PipelineRun<'a> {
    pipeline: &'a ModerationPipeline,
    submission: &'a Submission,
    ctx: &'a ExecutionContext,
    state: PipelineState,
    traces: Vec<StageTrace>,
}

impl<'a> PipelineRun<'a> {
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn traces(&self) -> &[StageTrace] {
        &self.traces
    }

    /// Make exactly one transition. Terminal states stay where they are.
    pub async fn step(&mut self) -> &PipelineState {
        let current = std::mem::replace(&mut self.state, PipelineState::Init);
        let from = current.name();
        let next = match current {
            PipelineState::Init => match self.build(StageIndex::First, None) {
                Ok(prompt) => PipelineState::Stage1Running { prompt },
                Err(e) => PipelineState::Failed(e),
            },
            PipelineState::Stage1Running { prompt } => match self.execute(&prompt).await {
                Ok(first) => PipelineState::Stage1Done { first },
                Err(e) => PipelineState::Failed(e),
            },
            PipelineState::Stage1Done { first } => {
                if self.modality().stages().len() == 1 {
                    PipelineState::Merged(MergedOutputs::Single(first))
                } else {
                    match self.build(StageIndex::Second, Some(&first)) {
                        Ok(prompt) => PipelineState::Stage2Running { first, prompt },
                        Err(e) => PipelineState::Failed(e),
                    }
                }
            }
            PipelineState::Stage2Running { first, prompt } => match self.execute(&prompt).await {
                Ok(review) => PipelineState::Stage2Done { first, review },
                Err(e) => PipelineState::Failed(e),
            },
            PipelineState::Stage2Done { first, review } => {
                PipelineState::Merged(MergedOutputs::Reviewed { first, review })
            }
            terminal @ (PipelineState::Merged(_) | PipelineState::Failed(_)) => terminal,
        };

        tracing::trace!(
            request_id = %self.ctx.request_id,
            from,
            to = next.name(),
            "pipeline transition"
        );
        if let PipelineState::Failed(error) = &next {
            if from != "failed" {
                tracing::error!(
                    request_id = %self.ctx.request_id,
                    modality = %self.modality(),
                    error = %error,
                    "pipeline failed"
                );
            }
        }

        self.state = next;
        &self.state
    }

    /// Step until terminal
    pub async fn finish(mut self) -> Result<PipelineOutcome, PipelineError> {
        while !self.state.is_terminal() {
            self.step().await;
        }
        match self.state {
            PipelineState::Merged(merged) => Ok(PipelineOutcome {
                merged,
                traces: self.traces,
            }),
            PipelineState::Failed(error) => Err(error),
            _ => Err(PipelineError::Incomplete),
        }
    }

    fn modality(&self) -> Modality {
        self.submission.modality()
    }

    fn build(
        &self,
        index: StageIndex,
        prior: Option<&StageResult>,
    ) -> Result<StagePrompt, PipelineError> {
        let modality = self.modality();
        self.pipeline
            .prompts
            .build(modality, index, self.submission, prior)
            .map_err(|e| PipelineError::Prompt {
                stage: StageKey::new(modality, index).unwrap_or(modality.final_stage()),
                detail: e.to_string(),
            })
    }

    async fn execute(&mut self, prompt: &StagePrompt) -> Result<StageResult, PipelineError> {
        let schema = self.pipeline.prompts.registry().schema(prompt.stage());
        let output = self.pipeline.executor.run(prompt, schema).await?;
        tracing::info!(
            request_id = %self.ctx.request_id,
            stage = %prompt.stage(),
            latency_ms = output.trace.latency_ms,
            output_hash = %output.trace.output_hash,
            "stage done"
        );
        self.traces.push(output.trace);
        Ok(output.result)
    }
}
