//! Stage Executor: one inference call, parsed and validated
//!
//! ```text
//! StagePrompt → client.complete → JSON → validate(schema) → StageResult
//!                     ↓              ↓            ↓
//!               UPSTREAM/...    PARSE/...    SCHEMA/...
//! ```
//!
//! Nothing is repaired or defaulted on the way through.

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use umbrella_core::{FailureKind, StageFailure, StagePrompt, StageTrace};
use umbrella_inference::{InferenceClient, InferenceError};
use umbrella_registry::{parse_stage_result, StageResult, StageSchema};

/// Result of one executed stage with its trace record
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub result: StageResult,
    pub trace: StageTrace,
}

#[derive(Clone)]
pub struct StageExecutor {
    client: Arc<dyn InferenceClient>,
}

impl StageExecutor {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<dyn InferenceClient> {
        &self.client
    }

    pub async fn run(
        &self,
        prompt: &StagePrompt,
        schema: &StageSchema,
    ) -> Result<StageOutput, StageFailure> {
        let stage = prompt.stage();
        if schema.key != stage {
            return Err(StageFailure::schema_violation(
                stage,
                "$",
                format!("prompt for {} checked against the {} schema", stage, schema.key),
            ));
        }

        let start = Instant::now();
        let prompt_hash = hash_bytes(
            &serde_json::to_vec(&(prompt.messages(), prompt.sampling())).unwrap_or_default(),
        );

        let raw = self
            .client
            .complete(prompt.messages(), prompt.sampling())
            .await
            .map_err(|e| upstream_failure(stage, e))?;

        let output_hash = hash_bytes(raw.as_bytes());
        let latency_ms = start.elapsed().as_millis() as u64;

        let value: Value = serde_json::from_str(&raw).map_err(|e| {
            tracing::warn!(stage = %stage, error = %e, raw = %raw, "stage output is not JSON");
            StageFailure::malformed(stage, e.to_string())
        })?;

        let result = parse_stage_result(schema, value).map_err(|v| {
            tracing::warn!(stage = %stage, field = %v.field, detail = %v.detail, "stage output violates schema");
            StageFailure::schema_violation(stage, v.field, v.detail)
        })?;

        tracing::debug!(stage = %stage, model = %prompt.model(), latency_ms, "stage complete");

        Ok(StageOutput {
            result,
            trace: StageTrace {
                id: stage.id().to_string(),
                model: prompt.model().to_string(),
                prompt_hash,
                output_hash,
                latency_ms,
            },
        })
    }
}

fn upstream_failure(stage: umbrella_core::StageKey, error: InferenceError) -> StageFailure {
    let kind = if error.is_misconfigured() {
        FailureKind::ServiceMisconfigured
    } else {
        FailureKind::ServiceUnavailable
    };
    tracing::warn!(stage = %stage, error = %error, "inference call failed");
    StageFailure::new(stage, kind, error.to_string())
}

fn hash_bytes(data: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(data))
}
