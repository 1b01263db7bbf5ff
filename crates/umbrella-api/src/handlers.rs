//! API Handlers
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use umbrella_core::{ChatMessage, ExecutionContext, Modality, Submission, UMBRELLA_VERSION};
use umbrella_verdict::Verdict;

use crate::error::ApiError;
use crate::AppState;

pub const CHAT_OPERATION: &str = "process chat request";

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoiceRequest {
    pub audio: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepfakeRequest {
    pub file: Option<String>,
    pub filename: Option<String>,
    pub file_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Option<Vec<ChatMessage>>,
}

/// Route name used as the `endpoint` metric label
pub fn endpoint_name(modality: Modality) -> &'static str {
    match modality {
        Modality::Text => "moderate-text",
        Modality::Image => "analyze-image",
        Modality::Voice => "analyze-voice",
        Modality::MixedMedia => "detect-deepfake",
    }
}

/// Absent, null and `""` are missing; anything else goes through as sent
fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::required(field))
}

pub async fn moderate_text(
    State(state): State<AppState>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<Verdict>, ApiError> {
    let submission = body
        .map_err(ApiError::invalid_body)
        .and_then(|Json(req)| required(req.text, "text"))
        .map(Submission::text);
    analyze(&state, Modality::Text, submission).await
}

pub async fn analyze_image(
    State(state): State<AppState>,
    body: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<Verdict>, ApiError> {
    let submission = body
        .map_err(ApiError::invalid_body)
        .and_then(|Json(req)| required(req.image, "image"))
        .map(Submission::image);
    analyze(&state, Modality::Image, submission).await
}

pub async fn analyze_voice(
    State(state): State<AppState>,
    body: Result<Json<VoiceRequest>, JsonRejection>,
) -> Result<Json<Verdict>, ApiError> {
    let submission = body.map_err(ApiError::invalid_body).and_then(|Json(req)| {
        let audio = required(req.audio, "audio")?;
        Ok(Submission::voice(audio, req.filename))
    });
    analyze(&state, Modality::Voice, submission).await
}

pub async fn detect_deepfake(
    State(state): State<AppState>,
    body: Result<Json<DeepfakeRequest>, JsonRejection>,
) -> Result<Json<Verdict>, ApiError> {
    let submission = body.map_err(ApiError::invalid_body).and_then(|Json(req)| {
        let file = required(req.file, "file")?;
        let file_type = req.file_type.filter(|t| !t.trim().is_empty());
        Ok(Submission::mixed_media(file, req.filename, file_type))
    });
    analyze(&state, Modality::MixedMedia, submission).await
}

async fn analyze(
    state: &AppState,
    modality: Modality,
    submission: Result<Submission, ApiError>,
) -> Result<Json<Verdict>, ApiError> {
    let endpoint = endpoint_name(modality);
    let result = match submission {
        Ok(submission) => {
            let ctx = ExecutionContext::new(modality);
            match state.service.analyze(&submission, &ctx).await {
                Ok(analysis) => {
                    state.metrics.observe_stages(&analysis.traces);
                    Ok(analysis.verdict)
                }
                Err(e) => {
                    tracing::warn!(request_id = %ctx.request_id, error = %e, "analysis rejected");
                    Err(ApiError::from_service(e, modality.operation()))
                }
            }
        }
        Err(e) => Err(e),
    };

    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.outcome(),
    };
    state.metrics.record_request(endpoint, outcome);
    result.map(Json)
}

pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let result = match body {
        Ok(Json(req)) => {
            let messages = req.messages.unwrap_or_default();
            state
                .service
                .chat(&messages)
                .await
                .map_err(|e| ApiError::from_service(e, CHAT_OPERATION))
        }
        Err(rejection) => Err(ApiError::invalid_body(rejection)),
    };

    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.outcome(),
    };
    state.metrics.record_request("chat", outcome);
    result.map(|message| Json(json!({ "message": message })))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": UMBRELLA_VERSION,
            "inferenceConfigured": state.service.is_configured(),
        })),
    )
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        ),
        Err(e) => {
            tracing::error!(error = %e, "metrics encoding failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                String::new(),
            )
        }
    }
}
