//! API errors with their HTTP mapping
//!
//! Callers only ever see `{"error": "<message>"}`. Upstream status codes,
//! offending fields and raw model output go to the log.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use umbrella_core::UmbrellaError;
use umbrella_prompts::PromptError;

pub const INVALID_BODY: &str = "invalid request body";
pub const NOT_CONFIGURED: &str = "service not configured";
pub const TOO_LARGE: &str = "request body too large";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Message is returned verbatim
    #[error("INPUT/{0}")]
    BadRequest(String),

    #[error("INPUT/request body too large")]
    TooLarge,

    #[error("CONFIG/{0}")]
    NotConfigured(String),

    /// `operation` names what failed ("analyze image"); `detail` stays internal
    #[error("FAILED/{operation}: {detail}")]
    Failed {
        operation: &'static str,
        detail: String,
    },
}

impl ApiError {
    pub fn required(field: &str) -> Self {
        ApiError::BadRequest(format!("{field} is required"))
    }

    pub fn invalid_body(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected request body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::TooLarge;
        }
        ApiError::BadRequest(INVALID_BODY.to_string())
    }

    /// Map a service error onto the caller-facing failure for `operation`
    pub fn from_service(error: UmbrellaError, operation: &'static str) -> Self {
        match error {
            UmbrellaError::InputMissing(field) => ApiError::required(field),
            UmbrellaError::ServiceMisconfigured(detail) => ApiError::NotConfigured(detail),
            other => ApiError::Failed {
                operation,
                detail: other.to_string(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotConfigured(_) | ApiError::Failed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Label for the request counter
    pub fn outcome(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) | ApiError::TooLarge => "rejected",
            ApiError::NotConfigured(_) => "unconfigured",
            ApiError::Failed { .. } => "failed",
        }
    }

    pub fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(message) => message.clone(),
            ApiError::TooLarge => TOO_LARGE.to_string(),
            ApiError::NotConfigured(_) => NOT_CONFIGURED.to_string(),
            ApiError::Failed { operation, .. } => format!("Failed to {operation}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::BadRequest(_) | ApiError::TooLarge => {}
            ApiError::NotConfigured(detail) => {
                tracing::error!(detail = %detail, "inference service not configured");
            }
            ApiError::Failed { operation, detail } => {
                tracing::error!(operation, detail = %detail, "request failed");
            }
        }

        let body = ErrorBody {
            error: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Failures while assembling the application at startup
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("STARTUP/prompts: {0}")]
    Prompts(#[from] PromptError),

    #[error("STARTUP/metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("STARTUP/io: {0}")]
    Io(#[from] std::io::Error),
}
