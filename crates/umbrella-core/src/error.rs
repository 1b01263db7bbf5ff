//! Unified Error Model
use thiserror::Error;

use crate::stage::{FailureKind, StageFailure};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UmbrellaError {
    #[error("INPUT/{0} is required")]
    InputMissing(&'static str),

    #[error("CONFIG/{0}")]
    ServiceMisconfigured(String),

    #[error("UPSTREAM/{0}")]
    ServiceUnavailable(String),

    #[error("PARSE/{0}")]
    MalformedOutput(String),

    #[error("SCHEMA/{field}: {detail}")]
    SchemaViolation { field: String, detail: String },
}

impl UmbrellaError {
    /// Client errors are the caller's fault; everything else is a 5xx.
    pub fn is_client_error(&self) -> bool {
        matches!(self, UmbrellaError::InputMissing(_))
    }
}

impl From<StageFailure> for UmbrellaError {
    fn from(failure: StageFailure) -> Self {
        let detail = format!("{}: {}", failure.stage, failure.detail);
        match failure.kind {
            FailureKind::ServiceUnavailable => UmbrellaError::ServiceUnavailable(detail),
            FailureKind::ServiceMisconfigured => UmbrellaError::ServiceMisconfigured(detail),
            FailureKind::MalformedOutput => UmbrellaError::MalformedOutput(detail),
            FailureKind::SchemaViolation { field } => {
                UmbrellaError::SchemaViolation { field, detail }
            }
        }
    }
}
