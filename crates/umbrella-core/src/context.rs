//! Execution Context: per-request identity carried through the pipeline
use chrono::{DateTime, Utc};

use crate::data_model::Modality;

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub request_id: String,
    pub modality: Modality,
    pub started_at: DateTime<Utc>,
}

impl ExecutionContext {
    pub fn new(modality: Modality) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            modality,
            started_at: Utc::now(),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}
