//! Stage identity and stage failures
//!
//! A stage is one sequential call to the inference service. The set of
//! (modality, stage) pairs is closed: [`StageKey`] enumerates every pair the
//! pipeline can run, so a pair without a schema or template cannot be named
//! at request time.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data_model::Modality;

/// Position of a stage inside a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageIndex {
    /// Descriptive stage, sees the submission
    First,
    /// Adjudicative stage, sees only the first stage's result
    Second,
}

impl StageIndex {
    pub fn number(&self) -> u8 {
        match self {
            StageIndex::First => 1,
            StageIndex::Second => 2,
        }
    }
}

/// Every (modality, stage) pair the pipeline knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKey {
    TextModeration,
    ImageDescription,
    ImageReview,
    VoiceTranscription,
    VoiceReview,
    DeepfakeIndicators,
    DeepfakeReview,
}

impl StageKey {
    pub const ALL: [StageKey; 7] = [
        StageKey::TextModeration,
        StageKey::ImageDescription,
        StageKey::ImageReview,
        StageKey::VoiceTranscription,
        StageKey::VoiceReview,
        StageKey::DeepfakeIndicators,
        StageKey::DeepfakeReview,
    ];

    /// Resolve a (modality, stage) pair. `None` for pairs the modality never runs.
    pub fn new(modality: Modality, index: StageIndex) -> Option<Self> {
        match (modality, index) {
            (Modality::Text, StageIndex::First) => Some(StageKey::TextModeration),
            (Modality::Text, StageIndex::Second) => None,
            (Modality::Image, StageIndex::First) => Some(StageKey::ImageDescription),
            (Modality::Image, StageIndex::Second) => Some(StageKey::ImageReview),
            (Modality::Voice, StageIndex::First) => Some(StageKey::VoiceTranscription),
            (Modality::Voice, StageIndex::Second) => Some(StageKey::VoiceReview),
            (Modality::MixedMedia, StageIndex::First) => Some(StageKey::DeepfakeIndicators),
            (Modality::MixedMedia, StageIndex::Second) => Some(StageKey::DeepfakeReview),
        }
    }

    pub fn modality(&self) -> Modality {
        match self {
            StageKey::TextModeration => Modality::Text,
            StageKey::ImageDescription | StageKey::ImageReview => Modality::Image,
            StageKey::VoiceTranscription | StageKey::VoiceReview => Modality::Voice,
            StageKey::DeepfakeIndicators | StageKey::DeepfakeReview => Modality::MixedMedia,
        }
    }

    pub fn index(&self) -> StageIndex {
        match self {
            StageKey::TextModeration
            | StageKey::ImageDescription
            | StageKey::VoiceTranscription
            | StageKey::DeepfakeIndicators => StageIndex::First,
            StageKey::ImageReview | StageKey::VoiceReview | StageKey::DeepfakeReview => {
                StageIndex::Second
            }
        }
    }

    /// Stable stage id (ex: "image.review.v1"), also the prompt template name
    pub fn id(&self) -> &'static str {
        match self {
            StageKey::TextModeration => "text.moderation.v1",
            StageKey::ImageDescription => "image.describe.v1",
            StageKey::ImageReview => "image.review.v1",
            StageKey::VoiceTranscription => "voice.transcribe.v1",
            StageKey::VoiceReview => "voice.review.v1",
            StageKey::DeepfakeIndicators => "deepfake.indicators.v1",
            StageKey::DeepfakeReview => "deepfake.review.v1",
        }
    }

    /// Whether this stage produces the authoritative verdict for its modality
    pub fn is_final(&self) -> bool {
        self.modality().final_stage() == *self
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// What went wrong inside a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport failure or non-2xx from the inference service
    ServiceUnavailable,
    /// Credential or endpoint missing
    ServiceMisconfigured,
    /// Completion text did not parse as JSON
    MalformedOutput,
    /// JSON parsed but did not satisfy the stage schema
    SchemaViolation { field: String },
}

/// Failure of a single stage; fatal to the whole pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: StageKey,
    pub kind: FailureKind,
    pub detail: String,
}

impl StageFailure {
    pub fn new(stage: StageKey, kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            detail: detail.into(),
        }
    }

    pub fn malformed(stage: StageKey, detail: impl Into<String>) -> Self {
        Self::new(stage, FailureKind::MalformedOutput, detail)
    }

    pub fn schema_violation(
        stage: StageKey,
        field: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::new(
            stage,
            FailureKind::SchemaViolation {
                field: field.into(),
            },
            detail,
        )
    }

    /// Offending field for schema violations
    pub fn field(&self) -> Option<&str> {
        match &self.kind {
            FailureKind::SchemaViolation { field } => Some(field),
            _ => None,
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            FailureKind::ServiceUnavailable => {
                write!(f, "UPSTREAM/UNAVAILABLE [{}]: {}", self.stage, self.detail)
            }
            FailureKind::ServiceMisconfigured => {
                write!(f, "UPSTREAM/CONFIG [{}]: {}", self.stage, self.detail)
            }
            FailureKind::MalformedOutput => {
                write!(f, "PARSE/MALFORMED [{}]: {}", self.stage, self.detail)
            }
            FailureKind::SchemaViolation { field } => {
                write!(f, "SCHEMA/VIOLATION [{}] {}: {}", self.stage, field, self.detail)
            }
        }
    }
}

impl std::error::Error for StageFailure {}
