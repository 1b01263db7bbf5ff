//! Schema Registry
//!
//! Compile-time table from [`StageKey`] to its [`StageSchema`]. Building a
//! [`SchemaRegistry`] checks the table's integrity once; the server refuses to
//! start if that check fails.

use std::collections::HashSet;
use thiserror::Error;
use umbrella_core::{Modality, StageIndex, StageKey};

use crate::schema::{Category, FieldKind, FieldSpec, StageSchema, ValueRange};

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("REGISTRY/no schema registered for {modality} stage {stage}")]
    Unregistered { modality: Modality, stage: u8 },

    #[error("REGISTRY/{0} is keyed under the wrong stage")]
    KeyMismatch(StageKey),

    #[error("REGISTRY/{0} declares no categories")]
    EmptyCategories(StageKey),

    #[error("REGISTRY/{stage} declares category '{category}' twice")]
    DuplicateCategory { stage: StageKey, category: String },

    #[error("REGISTRY/{stage} declares field '{field}' twice")]
    DuplicateField { stage: StageKey, field: String },

    #[error("REGISTRY/{stage} must have exactly one categorized field, found {count}")]
    CategorizedFieldCount { stage: StageKey, count: usize },

    #[error("REGISTRY/{0} has an empty or inverted value range")]
    InvalidRange(StageKey),

    #[error("REGISTRY/final stage {stage} lacks verdict field '{field}'")]
    NotVerdictShaped { stage: StageKey, field: &'static str },
}

/// Fields every verdict-producing stage must declare
pub const VERDICT_FIELDS: &[&str] = &[
    "isSafe",
    "reason",
    "metrics",
    "confidenceScore",
    "recommendedAction",
];

const REVIEW_REASON: &str = "Clear explanation of your decision";
const REVIEW_CONFIDENCE: &str = "Overall confidence in your assessment";
const REVIEW_ACTION: &str = "What action should be taken with this content";
const METRIC_HINT: &str = "Brief description of each category's presence";

// ---------------------------------------------------------------------------
// text
// ---------------------------------------------------------------------------

const TEXT_MODERATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(
        "isSafe",
        FieldKind::Bool,
        "true if the content is safe, false if it's potentially harmful",
    ),
    FieldSpec::new(
        "reason",
        FieldKind::Text,
        "brief explanation of why the content is flagged or why it's safe",
    ),
    FieldSpec::new(
        "metrics",
        FieldKind::MetricList,
        "0 is safe and 1 is harmful; the description briefly explains the category's presence",
    ),
    FieldSpec::new("confidenceScore", FieldKind::Score, REVIEW_CONFIDENCE),
    FieldSpec::new("recommendedAction", FieldKind::Text, REVIEW_ACTION),
];

const TEXT_CATEGORIES: &[Category] = &[
    Category::new("hateSpeech", "Hate Speech"),
    Category::new("violenceThreats", "Violence/Threats"),
    Category::new("sexualContent", "Sexual Content"),
    Category::new("selfHarm", "Self-Harm"),
    Category::new("illegalActivities", "Illegal Activities"),
    Category::new("harassmentBullying", "Harassment/Bullying"),
];

// ---------------------------------------------------------------------------
// image
// ---------------------------------------------------------------------------

const IMAGE_DESCRIPTION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("description", FieldKind::Text, "Detailed description of the image"),
    FieldSpec::new("analysis", FieldKind::Text, "Your assessment of the content"),
    FieldSpec::new(
        "contentCategories",
        FieldKind::CategoryMap,
        "Score from 0-1 for each category",
    ),
    FieldSpec::new(
        "objectsDetected",
        FieldKind::TextList,
        "list of objects in the image",
    ),
];

const IMAGE_DESCRIPTION_CATEGORIES: &[Category] = &[
    Category::new("violence", "Violence"),
    Category::new("gore", "Gore"),
    Category::new("sexualContent", "Sexual Content"),
    Category::new("hateSpeech", "Hate Speech"),
    Category::new("harassment", "Harassment"),
    Category::new("selfHarm", "Self-Harm"),
    Category::new("illegalActivity", "Illegal Activity"),
];

const IMAGE_REVIEW_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(
        "isSafe",
        FieldKind::Bool,
        "true if the image is safe, false if it is harmful",
    ),
    FieldSpec::new("reason", FieldKind::Text, REVIEW_REASON),
    FieldSpec::new("metrics", FieldKind::MetricList, METRIC_HINT),
    FieldSpec::new("confidenceScore", FieldKind::Score, REVIEW_CONFIDENCE),
    FieldSpec::new("recommendedAction", FieldKind::Text, REVIEW_ACTION),
];

const IMAGE_REVIEW_CATEGORIES: &[Category] = &[
    Category::new("violenceGore", "Violence/Gore"),
    Category::new("sexualContent", "Sexual Content"),
    Category::new("hateSpeech", "Hate Speech"),
    Category::new("harassment", "Harassment"),
    Category::new("selfHarm", "Self-Harm"),
    Category::new("illegalActivity", "Illegal Activity"),
];

// ---------------------------------------------------------------------------
// voice
// ---------------------------------------------------------------------------

const VOICE_TRANSCRIPTION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("transcription", FieldKind::Text, "The full transcribed text"),
    FieldSpec::new(
        "analysis",
        FieldKind::Text,
        "Your detailed analysis of the content",
    ),
    FieldSpec::new(
        "toneAssessment",
        FieldKind::Text,
        "Assessment of the tone (angry, calm, threatening, etc.)",
    ),
    FieldSpec::new(
        "contentCategories",
        FieldKind::CategoryMap,
        "Score from 0-1 for each category",
    ),
];

const VOICE_CATEGORIES: &[Category] = &[
    Category::new("hateSpeech", "Hate Speech"),
    Category::new("violence", "Violence"),
    Category::new("sexualContent", "Sexual Content"),
    Category::new("harassment", "Harassment"),
    Category::new("selfHarm", "Self-Harm"),
    Category::new("illegalActivity", "Illegal Activity"),
];

const VOICE_REVIEW_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(
        "isSafe",
        FieldKind::Bool,
        "true if the content is safe, false if it is harmful",
    ),
    FieldSpec::new("reason", FieldKind::Text, REVIEW_REASON),
    FieldSpec::new("transcription", FieldKind::Text, "The transcribed text"),
    FieldSpec::new("metrics", FieldKind::MetricList, METRIC_HINT),
    FieldSpec::new("confidenceScore", FieldKind::Score, REVIEW_CONFIDENCE),
    FieldSpec::new("recommendedAction", FieldKind::Text, REVIEW_ACTION),
];

// ---------------------------------------------------------------------------
// mixed media (deepfake)
// ---------------------------------------------------------------------------

const DEEPFAKE_INDICATOR_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(
        "mediaType",
        FieldKind::Text,
        "The type of media (image, video, audio)",
    ),
    FieldSpec::new(
        "technicalAnalysis",
        FieldKind::Text,
        "Detailed technical assessment of potential manipulation",
    ),
    FieldSpec::new(
        "detectedArtifacts",
        FieldKind::TextList,
        "list of suspicious elements",
    ),
    FieldSpec::new(
        "manipulationIndicators",
        FieldKind::CategoryMap,
        "Score from 0-1 for each indicator",
    ),
    FieldSpec::new(
        "overallDeepfakeScore",
        FieldKind::Score,
        "Likelihood from 0-1 that the content is AI-generated or manipulated",
    ),
];

const DEEPFAKE_CATEGORIES: &[Category] = &[
    Category::new("facialInconsistencies", "Facial Inconsistencies"),
    Category::new("audioVisualMismatch", "Audio-Visual Mismatch"),
    Category::new("unnaturalMovements", "Unnatural Movements"),
    Category::new("textureArtifacts", "Texture Artifacts"),
    Category::new("backgroundInconsistencies", "Background Inconsistencies"),
    Category::new("metadataManipulation", "Metadata Manipulation"),
];

const DEEPFAKE_REVIEW_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(
        "isSafe",
        FieldKind::Bool,
        "true if authentic, false if likely deepfake",
    ),
    FieldSpec::new("reason", FieldKind::Text, REVIEW_REASON),
    FieldSpec::new(
        "metrics",
        FieldKind::MetricList,
        "Brief description of each manipulation indicator",
    ),
    FieldSpec::new("confidenceScore", FieldKind::Score, REVIEW_CONFIDENCE),
    FieldSpec::new("recommendedAction", FieldKind::Text, REVIEW_ACTION),
];

static TEXT_MODERATION: StageSchema = StageSchema {
    key: StageKey::TextModeration,
    fields: TEXT_MODERATION_FIELDS,
    categories: TEXT_CATEGORIES,
    value_range: ValueRange::UNIT,
};

static IMAGE_DESCRIPTION: StageSchema = StageSchema {
    key: StageKey::ImageDescription,
    fields: IMAGE_DESCRIPTION_FIELDS,
    categories: IMAGE_DESCRIPTION_CATEGORIES,
    value_range: ValueRange::UNIT,
};

static IMAGE_REVIEW: StageSchema = StageSchema {
    key: StageKey::ImageReview,
    fields: IMAGE_REVIEW_FIELDS,
    categories: IMAGE_REVIEW_CATEGORIES,
    value_range: ValueRange::UNIT,
};

static VOICE_TRANSCRIPTION: StageSchema = StageSchema {
    key: StageKey::VoiceTranscription,
    fields: VOICE_TRANSCRIPTION_FIELDS,
    categories: VOICE_CATEGORIES,
    value_range: ValueRange::UNIT,
};

static VOICE_REVIEW: StageSchema = StageSchema {
    key: StageKey::VoiceReview,
    fields: VOICE_REVIEW_FIELDS,
    categories: VOICE_CATEGORIES,
    value_range: ValueRange::UNIT,
};

static DEEPFAKE_INDICATORS: StageSchema = StageSchema {
    key: StageKey::DeepfakeIndicators,
    fields: DEEPFAKE_INDICATOR_FIELDS,
    categories: DEEPFAKE_CATEGORIES,
    value_range: ValueRange::UNIT,
};

static DEEPFAKE_REVIEW: StageSchema = StageSchema {
    key: StageKey::DeepfakeReview,
    fields: DEEPFAKE_REVIEW_FIELDS,
    categories: DEEPFAKE_CATEGORIES,
    value_range: ValueRange::UNIT,
};

/// The compile-time mapping. Exhaustive over [`StageKey`].
fn standard_schema(key: StageKey) -> &'static StageSchema {
    match key {
        StageKey::TextModeration => &TEXT_MODERATION,
        StageKey::ImageDescription => &IMAGE_DESCRIPTION,
        StageKey::ImageReview => &IMAGE_REVIEW,
        StageKey::VoiceTranscription => &VOICE_TRANSCRIPTION,
        StageKey::VoiceReview => &VOICE_REVIEW,
        StageKey::DeepfakeIndicators => &DEEPFAKE_INDICATORS,
        StageKey::DeepfakeReview => &DEEPFAKE_REVIEW,
    }
}

/// Verified view over the schema table
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    _verified: (),
}

impl SchemaRegistry {
    /// Build the registry, checking every registered schema.
    pub fn standard() -> Result<Self, RegistryError> {
        for key in StageKey::ALL {
            verify(key, standard_schema(key))?;
        }
        Ok(Self { _verified: () })
    }

    /// Schema for a known stage
    pub fn schema(&self, key: StageKey) -> &'static StageSchema {
        standard_schema(key)
    }

    /// Schema for a (modality, stage) pair
    pub fn schema_for(
        &self,
        modality: Modality,
        index: StageIndex,
    ) -> Result<&'static StageSchema, RegistryError> {
        StageKey::new(modality, index)
            .map(standard_schema)
            .ok_or(RegistryError::Unregistered {
                modality,
                stage: index.number(),
            })
    }

    /// Schemas in pipeline order for a modality
    pub fn plan(&self, modality: Modality) -> Vec<&'static StageSchema> {
        modality
            .stages()
            .iter()
            .filter_map(|index| StageKey::new(modality, *index))
            .map(standard_schema)
            .collect()
    }
}

fn verify(key: StageKey, schema: &StageSchema) -> Result<(), RegistryError> {
    if schema.key != key {
        return Err(RegistryError::KeyMismatch(key));
    }
    if schema.categories.is_empty() {
        return Err(RegistryError::EmptyCategories(key));
    }

    let range = schema.value_range;
    if !(range.min.is_finite() && range.max.is_finite() && range.min < range.max) {
        return Err(RegistryError::InvalidRange(key));
    }

    let mut seen = HashSet::new();
    for category in schema.categories {
        let label = category.label.to_ascii_lowercase();
        if !seen.insert(category.key.to_string()) || !seen.insert(format!("label:{label}")) {
            return Err(RegistryError::DuplicateCategory {
                stage: key,
                category: category.label.to_string(),
            });
        }
    }

    let mut names = HashSet::new();
    for field in schema.fields {
        if !names.insert(field.name) {
            return Err(RegistryError::DuplicateField {
                stage: key,
                field: field.name.to_string(),
            });
        }
    }

    let categorized = schema.fields.iter().filter(|f| f.kind.is_categorized()).count();
    if categorized != 1 {
        return Err(RegistryError::CategorizedFieldCount {
            stage: key,
            count: categorized,
        });
    }

    if key.is_final() {
        for field in VERDICT_FIELDS {
            if schema.field(field).is_none() {
                return Err(RegistryError::NotVerdictShaped {
                    stage: key,
                    field: *field,
                });
            }
        }
        if !schema.is_verdict_shaped() {
            return Err(RegistryError::NotVerdictShaped {
                stage: key,
                field: "metrics",
            });
        }
    }

    Ok(())
}
