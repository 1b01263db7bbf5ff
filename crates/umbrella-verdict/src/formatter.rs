//! Verdict Formatter
//!
//! Folds the merged stage outputs of one pipeline run into a [`Verdict`].
//! Pure: no I/O, same input gives byte-identical output.

use thiserror::Error;
use umbrella_core::{Metric, Modality, StageIndex, StageKey};
use umbrella_registry::{SchemaRegistry, StageResult};

use crate::verdict::{Verdict, VerdictBody};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FormatError {
    #[error("FORMAT/{0} does not carry a verdict")]
    NotVerdict(StageKey),

    #[error("FORMAT/{first} cannot be reviewed by {review}")]
    StageMismatch { first: StageKey, review: StageKey },

    #[error("FORMAT/{stage} has no metric for '{category}'")]
    MissingMetric { stage: StageKey, category: &'static str },

    #[error("FORMAT/{stage} reports unknown metric '{name}'")]
    UnknownMetric { stage: StageKey, name: String },

    #[error("FORMAT/{stage} reports '{category}' twice")]
    DuplicateMetric { stage: StageKey, category: &'static str },

    #[error("FORMAT/{stage} {field} = {value} is out of range")]
    OutOfRange {
        stage: StageKey,
        field: String,
        value: f64,
    },

    #[error("FORMAT/voice verdict has no transcription")]
    MissingTranscription,

    #[error("FORMAT/serialization failed: {0}")]
    Serialize(String),
}

impl FormatError {
    /// Field the error is about, for error reporting upstream
    pub fn field(&self) -> &str {
        match self {
            FormatError::MissingMetric { .. }
            | FormatError::UnknownMetric { .. }
            | FormatError::DuplicateMetric { .. } => "metrics",
            FormatError::OutOfRange { field, .. } => field,
            FormatError::MissingTranscription => "transcription",
            FormatError::NotVerdict(_)
            | FormatError::StageMismatch { .. }
            | FormatError::Serialize(_) => "$",
        }
    }
}

/// Stage results of a finished pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum MergedOutputs {
    /// The only stage is also the verdict source
    Single(StageResult),
    /// Descriptive stage plus the review that decided
    Reviewed {
        first: StageResult,
        review: StageResult,
    },
}

impl MergedOutputs {
    pub fn modality(&self) -> Modality {
        self.final_result().key().modality()
    }

    /// Result of stage 1, kept for transparency
    pub fn first(&self) -> &StageResult {
        match self {
            MergedOutputs::Single(result) => result,
            MergedOutputs::Reviewed { first, .. } => first,
        }
    }

    /// Result the verdict fields come from
    pub fn final_result(&self) -> &StageResult {
        match self {
            MergedOutputs::Single(result) => result,
            MergedOutputs::Reviewed { review, .. } => review,
        }
    }

    pub fn stage_count(&self) -> usize {
        match self {
            MergedOutputs::Single(_) => 1,
            MergedOutputs::Reviewed { .. } => 2,
        }
    }
}

/// Build the verdict for `merged`
pub fn format(merged: &MergedOutputs, registry: &SchemaRegistry) -> Result<Verdict, FormatError> {
    let last = merged.final_result();
    let stage = last.key();
    let judgement = last.judgement().ok_or(FormatError::NotVerdict(stage))?;

    if let MergedOutputs::Reviewed { first, review } = merged {
        let expected = StageKey::new(review.key().modality(), StageIndex::First);
        if expected != Some(first.key()) {
            return Err(FormatError::StageMismatch {
                first: first.key(),
                review: review.key(),
            });
        }
    }

    let schema = registry.schema(stage);
    let range = schema.value_range();

    let mut slots: Vec<Option<&Metric>> = vec![None; schema.categories.len()];
    for metric in &judgement.metrics {
        let category = schema
            .category_for_label(&metric.name)
            .ok_or_else(|| FormatError::UnknownMetric {
                stage,
                name: metric.name.clone(),
            })?;
        let position = schema.category_position(category).ok_or_else(|| {
            FormatError::UnknownMetric {
                stage,
                name: metric.name.clone(),
            }
        })?;
        if slots[position].replace(metric).is_some() {
            return Err(FormatError::DuplicateMetric {
                stage,
                category: category.label,
            });
        }
    }

    let mut metrics = Vec::with_capacity(slots.len());
    for (category, slot) in schema.categories.iter().zip(slots) {
        let metric = slot.ok_or(FormatError::MissingMetric {
            stage,
            category: category.label,
        })?;
        if !range.contains(metric.value) {
            return Err(FormatError::OutOfRange {
                stage,
                field: format!("metrics.{}", category.label),
                value: metric.value,
            });
        }
        metrics.push(Metric::new(category.label, metric.value, metric.description.clone()));
    }

    if !range.contains(judgement.confidence_score) {
        return Err(FormatError::OutOfRange {
            stage,
            field: "confidenceScore".to_string(),
            value: judgement.confidence_score,
        });
    }

    let transcription = match stage.modality() {
        Modality::Voice => Some(
            judgement
                .transcription
                .clone()
                .ok_or(FormatError::MissingTranscription)?,
        ),
        _ => None,
    };

    let first_stage_analysis = match merged {
        MergedOutputs::Single(_) => None,
        MergedOutputs::Reviewed { first, .. } => Some(
            first
                .to_pretty_json()
                .map_err(|e| FormatError::Serialize(e.to_string()))?,
        ),
    };

    VerdictBody {
        is_safe: judgement.is_safe,
        reason: judgement.reason.clone(),
        transcription,
        metrics,
        confidence_score: judgement.confidence_score,
        recommended_action: judgement.recommended_action.clone(),
        first_stage_analysis,
    }
    .seal()
    .map_err(|e| FormatError::Serialize(e.to_string()))
}
