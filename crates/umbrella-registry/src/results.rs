//! Typed stage results
//!
//! One variant per [`StageKey`]. Each variant is only ever built from JSON
//! that already passed [`crate::validate`], so serde here only maps names.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use umbrella_core::{Metric, StageKey};

/// Verdict-bearing result shared by text moderation and every review stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Judgement {
    pub is_safe: bool,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    pub metrics: Vec<Metric>,
    pub confidence_score: f64,
    pub recommended_action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCategories {
    pub violence: f64,
    pub gore: f64,
    pub sexual_content: f64,
    pub hate_speech: f64,
    pub harassment: f64,
    pub self_harm: f64,
    pub illegal_activity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDescription {
    pub description: String,
    pub analysis: String,
    pub content_categories: ImageCategories,
    pub objects_detected: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceCategories {
    pub hate_speech: f64,
    pub violence: f64,
    pub sexual_content: f64,
    pub harassment: f64,
    pub self_harm: f64,
    pub illegal_activity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceTranscript {
    pub transcription: String,
    pub analysis: String,
    pub tone_assessment: String,
    pub content_categories: VoiceCategories,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManipulationIndicators {
    pub facial_inconsistencies: f64,
    pub audio_visual_mismatch: f64,
    pub unnatural_movements: f64,
    pub texture_artifacts: f64,
    pub background_inconsistencies: f64,
    pub metadata_manipulation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepfakeIndicators {
    pub media_type: String,
    pub technical_analysis: String,
    pub detected_artifacts: Vec<String>,
    pub manipulation_indicators: ManipulationIndicators,
    pub overall_deepfake_score: f64,
}

/// Parsed, validated output of one stage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageResult {
    TextModeration(Judgement),
    ImageDescription(ImageDescription),
    ImageReview(Judgement),
    VoiceTranscription(VoiceTranscript),
    VoiceReview(Judgement),
    DeepfakeIndicators(DeepfakeIndicators),
    DeepfakeReview(Judgement),
}

impl StageResult {
    /// Map validated JSON onto the variant for `key`
    pub fn from_validated(key: StageKey, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match key {
            StageKey::TextModeration => StageResult::TextModeration(serde_json::from_value(value)?),
            StageKey::ImageDescription => {
                StageResult::ImageDescription(serde_json::from_value(value)?)
            }
            StageKey::ImageReview => StageResult::ImageReview(serde_json::from_value(value)?),
            StageKey::VoiceTranscription => {
                StageResult::VoiceTranscription(serde_json::from_value(value)?)
            }
            StageKey::VoiceReview => StageResult::VoiceReview(serde_json::from_value(value)?),
            StageKey::DeepfakeIndicators => {
                StageResult::DeepfakeIndicators(serde_json::from_value(value)?)
            }
            StageKey::DeepfakeReview => StageResult::DeepfakeReview(serde_json::from_value(value)?),
        })
    }

    pub fn key(&self) -> StageKey {
        match self {
            StageResult::TextModeration(_) => StageKey::TextModeration,
            StageResult::ImageDescription(_) => StageKey::ImageDescription,
            StageResult::ImageReview(_) => StageKey::ImageReview,
            StageResult::VoiceTranscription(_) => StageKey::VoiceTranscription,
            StageResult::VoiceReview(_) => StageKey::VoiceReview,
            StageResult::DeepfakeIndicators(_) => StageKey::DeepfakeIndicators,
            StageResult::DeepfakeReview(_) => StageKey::DeepfakeReview,
        }
    }

    /// Verdict fields, for stages that produce them
    pub fn judgement(&self) -> Option<&Judgement> {
        match self {
            StageResult::TextModeration(j)
            | StageResult::ImageReview(j)
            | StageResult::VoiceReview(j)
            | StageResult::DeepfakeReview(j) => Some(j),
            StageResult::ImageDescription(_)
            | StageResult::VoiceTranscription(_)
            | StageResult::DeepfakeIndicators(_) => None,
        }
    }

    /// Two-space indented JSON, the form handed to reviewers and auditors
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
