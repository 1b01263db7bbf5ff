//! Model selection and sampling per stage

use serde::{Deserialize, Serialize};
use umbrella_core::{StageIndex, StageKey};

pub const DEFAULT_TEXT_MODEL: &str = "llama3-8b-8192";
pub const DEFAULT_VISION_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
pub const DEFAULT_AUDIO_MODEL: &str = "whisper-large-v3-turbo";
pub const DEFAULT_REVIEW_MODEL: &str = "llama3-8b-8192";

/// Descriptive stages: room to produce a plausible description
pub const DESCRIPTIVE_TEMPERATURE: f32 = 0.7;
/// Adjudicative stages: consistent verdicts
pub const ADJUDICATIVE_TEMPERATURE: f32 = 0.2;
pub const CHAT_TEMPERATURE: f32 = 0.7;
pub const CHAT_MAX_TOKENS: u32 = 1000;

/// Model identifiers by role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Text moderation and chat
    pub text: String,
    /// Image description and deepfake indicators
    pub vision: String,
    /// Voice transcription
    pub audio: String,
    /// Every second stage
    pub review: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT_MODEL.to_string(),
            vision: DEFAULT_VISION_MODEL.to_string(),
            audio: DEFAULT_AUDIO_MODEL.to_string(),
            review: DEFAULT_REVIEW_MODEL.to_string(),
        }
    }
}

impl ModelConfig {
    pub fn model_for(&self, key: StageKey) -> &str {
        match key {
            StageKey::TextModeration => &self.text,
            StageKey::ImageDescription | StageKey::DeepfakeIndicators => &self.vision,
            StageKey::VoiceTranscription => &self.audio,
            StageKey::ImageReview | StageKey::VoiceReview | StageKey::DeepfakeReview => {
                &self.review
            }
        }
    }

    pub fn chat_model(&self) -> &str {
        &self.text
    }
}

/// A stage that only describes runs warm; anything that decides runs cold.
pub fn temperature_for(key: StageKey) -> f32 {
    if key.index() == StageIndex::First && !key.is_final() {
        DESCRIPTIVE_TEMPERATURE
    } else {
        ADJUDICATIVE_TEMPERATURE
    }
}
