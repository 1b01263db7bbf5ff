//! Data Model: Submission, StagePrompt, Metric, StageTrace
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::media;
use crate::stage::{StageIndex, StageKey};

/// Content category being analyzed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Modality {
    Text,
    Image,
    Voice,
    /// Deepfake detection over image, video or audio files
    MixedMedia,
}

impl Modality {
    pub const ALL: [Modality; 4] = [
        Modality::Text,
        Modality::Image,
        Modality::Voice,
        Modality::MixedMedia,
    ];

    /// Stages run for this modality, in order
    pub fn stages(&self) -> &'static [StageIndex] {
        match self {
            Modality::Text => &[StageIndex::First],
            Modality::Image | Modality::Voice | Modality::MixedMedia => {
                &[StageIndex::First, StageIndex::Second]
            }
        }
    }

    /// Stage whose result is the verdict source
    pub fn final_stage(&self) -> StageKey {
        match self {
            Modality::Text => StageKey::TextModeration,
            Modality::Image => StageKey::ImageReview,
            Modality::Voice => StageKey::VoiceReview,
            Modality::MixedMedia => StageKey::DeepfakeReview,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Image => "image",
            Modality::Voice => "voice",
            Modality::MixedMedia => "mixed-media",
        }
    }

    /// Request field that carries the content
    pub fn input_field(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Image => "image",
            Modality::Voice => "audio",
            Modality::MixedMedia => "file",
        }
    }

    /// Operation phrase for caller-facing failures ("Failed to analyze image")
    pub fn operation(&self) -> &'static str {
        match self {
            Modality::Text => "moderate text",
            Modality::Image => "analyze image",
            Modality::Voice => "analyze voice",
            Modality::MixedMedia => "detect deepfake",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoded media blob with its declared metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    /// Base64 data URI exactly as submitted
    pub encoded: String,
    pub media_type: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Media(MediaPayload),
}

/// User-provided payload for one analysis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    modality: Modality,
    payload: Payload,
}

impl Submission {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            modality: Modality::Text,
            payload: Payload::Text(text.into()),
        }
    }

    pub fn image(data_uri: impl Into<String>) -> Self {
        let encoded = data_uri.into();
        Self {
            modality: Modality::Image,
            payload: Payload::Media(MediaPayload {
                media_type: media::declared_media_type(&encoded),
                encoded,
                filename: None,
            }),
        }
    }

    pub fn voice(data_uri: impl Into<String>, filename: Option<String>) -> Self {
        let encoded = data_uri.into();
        Self {
            modality: Modality::Voice,
            payload: Payload::Media(MediaPayload {
                media_type: media::declared_media_type(&encoded),
                encoded,
                filename,
            }),
        }
    }

    /// Deepfake submission. An explicit `file_type` wins over the data URI's
    /// declared media type.
    pub fn mixed_media(
        data_uri: impl Into<String>,
        filename: Option<String>,
        file_type: Option<String>,
    ) -> Self {
        let encoded = data_uri.into();
        let media_type = file_type.or_else(|| media::declared_media_type(&encoded));
        Self {
            modality: Modality::MixedMedia,
            payload: Payload::Media(MediaPayload {
                encoded,
                media_type,
                filename,
            }),
        }
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Raw submitted content: the text, or the full encoded blob
    pub fn content(&self) -> &str {
        match &self.payload {
            Payload::Text(text) => text,
            Payload::Media(media) => &media.encoded,
        }
    }
}

/// Canonical unit of reported risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    /// Score from 0 (absent) to 1 (certain)
    pub value: f64,
    pub description: String,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Role-tagged message sent to the inference service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Model and sampling settings for one inference call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub model: String,
    pub temperature: f32,
    /// Demand a JSON object as the completion
    pub json_output: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl SamplingParams {
    pub fn json(model: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            temperature,
            json_output: true,
            max_tokens: None,
        }
    }

    pub fn free_text(model: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            temperature,
            json_output: false,
            max_tokens: Some(max_tokens),
        }
    }
}

/// Instruction payload for one stage invocation. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct StagePrompt {
    stage: StageKey,
    messages: Vec<ChatMessage>,
    sampling: SamplingParams,
}

impl StagePrompt {
    pub fn new(stage: StageKey, messages: Vec<ChatMessage>, sampling: SamplingParams) -> Self {
        Self {
            stage,
            messages,
            sampling,
        }
    }

    pub fn stage(&self) -> StageKey {
        self.stage
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn sampling(&self) -> &SamplingParams {
        &self.sampling
    }

    pub fn model(&self) -> &str {
        &self.sampling.model
    }
}

/// Record of one executed stage, kept for logs and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTrace {
    pub id: String,
    pub model: String,
    pub prompt_hash: String,
    pub output_hash: String,
    pub latency_ms: u64,
}
