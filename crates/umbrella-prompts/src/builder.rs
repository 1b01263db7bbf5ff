//! Prompt Builder
//!
//! Turns a submission (stage 1) or a prior stage result (stage 2) into the
//! messages and sampling settings for one inference call. Response contracts
//! are rendered from the stage schema, so the instructions and the validator
//! always agree on field names and categories.

use serde_json::{json, Map, Value};
use umbrella_core::media::{excerpt, EXCERPT_CHARS};
use umbrella_core::{
    ChatMessage, Modality, Payload, Role, SamplingParams, StageIndex, StageKey, StagePrompt,
    Submission,
};
use umbrella_registry::{FieldKind, SchemaRegistry, StageResult, StageSchema};

use crate::models::{temperature_for, ModelConfig, CHAT_MAX_TOKENS, CHAT_TEMPERATURE};
use crate::renderer::{Part, PromptRenderer};
use crate::templates::TemplatesFile;
use crate::{PromptError, CHAT_TEMPLATE};

/// Messages and sampling for a chat turn
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    pub messages: Vec<ChatMessage>,
    pub sampling: SamplingParams,
}

pub struct PromptBuilder {
    registry: SchemaRegistry,
    renderer: PromptRenderer,
    models: ModelConfig,
}

impl PromptBuilder {
    /// Builder over the embedded templates and the standard registry
    pub fn standard(models: ModelConfig) -> Result<Self, PromptError> {
        Self::new(SchemaRegistry::standard()?, models, TemplatesFile::embedded()?)
    }

    /// Fails unless every stage has both template parts and chat has a system part.
    pub fn new(
        registry: SchemaRegistry,
        models: ModelConfig,
        templates: TemplatesFile,
    ) -> Result<Self, PromptError> {
        let renderer = PromptRenderer::new(templates)?;

        for key in StageKey::ALL {
            for part in [Part::System, Part::User] {
                if !renderer.has(key.id(), part) {
                    return Err(PromptError::MissingTemplate(key.id().to_string()));
                }
            }
        }
        if !renderer.has(CHAT_TEMPLATE, Part::System) {
            return Err(PromptError::MissingTemplate(CHAT_TEMPLATE.to_string()));
        }

        Ok(Self {
            registry,
            renderer,
            models,
        })
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn models(&self) -> &ModelConfig {
        &self.models
    }

    /// Build the prompt for one stage.
    ///
    /// Stage 1 embeds the submission (an excerpt, for encoded media). Stage 2
    /// reads only `prior` and never looks at `submission`.
    pub fn build(
        &self,
        modality: Modality,
        index: StageIndex,
        submission: &Submission,
        prior: Option<&StageResult>,
    ) -> Result<StagePrompt, PromptError> {
        let schema = self.registry.schema_for(modality, index)?;
        let key = schema.key;
        let mut data = schema_data(schema);

        match index {
            StageIndex::First => {
                if submission.modality() != modality {
                    return Err(PromptError::SubmissionMismatch {
                        stage: key,
                        modality: submission.modality(),
                    });
                }
                submission_data(submission, &mut data);
            }
            StageIndex::Second => {
                let prior = prior.ok_or(PromptError::MissingPrior(key))?;
                let expected = StageKey::new(modality, StageIndex::First);
                if expected != Some(prior.key()) {
                    return Err(PromptError::PriorMismatch {
                        stage: key,
                        got: prior.key(),
                    });
                }
                let analysis = prior
                    .to_pretty_json()
                    .map_err(|e| PromptError::Serialize(e.to_string()))?;
                data.insert("analysis".to_string(), Value::String(analysis));
            }
        }

        let data = Value::Object(data);
        let system = self.renderer.render(key.id(), Part::System, &data)?;
        let user = self.renderer.render(key.id(), Part::User, &data)?;

        Ok(StagePrompt::new(
            key,
            vec![ChatMessage::system(system), ChatMessage::user(user)],
            SamplingParams::json(self.models.model_for(key), temperature_for(key)),
        ))
    }

    /// Prefix the fixed assistant instruction to a conversation. Caller
    /// supplied system turns are dropped.
    pub fn build_chat(&self, history: &[ChatMessage]) -> Result<ChatPrompt, PromptError> {
        let turns: Vec<ChatMessage> = history
            .iter()
            .filter(|m| m.role != Role::System)
            .cloned()
            .collect();
        if turns.is_empty() {
            return Err(PromptError::EmptyConversation);
        }

        let system = self
            .renderer
            .render(CHAT_TEMPLATE, Part::System, &Value::Object(Map::new()))?;
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(ChatMessage::system(system));
        messages.extend(turns);

        Ok(ChatPrompt {
            messages,
            sampling: SamplingParams::free_text(
                self.models.chat_model(),
                CHAT_TEMPERATURE,
                CHAT_MAX_TOKENS,
            ),
        })
    }
}

/// Schema-derived data every stage template can use
fn schema_data(schema: &StageSchema) -> Map<String, Value> {
    let fields: Vec<Value> = schema
        .fields
        .iter()
        .map(|f| {
            json!({
                "name": f.name,
                "shape": shape(f.kind, schema),
                "hint": f.hint,
            })
        })
        .collect();

    let mut data = Map::new();
    data.insert("fields".to_string(), Value::Array(fields));
    data.insert("categories".to_string(), json!(schema.categories));
    data.insert(
        "metricList".to_string(),
        Value::Bool(schema.is_verdict_shaped()),
    );
    let category_map = schema
        .categorized_field()
        .filter(|f| f.kind == FieldKind::CategoryMap)
        .map(|f| Value::String(f.name.to_string()))
        .unwrap_or(Value::Null);
    data.insert("categoryMap".to_string(), category_map);
    data.insert("range".to_string(), json!(schema.value_range));
    data
}

fn submission_data(submission: &Submission, data: &mut Map<String, Value>) {
    match submission.payload() {
        Payload::Text(text) => {
            data.insert("content".to_string(), Value::String(text.clone()));
        }
        Payload::Media(media) => {
            data.insert(
                "excerpt".to_string(),
                Value::String(excerpt(&media.encoded, EXCERPT_CHARS).to_string()),
            );
            data.insert("filename".to_string(), json!(media.filename));
            data.insert("mediaType".to_string(), json!(media.media_type));
        }
    }
}

/// How a field's value is spelled out in the response contract
fn shape(kind: FieldKind, schema: &StageSchema) -> String {
    match kind {
        FieldKind::Text => "string".to_string(),
        FieldKind::Bool => "boolean".to_string(),
        FieldKind::Score => "number".to_string(),
        FieldKind::TextList => "[string, ...]".to_string(),
        FieldKind::CategoryMap => {
            let keys: Vec<String> = schema
                .category_keys()
                .map(|k| format!("\"{}\": number", k))
                .collect();
            format!("{{ {} }}", keys.join(", "))
        }
        FieldKind::MetricList => {
            r#"[{ "name": string, "value": number, "description": string }, ...]"#.to_string()
        }
    }
}
