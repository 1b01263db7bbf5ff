//! OpenAI-compatible chat completions client

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use umbrella_core::{ChatMessage, SamplingParams};

use crate::{InferenceClient, InferenceError};

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// `POST {endpoint}` with a bearer credential
pub struct ChatCompletionsClient {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ChatCompletionsClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client: reqwest::Client::new(),
        }
    }

    /// Client for the hosted Groq endpoint
    pub fn groq(api_key: Option<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, api_key)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn credential(&self) -> Result<&str, InferenceError> {
        if self.endpoint.trim().is_empty() {
            return Err(InferenceError::Misconfigured(
                "no inference endpoint configured".to_string(),
            ));
        }
        self.api_key
            .as_deref()
            .ok_or_else(|| InferenceError::Misconfigured("no API key configured".to_string()))
    }
}

#[async_trait]
impl InferenceClient for ChatCompletionsClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<String, InferenceError> {
        let api_key = self.credential()?;

        let body = ChatCompletionRequest {
            model: &params.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            response_format: params
                .json_output
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %params.model,
            messages = messages.len(),
            "inference request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    InferenceError::Transport(format!("cannot connect to {}", self.endpoint))
                } else if e.is_timeout() {
                    InferenceError::Transport("request timed out".to_string())
                } else {
                    InferenceError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| InferenceError::Envelope(e.to_string()))?;

        envelope
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                InferenceError::Envelope("response missing choices[0].message.content".to_string())
            })
    }

    fn check_configured(&self) -> Result<(), InferenceError> {
        self.credential().map(|_| ())
    }
}
