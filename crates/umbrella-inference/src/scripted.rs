//! In-memory client for tests and offline runs
//!
//! Answers from a queue or a responder function and records every request,
//! so callers can assert on exactly what would have gone over the wire.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use umbrella_core::{ChatMessage, SamplingParams};

use crate::{InferenceClient, InferenceError};

type Responder = dyn Fn(&[ChatMessage], &SamplingParams) -> Result<String, InferenceError> + Send + Sync;

/// What the scripted client was asked
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub params: SamplingParams,
}

impl RecordedRequest {
    /// Every message body concatenated, for "does the request mention X" checks
    pub fn body_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

enum Script {
    Queue(Mutex<VecDeque<Result<String, InferenceError>>>),
    Responder(Box<Responder>),
}

pub struct ScriptedClient {
    script: Script,
    requests: Mutex<Vec<RecordedRequest>>,
    configured: bool,
}

impl ScriptedClient {
    /// Answer calls in order from `responses`
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue = responses.into_iter().map(|r| Ok(r.into())).collect();
        Self::with_script(Script::Queue(Mutex::new(queue)))
    }

    /// Answer every call with whatever `responder` returns
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&[ChatMessage], &SamplingParams) -> Result<String, InferenceError>
            + Send
            + Sync
            + 'static,
    {
        Self::with_script(Script::Responder(Box::new(responder)))
    }

    /// A client that reports missing credentials and must never be called
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new(Vec::<String>::new())
        }
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
            configured: true,
        }
    }

    /// Queue an error as the next answer. No effect on responder clients.
    pub fn push_error(&self, error: InferenceError) {
        if let Script::Queue(queue) = &self.script {
            lock(queue).push_back(Err(error));
        }
    }

    pub fn push_response(&self, response: impl Into<String>) {
        if let Script::Queue(queue) = &self.script {
            lock(queue).push_back(Ok(response.into()));
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<String, InferenceError> {
        self.check_configured()?;
        lock(&self.requests).push(RecordedRequest {
            messages: messages.to_vec(),
            params: params.clone(),
        });

        match &self.script {
            Script::Queue(queue) => lock(queue).pop_front().unwrap_or_else(|| {
                Err(InferenceError::Transport(
                    "scripted client has no responses left".to_string(),
                ))
            }),
            Script::Responder(responder) => responder(messages, params),
        }
    }

    fn check_configured(&self) -> Result<(), InferenceError> {
        if self.configured {
            Ok(())
        } else {
            Err(InferenceError::Misconfigured(
                "scripted client has no credentials".to_string(),
            ))
        }
    }
}

// A panic while holding the lock leaves plain data behind; keep using it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
