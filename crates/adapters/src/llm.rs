// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! LLM collaborator (§6.1): goal classification, plan decomposition,
//! routing fallback, and auto-resume answers all go through one narrow
//! HTTP JSON contract.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response shape: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct LlmMessage {
    pub role: String,
    pub content: String,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<LlmMessage>,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
struct LlmResponse {
    choices: Vec<LlmChoice>,
}

#[derive(Debug, Deserialize)]
struct LlmChoice {
    message: LlmResponseMessage,
}

#[derive(Debug, Deserialize)]
struct LlmResponseMessage {
    content: String,
}

/// Narrow async collaborator trait so the engine can depend on an
/// abstraction instead of `reqwest` directly (§6.1).
#[async_trait]
pub trait Llm: Send + Sync + 'static {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError>;
}

#[derive(Clone)]
pub struct HttpLlm {
    client: reqwest::Client,
    url: String,
    bearer_token: String,
    timeout: Duration,
}

impl HttpLlm {
    pub fn new(url: impl Into<String>, bearer_token: impl Into<String>, timeout: Duration) -> Self {
        Self { client: reqwest::Client::new(), url: url.into(), bearer_token: bearer_token.into(), timeout }
    }
}

#[async_trait]
impl Llm for HttpLlm {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError> {
        let send = self.client.post(&self.url).bearer_auth(&self.bearer_token).json(&request).send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))?
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError::Transport(format!("LLM endpoint returned {}", response.status())));
        }

        let parsed: LlmResponse =
            response.json().await.map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("no choices in response".to_string()))
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Scripted LLM: returns queued responses in order, or errors if the
    /// queue is exhausted.
    #[derive(Clone, Default)]
    pub struct FakeLlm {
        responses: Arc<Mutex<VecDeque<Result<String, String>>>>,
        requests: Arc<Mutex<Vec<LlmRequest>>>,
    }

    impl FakeLlm {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_response(&self, content: impl Into<String>) {
            self.responses.lock().push_back(Ok(content.into()));
        }

        pub fn push_error(&self, error: impl Into<String>) {
            self.responses.lock().push_back(Err(error.into()));
        }

        pub fn requests(&self) -> Vec<LlmRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl Llm for FakeLlm {
        async fn complete(&self, request: LlmRequest) -> Result<String, LlmError> {
            self.requests.lock().push(request);
            match self.responses.lock().pop_front() {
                Some(Ok(content)) => Ok(content),
                Some(Err(error)) => Err(LlmError::Transport(error)),
                None => Err(LlmError::Transport("FakeLlm: no scripted response left".to_string())),
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeLlm;

#[cfg(test)]
#[path = "llm_tests.rs"]
mod tests;
