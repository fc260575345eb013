// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! SessionAPI collaborator (§6.1): one conversational session per
//! dispatched task, polled cooperatively by the executor.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("session {0} not found")]
    NotFound(String),
}

#[derive(Debug, Clone, Serialize)]
struct CreateSessionRequest<'a> {
    agent: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateSessionResponse {
    session_id: String,
}

#[derive(Debug, Clone, Serialize)]
struct ReplyRequest<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct ReplyResponse {
    message_id: String,
}

/// A message polled from a session's transcript (§6.1 `GET
/// /sessions/{id}/messages`), with a stable, monotonically increasing id.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionMessage {
    pub id: String,
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MessagesResponse {
    messages: Vec<SessionMessage>,
}

/// Narrow async collaborator trait over the SessionAPI HTTP contract
/// (§6.1), letting the engine depend on an abstraction instead of
/// `reqwest` directly.
#[async_trait]
pub trait SessionApi: Send + Sync + 'static {
    async fn create_session(&self, agent: &str) -> Result<String, SessionError>;
    async fn reply(&self, session_id: &str, role: &str, content: &str) -> Result<String, SessionError>;
    async fn poll_messages(&self, session_id: &str, after: Option<&str>) -> Result<Vec<SessionMessage>, SessionError>;
}

#[derive(Clone)]
pub struct HttpSessionApi {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpSessionApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), timeout }
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SessionError> {
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| SessionError::Timeout(self.timeout))?
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SessionError::NotFound(response.url().to_string()));
        }
        if !response.status().is_success() {
            return Err(SessionError::Transport(format!("SessionAPI returned {}", response.status())));
        }
        response.json().await.map_err(|e| SessionError::Transport(e.to_string()))
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn create_session(&self, agent: &str) -> Result<String, SessionError> {
        let url = format!("{}/sessions", self.base_url);
        let req = self.client.post(&url).json(&CreateSessionRequest { agent });
        let resp: CreateSessionResponse = self.send(req).await?;
        Ok(resp.session_id)
    }

    async fn reply(&self, session_id: &str, role: &str, content: &str) -> Result<String, SessionError> {
        let url = format!("{}/sessions/{session_id}/reply", self.base_url);
        let req = self.client.post(&url).json(&ReplyRequest { role, content });
        let resp: ReplyResponse = self.send(req).await?;
        Ok(resp.message_id)
    }

    async fn poll_messages(&self, session_id: &str, after: Option<&str>) -> Result<Vec<SessionMessage>, SessionError> {
        let mut url = format!("{}/sessions/{session_id}/messages", self.base_url);
        if let Some(after) = after {
            url.push_str(&format!("?after={after}"));
        }
        let req = self.client.get(&url);
        let resp: MessagesResponse = self.send(req).await?;
        Ok(resp.messages)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SessionState {
        transcript: Vec<SessionMessage>,
        next_id: u64,
    }

    /// In-memory SessionAPI. Scripted agent replies can be queued with
    /// `push_agent_message`; `reply`/`poll_messages` otherwise behave like
    /// the real API against this in-memory transcript.
    #[derive(Clone, Default)]
    pub struct FakeSessionApi {
        sessions: Arc<Mutex<HashMap<String, SessionState>>>,
        next_session_id: Arc<Mutex<u64>>,
        fail_next_reply: Arc<Mutex<u32>>,
    }

    impl FakeSessionApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_agent_message(&self, session_id: &str, content: impl Into<String>) {
            let mut sessions = self.sessions.lock();
            let state = sessions.entry(session_id.to_string()).or_default();
            state.next_id += 1;
            state.transcript.push(SessionMessage { id: state.next_id.to_string(), role: "assistant".to_string(), content: content.into() });
        }

        /// Make the next `n` calls to `reply` fail with a transport error,
        /// to exercise dispatch-failure handling without a real transport.
        pub fn fail_next_reply(&self, n: u32) {
            *self.fail_next_reply.lock() = n;
        }
    }

    #[async_trait]
    impl SessionApi for FakeSessionApi {
        async fn create_session(&self, _agent: &str) -> Result<String, SessionError> {
            let mut next = self.next_session_id.lock();
            *next += 1;
            let session_id = format!("sess_{next}");
            self.sessions.lock().insert(session_id.clone(), SessionState::default());
            Ok(session_id)
        }

        async fn reply(&self, session_id: &str, role: &str, content: &str) -> Result<String, SessionError> {
            {
                let mut remaining = self.fail_next_reply.lock();
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SessionError::Transport("simulated dispatch failure".to_string()));
                }
            }
            let mut sessions = self.sessions.lock();
            let state = sessions.get_mut(session_id).ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
            state.next_id += 1;
            let id = state.next_id.to_string();
            state.transcript.push(SessionMessage { id: id.clone(), role: role.to_string(), content: content.to_string() });
            Ok(id)
        }

        async fn poll_messages(&self, session_id: &str, after: Option<&str>) -> Result<Vec<SessionMessage>, SessionError> {
            let sessions = self.sessions.lock();
            let state = sessions.get(session_id).ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
            let after_id: u64 = after.and_then(|a| a.parse().ok()).unwrap_or(0);
            Ok(state
                .transcript
                .iter()
                .filter(|m| m.id.parse::<u64>().unwrap_or(0) > after_id)
                .cloned()
                .collect())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSessionApi;

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
