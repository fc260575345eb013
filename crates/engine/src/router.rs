// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Router (C4, §4.4): hard-rule keyword matching with an LLM fallback,
//! memoized per `(title, description)` within a run.

use std::collections::HashMap;

use agentflow_core::{AgentRegistry, OrchestratorError};
use agentflow_adapters::{Llm, LlmMessage, LlmRequest};
use parking_lot::Mutex;
use serde::Deserialize;

const CONFIDENCE_THRESHOLD: f64 = 0.5;
const ROUTER_MODEL: &str = "router";

#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    pub assigned_to: String,
    pub routing_reason: String,
}

#[derive(Debug, Deserialize)]
struct LlmRoutingResponse {
    assigned_to: String,
    confidence: f64,
}

/// Routes tasks to agents, memoizing by `(title, description)` so that a
/// retried LLM call for the same content doesn't re-query.
pub struct Router<L: Llm> {
    registry: AgentRegistry,
    llm: L,
    cache: Mutex<HashMap<(String, String), RoutingDecision>>,
}

impl<L: Llm> Router<L> {
    pub fn new(registry: AgentRegistry, llm: L) -> Self {
        Self { registry, llm, cache: Mutex::new(HashMap::new()) }
    }

    pub async fn route(&self, title: &str, description: Option<&str>) -> Result<RoutingDecision, OrchestratorError> {
        let key = (title.to_string(), description.unwrap_or_default().to_string());
        if let Some(cached) = self.cache.lock().get(&key).cloned() {
            return Ok(cached);
        }

        let decision = match self.hard_rule_match(title, description) {
            Some(decision) => decision,
            None => self.llm_fallback(title, description).await?,
        };

        self.cache.lock().insert(key, decision.clone());
        Ok(decision)
    }

    fn hard_rule_match(&self, title: &str, description: Option<&str>) -> Option<RoutingDecision> {
        let haystack = format!("{title} {}", description.unwrap_or_default()).to_lowercase();
        let tokens: std::collections::HashSet<&str> =
            haystack.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).collect();

        for rule in self.registry.rules() {
            if rule.keywords.iter().any(|kw| tokens.contains(kw.to_lowercase().as_str())) {
                return Some(RoutingDecision {
                    assigned_to: rule.agent.clone(),
                    routing_reason: format!("hard_rule:{}", rule.agent),
                });
            }
        }
        None
    }

    async fn llm_fallback(&self, title: &str, description: Option<&str>) -> Result<RoutingDecision, OrchestratorError> {
        let agents: Vec<String> = self.registry.agents().map(|a| a.name.clone()).collect();
        let prompt = format!(
            "Registered agents: {}\n\nTask title: {title}\nTask description: {}\n\nRespond with JSON {{\"assigned_to\": <agent>, \"confidence\": <0..1>}}.",
            agents.join(", "),
            description.unwrap_or(""),
        );
        let request = LlmRequest {
            model: ROUTER_MODEL.to_string(),
            messages: vec![LlmMessage::system("You are a task router."), LlmMessage::user(prompt)],
            temperature: 0.0,
        };
        let raw = self.llm.complete(request).await.map_err(|e| OrchestratorError::transient(e.to_string()))?;

        let parsed: Option<LlmRoutingResponse> = serde_json::from_str(&raw).ok();
        match parsed {
            Some(resp) if self.registry.is_registered(&resp.assigned_to) && resp.confidence >= CONFIDENCE_THRESHOLD => {
                Ok(RoutingDecision {
                    assigned_to: resp.assigned_to.clone(),
                    routing_reason: format!("llm:{}:{:.2}", resp.assigned_to, resp.confidence),
                })
            }
            _ => Ok(RoutingDecision {
                assigned_to: self.registry.default_agent().to_string(),
                routing_reason: "llm:below_threshold_or_unregistered".to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
