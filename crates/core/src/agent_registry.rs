// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Agent registry and hard-rule routing table (§4.4).
//!
//! Modeled as an explicit dependency constructed once at startup (§9
//! "Global mutable state masquerading as modules") rather than a shared
//! mutable cache read ad hoc by each component.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One registered worker agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// An ordered hard rule: first keyword match wins (§4.4 step 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    pub agent: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RegistryValidationError {
    #[error("routing rule references unregistered agent {0:?}")]
    UnknownAgent(String),
    #[error("keyword {keyword:?} is claimed by both {first} and {second}")]
    DuplicateKeyword { keyword: String, first: String, second: String },
    #[error("default agent {0:?} is not registered")]
    UnknownDefaultAgent(String),
}

/// The agents registry plus ordered routing rules, validated fail-closed
/// at load time (§4.4 "Validation").
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: IndexMap<String, AgentRecord>,
    rules: Vec<RoutingRule>,
    default_agent: String,
}

impl AgentRegistry {
    /// Build a registry, rejecting any rule referencing an unregistered
    /// agent (§4.4) and, per the supplemented behavior grounded in
    /// `original_source`'s `validate_routing_rules.py`, any keyword
    /// claimed by two different agents.
    pub fn new(
        agents: Vec<AgentRecord>,
        rules: Vec<RoutingRule>,
        default_agent: impl Into<String>,
    ) -> Result<Self, RegistryValidationError> {
        let default_agent = default_agent.into();
        let agent_map: IndexMap<String, AgentRecord> =
            agents.into_iter().map(|a| (a.name.clone(), a)).collect();

        for rule in &rules {
            if !agent_map.contains_key(&rule.agent) {
                return Err(RegistryValidationError::UnknownAgent(rule.agent.clone()));
            }
        }
        if !agent_map.contains_key(&default_agent) {
            return Err(RegistryValidationError::UnknownDefaultAgent(default_agent));
        }

        let mut claimed: IndexMap<String, String> = IndexMap::new();
        for rule in &rules {
            for kw in &rule.keywords {
                if let Some(owner) = claimed.get(kw) {
                    if owner != &rule.agent {
                        return Err(RegistryValidationError::DuplicateKeyword {
                            keyword: kw.clone(),
                            first: owner.clone(),
                            second: rule.agent.clone(),
                        });
                    }
                } else {
                    claimed.insert(kw.clone(), rule.agent.clone());
                }
            }
        }

        Ok(Self { agents: agent_map, rules, default_agent })
    }

    pub fn is_registered(&self, agent: &str) -> bool {
        self.agents.contains_key(agent)
    }

    pub fn default_agent(&self) -> &str {
        &self.default_agent
    }

    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    pub fn agents(&self) -> impl Iterator<Item = &AgentRecord> {
        self.agents.values()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl AgentRegistry {
    /// Test helper: a registry with one agent per name plus a wildcard
    /// default, and no routing rules.
    pub fn test_fixture(agent_names: &[&str]) -> Self {
        let agents = agent_names
            .iter()
            .map(|n| AgentRecord { name: n.to_string(), description: None })
            .collect();
        Self::new(agents, Vec::new(), agent_names[0]).expect("test fixture is valid")
    }
}

#[cfg(test)]
#[path = "agent_registry_tests.rs"]
mod tests;
