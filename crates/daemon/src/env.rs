// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Centralized environment variable access for the daemon crate (§6.6).
//! Read once at startup into [`WorkerConfig`] and passed down as an
//! explicit dependency, rather than read ad hoc by each component (§9
//! "Global mutable state masquerading as modules").

use std::path::PathBuf;
use std::time::Duration;

use agentflow_adapters::NotifyChannel;
use agentflow_core::{AgentRecord, AgentRegistry, RegistryValidationError, RoutingRule};
use agentflow_engine::{AgentLimits, OutputPolicy, WaitingHumanPolicy};

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_string(key).and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_string(key).and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env_string(key).as_deref() {
        Some("0") | Some("false") | Some("off") => false,
        Some("1") | Some("true") | Some("on") => true,
        _ => default,
    }
}

/// Agent registry config file shape, loaded from `ORCH_AGENTS_CONFIG`
/// (JSON). The registry itself is an explicit dependency constructed
/// once at startup (§9), not read ad hoc.
#[derive(Debug, serde::Deserialize)]
struct AgentsConfigFile {
    agents: Vec<AgentRecord>,
    #[serde(default)]
    rules: Vec<RoutingRule>,
    default_agent: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse { path: String, source: serde_json::Error },
    #[error(transparent)]
    Registry(#[from] RegistryValidationError),
}

/// Load the agent registry from `ORCH_AGENTS_CONFIG` if set, falling back
/// to a single catch-all `default_agent` with no hard rules (fail-closed
/// on malformed config, permissive when unconfigured).
pub fn load_agent_registry(path: Option<&PathBuf>) -> Result<AgentRegistry, ConfigError> {
    let Some(path) = path else {
        let fallback = vec![AgentRecord { name: "default_agent".to_string(), description: None }];
        return Ok(AgentRegistry::new(fallback, Vec::new(), "default_agent")?);
    };
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
    let parsed: AgentsConfigFile =
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })?;
    Ok(AgentRegistry::new(parsed.agents, parsed.rules, parsed.default_agent)?)
}

/// Parse `ORCH_AGENT_LIMITS` (JSON `{agent:int, "*":int}`) into
/// [`AgentLimits`], defaulting to `{"*":1}` (§6.6). The global cap
/// (`ORCH_MAX_PARALLEL_TASKS`) is carried separately on [`WorkerConfig`]
/// since it is a distinct parameter to `select_batch`, not part of the
/// per-agent table.
fn agent_limits() -> AgentLimits {
    let per_agent: std::collections::HashMap<String, u32> = env_string("ORCH_AGENT_LIMITS")
        .and_then(|raw| serde_json::from_str::<std::collections::HashMap<String, u32>>(&raw).ok())
        .unwrap_or_else(|| std::collections::HashMap::from([("*".to_string(), 1)]));
    AgentLimits { per_agent }
}

/// One entry of `ORCH_AGENT_CHANNELS` (§6.6, JSON `{agent: {type, ...}}`).
/// The original notifier also recognizes `discord_tool`/`discord_api`
/// channel types; neither has a Rust collaborator here (no in-process
/// Discord client), so both are accepted as aliases for `chat` and
/// delivered over the same HTTP transport as any other bot-token chat
/// channel.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChannelConfigEntry {
    Log,
    Webhook { url: String },
    #[serde(alias = "discord_tool", alias = "discord_api")]
    Chat { url: String, bot_token: String },
}

impl From<ChannelConfigEntry> for NotifyChannel {
    fn from(entry: ChannelConfigEntry) -> Self {
        match entry {
            ChannelConfigEntry::Log => NotifyChannel::Log,
            ChannelConfigEntry::Webhook { url } => NotifyChannel::Webhook { url },
            ChannelConfigEntry::Chat { url, bot_token } => NotifyChannel::Chat { url, bot_token },
        }
    }
}

/// Parse `ORCH_AGENT_CHANNELS` into explicit per-agent channel config,
/// ignoring the variable entirely (not failing startup) if it is unset
/// or malformed, matching `agent_limits`'s fail-permissive stance.
fn agent_channels() -> std::collections::HashMap<String, NotifyChannel> {
    env_string("ORCH_AGENT_CHANNELS")
        .and_then(|raw| serde_json::from_str::<std::collections::HashMap<String, ChannelConfigEntry>>(&raw).ok())
        .map(|entries| entries.into_iter().map(|(agent, entry)| (agent, entry.into())).collect())
        .unwrap_or_default()
}

fn waiting_human_policy() -> WaitingHumanPolicy {
    match env_string("ORCH_WAITING_POLICY").as_deref() {
        Some("auto") => WaitingHumanPolicy::Auto { max_auto_resumes: env_u32("ORCH_MAX_AUTO_RESUMES", 1) },
        Some("strict") => WaitingHumanPolicy::Strict,
        _ => WaitingHumanPolicy::Human,
    }
}

/// Every §6.6 environment variable, resolved once at daemon startup.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub base_path: Option<String>,
    pub project_id: String,
    pub agents_config_path: Option<PathBuf>,
    pub worker_id: String,

    pub llm_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub llm_timeout: Duration,

    pub session_base_url: String,
    pub session_api_key: String,
    pub session_timeout: Duration,

    pub executor_idle_timeout: Duration,
    pub worker_job_timeout: Duration,
    pub running_stale_secs: u64,
    pub heartbeat_log_secs: u64,
    pub agent_limits: AgentLimits,
    pub max_parallel_tasks: u32,
    pub worker_max_concurrency: usize,
    pub claim_lease_secs: u64,

    pub audit_gate: bool,
    pub audit_decision: String,
    pub require_design_confirm: bool,
    pub design_confirmed: bool,
    pub waiting_human_policy: WaitingHumanPolicy,
    pub max_attempts: u32,

    pub auth_enabled: bool,
    pub control_token: Option<String>,

    pub notify_webhook_url: Option<String>,
    pub main_channel_id: Option<String>,
    pub agent_channels: std::collections::HashMap<String, NotifyChannel>,

    pub legacy_queue_compat: bool,
}

impl WorkerConfig {
    /// Resolve every §6.6 variable, applying the documented defaults.
    pub fn from_env() -> Self {
        Self {
            base_path: env_string("BASE_PATH"),
            project_id: env_string("PROJECT_ID").unwrap_or_else(|| "default_project".to_string()),
            agents_config_path: env_string("ORCH_AGENTS_CONFIG").map(PathBuf::from),
            worker_id: env_string("WORKER_ID").unwrap_or_else(|| format!("worker-{}", std::process::id())),

            llm_url: env_string("LLM_URL").unwrap_or_else(|| "http://localhost:8081".to_string()),
            llm_api_key: env_string("LLM_API_KEY").unwrap_or_default(),
            llm_model: env_string("LLM_MODEL").unwrap_or_else(|| "decompose".to_string()),
            llm_timeout: Duration::from_secs(env_u64("LLM_TIMEOUT", 60)),

            session_base_url: env_string("OPENCLAW_API_BASE_URL").unwrap_or_else(|| "http://localhost:8082".to_string()),
            session_api_key: env_string("OPENCLAW_API_KEY").unwrap_or_default(),
            session_timeout: Duration::from_secs(env_u64("OPENCLAW_AGENT_TIMEOUT_SECONDS", 600)),

            executor_idle_timeout: Duration::from_secs(env_u64("ORCH_EXECUTOR_IDLE_TIMEOUT_SECONDS", 60)),
            worker_job_timeout: Duration::from_secs(env_u64("ORCH_WORKER_JOB_TIMEOUT_SECONDS", 2400)),
            running_stale_secs: env_u64("ORCH_RUNNING_STALE_SECONDS", 300),
            heartbeat_log_secs: env_u64("ORCH_HEARTBEAT_LOG_SECONDS", 30),
            agent_limits: agent_limits(),
            max_parallel_tasks: env_u32("ORCH_MAX_PARALLEL_TASKS", 2),
            worker_max_concurrency: env_u32("ORCH_WORKER_MAX_CONCURRENCY", 2) as usize,
            claim_lease_secs: 60,

            audit_gate: env_bool("ORCH_AUDIT_GATE", true),
            audit_decision: env_string("ORCH_AUDIT_DECISION").unwrap_or_else(|| "pending".to_string()),
            require_design_confirm: env_bool("ORCH_REQUIRE_DESIGN_CONFIRM", false),
            design_confirmed: env_bool("ORCH_DESIGN_CONFIRMED", false),
            waiting_human_policy: waiting_human_policy(),
            max_attempts: 3,

            auth_enabled: env_bool("ORCH_AUTH_ENABLED", true),
            control_token: env_string("ORCH_CONTROL_TOKEN"),

            notify_webhook_url: env_string("ORCH_NOTIFY_WEBHOOK_URL"),
            main_channel_id: env_string("ORCH_MAIN_CHANNEL_ID"),
            agent_channels: agent_channels(),

            legacy_queue_compat: env_bool("ORCH_LEGACY_QUEUE_COMPAT", false),
        }
    }

    pub fn output_policy(&self) -> OutputPolicy {
        OutputPolicy::default()
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
