// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! `agentflowd`: the worker process (C8, §4.8). Resolves [`env::WorkerConfig`]
//! once at startup, wires the durable store and HTTP collaborators, and
//! runs the dispatch loop forever.

mod env;
mod worker;

use std::sync::Arc;

use agentflow_adapters::{ChannelResolver, HttpChannelTransport, HttpLlm, HttpSessionApi, NotifyChannel, Notifier};
use agentflow_core::{RetryPolicy, SystemClock};
use agentflow_engine::{Orchestrator, OrchestratorConfig};
use agentflow_storage::{resolve_base_path, ProjectPaths, SignalQueue, Store};

use env::WorkerConfig;
use worker::Worker;

/// §4.11 notifier HTTP delivery timeout; not independently configurable
/// via §6.6, unlike the LLM/SessionAPI collaborators.
const NOTIFY_TRANSPORT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config = WorkerConfig::from_env();
    let base_path = resolve_base_path(config.base_path.as_deref());
    let paths = ProjectPaths::new(&base_path, &config.project_id);

    let registry = match env::load_agent_registry(config.agents_config_path.as_ref()) {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!(error = %e, "failed to load agent registry");
            std::process::exit(1);
        }
    };

    let store = match Store::open(paths.clone(), SystemClock) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, "failed to open store");
            std::process::exit(1);
        }
    };

    let llm = HttpLlm::new(config.llm_url.clone(), config.llm_api_key.clone(), config.llm_timeout);
    let session_api = HttpSessionApi::new(config.session_base_url.clone(), config.session_timeout);
    let notifier = Notifier::spawn(notify_resolver(&config), Arc::new(HttpChannelTransport::new(NOTIFY_TRANSPORT_TIMEOUT)), RetryPolicy::notify());

    let orchestrator_config = OrchestratorConfig {
        max_attempts: config.max_attempts,
        audit_required: config.audit_gate,
        waiting_human_policy: config.waiting_human_policy,
        idle_timeout: config.executor_idle_timeout,
        output_policy: config.output_policy(),
        artifacts_root: paths.artifacts_dir(),
        agent_limits: config.agent_limits.clone(),
        global_cap: config.max_parallel_tasks,
    };
    let orchestrator = Arc::new(Orchestrator::new(store.clone(), SystemClock, llm, registry, session_api, notifier, orchestrator_config));

    let signal_queue = SignalQueue::new(&paths, config.legacy_queue_compat);

    tracing::info!(project_id = %config.project_id, worker_id = %config.worker_id, base_path = %base_path.display(), "agentflowd starting");
    let worker = Worker::new(store, signal_queue, orchestrator, config);
    worker.run().await;
}

/// §4.11 notifier wiring. `ORCH_AGENT_CHANNELS` supplies explicit
/// per-agent config; `ORCH_NOTIFY_WEBHOOK_URL` (`ORCH_MAIN_CHANNEL_ID` is
/// accepted for parity with the documented env vars but carries no
/// separate channel identifier in this transport) is the wildcard
/// fallback, itself falling back to `log` so notifications never
/// silently vanish in dev.
fn notify_resolver(config: &WorkerConfig) -> ChannelResolver {
    let mut resolver = ChannelResolver::new();
    for (agent, channel) in &config.agent_channels {
        resolver.configure(agent.clone(), channel.clone());
    }
    match &config.notify_webhook_url {
        Some(url) => resolver.configure_wildcard(NotifyChannel::Webhook { url: url.clone() }),
        None => resolver.configure_wildcard(NotifyChannel::Log),
    };
    resolver
}
