// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

use super::*;
use tempfile::NamedTempFile;

#[test]
fn env_bool_accepts_common_spellings() {
    assert!(env_bool("AGENTFLOW_TEST_NONEXISTENT_BOOL_A", true));
    assert!(!env_bool("AGENTFLOW_TEST_NONEXISTENT_BOOL_B", false));
}

#[test]
fn waiting_human_policy_defaults_to_human() {
    std::env::remove_var("ORCH_WAITING_POLICY");
    assert_eq!(waiting_human_policy(), WaitingHumanPolicy::Human);
}

#[test]
fn waiting_human_policy_parses_auto_with_max_resumes() {
    std::env::set_var("ORCH_WAITING_POLICY", "auto");
    std::env::set_var("ORCH_MAX_AUTO_RESUMES", "4");
    assert_eq!(waiting_human_policy(), WaitingHumanPolicy::Auto { max_auto_resumes: 4 });
    std::env::remove_var("ORCH_WAITING_POLICY");
    std::env::remove_var("ORCH_MAX_AUTO_RESUMES");
}

#[test]
fn waiting_human_policy_parses_strict() {
    std::env::set_var("ORCH_WAITING_POLICY", "strict");
    assert_eq!(waiting_human_policy(), WaitingHumanPolicy::Strict);
    std::env::remove_var("ORCH_WAITING_POLICY");
}

#[test]
fn worker_config_defaults_worker_id_from_pid() {
    std::env::remove_var("WORKER_ID");
    let config = WorkerConfig::from_env();
    assert_eq!(config.worker_id, format!("worker-{}", std::process::id()));
}

#[test]
fn agent_limits_defaults_to_wildcard_one() {
    std::env::remove_var("ORCH_AGENT_LIMITS");
    let limits = agent_limits();
    assert_eq!(limits.cap_for("coder"), Some(1));
}

#[test]
fn agent_limits_parses_per_agent_table() {
    std::env::set_var("ORCH_AGENT_LIMITS", r#"{"coder":3,"*":1}"#);
    let limits = agent_limits();
    assert_eq!(limits.cap_for("coder"), Some(3));
    assert_eq!(limits.cap_for("reviewer"), Some(1));
    std::env::remove_var("ORCH_AGENT_LIMITS");
}

#[test]
fn agent_channels_defaults_to_empty() {
    std::env::remove_var("ORCH_AGENT_CHANNELS");
    assert!(agent_channels().is_empty());
}

#[test]
fn agent_channels_parses_per_agent_table() {
    std::env::set_var(
        "ORCH_AGENT_CHANNELS",
        r#"{"coder":{"type":"webhook","url":"https://example.test/hook"},"reviewer":{"type":"log"}}"#,
    );
    let channels = agent_channels();
    assert_eq!(channels.get("coder"), Some(&NotifyChannel::Webhook { url: "https://example.test/hook".to_string() }));
    assert_eq!(channels.get("reviewer"), Some(&NotifyChannel::Log));
    std::env::remove_var("ORCH_AGENT_CHANNELS");
}

#[test]
fn agent_channels_accepts_discord_aliases_as_chat() {
    std::env::set_var(
        "ORCH_AGENT_CHANNELS",
        r#"{"coder":{"type":"discord_tool","url":"https://example.test/bot","bot_token":"secret"}}"#,
    );
    let channels = agent_channels();
    assert_eq!(channels.get("coder"), Some(&NotifyChannel::Chat { url: "https://example.test/bot".to_string(), bot_token: "secret".to_string() }));
    std::env::remove_var("ORCH_AGENT_CHANNELS");
}

#[test]
fn load_agent_registry_falls_back_when_unset() {
    let registry = load_agent_registry(None).unwrap();
    assert_eq!(registry.default_agent(), "default_agent");
    assert!(registry.is_registered("default_agent"));
}

#[test]
fn load_agent_registry_reads_config_file() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(
        file.path(),
        r#"{"agents":[{"name":"coder"},{"name":"reviewer"}],"rules":[],"default_agent":"coder"}"#,
    )
    .unwrap();
    let registry = load_agent_registry(Some(&file.path().to_path_buf())).unwrap();
    assert_eq!(registry.default_agent(), "coder");
    assert!(registry.is_registered("reviewer"));
}

#[test]
fn load_agent_registry_rejects_malformed_json() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "not json").unwrap();
    assert!(load_agent_registry(Some(&file.path().to_path_buf())).is_err());
}

#[test]
fn load_agent_registry_rejects_unknown_default_agent() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), r#"{"agents":[{"name":"coder"}],"rules":[],"default_agent":"ghost"}"#).unwrap();
    assert!(load_agent_registry(Some(&file.path().to_path_buf())).is_err());
}
