use std::sync::Arc;

use agentflow_adapters::{ChannelResolver, FakeChannelTransport, FakeLlm, FakeSessionApi, NotifyChannel, Notifier};
use agentflow_core::{test_support::simple_chain_tasks, AgentRecord, AgentRegistry, FakeClock, RetryPolicy, RoutingRule};
use agentflow_storage::{ProjectPaths, Store};

use super::*;

fn registry() -> AgentRegistry {
    AgentRegistry::new(
        vec![AgentRecord { name: "coder".to_string(), description: None }],
        vec![RoutingRule { agent: "coder".to_string(), keywords: vec!["implement".to_string()] }],
        "coder",
    )
    .unwrap()
}

fn notifier() -> Notifier {
    let transport = FakeChannelTransport::new();
    let mut resolver = ChannelResolver::new();
    resolver.bind_wildcard(NotifyChannel::Log);
    Notifier::spawn(resolver, Arc::new(transport), RetryPolicy::notify())
}

fn open_store(tmp: &tempfile::TempDir) -> Arc<Store<FakeClock>> {
    let paths = ProjectPaths::new(tmp.path(), "proj-1");
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    Arc::new(Store::open(paths, clock).unwrap())
}

fn orchestrator(
    store: Arc<Store<FakeClock>>,
    llm: FakeLlm,
    config: OrchestratorConfig,
) -> Orchestrator<FakeClock, FakeLlm, FakeSessionApi> {
    Orchestrator::new(store, FakeClock::new(), llm, registry(), FakeSessionApi::new(), notifier(), config)
}

fn plan_json() -> String {
    serde_json::json!({
        "tasks": [
            {
                "id": "t1",
                "title": "Implement the parser",
                "description": "write the parser",
                "deps": [],
                "inputs": [],
                "outputs": [],
                "done_when": ["parser compiles"],
                "task_type": "implement",
                "subtasks": []
            },
            {
                "id": "t2",
                "title": "Implement the docs",
                "description": "document the parser",
                "deps": ["t1"],
                "inputs": [],
                "outputs": [],
                "done_when": ["docs exist"],
                "task_type": "docs",
                "subtasks": []
            },
            {
                "id": "t3",
                "title": "Implement the release",
                "description": "final review",
                "deps": ["t2"],
                "inputs": [],
                "outputs": [],
                "done_when": ["shipped"],
                "task_type": "ops",
                "subtasks": []
            }
        ]
    })
    .to_string()
}

#[tokio::test]
async fn decompose_repairs_once_on_invalid_plan_then_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    let store = open_store(&tmp);
    let llm = FakeLlm::new();
    llm.push_response(r#"{"tasks": []}"#);
    llm.push_response(plan_json());
    let orchestrator = orchestrator(store.clone(), llm, OrchestratorConfig::default());

    let job = store.create_job("proj-1", "ship the parser", 3).unwrap();
    let run = store.start_run(&job.job_id).unwrap();
    let tasks = orchestrator.decompose(&job, &run).await.unwrap();

    assert_eq!(tasks.len(), 3);
    // ids get reassigned away from the LLM-proposed "t1"/"t2"/"t3" and deps
    // are rewritten to match.
    assert!(tasks.iter().all(|t| t.id.to_string() != "t1"));
    let first = tasks.iter().find(|t| t.title == "Implement the parser").unwrap();
    let second = tasks.iter().find(|t| t.title == "Implement the docs").unwrap();
    assert_eq!(second.deps, vec![first.id]);
}

#[tokio::test]
async fn decompose_fails_after_max_attempts_of_invalid_plans() {
    let tmp = tempfile::tempdir().unwrap();
    let store = open_store(&tmp);
    let llm = FakeLlm::new();
    llm.push_response(r#"{"tasks": []}"#);
    llm.push_response(r#"{"tasks": []}"#);
    llm.push_response(r#"{"tasks": []}"#);
    let orchestrator = orchestrator(store.clone(), llm, OrchestratorConfig::default());

    let job = store.create_job("proj-1", "ship the parser", 3).unwrap();
    let run = store.start_run(&job.job_id).unwrap();
    let err = orchestrator.decompose(&job, &run).await.unwrap_err();
    assert_eq!(err.kind, agentflow_core::ErrorKind::Validation);
}

#[tokio::test]
async fn route_tasks_assigns_via_hard_rule_and_records_events() {
    let tmp = tempfile::tempdir().unwrap();
    let store = open_store(&tmp);
    let llm = FakeLlm::new();
    llm.push_response(r#"{"assigned_to":"coder","confidence":0.9}"#);
    let orchestrator = orchestrator(store.clone(), llm, OrchestratorConfig::default());

    let job = store.create_job("proj-1", "ship the parser", 3).unwrap();
    let run = store.start_run(&job.job_id).unwrap();
    let tasks = vec![simple_chain_tasks().remove(0)];
    let routed = orchestrator.route_tasks(&job, &run, tasks).await.unwrap();

    assert_eq!(routed[0].assigned_to.as_deref(), Some("coder"));
    let events = store.events_for_job(&job.job_id);
    assert!(events.iter().any(|e| matches!(&e.kind, agentflow_core::Event::TaskRouted { .. })));
}

#[tokio::test]
async fn run_job_stops_at_awaiting_audit_when_not_yet_approved() {
    let tmp = tempfile::tempdir().unwrap();
    let store = open_store(&tmp);
    let llm = FakeLlm::new();
    llm.push_response(plan_json());
    let orchestrator = orchestrator(store.clone(), llm, OrchestratorConfig::default());

    let job = store.create_job("proj-1", "ship the parser", 3).unwrap();
    let outcome = orchestrator.run_job(job.clone()).await.unwrap();

    match outcome {
        PipelineOutcome::AwaitingAudit { job_id, missing_fields, .. } => {
            assert_eq!(job_id, job.job_id);
            assert!(missing_fields.contains(&"risk_items".to_string()));
        }
        other => panic!("expected awaiting_audit, got {other:?}"),
    }
}

#[tokio::test]
async fn run_job_proceeds_to_execute_once_audit_is_approved() {
    let tmp = tempfile::tempdir().unwrap();
    let store = open_store(&tmp);
    let llm = FakeLlm::new();
    llm.push_response(plan_json());
    let orchestrator = orchestrator(
        store.clone(),
        llm,
        OrchestratorConfig { idle_timeout: std::time::Duration::ZERO, ..Default::default() },
    );

    let job = store.create_job("proj-1", "ship the parser", 3).unwrap();
    store.append_event(job.job_id, None, agentflow_core::Event::AuditApproved).unwrap();
    let job = store.get_job(&job.job_id).unwrap();
    assert!(job.audit.passed);

    // With a zero idle timeout and no scripted agent replies, the first
    // dispatched task never completes and the run fails fast rather than
    // hanging, exercising the execute() path without needing to script a
    // full session transcript.
    let outcome = orchestrator.run_job(job).await.unwrap();
    assert!(matches!(outcome, PipelineOutcome::Failed { .. }));
}

#[test]
fn derive_project_id_slugifies_the_goal() {
    let job_id = agentflow_core::JobId::new();
    let id = Orchestrator::<FakeClock, FakeLlm, FakeSessionApi>::derive_project_id("Ship the New Parser!", job_id);
    assert!(id.starts_with("ship-the-new-parser"));
    assert!(id.ends_with(&job_id.to_string()));
}
