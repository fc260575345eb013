//! S2: a job that requires an audit gate stalls at `awaiting_audit` until
//! an operator runs `control approve`, then runs to completion.

use agentflow_core::JobStatus;

use crate::support::{control, decompose_plan, seed_job, start_stub, wait_for_status, write_agent_registry, Daemon};

#[tokio::test]
async fn job_waits_for_approval_then_completes() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path();

    let job_id = seed_job(base, "cut the quarterly report");

    let plan = decompose_plan(&[("t1", "setup data pull"), ("t2", "setup summary"), ("t3", "setup distribution")]);
    let server = start_stub(vec![plan], "never-matches-anything").await;
    let registry = write_agent_registry(base, "setup");

    let llm_url = format!("{}/llm", server.uri());
    let mut daemon = Daemon::spawn_with_audit(base, &registry, &llm_url, &server.uri(), true);

    let awaiting = wait_for_status(base, job_id, JobStatus::AwaitingAudit, 20_000);
    assert!(awaiting.is_some(), "job should reach awaiting_audit before any approval");

    let out = control(base, &["approve", &job_id.to_string()]);
    assert!(out.status.success(), "control approve failed: {}", String::from_utf8_lossy(&out.stderr));

    let completed = wait_for_status(base, job_id, JobStatus::Completed, 20_000);
    assert!(completed.is_some(), "job should complete once approved");

    daemon.shutdown();
}
