//! S4/S5: a task that raises `[TASK_WAITING]` parks the job at
//! `waiting_human`; `control resume` answers it and the job reaches
//! `approved` again, is reclaimed, and completes on a fresh run. A second,
//! identical `resume` is deduped rather than re-applied (S5).

use agentflow_core::JobStatus;

use crate::support::{control, decompose_plan, seed_job, start_stub, wait_for_status, write_agent_registry, Daemon};

#[tokio::test]
async fn waiting_human_task_resumes_and_completes() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path();

    let job_id = seed_job(base, "roll out the new pricing");

    // The first run's plan has one task that needs human approval; the
    // resumed run's plan doesn't mention it, so that run completes outright.
    // Every task title carries the "rollout" keyword so the hard routing
    // rule matches both plans without ever falling back to an LLM call.
    let waiting_plan = decompose_plan(&[
        ("t1", "rollout prep work"),
        ("t2", "rollout needs-approval before shipping"),
        ("t3", "rollout cleanup"),
    ]);
    let clean_plan = decompose_plan(&[("t1", "rollout announce"), ("t2", "rollout notify billing"), ("t3", "rollout close ticket")]);
    let server = start_stub(vec![waiting_plan, clean_plan], "needs-approval").await;
    let registry = write_agent_registry(base, "rollout");

    let llm_url = format!("{}/llm", server.uri());
    let _daemon = Daemon::spawn(base, &registry, &llm_url, &server.uri());

    let waiting = wait_for_status(base, job_id, JobStatus::WaitingHuman, 20_000);
    assert!(waiting.is_some(), "job should park at waiting_human");

    let answer = "yes, proceed";
    let out = control(base, &["resume", &job_id.to_string(), answer]);
    assert!(out.status.success(), "control resume failed: {}", String::from_utf8_lossy(&out.stderr));

    let completed = wait_for_status(base, job_id, JobStatus::Completed, 20_000);
    assert!(completed.is_some(), "job should complete after the resumed run");

    // S5: an identical resume is deduped, not reapplied; status must not
    // regress from the already-terminal completed state.
    let out2 = control(base, &["resume", &job_id.to_string(), answer]);
    assert!(out2.status.success(), "second identical control resume should still exit cleanly");

    std::thread::sleep(std::time::Duration::from_millis(500));
    let final_job = crate::support::read_job(base, job_id).expect("snapshot still present");
    assert_eq!(final_job.status, JobStatus::Completed, "a duplicate resume must not disturb a completed job");
}
