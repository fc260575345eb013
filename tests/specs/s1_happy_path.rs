//! S1: a job with no audit gate decomposes, routes via a hard rule, and
//! runs every task to completion without any human in the loop.

use agentflow_core::JobStatus;

use crate::support::{decompose_plan, seed_job, start_stub, wait_for_status, write_agent_registry, Daemon};

#[tokio::test]
async fn linear_job_completes_without_human_intervention() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path();

    let job_id = seed_job(base, "ship the release notes");

    let plan = decompose_plan(&[("t1", "draft the setup guide"), ("t2", "review the setup guide"), ("t3", "publish the setup guide")]);
    let server = start_stub(vec![plan], "never-matches-anything").await;
    let registry = write_agent_registry(base, "setup");

    let llm_url = format!("{}/llm", server.uri());
    let _daemon = Daemon::spawn(base, &registry, &llm_url, &server.uri());

    let job = wait_for_status(base, job_id, JobStatus::Completed, 20_000);
    let job = job.expect("job should reach completed within the wait window");
    assert_eq!(job.status, JobStatus::Completed);
}
