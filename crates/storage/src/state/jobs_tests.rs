use agentflow_core::{Event, EventRecord, JobId, JobStatus};

use super::super::MaterializedState;

fn evt(job_id: JobId, ts: u64, kind: Event) -> EventRecord {
    EventRecord { job_id, run_id: None, ts, kind }
}

#[test]
fn job_created_then_claimed() {
    let job_id = JobId::new();
    let mut state = MaterializedState::new();
    state.apply(&evt(job_id, 1, Event::JobCreated { project_id: "p".into(), goal: "g".into() }));
    state.apply(&evt(job_id, 2, Event::JobClaimed { worker_id: "w1".into(), lease_until: 100 }));

    let job = state.job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.worker_id.as_deref(), Some("w1"));
    assert_eq!(job.attempt_count, 1);
}

#[test]
fn stale_recovery_from_running_returns_to_approved() {
    let job_id = JobId::new();
    let mut state = MaterializedState::new();
    state.apply(&evt(job_id, 1, Event::JobCreated { project_id: "p".into(), goal: "g".into() }));
    state.apply(&evt(job_id, 2, Event::JobClaimed { worker_id: "w1".into(), lease_until: 5 }));
    state.apply(&evt(job_id, 3, Event::StaleRecovered { previous_status: "running".into() }));

    let job = state.job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Approved);
    assert!(job.worker_id.is_none());
    assert!(job.runner_pid.is_none());
    assert!(job.lease_until.is_none());
}

#[test]
fn stale_recovery_from_planning_returns_to_queued() {
    let job_id = JobId::new();
    let mut state = MaterializedState::new();
    state.apply(&evt(job_id, 1, Event::JobCreated { project_id: "p".into(), goal: "g".into() }));
    state.apply(&evt(job_id, 2, Event::JobClaimed { worker_id: "w1".into(), lease_until: 5 }));
    state.apply(&evt(job_id, 3, Event::StaleRecovered { previous_status: "planning".into() }));

    let job = state.job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.worker_id.is_none());
}

#[test]
fn workflow_failed_records_error() {
    let job_id = JobId::new();
    let mut state = MaterializedState::new();
    state.apply(&evt(job_id, 1, Event::JobCreated { project_id: "p".into(), goal: "g".into() }));
    state.apply(&evt(job_id, 2, Event::WorkflowFailed { error: "boom".into() }));

    let job = state.job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("boom"));
}
