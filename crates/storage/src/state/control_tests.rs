use agentflow_core::{Event, EventRecord, JobId, JobStatus};

use super::super::MaterializedState;

#[test]
fn resume_marks_dedupe_key_seen() {
    let job_id = JobId::new();
    let mut state = MaterializedState::new();
    state.apply(&EventRecord { job_id, run_id: None, ts: 1, kind: Event::JobCreated { project_id: "p".into(), goal: "g".into() } });
    state.apply(&EventRecord { job_id, run_id: None, ts: 2, kind: Event::JobResumed { dedupe_key: "abc123".into() } });

    assert!(state.has_seen_resume_key(job_id, "abc123"));
    assert!(!state.has_seen_resume_key(job_id, "other"));
    assert_eq!(state.job(&job_id).unwrap().status, JobStatus::Approved);
}

#[test]
fn request_id_tracking_is_per_job() {
    let job_a = JobId::new();
    let job_b = JobId::new();
    let mut state = MaterializedState::new();
    state.mark_request_id_seen(job_a, "req-1");

    assert!(state.has_seen_request_id(job_a, "req-1"));
    assert!(!state.has_seen_request_id(job_b, "req-1"));
}

#[test]
fn signal_seq_increments_per_job() {
    let job_id = JobId::new();
    let mut state = MaterializedState::new();
    assert_eq!(state.next_signal_seq(job_id), 1);
    assert_eq!(state.next_signal_seq(job_id), 2);
}
