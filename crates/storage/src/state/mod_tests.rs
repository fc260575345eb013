use agentflow_core::{Event, EventRecord, JobId, JobStatus, RunId};

use super::MaterializedState;

#[test]
fn replay_is_idempotent() {
    let job_id = JobId::new();
    let records = vec![
        EventRecord { job_id, run_id: None, ts: 1, kind: Event::JobCreated { project_id: "p".into(), goal: "g".into() } },
        EventRecord { job_id, run_id: None, ts: 2, kind: Event::JobClaimed { worker_id: "w1".into(), lease_until: 50 } },
    ];
    let a = MaterializedState::replay(&records);
    let b = MaterializedState::replay(&records);
    assert_eq!(a.job(&job_id).unwrap().status, b.job(&job_id).unwrap().status);
    assert_eq!(a.job(&job_id).unwrap().status, JobStatus::Running);
}

#[test]
fn audit_timeline_filters_non_audit_events() {
    let job_id = JobId::new();
    let run_id = RunId::from_epoch_ms(1_700_000_000_000);
    let mut state = MaterializedState::new();
    state.apply(&EventRecord { job_id, run_id: None, ts: 1, kind: Event::JobCreated { project_id: "p".into(), goal: "g".into() } });
    state.apply(&EventRecord { job_id, run_id: Some(run_id), ts: 2, kind: Event::RunStarted { run_id } });
    state.apply(&EventRecord {
        job_id,
        run_id: Some(run_id),
        ts: 3,
        kind: Event::WorkflowAwaitingAudit { missing_fields: vec![] },
    });
    state.apply(&EventRecord { job_id, run_id: Some(run_id), ts: 4, kind: Event::AuditApproved });

    let timeline = state.audit_timeline(&job_id);
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[0].ts, 3);
    assert_eq!(timeline[1].ts, 4);
}

#[test]
fn events_for_unknown_job_is_empty_slice() {
    let state = MaterializedState::new();
    assert!(state.events_for_job(&JobId::new()).is_empty());
}
