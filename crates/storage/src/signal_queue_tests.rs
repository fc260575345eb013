use agentflow_core::{ControlAction, ControlPayload, ControlSignal, JobId};

use super::*;
use crate::paths::ProjectPaths;

fn sample(job_id: JobId, seq: u64) -> ControlSignal {
    ControlSignal {
        job_id,
        action: ControlAction::Approve,
        payload: ControlPayload::default(),
        request_id: format!("req-{seq}"),
        signal_seq: seq,
        ts: 1,
    }
}

#[test]
fn enqueue_then_drain_returns_all_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(tmp.path(), "proj-1");
    paths.ensure_dirs().unwrap();
    let queue = SignalQueue::new(&paths, false);
    let job_id = JobId::new();

    queue.enqueue(&sample(job_id, 1)).unwrap();
    queue.enqueue(&sample(job_id, 2)).unwrap();

    let drained = queue.drain().unwrap();
    assert_eq!(drained.len(), 2);
    assert_eq!(drained[0].signal_seq, 1);
    assert_eq!(drained[1].signal_seq, 2);
}

#[test]
fn drain_empties_the_queue() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(tmp.path(), "proj-1");
    paths.ensure_dirs().unwrap();
    let queue = SignalQueue::new(&paths, false);
    queue.enqueue(&sample(JobId::new(), 1)).unwrap();

    assert_eq!(queue.drain().unwrap().len(), 1);
    assert_eq!(queue.drain().unwrap().len(), 0);
}

#[test]
fn legacy_compat_mirrors_each_signal_to_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(tmp.path(), "proj-1");
    paths.ensure_dirs().unwrap();
    let queue = SignalQueue::new(&paths, true);
    let job_id = JobId::new();
    queue.enqueue(&sample(job_id, 1)).unwrap();

    let legacy_path = paths.orchestrator_dir().join("queue").join("jobs").join(format!("{job_id}.1.json"));
    assert!(legacy_path.exists());
}

#[test]
fn drain_of_missing_queue_file_is_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(tmp.path(), "proj-1");
    let queue = SignalQueue::new(&paths, false);
    assert!(queue.drain().unwrap().is_empty());
}
