// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! End-to-end exit-code and queue-file coverage for the `control` binary
//! (§6.4).

use assert_cmd::Command;

fn control(tmp: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("control").unwrap();
    cmd.env("BASE_PATH", tmp.path()).env("PROJECT_ID", "proj-1");
    cmd
}

#[test]
fn approve_succeeds_and_queues_a_signal() {
    let tmp = tempfile::tempdir().unwrap();
    control(&tmp).args(["approve", "job-1"]).assert().success();

    let queue_path = tmp.path().join("proj-1/.orchestrator/state/control_signals.jsonl");
    let contents = std::fs::read_to_string(queue_path).unwrap();
    assert!(contents.contains("\"action\":\"approve\""));
    assert!(contents.contains("\"job_id\":\"job-1\""));
}

#[test]
fn revise_with_blank_text_exits_one() {
    let tmp = tempfile::tempdir().unwrap();
    control(&tmp).args(["revise", "job-1", "   "]).assert().failure().code(1);
}

#[test]
fn resume_carries_task_id_and_answer() {
    let tmp = tempfile::tempdir().unwrap();
    control(&tmp).args(["resume", "job-1", "yes", "--task-id", "tsk_001"]).assert().success();

    let queue_path = tmp.path().join("proj-1/.orchestrator/state/control_signals.jsonl");
    let contents = std::fs::read_to_string(queue_path).unwrap();
    assert!(contents.contains("\"answer\":\"yes\""));
    assert!(contents.contains("tsk_001"));
}

#[test]
fn cancel_honors_explicit_request_id_and_signal_seq() {
    let tmp = tempfile::tempdir().unwrap();
    control(&tmp).args(["cancel", "job-1", "--request-id", "req-fixed", "--signal-seq", "7"]).assert().success();

    let queue_path = tmp.path().join("proj-1/.orchestrator/state/control_signals.jsonl");
    let contents = std::fs::read_to_string(queue_path).unwrap();
    assert!(contents.contains("\"request_id\":\"req-fixed\""));
    assert!(contents.contains("\"signal_seq\":7"));
}
