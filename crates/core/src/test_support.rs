// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Shared test fixtures, gated behind `test-support` so downstream crates
//! can depend on them without pulling test code into release builds.

use crate::job::Job;
use crate::run::{Run, RunId};
use crate::task::{Task, TaskType};
use crate::task_id::TaskId;

/// Build the S1 "simple chain" fixture from §8: A -> B -> C.
pub fn simple_chain_tasks() -> Vec<Task> {
    let a = TaskId::new();
    let b = TaskId::new();
    let c = TaskId::new();
    vec![
        task_fixture(a, "Task A", vec![]),
        task_fixture(b, "Task B", vec![a]),
        task_fixture(c, "Task C", vec![b]),
    ]
}

/// Build the S2 "diamond" fixture from §8: A -> {B, C} -> D.
pub fn diamond_tasks() -> Vec<Task> {
    let a = TaskId::new();
    let b = TaskId::new();
    let c = TaskId::new();
    let d = TaskId::new();
    vec![
        task_fixture(a, "Task A", vec![]),
        task_fixture(b, "Task B", vec![a]),
        task_fixture(c, "Task C", vec![a]),
        task_fixture(d, "Task D", vec![b, c]),
    ]
}

fn task_fixture(id: TaskId, title: &str, deps: Vec<TaskId>) -> Task {
    Task {
        id,
        title: title.to_string(),
        description: None,
        deps,
        inputs: vec![],
        outputs: vec![],
        done_when: vec!["completed without error".to_string()],
        task_type: TaskType::Implement,
        assigned_to: None,
        subtasks: vec![],
    }
}

pub fn fresh_job_and_run(now_ms: u64) -> (Job, Run) {
    let job = Job::new("test-project", "a test goal", now_ms, 3);
    let run = Run::new(RunId::from_epoch_ms(now_ms), job.job_id, now_ms);
    (job, run)
}
