// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

use super::*;

fn sample_task(id: &str, title: &str) -> Task {
    Task {
        id: TaskId::from_string(id),
        title: title.to_string(),
        description: None,
        deps: vec![],
        inputs: vec![],
        outputs: vec![],
        done_when: vec!["it works".to_string()],
        task_type: TaskType::Implement,
        assigned_to: None,
        subtasks: vec![],
    }
}

#[test]
fn rejects_too_few_tasks() {
    let tasks = vec![sample_task("t1", "one"), sample_task("t2", "two")];
    assert_eq!(validate_task_plan(&tasks), Err(TaskPlanError::WrongTaskCount(2)));
}

#[test]
fn rejects_too_many_tasks() {
    let tasks: Vec<_> = (0..9).map(|i| sample_task(&format!("t{i}"), "task title")).collect();
    assert_eq!(validate_task_plan(&tasks), Err(TaskPlanError::WrongTaskCount(9)));
}

#[test]
fn accepts_valid_plan() {
    let tasks: Vec<_> = (0..4).map(|i| sample_task(&format!("t{i}"), "task title")).collect();
    assert!(validate_task_plan(&tasks).is_ok());
}

#[test]
fn rejects_short_title() {
    let mut tasks: Vec<_> = (0..3).map(|i| sample_task(&format!("t{i}"), "task title")).collect();
    tasks[0].title = "ab".to_string();
    assert!(matches!(validate_task_plan(&tasks), Err(TaskPlanError::TitleTooShort { .. })));
}

#[test]
fn rejects_missing_done_when() {
    let mut tasks: Vec<_> = (0..3).map(|i| sample_task(&format!("t{i}"), "task title")).collect();
    tasks[0].done_when.clear();
    assert!(matches!(validate_task_plan(&tasks), Err(TaskPlanError::MissingDoneWhen { .. })));
}

#[test]
fn rejects_output_with_path_separators() {
    let mut tasks: Vec<_> = (0..3).map(|i| sample_task(&format!("t{i}"), "task title")).collect();
    tasks[0].outputs.push("../escape.txt".to_string());
    assert!(matches!(validate_task_plan(&tasks), Err(TaskPlanError::OutputNotBasename { .. })));
}

#[test]
fn task_state_transitions_and_counts_attempts() {
    let mut state = TaskState::new(TaskId::from_string("t1"), 0);
    state.transition(TaskRuntimeStatus::Running, 10).unwrap();
    assert_eq!(state.attempts, 1);
    state.transition(TaskRuntimeStatus::Completed, 20).unwrap();
    assert_eq!(state.status, TaskRuntimeStatus::Completed);
}

#[test]
fn task_state_rejects_transition_out_of_terminal() {
    let mut state = TaskState::new(TaskId::from_string("t1"), 0);
    state.transition(TaskRuntimeStatus::Failed, 10).unwrap();
    let err = state.transition(TaskRuntimeStatus::Pending, 20).unwrap_err();
    assert_eq!(err.from, TaskRuntimeStatus::Failed);
}
