use agentflow_core::test_support::{diamond_tasks, simple_chain_tasks};
use agentflow_core::{Task, TaskId, TaskType};

use super::*;

fn task_with_deps(id: TaskId, deps: Vec<TaskId>) -> Task {
    Task {
        id,
        title: "task".to_string(),
        description: None,
        deps,
        inputs: vec![],
        outputs: vec![],
        done_when: vec!["done".to_string()],
        task_type: TaskType::Implement,
        assigned_to: None,
        subtasks: vec![],
    }
}

#[test]
fn simple_chain_has_single_initial_ready() {
    let tasks = simple_chain_tasks();
    let dag = build_dag(&tasks).unwrap();
    assert_eq!(dag.initial_ready.len(), 1);
    assert_eq!(dag.initial_ready[0], tasks[0].id);
}

#[test]
fn diamond_ready_order_is_stable() {
    let tasks = diamond_tasks();
    let dag = build_dag(&tasks).unwrap();
    assert_eq!(dag.initial_ready, vec![tasks[0].id]);
    assert_eq!(dag.forward_adjacency[&tasks[0].id].len(), 2);
}

#[test]
fn unknown_dependency_is_rejected() {
    let a = task_with_deps(TaskId::new(), vec![TaskId::new()]);
    let err = build_dag(&[a]).unwrap_err();
    assert!(matches!(err, DagError::UnknownDependency { .. }));
}

#[test]
fn circular_dependency_is_rejected() {
    let a_id = TaskId::new();
    let b_id = TaskId::new();
    let a = task_with_deps(a_id, vec![b_id]);
    let b = task_with_deps(b_id, vec![a_id]);
    let err = build_dag(&[a, b]).unwrap_err();
    assert_eq!(err, DagError::CircularDependency);
}

#[test]
fn tasks_with_no_deps_are_all_initially_ready() {
    let a = task_with_deps(TaskId::new(), vec![]);
    let b = task_with_deps(TaskId::new(), vec![]);
    let dag = build_dag(&[a, b]).unwrap();
    assert_eq!(dag.initial_ready.len(), 2);
}
