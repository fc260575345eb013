// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! DAG Builder (C2, §4.2): turn a task list into a forward adjacency list,
//! in-degree map, and initial ready set, rejecting unknown dependencies
//! and cycles via Kahn's algorithm.

use std::collections::{HashMap, VecDeque};

use agentflow_core::{Task, TaskId};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DagError {
    #[error("task {task} depends on unknown task {dependency}")]
    UnknownDependency { task: TaskId, dependency: TaskId },
    #[error("task plan contains a circular dependency")]
    CircularDependency,
}

/// Frozen DAG view handed to the [`crate::scheduler::Scheduler`].
#[derive(Debug, Clone)]
pub struct Dag {
    pub forward_adjacency: HashMap<TaskId, Vec<TaskId>>,
    pub in_degree: HashMap<TaskId, u32>,
    pub initial_ready: Vec<TaskId>,
}

/// Build the DAG. An edge A→B means "B depends on A"; completing A may
/// unlock B.
pub fn build_dag(tasks: &[Task]) -> Result<Dag, DagError> {
    let ids: std::collections::HashSet<TaskId> = tasks.iter().map(|t| t.id).collect();

    let mut forward_adjacency: HashMap<TaskId, Vec<TaskId>> = tasks.iter().map(|t| (t.id, Vec::new())).collect();
    let mut in_degree: HashMap<TaskId, u32> = tasks.iter().map(|t| (t.id, 0)).collect();

    for task in tasks {
        for dep in &task.deps {
            if !ids.contains(dep) {
                return Err(DagError::UnknownDependency { task: task.id, dependency: *dep });
            }
            forward_adjacency.get_mut(dep).unwrap().push(task.id);
            *in_degree.get_mut(&task.id).unwrap() += 1;
        }
    }

    // Kahn's algorithm to verify acyclicity.
    let mut queue: VecDeque<TaskId> = in_degree.iter().filter(|(_, &d)| d == 0).map(|(id, _)| *id).collect();
    let initial_ready: Vec<TaskId> = {
        let mut r: Vec<TaskId> = queue.iter().copied().collect();
        r.sort_by_key(|id| id.to_string());
        r
    };

    let mut remaining = in_degree.clone();
    let mut visited = 0usize;
    while let Some(id) = queue.pop_front() {
        visited += 1;
        for &child in &forward_adjacency[&id] {
            let d = remaining.get_mut(&child).unwrap();
            *d -= 1;
            if *d == 0 {
                queue.push_back(child);
            }
        }
    }

    if visited != tasks.len() {
        return Err(DagError::CircularDependency);
    }

    Ok(Dag { forward_adjacency, in_degree, initial_ready })
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;
