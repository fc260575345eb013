// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Task: an atomic unit of work within a run, and its runtime state.

use crate::task_id::TaskId;
use serde::{Deserialize, Serialize};

/// Task category (§3, §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Implement,
    Test,
    Integrate,
    Docs,
    Ops,
    Research,
    Coordination,
}

crate::simple_display! {
    TaskType {
        Implement => "implement",
        Test => "test",
        Integrate => "integrate",
        Docs => "docs",
        Ops => "ops",
        Research => "research",
        Coordination => "coordination",
    }
}

/// Status field as it appears in the bit-exact task JSON schema (§6.2).
/// Distinct from [`TaskRuntimeStatus`]: this is the externally-serialized
/// projection (includes scheduler-only states like `ready`), while
/// `TaskRuntimeStatus` is the internal per-run state machine (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSchemaStatus {
    Pending,
    Ready,
    Running,
    Waiting,
    Done,
    Failed,
}

crate::simple_display! {
    TaskSchemaStatus {
        Pending => "pending",
        Ready => "ready",
        Running => "running",
        Waiting => "waiting",
        Done => "done",
        Failed => "failed",
    }
}

/// A single task within a plan (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deps: Vec<TaskId>,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    pub done_when: Vec<String>,
    pub task_type: TaskType,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub subtasks: Vec<String>,
}

/// Errors validating a task plan against the schema invariants (§3, §6.2).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TaskPlanError {
    #[error("plan must contain between 3 and 8 tasks, got {0}")]
    WrongTaskCount(usize),
    #[error("task {task} title must be at least 3 characters")]
    TitleTooShort { task: String },
    #[error("task {task} must declare at least one done_when criterion")]
    MissingDoneWhen { task: String },
    #[error("task {task} has more than 6 subtasks")]
    TooManySubtasks { task: String },
    #[error("task {task} output {output:?} must be a bare filename, not a path")]
    OutputNotBasename { task: String, output: String },
}

/// Validate the structural invariants of a task plan that are independent
/// of the DAG (count, title length, done_when, subtask count, output
/// basenames). Dependency-graph invariants are checked by
/// `agentflow_engine::dag`.
pub fn validate_task_plan(tasks: &[Task]) -> Result<(), TaskPlanError> {
    if !(3..=8).contains(&tasks.len()) {
        return Err(TaskPlanError::WrongTaskCount(tasks.len()));
    }
    for t in tasks {
        if t.title.trim().len() < 3 {
            return Err(TaskPlanError::TitleTooShort { task: t.id.to_string() });
        }
        if t.done_when.is_empty() {
            return Err(TaskPlanError::MissingDoneWhen { task: t.id.to_string() });
        }
        if t.subtasks.len() > 6 {
            return Err(TaskPlanError::TooManySubtasks { task: t.id.to_string() });
        }
        for output in &t.outputs {
            let basename = std::path::Path::new(output).file_name().and_then(|f| f.to_str());
            if basename != Some(output.as_str()) {
                return Err(TaskPlanError::OutputNotBasename {
                    task: t.id.to_string(),
                    output: output.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Runtime per-task record within a run (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskRuntimeStatus {
    Pending,
    Running,
    WaitingHuman,
    Completed,
    Failed,
}

crate::simple_display! {
    TaskRuntimeStatus {
        Pending => "pending",
        Running => "running",
        WaitingHuman => "waiting_human",
        Completed => "completed",
        Failed => "failed",
    }
}

impl TaskRuntimeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskRuntimeStatus::Completed | TaskRuntimeStatus::Failed)
    }
}

/// Runtime state for one task within one run (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskState {
    pub task_id: TaskId,
    pub status: TaskRuntimeStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    pub updated_at: u64,
}

impl TaskState {
    pub fn new(task_id: TaskId, now_ms: u64) -> Self {
        Self { task_id, status: TaskRuntimeStatus::Pending, attempts: 0, last_error: None, updated_at: now_ms }
    }

    /// Apply a status transition, rejecting any move out of a terminal
    /// state (§3 invariant, §8 invariant 4 "terminal once").
    pub fn transition(&mut self, status: TaskRuntimeStatus, now_ms: u64) -> Result<(), TerminalStateViolation> {
        if self.status.is_terminal() {
            return Err(TerminalStateViolation { task_id: self.task_id, from: self.status, attempted: status });
        }
        if status == TaskRuntimeStatus::Running {
            self.attempts += 1;
        }
        self.status = status;
        self.updated_at = now_ms;
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("task {task_id} is already terminal ({from}); cannot transition to {attempted}")]
pub struct TerminalStateViolation {
    pub task_id: TaskId,
    pub from: TaskRuntimeStatus,
    pub attempted: TaskRuntimeStatus,
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
