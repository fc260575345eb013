// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

use agentflow_core::{EventRecord, TaskId, TaskRuntimeStatus, TaskState};

use super::MaterializedState;

impl MaterializedState {
    pub(crate) fn apply_task_routed(&mut self, record: &EventRecord, task_id: TaskId, _assigned_to: &str) {
        let Some(run_id) = record.run_id else { return };
        self.task_states.entry((run_id, task_id)).or_insert_with(|| TaskState::new(task_id, record.ts));
    }

    pub(crate) fn apply_task_transition(&mut self, record: &EventRecord, task_id: TaskId, status: TaskRuntimeStatus) {
        let Some(run_id) = record.run_id else { return };
        let state = self.task_states.entry((run_id, task_id)).or_insert_with(|| TaskState::new(task_id, record.ts));
        if let Err(violation) = state.transition(status, record.ts) {
            tracing::warn!(%violation, "ignoring terminal-state violation during replay");
        }
    }

    pub(crate) fn apply_task_failed(&mut self, record: &EventRecord, task_id: TaskId, error: &str) {
        let Some(run_id) = record.run_id else { return };
        let state = self.task_states.entry((run_id, task_id)).or_insert_with(|| TaskState::new(task_id, record.ts));
        state.last_error = Some(error.to_string());
        if let Err(violation) = state.transition(TaskRuntimeStatus::Failed, record.ts) {
            tracing::warn!(%violation, "ignoring terminal-state violation during replay");
        }
    }

    /// Register the declared task metadata for a run (not an event-sourced
    /// mutation — plans are written once at decomposition time and read
    /// verbatim thereafter).
    pub fn register_plan(&mut self, run_id: agentflow_core::RunId, tasks: Vec<agentflow_core::Task>) {
        for task in tasks {
            self.tasks.insert((run_id, task.id), task);
        }
    }
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
