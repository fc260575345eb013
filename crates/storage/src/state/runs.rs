// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

use agentflow_core::{EventRecord, Run, RunId};

use super::MaterializedState;

impl MaterializedState {
    pub(crate) fn apply_run_started(&mut self, record: &EventRecord, run_id: RunId) {
        let run = Run::new(run_id, record.job_id, record.ts);
        self.runs.insert(run_id, run);
        if let Some(job) = self.jobs.get_mut(&record.job_id) {
            job.run_id = Some(run_id);
            job.updated_at = record.ts;
        }
    }

    /// Record a terminal run status, enforcing "terminal once" (§8
    /// invariant 4). Returns `false` if the run was already terminal —
    /// callers should raise a `scheduler_exception` in that case.
    pub fn finish_run(&mut self, run_id: RunId, status: agentflow_core::RunStatus, now_ms: u64) -> bool {
        match self.runs.get_mut(&run_id) {
            Some(run) => run.finish(status, now_ms),
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "runs_tests.rs"]
mod tests;
