// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

use agentflow_core::{Event, EventRecord, HumanInput, JobStatus, TaskId};

use super::MaterializedState;

impl MaterializedState {
    /// §4.9 `resume`: records the operator's answer as a [`HumanInput`] on
    /// the job (question text recovered from the task's last
    /// `task_waiting` event, since the `resume` control signal itself
    /// does not carry it).
    pub(crate) fn apply_answer_consumed(&mut self, record: &EventRecord, task_id: Option<TaskId>, answer: &str, dedupe_key: &str) {
        self.seen_resume_keys.insert((record.job_id, dedupe_key.to_string()));
        let question = task_id
            .and_then(|t| {
                self.events_by_job.get(&record.job_id)?.iter().rev().find_map(|r| match &r.kind {
                    Event::TaskWaiting { task_id: tid, question } if *tid == t => Some(question.clone()),
                    _ => None,
                })
            })
            .unwrap_or_default();
        if let Some(job) = self.jobs.get_mut(&record.job_id) {
            job.human_inputs.push(HumanInput {
                at: record.ts,
                question,
                answer: answer.to_string(),
                task_id: task_id.map(|t| t.to_string()),
            });
        }
        if let Some(run_id) = record.run_id {
            if let Some(task_id) = task_id {
                if let Some(state) = self.task_states.get_mut(&(run_id, task_id)) {
                    let _ = state.transition(agentflow_core::TaskRuntimeStatus::Pending, record.ts);
                }
            }
        }
        self.touch_job(record.job_id, record.ts);
    }

    /// §4.9 `resume`: the job returns to `approved` if the audit already
    /// passed, otherwise back to `awaiting_audit` so the audit gate runs
    /// again on the next worker pass.
    /// A waiting-human resume always returns the job to `approved` for
    /// reclaiming, regardless of `job.audit.passed`: a task can only reach
    /// `[TASK_WAITING]` from inside `execute()`, which the orchestrator
    /// only enters once the audit gate has already been cleared for
    /// audit-required jobs, and is never consulted at all for jobs that
    /// don't require one.
    pub(crate) fn apply_job_resumed(&mut self, record: &EventRecord, dedupe_key: &str) {
        self.seen_resume_keys.insert((record.job_id, dedupe_key.to_string()));
        if let Some(job) = self.jobs.get_mut(&record.job_id) {
            job.status = JobStatus::Approved;
            job.updated_at = record.ts;
        }
    }

    pub fn has_seen_resume_key(&self, job_id: agentflow_core::JobId, dedupe_key: &str) -> bool {
        self.seen_resume_keys.contains(&(job_id, dedupe_key.to_string()))
    }

    pub fn has_seen_request_id(&self, job_id: agentflow_core::JobId, request_id: &str) -> bool {
        self.seen_request_ids.contains(&(job_id, request_id.to_string()))
    }

    pub fn mark_request_id_seen(&mut self, job_id: agentflow_core::JobId, request_id: &str) {
        self.seen_request_ids.insert((job_id, request_id.to_string()));
    }

    pub fn next_signal_seq(&mut self, job_id: agentflow_core::JobId) -> u64 {
        let seq = self.next_signal_seq.entry(job_id).or_insert(0);
        *seq += 1;
        *seq
    }

    /// §4.9 "reject strictly-decreasing sequences within a single job
    /// lineage" (§9 OQ2): `true` if `seq` is acceptable (greater than or
    /// equal to the highest one already applied for `job_id`).
    pub fn accepts_signal_seq(&self, job_id: agentflow_core::JobId, seq: u64) -> bool {
        self.applied_signal_seq.get(&job_id).map_or(true, |&last| seq >= last)
    }

    pub(crate) fn record_applied_signal_seq(&mut self, job_id: agentflow_core::JobId, seq: u64) {
        let entry = self.applied_signal_seq.entry(job_id).or_insert(0);
        if seq > *entry {
            *entry = seq;
        }
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
