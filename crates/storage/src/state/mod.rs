// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! In-memory projection rebuilt by replaying the WAL at startup and kept
//! current thereafter by [`MaterializedState::apply`]. This is the only
//! place event semantics are interpreted; `Store` never mutates entities
//! directly.

mod control;
mod jobs;
mod runs;
mod tasks;

use std::collections::{HashMap, HashSet};

use agentflow_core::{EventRecord, Job, JobId, Run, RunId, Task, TaskId, TaskState};

/// Everything the orchestrator knows about one project, derived entirely
/// from its event log.
#[derive(Debug, Default)]
pub struct MaterializedState {
    pub(crate) jobs: HashMap<JobId, Job>,
    pub(crate) runs: HashMap<RunId, Run>,
    pub(crate) tasks: HashMap<(RunId, TaskId), Task>,
    pub(crate) task_states: HashMap<(RunId, TaskId), TaskState>,
    /// Next `signal_seq` to assign per job, for control-plane ordering.
    pub(crate) next_signal_seq: HashMap<JobId, u64>,
    /// Highest `signal_seq` applied per job so far, to reject
    /// strictly-decreasing control signals (§4.9, §9 OQ2).
    pub(crate) applied_signal_seq: HashMap<JobId, u64>,
    /// request_ids already applied, for control-signal idempotency (§4.9).
    pub(crate) seen_request_ids: HashSet<(JobId, String)>,
    /// resume dedupe_keys already applied (§4.9).
    pub(crate) seen_resume_keys: HashSet<(JobId, String)>,
    /// Full event history per job, in append order, for `audit_timeline`
    /// and debugging (§6.4 supplement).
    pub(crate) events_by_job: HashMap<JobId, Vec<EventRecord>>,
}

impl MaterializedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild state by replaying events in the order they were appended.
    /// Idempotent: replaying the same log twice yields the same state.
    pub fn replay(records: &[EventRecord]) -> Self {
        let mut state = Self::new();
        for record in records {
            state.apply(record);
        }
        state
    }

    /// Apply one event to the projection. Unknown/duplicate transitions
    /// are logged and otherwise ignored rather than panicking — the WAL is
    /// ground truth and a defensive projection must never crash on replay.
    pub fn apply(&mut self, record: &EventRecord) {
        use agentflow_core::Event::*;
        match &record.kind {
            JobCreated { project_id, goal } => self.apply_job_created(record, project_id, goal),
            JobClaimed { worker_id, lease_until } => self.apply_job_claimed(record, worker_id, *lease_until),
            Heartbeat { worker_id } => self.apply_heartbeat(record, worker_id),
            StaleRecovered { previous_status } => self.apply_stale_recovered(record, previous_status),
            JobRetried { .. } => self.apply_job_status(record, agentflow_core::JobStatus::Approved),
            RunStarted { run_id } => self.apply_run_started(record, *run_id),
            PlanDecomposed { .. } | PlanRepaired { .. } => self.touch_job(record.job_id, record.ts),
            TaskRouted { task_id, assigned_to, .. } => self.apply_task_routed(record, *task_id, assigned_to),
            TaskDispatched { task_id, .. } => self.apply_task_transition(record, *task_id, agentflow_core::TaskRuntimeStatus::Running),
            TaskCompleted { task_id, .. } => self.apply_task_transition(record, *task_id, agentflow_core::TaskRuntimeStatus::Completed),
            TaskFailed { task_id, error } => self.apply_task_failed(record, *task_id, error),
            TaskWaiting { task_id, .. } => self.apply_task_transition(record, *task_id, agentflow_core::TaskRuntimeStatus::WaitingHuman),
            JobWaitingHuman { .. } => self.apply_job_status(record, agentflow_core::JobStatus::WaitingHuman),
            WorkflowAwaitingAudit { .. } => self.apply_job_status(record, agentflow_core::JobStatus::AwaitingAudit),
            AuditApproved => self.apply_audit_decision(record, agentflow_core::AuditDecision::Approve, true),
            AuditReviseRequested { revision } => self.apply_audit_revise(record, revision),
            RevisionApplied { goal } => self.apply_revision_applied(record, goal),
            AnswerConsumed { task_id, answer, dedupe_key } => self.apply_answer_consumed(record, *task_id, answer, dedupe_key),
            JobResumed { dedupe_key } => self.apply_job_resumed(record, dedupe_key),
            JobCancelled => self.apply_job_status(record, agentflow_core::JobStatus::Cancelled),
            WorkflowFinished { .. } => self.apply_job_status(record, agentflow_core::JobStatus::Completed),
            WorkflowFailed { error } => self.apply_workflow_failed(record, error),
            SchedulerException { .. } | NotifyDeliveryFailed { .. } | NotifyDelivered { .. } => {
                self.touch_job(record.job_id, record.ts)
            }
        }
        self.events_by_job.entry(record.job_id).or_default().push(record.clone());
    }

    pub fn job(&self, job_id: &JobId) -> Option<&Job> {
        self.jobs.get(job_id)
    }

    pub fn jobs_iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn run(&self, run_id: &RunId) -> Option<&Run> {
        self.runs.get(run_id)
    }

    pub fn task_state(&self, run_id: RunId, task_id: TaskId) -> Option<&TaskState> {
        self.task_states.get(&(run_id, task_id))
    }

    pub fn task(&self, run_id: RunId, task_id: TaskId) -> Option<&Task> {
        self.tasks.get(&(run_id, task_id))
    }

    pub fn tasks_for_run(&self, run_id: RunId) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |((r, _), _)| *r == run_id).map(|(_, t)| t)
    }

    /// §6.4 supplement: the audit-relevant slice of a job's event history.
    pub fn audit_timeline(&self, job_id: &JobId) -> Vec<&EventRecord> {
        self.events_by_job
            .get(job_id)
            .into_iter()
            .flatten()
            .filter(|r| {
                matches!(
                    r.kind,
                    agentflow_core::Event::WorkflowAwaitingAudit { .. }
                        | agentflow_core::Event::AuditApproved
                        | agentflow_core::Event::AuditReviseRequested { .. }
                        | agentflow_core::Event::PlanRepaired { .. }
                )
            })
            .collect()
    }

    pub fn events_for_job(&self, job_id: &JobId) -> &[EventRecord] {
        self.events_by_job.get(job_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn touch_job(&mut self, job_id: JobId, ts: u64) {
        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.updated_at = ts;
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
