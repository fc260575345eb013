// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Event: the append-only audit row that is ground truth for observability
//! (§3). Every state mutation in the system is recorded as an `Event`
//! before (or atomically with) the in-memory projection it produces.

use crate::job::JobId;
use crate::run::RunId;
use crate::task_id::TaskId;
use serde::{Deserialize, Serialize};

/// A single append-only event row, keyed to a job and optionally a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub job_id: JobId,
    #[serde(default)]
    pub run_id: Option<RunId>,
    pub ts: u64,
    #[serde(flatten)]
    pub kind: Event,
}

/// Tagged event payloads. Variant names match the event names used
/// throughout §4 verbatim (e.g. `job_claimed`, `task_dispatched`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    JobCreated { project_id: String, goal: String },
    JobClaimed { worker_id: String, lease_until: u64 },
    Heartbeat { worker_id: String },
    StaleRecovered { previous_status: String },
    /// A failed run returned to `approved` because `attempts < max_attempts`
    /// (§4.8 step 5).
    JobRetried { attempt: u32 },
    RunStarted { run_id: RunId },
    PlanDecomposed { task_count: usize },
    PlanRepaired { attempt: u32 },
    TaskRouted { task_id: TaskId, assigned_to: String, routing_reason: String },
    TaskDispatched { task_id: TaskId, agent: String, session_id: String },
    TaskCompleted { task_id: TaskId, payload: Option<serde_json::Value> },
    TaskFailed { task_id: TaskId, error: String },
    TaskWaiting { task_id: TaskId, question: String },
    /// The pipeline paused and is returning control to an operator (§4.7
    /// step 8): distinct from `TaskWaiting`, which fires even when the
    /// auto-resume policy is about to answer the question itself.
    JobWaitingHuman { task_id: TaskId },
    WorkflowAwaitingAudit { missing_fields: Vec<String> },
    AuditApproved,
    AuditReviseRequested { revision: String },
    /// Worker's next pass after a `revise` signal (§4.9): folds the
    /// revision text into the goal and returns the job to `planning`.
    RevisionApplied { goal: String },
    AnswerConsumed { task_id: Option<TaskId>, answer: String, dedupe_key: String },
    JobResumed { dedupe_key: String },
    JobCancelled,
    WorkflowFinished { summary: String },
    WorkflowFailed { error: String },
    SchedulerException { code: String, root_cause: String, impact: String, recovery_plan: String },
    NotifyDeliveryFailed { channel: String, error: String },
    NotifyDelivered { channel: String },
}

impl Event {
    /// Stable event name, matching the names used throughout §4/§8.
    pub fn name(&self) -> &'static str {
        match self {
            Event::JobCreated { .. } => "job_created",
            Event::JobClaimed { .. } => "job_claimed",
            Event::Heartbeat { .. } => "heartbeat",
            Event::StaleRecovered { .. } => "stale_recovered",
            Event::JobRetried { .. } => "job_retried",
            Event::RunStarted { .. } => "run_started",
            Event::PlanDecomposed { .. } => "plan_decomposed",
            Event::PlanRepaired { .. } => "plan_repaired",
            Event::TaskRouted { .. } => "task_routed",
            Event::TaskDispatched { .. } => "task_dispatched",
            Event::TaskCompleted { .. } => "task_completed",
            Event::TaskFailed { .. } => "task_failed",
            Event::TaskWaiting { .. } => "task_waiting",
            Event::JobWaitingHuman { .. } => "job_waiting_human",
            Event::WorkflowAwaitingAudit { .. } => "workflow_awaiting_audit",
            Event::AuditApproved => "audit_approved",
            Event::AuditReviseRequested { .. } => "audit_revise_requested",
            Event::RevisionApplied { .. } => "revision_applied",
            Event::AnswerConsumed { .. } => "answer_consumed",
            Event::JobResumed { .. } => "job_resumed",
            Event::JobCancelled => "job_cancelled",
            Event::WorkflowFinished { .. } => "workflow_finished",
            Event::WorkflowFailed { .. } => "workflow_failed",
            Event::SchedulerException { .. } => "scheduler_exception",
            Event::NotifyDeliveryFailed { .. } => "notify_delivery_failed",
            Event::NotifyDelivered { .. } => "notify_delivered",
        }
    }

    /// True for events that represent an "is terminal" transition relevant
    /// to §8 invariant 4 (terminal-once).
    pub fn is_terminal_transition(&self) -> bool {
        matches!(
            self,
            Event::TaskCompleted { .. }
                | Event::TaskFailed { .. }
                | Event::WorkflowFinished { .. }
                | Event::WorkflowFailed { .. }
                | Event::JobCancelled
        )
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
