// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! ControlSignal: the envelope for an operator intent (§3, §4.9).

use crate::job::JobId;
use crate::task_id::TaskId;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Approve,
    Revise,
    Resume,
    Cancel,
}

crate::simple_display! {
    ControlAction {
        Approve => "approve",
        Revise => "revise",
        Resume => "resume",
        Cancel => "cancel",
    }
}

/// Payload carried by a control signal; shape depends on `action`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlPayload {
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub task_id: Option<TaskId>,
}

/// Operator-intent envelope appended to the durable signal queue (§3, §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlSignal {
    pub job_id: JobId,
    pub action: ControlAction,
    #[serde(default)]
    pub payload: ControlPayload,
    pub request_id: String,
    pub signal_seq: u64,
    pub ts: u64,
}

/// Compute the idempotency key for a `resume` signal (§4.9):
/// `SHA1(task_id + "::" + answer)[:16]`. `task_id` is the empty string
/// when the resume is not scoped to a specific task.
pub fn resume_dedupe_key(task_id: Option<&TaskId>, answer: &str) -> String {
    let task_part = task_id.map(|t| t.to_string()).unwrap_or_default();
    let mut hasher = Sha1::new();
    hasher.update(task_part.as_bytes());
    hasher.update(b"::");
    hasher.update(answer.as_bytes());
    let digest = hasher.finalize();
    let hex = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
    hex[..16].to_string()
}

/// Outcome of applying a control signal to the state store (§4.9).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlOutcome {
    Applied,
    /// Duplicate `request_id`; signal was not re-appended.
    Deduped,
    /// `resume` with a previously-seen `dedupe_key`; no-op by design.
    DedupedByAnswer,
    Rejected { reason: String },
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
