// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Builds and enqueues operator control signals (C9, §4.9, §6.4). The CLI
//! never touches the state store directly — `Store::open` takes an
//! exclusive lock the running daemon already holds — it only appends to
//! the durable [`SignalQueue`], which the daemon drains and applies on
//! its own poll loop.

use agentflow_core::{Clock, ControlAction, ControlPayload, ControlSignal, JobId, SystemClock, TaskId};
use agentflow_storage::SignalQueue;

use crate::exit_error::ExitError;
use crate::Command;

/// Resolve a `--signal-seq` override or default to the current wall clock
/// in epoch milliseconds. The store only requires signals to be
/// non-decreasing per job lineage (§4.9, §9 Open Question 2), so any
/// monotonically-advancing default is sufficient; a caller that needs a
/// precise ordering across concurrent CLI invocations supplies its own.
fn default_signal_seq() -> u64 {
    SystemClock.epoch_ms()
}

fn default_request_id() -> String {
    nanoid::nanoid!(21)
}

/// Validate and build the [`ControlSignal`] for one CLI invocation.
/// Returns `Err` (exit code 1, §6.4) on malformed arguments; never
/// validates against live job state, since the CLI has no read access to
/// the store.
pub fn build_signal(command: &Command, job_id: &str, request_id: Option<String>, signal_seq: Option<u64>) -> Result<ControlSignal, ExitError> {
    if job_id.trim().is_empty() {
        return Err(ExitError::validation("job_id must not be empty"));
    }
    let (action, payload) = match command {
        Command::Approve { .. } => (ControlAction::Approve, ControlPayload::default()),
        Command::Revise { revision, .. } => {
            if revision.trim().is_empty() {
                return Err(ExitError::validation("revision text must not be empty"));
            }
            (ControlAction::Revise, ControlPayload { revision: Some(revision.clone()), ..Default::default() })
        }
        Command::Resume { answer, task_id, .. } => {
            if answer.trim().is_empty() {
                return Err(ExitError::validation("answer text must not be empty"));
            }
            (ControlAction::Resume, ControlPayload { answer: Some(answer.clone()), task_id: task_id.as_deref().map(TaskId::from_string), ..Default::default() })
        }
        Command::Cancel { .. } => (ControlAction::Cancel, ControlPayload::default()),
    };

    Ok(ControlSignal {
        job_id: JobId::from_string(job_id),
        action,
        payload,
        request_id: request_id.unwrap_or_else(default_request_id),
        signal_seq: signal_seq.unwrap_or_else(default_signal_seq),
        ts: SystemClock.epoch_ms(),
    })
}

pub fn enqueue(queue: &SignalQueue, signal: &ControlSignal) -> Result<(), ExitError> {
    queue.enqueue(signal).map_err(|e| ExitError { code: 1, message: format!("failed to enqueue control signal: {e}") })
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
