// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Error kinds and the propagation contract (§7).

use crate::status::StatusView;
use serde::{Deserialize, Serialize};

/// The five error kinds (§7). Every component boundary returns
/// `Result<T, OrchestratorError>` instead of using exceptions as control
/// flow (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed plan, missing schema fields, unknown dependency, circular
    /// dependency, invalid control arguments.
    Validation,
    /// Network timeouts, rate-limit responses, notifier delivery failures.
    Transient,
    /// Disk/state store unavailable, permission denied.
    Resource,
    /// `[TASK_WAITING]` or audit gate awaiting a decision.
    Human,
    /// Scheduler invariant violations, parser malformation.
    Logic,
}

crate::simple_display! {
    ErrorKind {
        Validation => "validation",
        Transient => "transient",
        Resource => "resource",
        Human => "human",
        Logic => "logic",
    }
}

impl ErrorKind {
    /// Whether the error kind is recovered locally (retry or one repair
    /// round) rather than propagated to the supervising loop (§7
    /// "Propagation policy").
    pub fn recovers_locally(self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}

/// The single error type returned across every component boundary (§9).
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct OrchestratorError {
    pub kind: ErrorKind,
    pub message: String,
}

impl OrchestratorError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resource, message)
    }

    pub fn human(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Human, message)
    }

    pub fn logic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Logic, message)
    }
}

/// User-visible failure detail accompanying a terminal job/run status (§7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecovery {
    pub root_cause: String,
    pub impact: String,
    pub recovery_plan: String,
    pub needs_human_approval: bool,
}

/// The envelope every user-visible failure response must include (§7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureResponse {
    pub status_view: StatusView,
    pub job_status: String,
    pub run_status: Option<String>,
    pub error: String,
    pub failure_recovery: FailureRecovery,
}

/// Classify a scheduler-internal invariant violation into a
/// `SCHED_<OP>_<KIND>` code and append-ready record (§7, §6.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerExceptionRecord {
    pub code: String,
    pub root_cause: String,
    pub impact: String,
    pub recovery_plan: String,
}

impl SchedulerExceptionRecord {
    pub fn new(op: &str, kind: &str, root_cause: impl Into<String>, impact: impl Into<String>, recovery_plan: impl Into<String>) -> Self {
        Self {
            code: format!("SCHED_{}_{}", op.to_uppercase(), kind.to_uppercase()),
            root_cause: root_cause.into(),
            impact: impact.into(),
            recovery_plan: recovery_plan.into(),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
