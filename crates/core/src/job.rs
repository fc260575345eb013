// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Job: the durable work item created by a goal submission.

use crate::id::IdBuf;
use crate::run::RunId;
use serde::{Deserialize, Serialize};

/// Identity of a [`Job`]: an opaque 16-character lowercase hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(IdBuf);

const HEX_ALPHABET: [char; 16] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f'];

impl JobId {
    /// Generate an opaque 16-hex-character job id (§3).
    pub fn new() -> Self {
        let hex = nanoid::nanoid!(16, &HEX_ALPHABET);
        Self(IdBuf::new(&hex))
    }

    pub fn from_string(id: impl AsRef<str>) -> Self {
        Self(IdBuf::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_str())
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::borrow::Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

/// Job status (§4.1, §4.10). Only workers mutate this; the control plane
/// mutates `audit` and `human_inputs` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Planning,
    Approved,
    Running,
    AwaitingAudit,
    ReviseRequested,
    WaitingHuman,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    JobStatus {
        Queued => "queued",
        Planning => "planning",
        Approved => "approved",
        Running => "running",
        AwaitingAudit => "awaiting_audit",
        ReviseRequested => "revise_requested",
        WaitingHuman => "waiting_human",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl JobStatus {
    /// Statuses from which a job may be claimed under a lease (§4.1).
    pub fn is_claimable(self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Planning | JobStatus::Approved)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

/// Audit-gate decision on a job's plan (§3, §4.7 step 6, §4.9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Audit {
    pub decision: AuditDecision,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditDecision {
    #[default]
    Pending,
    Approve,
    Revise,
}

crate::simple_display! {
    AuditDecision {
        Pending => "pending",
        Approve => "approve",
        Revise => "revise",
    }
}

/// An operator answer recorded on a job after a `waiting_human` state (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanInput {
    pub at: u64,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Structured result of the job's most recent run attempt, surfaced to
/// status SSOT (§4.10) and persisted on the job (§3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LastResult {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Durable work item created by a goal submission (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub project_id: String,
    pub goal: String,
    pub status: JobStatus,
    pub audit: Audit,
    pub run_id: Option<RunId>,
    pub last_result: LastResult,
    pub error: Option<String>,
    #[serde(default)]
    pub human_inputs: Vec<HumanInput>,
    pub worker_id: Option<String>,
    pub runner_pid: Option<u32>,
    pub lease_until: Option<u64>,
    pub heartbeat_at: Option<u64>,
    #[serde(default)]
    pub attempt_count: u32,
    pub max_attempts: u32,
    #[serde(default)]
    pub last_notified_status: Option<String>,
    #[serde(default)]
    pub last_main_heartbeat_ts: Option<u64>,
    #[serde(default)]
    pub last_heartbeat_log_ts: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Job {
    /// Construct a freshly-submitted job in `queued` status.
    pub fn new(project_id: impl Into<String>, goal: impl Into<String>, now_ms: u64, max_attempts: u32) -> Self {
        Self {
            job_id: JobId::new(),
            project_id: project_id.into(),
            goal: goal.into(),
            status: JobStatus::Queued,
            audit: Audit::default(),
            run_id: None,
            last_result: LastResult::default(),
            error: None,
            human_inputs: Vec::new(),
            worker_id: None,
            runner_pid: None,
            lease_until: None,
            heartbeat_at: None,
            attempt_count: 0,
            max_attempts,
            last_notified_status: None,
            last_main_heartbeat_ts: None,
            last_heartbeat_log_ts: None,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    pub fn is_lease_expired(&self, now_ms: u64) -> bool {
        match self.lease_until {
            Some(until) => now_ms >= until,
            None => true,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct JobBuilder => Job {
        into {
            project_id: String = "default_project",
            goal: String = "do the thing"
        }
        set {
            status: JobStatus = JobStatus::Queued,
            audit: Audit = Audit::default(),
            last_result: LastResult = LastResult::default(),
            human_inputs: Vec<HumanInput> = Vec::new(),
            attempt_count: u32 = 0,
            max_attempts: u32 = 3,
            created_at: u64 = 0,
            updated_at: u64 = 0
        }
        option {
            run_id: RunId = None,
            error: String = None,
            worker_id: String = None,
            runner_pid: u32 = None,
            lease_until: u64 = None,
            heartbeat_at: u64 = None,
            last_notified_status: String = None,
            last_main_heartbeat_ts: u64 = None,
            last_heartbeat_log_ts: u64 = None
        }
        computed { job_id: JobId = JobId::new() }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
