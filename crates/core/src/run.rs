// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Run: one attempt at executing a job's plan end-to-end.

use crate::id::IdBuf;
use crate::job::JobId;
use serde::{Deserialize, Serialize};

/// Identity of a [`Run`]: a UTC-timestamp string unless overridden by
/// `ORCH_RUN_ID` (§3, §6.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(IdBuf);

impl RunId {
    /// Build a run id from a UTC epoch-millisecond timestamp:
    /// `run_<YYYYMMDDTHHMMSSZ>`.
    pub fn from_epoch_ms(epoch_ms: u64) -> Self {
        let secs = epoch_ms / 1000;
        let (y, mo, d, h, mi, s) = civil_from_unix(secs as i64);
        let s = format!("run_{y:04}{mo:02}{d:02}T{h:02}{mi:02}{s:02}Z");
        Self(IdBuf::new(&s))
    }

    /// Use an externally-provided override (e.g. `ORCH_RUN_ID`).
    pub fn from_string(id: impl AsRef<str>) -> Self {
        Self(IdBuf::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_str())
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for RunId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::borrow::Borrow<str> for RunId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

/// Days-from-civil-epoch algorithm (Howard Hinnant's public-domain
/// `civil_from_days`), used to render run ids without pulling in a
/// calendar crate for a single timestamp format.
fn civil_from_unix(unix_secs: i64) -> (i64, u32, u32, u32, u32, u32) {
    let days = unix_secs.div_euclid(86_400);
    let secs_of_day = unix_secs.rem_euclid(86_400);
    let h = (secs_of_day / 3600) as u32;
    let mi = ((secs_of_day % 3600) / 60) as u32;
    let s = (secs_of_day % 60) as u32;

    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d, h, mi, s)
}

/// Run status (§3, §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Retrying,
    Queued,
    Finished,
    Completed,
    AwaitingAudit,
    WaitingHuman,
    Failed,
    Cancelled,
    Timeout,
    Error,
}

crate::simple_display! {
    RunStatus {
        Running => "running",
        Retrying => "retrying",
        Queued => "queued",
        Finished => "finished",
        Completed => "completed",
        AwaitingAudit => "awaiting_audit",
        WaitingHuman => "waiting_human",
        Failed => "failed",
        Cancelled => "cancelled",
        Timeout => "timeout",
        Error => "error",
    }
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Finished
                | RunStatus::Completed
                | RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Timeout
                | RunStatus::Error
        )
    }
}

/// One attempt at executing a job's plan (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: RunId,
    pub job_id: JobId,
    pub status: RunStatus,
    pub pid: Option<u32>,
    pub worker_id: Option<String>,
    pub lease_until: Option<u64>,
    pub heartbeat_at: Option<u64>,
    pub started_at: u64,
    pub finished_at: Option<u64>,
    #[serde(default)]
    pub meta: serde_json::Value,
    /// Set once, on the first terminal transition. Re-transitioning a run
    /// whose `terminal_at` is already set is the "terminal once" violation
    /// (§8 invariant 4).
    #[serde(default)]
    pub terminal_at: Option<u64>,
}

impl Run {
    pub fn new(run_id: RunId, job_id: JobId, started_at: u64) -> Self {
        Self {
            run_id,
            job_id,
            status: RunStatus::Running,
            pid: None,
            worker_id: None,
            lease_until: None,
            heartbeat_at: None,
            started_at,
            finished_at: None,
            meta: serde_json::Value::Null,
            terminal_at: None,
        }
    }

    /// Transition to a terminal status, enforcing "terminal once".
    /// Returns `false` (no-op) if the run already reached a terminal state.
    pub fn finish(&mut self, status: RunStatus, now_ms: u64) -> bool {
        if self.terminal_at.is_some() {
            return false;
        }
        debug_assert!(status.is_terminal());
        self.status = status;
        self.finished_at = Some(now_ms);
        self.terminal_at = Some(now_ms);
        true
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
