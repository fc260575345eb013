// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Status SSOT (C10, §4.10): reconcile job and run status into one
//! externally-observable `status_view`.

use crate::job::JobStatus;
use crate::run::RunStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusView {
    Running,
    Waiting,
    Done,
    Failed,
}

crate::simple_display! {
    StatusView {
        Running => "running",
        Waiting => "waiting",
        Done => "done",
        Failed => "failed",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceSeverity {
    Low,
    High,
}

/// Recorded when the chosen run-status source disagrees with another
/// source by more than one status category (§4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDivergence {
    pub run_id: String,
    pub severity: DivergenceSeverity,
    pub action_hint: String,
}

/// Raised when a `(job_status, run_status)` pair matches none of the
/// mapping rules in §4.10 (§8 invariant 9).
#[derive(Debug, Clone, thiserror::Error)]
#[error("no status_view mapping for job_status={job_status} run_status={run_status}")]
pub struct UnmappedStatusCombination {
    pub job_status: String,
    pub run_status: String,
}

/// Compute the external `status_view` for a `(job_status, run_status)`
/// pair per the mapping table in §4.10. Pure function: no I/O, so it's
/// directly unit-testable (§4.10 design intent).
pub fn status_view(job: JobStatus, run: Option<RunStatus>) -> Result<StatusView, UnmappedStatusCombination> {
    use JobStatus as J;
    use RunStatus as R;

    let waiting_job = matches!(job, J::AwaitingAudit | J::WaitingHuman | J::ReviseRequested);
    let waiting_run = matches!(run, Some(R::AwaitingAudit) | Some(R::WaitingHuman));
    if waiting_job || waiting_run {
        return Ok(StatusView::Waiting);
    }

    let running_job = matches!(job, J::Running | J::Planning | J::Approved);
    let running_run = matches!(run, Some(R::Running) | Some(R::Retrying) | Some(R::Queued));
    if running_job || running_run {
        return Ok(StatusView::Running);
    }

    let done_run = matches!(run, Some(R::Finished) | Some(R::Completed));
    if job == J::Completed && done_run {
        return Ok(StatusView::Done);
    }

    let failed_job = matches!(job, J::Failed | J::Cancelled);
    let failed_run =
        matches!(run, Some(R::Failed) | Some(R::Cancelled) | Some(R::Timeout) | Some(R::Error));
    if failed_job || failed_run {
        return Ok(StatusView::Failed);
    }

    Err(UnmappedStatusCombination {
        job_status: job.to_string(),
        run_status: run.map(|r| r.to_string()).unwrap_or_else(|| "none".to_string()),
    })
}

/// Ordinal distance between status_view categories, used to decide
/// whether two disagreeing sources diverge by "more than one category"
/// (§4.10).
fn category_rank(v: StatusView) -> u8 {
    match v {
        StatusView::Running => 0,
        StatusView::Waiting => 1,
        StatusView::Done => 2,
        StatusView::Failed => 3,
    }
}

/// Compare the chosen source's view against an alternate source's implied
/// view and produce a divergence record if they disagree by more than one
/// category (§4.10: "temporal-run-state file > last_result.status >
/// job.status").
pub fn divergence(run_id: impl Into<String>, chosen: StatusView, alternate: StatusView) -> Option<StatusDivergence> {
    let distance = (category_rank(chosen) as i16 - category_rank(alternate) as i16).abs();
    if distance <= 1 {
        return None;
    }
    let severity = if distance >= 3 { DivergenceSeverity::High } else { DivergenceSeverity::Low };
    Some(StatusDivergence {
        run_id: run_id.into(),
        severity,
        action_hint: format!(
            "chosen status_view={chosen} disagrees with alternate={alternate}; verify run state source"
        ),
    })
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
