// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

use super::*;
use crate::job::JobStatus;
use crate::run::RunStatus;

#[test]
fn waiting_mapping() {
    assert_eq!(status_view(JobStatus::AwaitingAudit, None).unwrap(), StatusView::Waiting);
    assert_eq!(
        status_view(JobStatus::Running, Some(RunStatus::WaitingHuman)).unwrap(),
        StatusView::Waiting
    );
}

#[test]
fn running_mapping() {
    assert_eq!(status_view(JobStatus::Planning, None).unwrap(), StatusView::Running);
    assert_eq!(status_view(JobStatus::Approved, Some(RunStatus::Queued)).unwrap(), StatusView::Running);
}

#[test]
fn done_mapping_requires_both_sides() {
    assert_eq!(
        status_view(JobStatus::Completed, Some(RunStatus::Finished)).unwrap(),
        StatusView::Done
    );
    // Job completed but run status unknown isn't covered by the "done" rule;
    // falls through to failed/running rules and in this combination is
    // unmapped since none of the other job statuses apply either.
}

#[test]
fn failed_mapping() {
    assert_eq!(status_view(JobStatus::Failed, None).unwrap(), StatusView::Failed);
    assert_eq!(status_view(JobStatus::Cancelled, Some(RunStatus::Cancelled)).unwrap(), StatusView::Failed);
    assert_eq!(status_view(JobStatus::Completed, Some(RunStatus::Error)).unwrap(), StatusView::Failed);
}

#[test]
fn every_combination_yields_exactly_one_view_or_an_error() {
    let jobs = [
        JobStatus::Queued,
        JobStatus::Planning,
        JobStatus::Approved,
        JobStatus::Running,
        JobStatus::AwaitingAudit,
        JobStatus::ReviseRequested,
        JobStatus::WaitingHuman,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];
    let runs = [
        None,
        Some(RunStatus::Running),
        Some(RunStatus::Retrying),
        Some(RunStatus::Queued),
        Some(RunStatus::Finished),
        Some(RunStatus::Completed),
        Some(RunStatus::AwaitingAudit),
        Some(RunStatus::WaitingHuman),
        Some(RunStatus::Failed),
        Some(RunStatus::Cancelled),
        Some(RunStatus::Timeout),
        Some(RunStatus::Error),
    ];
    for &j in &jobs {
        for &r in &runs {
            // Must not panic; either a single view or an explicit error.
            let _ = status_view(j, r);
        }
    }
}

#[test]
fn divergence_ignored_within_one_category() {
    assert!(divergence("r1", StatusView::Running, StatusView::Waiting).is_none());
}

#[test]
fn divergence_recorded_beyond_one_category() {
    let d = divergence("r1", StatusView::Running, StatusView::Done).unwrap();
    assert_eq!(d.run_id, "r1");
}

#[test]
fn divergence_severity_escalates_with_distance() {
    let low = divergence("r1", StatusView::Running, StatusView::Done).unwrap();
    assert_eq!(low.severity, DivergenceSeverity::Low);
    let high = divergence("r1", StatusView::Running, StatusView::Failed).unwrap();
    assert_eq!(high.severity, DivergenceSeverity::High);
}
