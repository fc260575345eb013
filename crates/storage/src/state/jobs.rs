// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

use agentflow_core::{AuditDecision, EventRecord, Job, JobStatus};

use super::MaterializedState;

impl MaterializedState {
    pub(crate) fn apply_job_created(&mut self, record: &EventRecord, project_id: &str, goal: &str) {
        let job = Job::new(project_id, goal, record.ts, 3);
        // job_id in the event is authoritative; Job::new() mints its own,
        // so overwrite it to keep the projection keyed consistently.
        let mut job = job;
        job.job_id = record.job_id;
        job.created_at = record.ts;
        job.updated_at = record.ts;
        self.jobs.insert(record.job_id, job);
    }

    pub(crate) fn apply_job_claimed(&mut self, record: &EventRecord, worker_id: &str, lease_until: u64) {
        if let Some(job) = self.jobs.get_mut(&record.job_id) {
            job.status = JobStatus::Running;
            job.worker_id = Some(worker_id.to_string());
            job.lease_until = Some(lease_until);
            job.heartbeat_at = Some(record.ts);
            job.attempt_count += 1;
            job.updated_at = record.ts;
        }
    }

    pub(crate) fn apply_heartbeat(&mut self, record: &EventRecord, worker_id: &str) {
        if let Some(job) = self.jobs.get_mut(&record.job_id) {
            job.worker_id = Some(worker_id.to_string());
            job.heartbeat_at = Some(record.ts);
            job.last_main_heartbeat_ts = Some(record.ts);
        }
    }

    /// §4.1: `running` reverts to `approved`, `planning` reverts to
    /// `queued`; anything else (a defensively-recorded event for a status
    /// that was no longer stale by the time it replays) falls back to
    /// `queued` rather than panicking.
    pub(crate) fn apply_stale_recovered(&mut self, record: &EventRecord, previous_status: &str) {
        if let Some(job) = self.jobs.get_mut(&record.job_id) {
            job.status = match previous_status {
                "running" => JobStatus::Approved,
                "planning" => JobStatus::Queued,
                _ => JobStatus::Queued,
            };
            job.worker_id = None;
            job.runner_pid = None;
            job.lease_until = None;
            job.updated_at = record.ts;
        }
    }

    /// §4.9 `revise` follow-up: fold the revision text into the goal and
    /// return the job to `planning` for the next worker pass to replan.
    pub(crate) fn apply_revision_applied(&mut self, record: &EventRecord, goal: &str) {
        if let Some(job) = self.jobs.get_mut(&record.job_id) {
            job.goal = goal.to_string();
            job.status = JobStatus::Planning;
            job.updated_at = record.ts;
        }
    }

    pub(crate) fn apply_job_status(&mut self, record: &EventRecord, status: JobStatus) {
        if let Some(job) = self.jobs.get_mut(&record.job_id) {
            job.status = status;
            job.updated_at = record.ts;
        }
    }

    pub(crate) fn apply_workflow_failed(&mut self, record: &EventRecord, error: &str) {
        if let Some(job) = self.jobs.get_mut(&record.job_id) {
            job.status = JobStatus::Failed;
            job.error = Some(error.to_string());
            job.updated_at = record.ts;
        }
    }

    pub(crate) fn apply_audit_decision(&mut self, record: &EventRecord, decision: AuditDecision, passed: bool) {
        if let Some(job) = self.jobs.get_mut(&record.job_id) {
            job.audit.decision = decision;
            job.audit.passed = passed;
            job.status = JobStatus::Approved;
            job.updated_at = record.ts;
        }
    }

    pub(crate) fn apply_audit_revise(&mut self, record: &EventRecord, revision: &str) {
        if let Some(job) = self.jobs.get_mut(&record.job_id) {
            job.audit.decision = AuditDecision::Revise;
            job.audit.revision = Some(revision.to_string());
            job.audit.passed = false;
            job.status = JobStatus::ReviseRequested;
            job.updated_at = record.ts;
        }
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
