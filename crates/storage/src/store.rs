// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! `StateStore`: the single-writer durable store every other crate talks
//! to. One `Store` instance owns the WAL and lock file for one project;
//! concurrent writers across processes are rejected at `open()` (§6.5).

use std::sync::Arc;

use agentflow_core::{
    resume_dedupe_key, Clock, ControlAction, ControlOutcome, ControlSignal, Event, EventRecord, Job, JobId,
    JobStatus, Run, RunId, RunStatus,
};
use fs2::FileExt;
use parking_lot::Mutex;

use crate::error::{StorageError, StorageResult};
use crate::paths::ProjectPaths;
use crate::state::MaterializedState;
use crate::wal::Wal;

/// Threshold below which a repeated heartbeat is dropped rather than
/// appended, to bound WAL growth under a fast poll loop (§6.6 default).
pub const HEARTBEAT_THROTTLE_MS: u64 = 30_000;

#[derive(Debug)]
pub struct Store<C: Clock> {
    paths: ProjectPaths,
    clock: C,
    inner: Mutex<Inner>,
    _lock_file: std::fs::File,
}

#[derive(Debug)]
struct Inner {
    wal: Wal,
    state: MaterializedState,
}

impl<C: Clock> Store<C> {
    /// Open (creating if needed) the durable store for one project.
    /// Acquires an exclusive advisory lock on `orchestrator.lock`;
    /// returns [`StorageError::Locked`] if another process holds it.
    pub fn open(paths: ProjectPaths, clock: C) -> StorageResult<Self> {
        paths.ensure_dirs().map_err(|source| StorageError::Io { path: paths.root().display().to_string(), source })?;

        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(paths.lock_path())
            .map_err(|source| StorageError::Io { path: paths.lock_path().display().to_string(), source })?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| StorageError::Locked(paths.lock_path().display().to_string()))?;

        let records = Wal::replay(paths.wal_path())?;
        let state = MaterializedState::replay(&records);
        let wal = Wal::open(paths.wal_path())?;

        Ok(Self { paths, clock, inner: Mutex::new(Inner { wal, state }), _lock_file: lock_file })
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    fn append(&self, inner: &mut Inner, job_id: JobId, run_id: Option<RunId>, kind: Event) -> StorageResult<()> {
        let record = EventRecord { job_id, run_id, ts: self.clock.epoch_ms(), kind };
        inner.wal.append(&record)?;
        inner.state.apply(&record);
        Ok(())
    }

    pub fn create_job(&self, project_id: &str, goal: &str, max_attempts: u32) -> StorageResult<Job> {
        let mut inner = self.inner.lock();
        let now = self.clock.epoch_ms();
        let mut job = Job::new(project_id, goal, now, max_attempts);
        let job_id = job.job_id;
        self.append(&mut inner, job_id, None, Event::JobCreated { project_id: project_id.to_string(), goal: goal.to_string() })?;
        // Reconcile the constructed job with what the projection now holds
        // (apply() is the single source of truth for derived fields).
        job = inner.state.job(&job_id).cloned().unwrap_or(job);
        Ok(job)
    }

    pub fn get_job(&self, job_id: &JobId) -> Option<Job> {
        self.inner.lock().state.job(job_id).cloned()
    }

    pub fn get_run(&self, run_id: &RunId) -> Option<Run> {
        self.inner.lock().state.run(run_id).cloned()
    }

    /// Atomically claim a claimable, unexpired-or-unheld job for `worker_id`
    /// (§4.2). Returns [`StorageError::NotClaimable`] otherwise.
    pub fn claim(&self, job_id: &JobId, worker_id: &str, lease_secs: u64) -> StorageResult<Job> {
        let mut inner = self.inner.lock();
        let job = inner.state.job(job_id).cloned().ok_or_else(|| StorageError::JobNotFound(*job_id))?;
        let now = self.clock.epoch_ms();
        let claimable = job.status.is_claimable() || job.is_lease_expired(now);
        if !claimable {
            return Err(StorageError::NotClaimable { job_id: *job_id, status: job.status.to_string() });
        }
        let lease_until = now + lease_secs * 1000;
        self.append(&mut inner, *job_id, job.run_id, Event::JobClaimed { worker_id: worker_id.to_string(), lease_until })?;
        Ok(inner.state.job(job_id).cloned().unwrap())
    }

    /// Record a heartbeat, throttled to at most once per
    /// [`HEARTBEAT_THROTTLE_MS`] to bound WAL growth (§4.3, §6.6).
    pub fn heartbeat(&self, job_id: &JobId, worker_id: &str) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        let now = self.clock.epoch_ms();
        let job = inner.state.job(job_id).cloned().ok_or_else(|| StorageError::JobNotFound(*job_id))?;
        if let Some(last) = job.last_main_heartbeat_ts {
            if now.saturating_sub(last) < HEARTBEAT_THROTTLE_MS {
                return Ok(());
            }
        }
        self.append(&mut inner, *job_id, job.run_id, Event::Heartbeat { worker_id: worker_id.to_string() })
    }

    /// Reclaim jobs in `running` or `planning` whose lease has expired or
    /// whose heartbeat has gone quiet for longer than `stale_secs` (§4.1,
    /// §4.5). `running` jobs revert to `approved`, `planning` jobs revert
    /// to `queued` — `apply_stale_recovered` branches on the recorded
    /// `previous_status`. Returns the ids recovered.
    pub fn recover_stale_jobs(&self, stale_secs: u64) -> StorageResult<Vec<JobId>> {
        let mut inner = self.inner.lock();
        let now = self.clock.epoch_ms();
        let stale_ms = stale_secs * 1000;
        let stale: Vec<JobId> = inner
            .state
            .jobs_iter()
            .filter(|j| matches!(j.status, JobStatus::Running | JobStatus::Planning))
            .filter(|j| j.is_lease_expired(now) || j.heartbeat_at.map_or(true, |hb| now.saturating_sub(hb) >= stale_ms))
            .map(|j| j.job_id)
            .collect();
        for job_id in &stale {
            let job = inner.state.job(job_id).cloned().unwrap();
            self.append(&mut inner, *job_id, job.run_id, Event::StaleRecovered { previous_status: job.status.to_string() })?;
        }
        Ok(stale)
    }

    /// §4.9 `revise` follow-up: jobs parked at `revise_requested` fold
    /// their revision text into the goal and return to `planning` so the
    /// next claim replans from the updated goal. Returns the ids advanced.
    pub fn apply_pending_revisions(&self) -> StorageResult<Vec<JobId>> {
        let mut inner = self.inner.lock();
        let pending: Vec<JobId> = inner
            .state
            .jobs_iter()
            .filter(|j| j.status == JobStatus::ReviseRequested)
            .map(|j| j.job_id)
            .collect();
        for job_id in &pending {
            let job = inner.state.job(job_id).cloned().unwrap();
            let revision = job.audit.revision.clone().unwrap_or_default();
            let goal = format!("{}\n\nRevision requested: {}", job.goal, revision);
            self.append(&mut inner, *job_id, job.run_id, Event::RevisionApplied { goal })?;
        }
        Ok(pending)
    }

    /// List ids of jobs currently claimable by a worker (§4.8 step 2),
    /// oldest first.
    pub fn claimable_jobs(&self) -> Vec<JobId> {
        let inner = self.inner.lock();
        let mut jobs: Vec<Job> = inner.state.jobs_iter().filter(|j| j.status.is_claimable()).cloned().collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs.into_iter().map(|j| j.job_id).collect()
    }

    pub fn start_run(&self, job_id: &JobId) -> StorageResult<Run> {
        let mut inner = self.inner.lock();
        let now = self.clock.epoch_ms();
        let run_id = RunId::from_epoch_ms(now);
        self.append(&mut inner, *job_id, Some(run_id), Event::RunStarted { run_id })?;
        Ok(inner.state.run(&run_id).cloned().unwrap())
    }

    pub fn finish_run(&self, job_id: &JobId, run_id: RunId, status: RunStatus) -> StorageResult<bool> {
        let mut inner = self.inner.lock();
        let now = self.clock.epoch_ms();
        let ok = inner.state.finish_run(run_id, status, now);
        if ok {
            let event = match status {
                RunStatus::Finished | RunStatus::Completed => Event::WorkflowFinished { summary: String::new() },
                _ => Event::WorkflowFailed { error: format!("run ended in {status}") },
            };
            self.append(&mut inner, *job_id, Some(run_id), event)?;
        }
        Ok(ok)
    }

    pub fn append_event(&self, job_id: JobId, run_id: Option<RunId>, kind: Event) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        self.append(&mut inner, job_id, run_id, kind)
    }

    pub fn audit_timeline(&self, job_id: &JobId) -> Vec<EventRecord> {
        self.inner.lock().state.audit_timeline(job_id).into_iter().cloned().collect()
    }

    pub fn events_for_job(&self, job_id: &JobId) -> Vec<EventRecord> {
        self.inner.lock().state.events_for_job(job_id).to_vec()
    }

    pub fn register_plan(&self, run_id: RunId, tasks: Vec<agentflow_core::Task>) {
        self.inner.lock().state.register_plan(run_id, tasks)
    }

    pub fn task_state(&self, run_id: RunId, task_id: agentflow_core::TaskId) -> Option<agentflow_core::TaskState> {
        self.inner.lock().state.task_state(run_id, task_id).cloned()
    }

    pub fn tasks_for_run(&self, run_id: RunId) -> Vec<agentflow_core::Task> {
        self.inner.lock().state.tasks_for_run(run_id).cloned().collect()
    }

    /// Write a point-in-time snapshot of one job to disk (§6.5
    /// `jobs/<job_id>.snapshot.json`), for operator inspection without
    /// replaying the whole WAL.
    pub fn write_job_snapshot(&self, job_id: &JobId) -> StorageResult<()> {
        let job = self.get_job(job_id).ok_or_else(|| StorageError::JobNotFound(*job_id))?;
        let bytes = serde_json::to_vec_pretty(&job)?;
        let path = self.paths.job_snapshot_path(job_id.as_str());
        std::fs::write(&path, bytes).map_err(|source| StorageError::Io { path: path.display().to_string(), source })
    }

    pub fn has_seen_request_id(&self, job_id: JobId, request_id: &str) -> bool {
        self.inner.lock().state.has_seen_request_id(job_id, request_id)
    }

    pub fn has_seen_resume_key(&self, job_id: JobId, dedupe_key: &str) -> bool {
        self.inner.lock().state.has_seen_resume_key(job_id, dedupe_key)
    }

    pub fn mark_request_id_seen(&self, job_id: JobId, request_id: &str) {
        self.inner.lock().state.mark_request_id_seen(job_id, request_id)
    }

    pub fn next_signal_seq(&self, job_id: JobId) -> u64 {
        self.inner.lock().state.next_signal_seq(job_id)
    }

    /// Apply one drained control signal under the same single-writer
    /// discipline as every other mutation (§4.9). Idempotent: redelivery
    /// of an already-applied `request_id` or resume `dedupe_key` is a
    /// no-op, and `signal_seq` gaps are accepted (only strictly-decreasing
    /// sequences are rejected, §9 OQ2).
    pub fn apply_control_signal(&self, signal: &ControlSignal) -> StorageResult<ControlOutcome> {
        let mut inner = self.inner.lock();

        if inner.state.has_seen_request_id(signal.job_id, &signal.request_id) {
            return Ok(ControlOutcome::Deduped);
        }
        if !inner.state.accepts_signal_seq(signal.job_id, signal.signal_seq) {
            return Ok(ControlOutcome::Rejected { reason: "signal_seq is strictly decreasing".to_string() });
        }
        let job = inner.state.job(&signal.job_id).cloned().ok_or(StorageError::JobNotFound(signal.job_id))?;

        let outcome = match signal.action {
            ControlAction::Approve => {
                self.append(&mut inner, signal.job_id, job.run_id, Event::AuditApproved)?;
                ControlOutcome::Applied
            }
            ControlAction::Revise => {
                let revision = signal.payload.revision.clone().unwrap_or_default();
                self.append(&mut inner, signal.job_id, job.run_id, Event::AuditReviseRequested { revision })?;
                ControlOutcome::Applied
            }
            ControlAction::Resume => {
                let Some(answer) = signal.payload.answer.as_deref().filter(|a| !a.is_empty()) else {
                    return Ok(ControlOutcome::Rejected { reason: "invalid_answer".to_string() });
                };
                let dedupe_key = resume_dedupe_key(signal.payload.task_id.as_ref(), answer);
                if inner.state.has_seen_resume_key(signal.job_id, &dedupe_key) {
                    ControlOutcome::DedupedByAnswer
                } else {
                    self.append(
                        &mut inner,
                        signal.job_id,
                        job.run_id,
                        Event::AnswerConsumed {
                            task_id: signal.payload.task_id,
                            answer: answer.to_string(),
                            dedupe_key: dedupe_key.clone(),
                        },
                    )?;
                    self.append(&mut inner, signal.job_id, job.run_id, Event::JobResumed { dedupe_key })?;
                    ControlOutcome::Applied
                }
            }
            ControlAction::Cancel => {
                self.append(&mut inner, signal.job_id, job.run_id, Event::JobCancelled)?;
                ControlOutcome::Applied
            }
        };

        inner.state.mark_request_id_seen(signal.job_id, &signal.request_id);
        inner.state.record_applied_signal_seq(signal.job_id, signal.signal_seq);
        Ok(outcome)
    }
}

/// Shared handle to a store, cloneable across worker tasks within one
/// process (the advisory file lock enforces single-process ownership
/// across processes, this `Arc` shares that ownership within one).
pub type SharedStore<C> = Arc<Store<C>>;

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
