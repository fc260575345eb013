// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Worker loop (C8, §4.8): drains control signals, recovers stale jobs,
//! claims up to `worker_max_concurrency` jobs under a lease, and runs
//! each to completion under a hard per-job timeout. The orchestrator
//! owns every status transition except one: retrying a failed run back
//! to `approved` when `attempt_count < max_attempts` (§4.8 step 5) is
//! this loop's responsibility, since [`Orchestrator::run_job`] only ever
//! leaves a failed run in `failed`.

use std::sync::Arc;
use std::time::Duration;

use agentflow_adapters::{Llm, SessionApi};
use agentflow_core::{Clock, Event, Job, JobId, JobStatus};
use agentflow_engine::{Orchestrator, PipelineOutcome};
use agentflow_storage::{SignalQueue, Store};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::env::WorkerConfig;

/// Minimum heartbeat cadence regardless of how short the lease is, so a
/// misconfigured `claim_lease_secs` can't spin the heartbeat loop.
const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// How often the dispatch loop wakes up to drain signals, recover stale
/// leases, and look for newly claimable jobs.
const POLL_INTERVAL: Duration = Duration::from_millis(750);

pub struct Worker<C: Clock, L: Llm + Clone, S: SessionApi + Clone> {
    store: Arc<Store<C>>,
    signal_queue: SignalQueue,
    orchestrator: Arc<Orchestrator<C, L, S>>,
    config: WorkerConfig,
}

impl<C: Clock + 'static, L: Llm + Clone, S: SessionApi + Clone> Worker<C, L, S> {
    pub fn new(store: Arc<Store<C>>, signal_queue: SignalQueue, orchestrator: Arc<Orchestrator<C, L, S>>, config: WorkerConfig) -> Self {
        Self { store, signal_queue, orchestrator, config }
    }

    /// Run the dispatch loop forever. Never returns under normal
    /// operation; a caller that wants a bounded run (tests, a single
    /// drain-and-exit invocation) should wrap this in `tokio::select!`
    /// against its own shutdown signal instead of calling it directly.
    pub async fn run(&self) -> ! {
        let mut running = JoinSet::new();
        loop {
            self.drain_control_signals();
            self.apply_pending_revisions();
            self.recover_stale_jobs();
            self.claim_and_dispatch(&mut running).await;

            tokio::select! {
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
                Some(result) = running.join_next(), if !running.is_empty() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "job task panicked");
                    }
                }
            }
        }
    }

    /// §4.9: drain the durable signal queue and apply each signal
    /// atomically against the store. Redelivery after a crash between
    /// drain and apply is safe: `apply_control_signal` is idempotent on
    /// `request_id`.
    fn drain_control_signals(&self) {
        let signals = match self.signal_queue.drain() {
            Ok(signals) => signals,
            Err(e) => {
                tracing::warn!(error = %e, "failed to drain control signal queue");
                return;
            }
        };
        for signal in signals {
            let job_id = signal.job_id;
            let action = signal.action;
            match self.store.apply_control_signal(&signal) {
                Ok(outcome) => {
                    tracing::info!(%job_id, ?action, ?outcome, "control signal applied");
                    write_snapshot(&self.store, job_id);
                }
                Err(e) => tracing::error!(%job_id, ?action, error = %e, "control signal application failed"),
            }
        }
    }

    /// §4.5: revert expired leases so another claim pass can pick the job
    /// back up.
    fn recover_stale_jobs(&self) {
        match self.store.recover_stale_jobs(self.config.running_stale_secs) {
            Ok(recovered) if !recovered.is_empty() => {
                tracing::info!(count = recovered.len(), "recovered stale jobs");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "stale job recovery failed"),
        }
    }

    /// §4.9 `revise` follow-up: advance every `revise_requested` job to
    /// `planning` with its goal rewritten, so the next claim pass replans.
    fn apply_pending_revisions(&self) {
        match self.store.apply_pending_revisions() {
            Ok(advanced) => {
                for job_id in advanced {
                    tracing::info!(%job_id, "revision folded into goal, job returned to planning");
                    write_snapshot(&self.store, job_id);
                }
            }
            Err(e) => tracing::warn!(error = %e, "applying pending revisions failed"),
        }
    }

    /// §4.8 steps 2-3: claim up to the remaining concurrency budget and
    /// spawn one task per claimed job.
    async fn claim_and_dispatch(&self, running: &mut JoinSet<()>) {
        let available = self.config.worker_max_concurrency.saturating_sub(running.len());
        if available == 0 {
            return;
        }
        for job_id in self.store.claimable_jobs().into_iter().take(available) {
            match self.store.claim(&job_id, &self.config.worker_id, self.config.claim_lease_secs) {
                Ok(job) => {
                    tracing::info!(job_id = %job.job_id, worker_id = %self.config.worker_id, "claimed job");
                    write_snapshot(&self.store, job.job_id);
                    running.spawn(self.run_claimed_job(job));
                }
                Err(e) => tracing::debug!(%job_id, error = %e, "claim lost race, skipping"),
            }
        }
    }

    /// Drive one claimed job to a terminal pipeline outcome under a hard
    /// timeout, heartbeating the lease concurrently, then apply the one
    /// status transition the orchestrator doesn't own (§4.8 step 5).
    fn run_claimed_job(&self, job: Job) -> impl std::future::Future<Output = ()> + 'static {
        let store = self.store.clone();
        let orchestrator = self.orchestrator.clone();
        let worker_id = self.config.worker_id.clone();
        let job_timeout = self.config.worker_job_timeout;
        let heartbeat_interval = (self.config.claim_lease_secs / 3).max(1);
        let heartbeat_interval = Duration::from_secs(heartbeat_interval).max(MIN_HEARTBEAT_INTERVAL);
        let max_attempts = job.max_attempts;
        let job_id = job.job_id;

        async move {
            let token = CancellationToken::new();
            let heartbeat = tokio::spawn(heartbeat_loop(store.clone(), job_id, worker_id, heartbeat_interval, token.clone()));

            let outcome = tokio::time::timeout(job_timeout, orchestrator.run_job(job)).await;
            token.cancel();
            let _ = heartbeat.await;

            match outcome {
                Ok(Ok(pipeline_outcome)) => log_pipeline_outcome(job_id, &pipeline_outcome),
                Ok(Err(e)) => tracing::error!(%job_id, error = %e, "run_job returned an error"),
                Err(_) => {
                    tracing::warn!(%job_id, timeout = ?job_timeout, "job exceeded its hard timeout");
                    fail_timed_out_run(&store, job_id);
                }
            }

            maybe_retry_to_approved(&store, job_id, max_attempts);
            write_snapshot(&store, job_id);
        }
    }
}

/// Refresh the on-disk job snapshot (§6.5) after every run attempt so an
/// operator, or a test, can observe the job's terminal status without
/// contending for the store's exclusive lock.
fn write_snapshot<C: Clock>(store: &Store<C>, job_id: JobId) {
    if let Err(e) = store.write_job_snapshot(&job_id) {
        tracing::warn!(%job_id, error = %e, "failed to write job snapshot");
    }
}

async fn heartbeat_loop<C: Clock>(store: Arc<Store<C>>, job_id: JobId, worker_id: String, interval: Duration, token: CancellationToken) {
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(interval) => {
                if let Err(e) = store.heartbeat(&job_id, &worker_id) {
                    tracing::warn!(%job_id, error = %e, "heartbeat failed");
                }
            }
        }
    }
}

fn log_pipeline_outcome(job_id: JobId, outcome: &PipelineOutcome) {
    match outcome {
        PipelineOutcome::Finished(report) => {
            tracing::info!(%job_id, run_id = %report.run_id, completed = report.completed.len(), failed = report.failed.len(), "job finished");
        }
        PipelineOutcome::AwaitingAudit { run_id, missing_fields, .. } => {
            tracing::info!(%job_id, %run_id, missing = ?missing_fields, "job awaiting audit");
        }
        PipelineOutcome::WaitingHuman { run_id, task_id, .. } => {
            tracing::info!(%job_id, %run_id, %task_id, "job waiting on human input");
        }
        PipelineOutcome::Failed { run_id, error, .. } => {
            tracing::warn!(%job_id, ?run_id, %error, "job failed");
        }
    }
}

/// A timed-out run never reached `Orchestrator::fail_run`, so the run row
/// (if one was started) is still non-terminal. Close it out explicitly;
/// `finish_run` is write-once so this is a no-op if the orchestrator
/// actually finished in the race window before the timeout fired.
fn fail_timed_out_run<C: Clock>(store: &Store<C>, job_id: JobId) {
    let Some(job) = store.get_job(&job_id) else { return };
    let Some(run_id) = job.run_id else { return };
    match store.finish_run(&job_id, run_id, agentflow_core::RunStatus::Failed) {
        Ok(true) => tracing::info!(%job_id, %run_id, "marked timed-out run failed"),
        Ok(false) => {}
        Err(e) => tracing::error!(%job_id, %run_id, error = %e, "failed to mark timed-out run failed"),
    }
}

/// §4.8 step 5: a run that ended `failed` returns the job to `approved`
/// for another attempt when `attempt_count < max_attempts`; otherwise the
/// job stays terminally `failed`.
fn maybe_retry_to_approved<C: Clock>(store: &Store<C>, job_id: JobId, max_attempts: u32) {
    let Some(job) = store.get_job(&job_id) else { return };
    if job.status != JobStatus::Failed || job.attempt_count >= max_attempts {
        return;
    }
    if let Err(e) = store.append_event(job_id, job.run_id, Event::JobRetried { attempt: job.attempt_count }) {
        tracing::error!(%job_id, error = %e, "failed to retry job");
    } else {
        tracing::info!(%job_id, attempt = job.attempt_count, max_attempts, "job returned to approved for retry");
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
