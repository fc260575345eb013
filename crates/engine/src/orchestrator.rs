// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Orchestrator (C7, §4.7): the single-run pipeline from goal to report,
//! wiring together the DAG builder, scheduler, router, and executor over
//! one [`Store`].

use std::path::PathBuf;
use std::sync::Arc;

use agentflow_adapters::{Llm, LlmMessage, LlmRequest, Notifier, NotifyMessage, SessionApi};
use agentflow_core::{
    AgentRegistry, Clock, Event, Job, JobId, OrchestratorError, Run, RunId, RunStatus, Task,
    TaskId, validate_task_plan,
};
use agentflow_storage::Store;
use serde::Deserialize;

use crate::dag::build_dag;
use crate::executor::{Executor, PassOutcome, DEFAULT_IDLE_TIMEOUT};
use crate::router::Router;
use crate::scheduler::{AgentLimits, Scheduler};
use crate::validate::OutputPolicy;

const MAX_DECOMPOSE_ATTEMPTS: u32 = 3;
const DECOMPOSE_MODEL: &str = "decompose";

/// §4.10 "no busy-wait": a short sleep between passes that made no
/// terminal progress, so the executor loop yields instead of hammering
/// the session/LLM adapters.
const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(500);

/// §4.7 step 8: how the orchestrator reacts to a `[TASK_WAITING]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitingHumanPolicy {
    /// Persist the question and return `waiting_human`; an external
    /// `resume` control signal re-enters the run.
    Human,
    /// Ask the LLM for an answer, bounded by `max_auto_resumes`.
    Auto { max_auto_resumes: u32 },
    /// Fail the run immediately.
    Strict,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_attempts: u32,
    pub audit_required: bool,
    pub waiting_human_policy: WaitingHumanPolicy,
    pub idle_timeout: std::time::Duration,
    pub output_policy: OutputPolicy,
    pub artifacts_root: PathBuf,
    /// Per-agent dispatch concurrency caps (§4.3, `ORCH_AGENT_LIMITS`).
    pub agent_limits: AgentLimits,
    /// Global in-flight task cap across the whole run (`ORCH_MAX_PARALLEL_TASKS`).
    pub global_cap: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            audit_required: true,
            waiting_human_policy: WaitingHumanPolicy::Human,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            output_policy: OutputPolicy::default(),
            artifacts_root: PathBuf::from("./workspace"),
            agent_limits: AgentLimits::default(),
            global_cap: 2,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub job_id: JobId,
    pub completed: Vec<TaskId>,
    pub failed: Vec<TaskId>,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    AwaitingAudit { job_id: JobId, run_id: RunId, missing_fields: Vec<String> },
    WaitingHuman { job_id: JobId, run_id: RunId, task_id: TaskId, question: String },
    Finished(RunReport),
    Failed { job_id: JobId, run_id: Option<RunId>, error: String },
}

#[derive(Debug, Deserialize)]
struct DecomposedPlan {
    tasks: Vec<Task>,
}

pub struct Orchestrator<C: Clock, L: Llm + Clone, S: SessionApi + Clone> {
    store: Arc<Store<C>>,
    clock: C,
    llm: L,
    router: Router<L>,
    session_api: S,
    notifier: Notifier,
    config: OrchestratorConfig,
}

impl<C: Clock, L: Llm + Clone, S: SessionApi + Clone> Orchestrator<C, L, S> {
    pub fn new(store: Arc<Store<C>>, clock: C, llm: L, registry: AgentRegistry, session_api: S, notifier: Notifier, config: OrchestratorConfig) -> Self {
        let router = Router::new(registry, llm.clone());
        Self { store, clock, llm, router, session_api, notifier, config }
    }

    fn notify(&self, job_id: JobId, run_id: Option<RunId>, event: &str, title: &str, body: impl Into<String>) {
        self.notifier.notify(NotifyMessage {
            agent: "orchestrator".to_string(),
            event: event.to_string(),
            run_id: run_id.map(|r| r.to_string()),
            task_id: None,
            title: title.to_string(),
            body: body.into(),
        });
    }

    /// Derive a stable project id from the goal and job id (§4.7 step 1).
    pub fn derive_project_id(goal: &str, job_id: JobId) -> String {
        let slug: String = goal
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .take(6)
            .collect::<Vec<_>>()
            .join("-");
        format!("{slug}-{job_id}")
    }

    /// Run the single-run pipeline for a fresh goal submission (§4.7).
    pub async fn run(&self, goal: &str) -> Result<PipelineOutcome, OrchestratorError> {
        let project_id = Self::derive_project_id(goal, JobId::new());
        let job = self
            .store
            .create_job(&project_id, goal, self.config.max_attempts)
            .map_err(|e| OrchestratorError::resource(e.to_string()))?;
        self.run_job(job).await
    }

    /// Resume the pipeline for an already-approved job (skips decompose
    /// repeat and the audit gate): used after a `control approve`/`resume`
    /// signal has transitioned the job back to `approved` (§4.9).
    pub async fn run_job(&self, job: Job) -> Result<PipelineOutcome, OrchestratorError> {
        let run = self.store.start_run(&job.job_id).map_err(|e| OrchestratorError::resource(e.to_string()))?;
        self.notify(job.job_id, Some(run.run_id), "run_started", &job.goal, "");

        let tasks = match self.decompose(&job, &run).await {
            Ok(tasks) => tasks,
            Err(e) => return self.fail_run(&job, &run, e).await,
        };

        let routed = match self.route_tasks(&job, &run, tasks).await {
            Ok(routed) => routed,
            Err(e) => return self.fail_run(&job, &run, e).await,
        };

        let dag = match build_dag(&routed) {
            Ok(dag) => dag,
            Err(e) => return self.fail_run(&job, &run, OrchestratorError::validation(e.to_string())).await,
        };

        if self.config.audit_required && !job.audit.passed {
            return self.await_audit(&job, &run, &routed).await;
        }

        self.execute(&job, &run, routed, dag).await
    }

    async fn decompose(&self, job: &Job, run: &Run) -> Result<Vec<Task>, OrchestratorError> {
        let mut last_error = String::new();
        for attempt in 1..=MAX_DECOMPOSE_ATTEMPTS {
            let prompt = if attempt == 1 {
                format!("Decompose this goal into 3-8 tasks conforming to the task schema: {}", job.goal)
            } else {
                format!(
                    "Decompose this goal into 3-8 tasks conforming to the task schema: {}\n\nThe previous attempt failed validation: {last_error}",
                    job.goal
                )
            };
            let request = LlmRequest {
                model: DECOMPOSE_MODEL.to_string(),
                messages: vec![LlmMessage::system("You are a task planner."), LlmMessage::user(prompt)],
                temperature: 0.2,
            };
            let raw = self.llm.complete(request).await.map_err(|e| OrchestratorError::transient(e.to_string()))?;
            let parsed: Result<DecomposedPlan, _> = serde_json::from_str(&raw);
            match parsed {
                Ok(plan) => match validate_task_plan(&plan.tasks) {
                    Ok(()) => {
                        let tasks = reassign_task_ids(plan.tasks);
                        self.store
                            .append_event(job.job_id, Some(run.run_id), Event::PlanDecomposed { task_count: tasks.len() })
                            .map_err(|e| OrchestratorError::resource(e.to_string()))?;
                        return Ok(tasks);
                    }
                    Err(e) => last_error = e.to_string(),
                },
                Err(e) => last_error = e.to_string(),
            }
            if attempt > 1 {
                self.store
                    .append_event(job.job_id, Some(run.run_id), Event::PlanRepaired { attempt })
                    .map_err(|e| OrchestratorError::resource(e.to_string()))?;
            }
        }
        Err(OrchestratorError::validation(format!("plan decomposition failed after {MAX_DECOMPOSE_ATTEMPTS} attempts: {last_error}")))
    }

    async fn route_tasks(&self, job: &Job, run: &Run, mut tasks: Vec<Task>) -> Result<Vec<Task>, OrchestratorError> {
        for task in &mut tasks {
            let decision = self.router.route(&task.title, task.description.as_deref()).await?;
            task.assigned_to = Some(decision.assigned_to.clone());
            self.store
                .append_event(
                    job.job_id,
                    Some(run.run_id),
                    Event::TaskRouted { task_id: task.id, assigned_to: decision.assigned_to, routing_reason: decision.routing_reason },
                )
                .map_err(|e| OrchestratorError::resource(e.to_string()))?;
        }
        self.store.register_plan(run.run_id, tasks.clone());
        Ok(tasks)
    }

    async fn await_audit(&self, job: &Job, run: &Run, tasks: &[Task]) -> Result<PipelineOutcome, OrchestratorError> {
        let impact_scope = tasks.iter().map(|t| t.title.as_str()).collect::<Vec<_>>().join("; ");
        let payload = agentflow_core::AuditPayloadBuilder::default()
            .status("awaiting_audit")
            .job_id(job.job_id.to_string())
            .run_id(run.run_id.to_string())
            .goal(job.goal.clone())
            .impact_scope(impact_scope)
            .build();
        self.store
            .append_event(job.job_id, Some(run.run_id), Event::WorkflowAwaitingAudit { missing_fields: payload.missing_fields.clone() })
            .map_err(|e| OrchestratorError::resource(e.to_string()))?;
        self.notify(job.job_id, Some(run.run_id), "workflow_awaiting_audit", &job.goal, "");
        Ok(PipelineOutcome::AwaitingAudit { job_id: job.job_id, run_id: run.run_id, missing_fields: payload.missing_fields })
    }

    async fn execute(&self, job: &Job, run: &Run, tasks: Vec<Task>, dag: crate::dag::Dag) -> Result<PipelineOutcome, OrchestratorError> {
        let assigned_agent: std::collections::HashMap<TaskId, String> =
            tasks.iter().map(|t| (t.id, t.assigned_to.clone().unwrap_or_default())).collect();

        let artifacts_dir = self.config.artifacts_root.join(job.project_id.as_str()).join("artifacts");
        std::fs::create_dir_all(&artifacts_dir).map_err(|e| OrchestratorError::resource(e.to_string()))?;

        let mut scheduler = Scheduler::new(&dag);
        let mut executor = Executor::new(
            self.session_api.clone(),
            self.notifier.clone(),
            tasks.clone(),
            run.run_id,
            artifacts_dir,
            self.config.output_policy,
            self.config.idle_timeout,
            self.config.agent_limits.clone(),
            self.config.global_cap,
            0,
        );

        let mut auto_resumes_used = 0u32;
        loop {
            if scheduler.is_finished() {
                break;
            }
            let outcome = executor.run_pass(&mut scheduler, &assigned_agent, self.clock.epoch_ms()).await?;
            match outcome {
                PassOutcome::Progressed => {
                    if !scheduler.is_finished() {
                        tokio::time::sleep(POLL_INTERVAL).await;
                    }
                    continue;
                }
                PassOutcome::Stalled => {
                    return self.fail_run(job, run, OrchestratorError::logic("run stalled: no ready or running tasks")).await;
                }
                PassOutcome::Waiting(task_id, question) => {
                    self.store
                        .append_event(job.job_id, Some(run.run_id), Event::TaskWaiting { task_id, question: question.clone() })
                        .map_err(|e| OrchestratorError::resource(e.to_string()))?;
                    match self.config.waiting_human_policy {
                        WaitingHumanPolicy::Human => {
                            self.persist_waiting_state(run.run_id, task_id, &question)?;
                            self.store
                                .append_event(job.job_id, Some(run.run_id), Event::JobWaitingHuman { task_id })
                                .map_err(|e| OrchestratorError::resource(e.to_string()))?;
                            return Ok(PipelineOutcome::WaitingHuman { job_id: job.job_id, run_id: run.run_id, task_id, question });
                        }
                        WaitingHumanPolicy::Strict => {
                            return self.fail_run(job, run, OrchestratorError::human(question)).await;
                        }
                        WaitingHumanPolicy::Auto { max_auto_resumes } => {
                            if auto_resumes_used >= max_auto_resumes {
                                self.persist_waiting_state(run.run_id, task_id, &question)?;
                                self.store
                                    .append_event(job.job_id, Some(run.run_id), Event::JobWaitingHuman { task_id })
                                    .map_err(|e| OrchestratorError::resource(e.to_string()))?;
                                return Ok(PipelineOutcome::WaitingHuman { job_id: job.job_id, run_id: run.run_id, task_id, question });
                            }
                            auto_resumes_used += 1;
                            let answer = self.auto_answer(&question).await?;
                            executor.resume_waiting(task_id, &answer).await?;
                        }
                    }
                }
            }
        }

        let summary = format!("{} completed, {} failed", scheduler.done().len(), scheduler.failed().len());
        self.store.finish_run(&job.job_id, run.run_id, RunStatus::Finished).map_err(|e| OrchestratorError::resource(e.to_string()))?;
        self.notify(job.job_id, Some(run.run_id), "workflow_finished", &job.goal, summary.clone());

        let report = RunReport {
            run_id: run.run_id,
            job_id: job.job_id,
            completed: scheduler.done().iter().copied().collect(),
            failed: scheduler.failed().iter().copied().collect(),
            summary,
        };
        self.persist_report(&report);
        Ok(PipelineOutcome::Finished(report))
    }

    /// Durably record a waiting-human pause (§4.7 step 8, S4): the worker
    /// restarting mid-wait can reconstruct which task is blocked without
    /// replaying the whole executor loop.
    fn persist_waiting_state(&self, run_id: RunId, task_id: TaskId, question: &str) -> Result<(), OrchestratorError> {
        let path = self.store.paths().waiting_path(run_id.as_str());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| OrchestratorError::resource(e.to_string()))?;
        }
        let body = serde_json::json!({ "task_id": task_id.to_string(), "question": question });
        std::fs::write(&path, body.to_string()).map_err(|e| OrchestratorError::resource(e.to_string()))
    }

    /// Write the run report JSON snapshot to disk (§4.7 step 9). Best
    /// effort: a write failure here must not turn a finished run into a
    /// failed one.
    fn persist_report(&self, report: &RunReport) {
        let path = self.store.paths().run_report_path(report.run_id.as_str());
        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        if let Ok(body) = serde_json::to_string_pretty(report) {
            let _ = std::fs::write(&path, body);
        }
    }

    async fn auto_answer(&self, question: &str) -> Result<String, OrchestratorError> {
        let request = LlmRequest {
            model: DECOMPOSE_MODEL.to_string(),
            messages: vec![
                LlmMessage::system("Answer the agent's question on the operator's behalf, concisely."),
                LlmMessage::user(question.to_string()),
            ],
            temperature: 0.0,
        };
        self.llm.complete(request).await.map_err(|e| OrchestratorError::transient(e.to_string()))
    }

    async fn fail_run(&self, job: &Job, run: &Run, error: OrchestratorError) -> Result<PipelineOutcome, OrchestratorError> {
        self.store.finish_run(&job.job_id, run.run_id, RunStatus::Failed).map_err(|e| OrchestratorError::resource(e.to_string()))?;
        self.notify(job.job_id, Some(run.run_id), "workflow_failed", &job.goal, error.to_string());
        Ok(PipelineOutcome::Failed { job_id: job.job_id, run_id: Some(run.run_id), error: error.to_string() })
    }
}

/// Assign fresh task ids and rewrite `deps` to match (§4.7 step 3
/// post-processing), since the LLM-proposed ids aren't guaranteed globally
/// unique or schema-exact.
fn reassign_task_ids(tasks: Vec<Task>) -> Vec<Task> {
    let remap: std::collections::HashMap<TaskId, TaskId> = tasks.iter().map(|t| (t.id, TaskId::new())).collect();
    tasks
        .into_iter()
        .map(|mut t| {
            t.deps = t.deps.iter().filter_map(|d| remap.get(d).copied()).collect();
            t.id = remap[&t.id];
            t
        })
        .collect()
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
