// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Session Executor (C6, §4.6): per-run dispatch/poll loop, owning the
//! per-task session map, the watcher of which sessions to poll, the
//! idle-timeout clock, and a notifier handle.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use agentflow_adapters::{NotifyMessage, Notifier, SessionApi};
use agentflow_core::{OrchestratorError, RunId, Task, TaskId};

use crate::parser::{first_terminal, parse_directives, TerminalResult};
use crate::prompt::build_prompt;
use crate::scheduler::{select_batch, AgentLimits, Scheduler};
use crate::validate::{validate_outputs, OutputPolicy};

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    /// At least one task was dispatched or completed this pass.
    Progressed,
    /// Nothing changed and nothing is in flight; caller should treat this
    /// as a hard failure (§4.6 step 3).
    Stalled,
    /// A task raised `[TASK_WAITING]`; the executor call ends here so the
    /// orchestrator can apply the waiting-human policy (§4.6 step 2,
    /// §4.7 step 8).
    Waiting(TaskId, String),
}

/// Owns session lifecycle for one active run.
pub struct Executor<S: SessionApi> {
    session_api: S,
    notifier: Notifier,
    tasks: HashMap<TaskId, Task>,
    run_id: RunId,
    artifacts_dir: PathBuf,
    output_policy: OutputPolicy,
    idle_timeout: Duration,
    agent_limits: AgentLimits,
    global_cap: u32,
    agent_sessions: HashMap<String, String>,
    busy_sessions: HashSet<String>,
    task_session: HashMap<TaskId, String>,
    session_task: HashMap<String, TaskId>,
    session_cursor: HashMap<String, String>,
    waiting_tasks: HashMap<TaskId, String>,
    last_progress_at: u64,
}

impl<S: SessionApi> Executor<S> {
    pub fn new(
        session_api: S,
        notifier: Notifier,
        tasks: Vec<Task>,
        run_id: RunId,
        artifacts_dir: PathBuf,
        output_policy: OutputPolicy,
        idle_timeout: Duration,
        agent_limits: AgentLimits,
        global_cap: u32,
        now_ms: u64,
    ) -> Self {
        Self {
            session_api,
            notifier,
            tasks: tasks.into_iter().map(|t| (t.id, t)).collect(),
            run_id,
            artifacts_dir,
            output_policy,
            idle_timeout,
            agent_limits,
            global_cap,
            agent_sessions: HashMap::new(),
            busy_sessions: HashSet::new(),
            task_session: HashMap::new(),
            session_task: HashMap::new(),
            session_cursor: HashMap::new(),
            waiting_tasks: HashMap::new(),
            last_progress_at: now_ms,
        }
    }

    pub fn waiting_tasks(&self) -> &HashMap<TaskId, String> {
        &self.waiting_tasks
    }

    fn notify(&self, task_id: TaskId, agent: &str, event: &str, title: &str, body: impl Into<String>) {
        self.notifier.notify(NotifyMessage {
            agent: agent.to_string(),
            event: event.to_string(),
            run_id: Some(self.run_id.to_string()),
            task_id: Some(task_id.to_string()),
            title: title.to_string(),
            body: body.into(),
        });
    }

    /// Run one executor pass: dispatch newly-ready tasks, poll in-flight
    /// sessions for terminal directives, then detect stalls and idle
    /// timeouts (§4.6).
    pub async fn run_pass(
        &mut self,
        scheduler: &mut Scheduler,
        assigned_agent: &HashMap<TaskId, String>,
        now_ms: u64,
    ) -> Result<PassOutcome, OrchestratorError> {
        let ready = scheduler.ready_tasks();
        let mut progressed = false;

        let total_running = self.task_session.len() as u32;
        let mut running_per_agent: HashMap<String, u32> = HashMap::new();
        for task_id in self.task_session.keys() {
            if let Some(agent) = assigned_agent.get(task_id) {
                *running_per_agent.entry(agent.clone()).or_insert(0) += 1;
            }
        }
        let ready_with_agents: Vec<(TaskId, String)> =
            ready.iter().filter_map(|id| assigned_agent.get(id).map(|a| (*id, a.clone()))).collect();
        let batch = select_batch(&ready_with_agents, &running_per_agent, total_running, &self.agent_limits, self.global_cap);

        for task_id in &batch {
            let Some(agent) = assigned_agent.get(task_id) else { continue };
            if let Some(session_id) = self.agent_sessions.get(agent) {
                if self.busy_sessions.contains(session_id) {
                    continue;
                }
            }
            progressed |= self.dispatch(*task_id, agent, scheduler, now_ms).await?;
        }

        let in_flight: Vec<String> = self.busy_sessions.iter().cloned().collect();
        for session_id in in_flight {
            match self.poll(&session_id, scheduler, now_ms).await? {
                Some(PassOutcome::Waiting(task_id, question)) => {
                    return Ok(PassOutcome::Waiting(task_id, question));
                }
                Some(_) => progressed = true,
                None => {}
            }
        }

        if progressed {
            return Ok(PassOutcome::Progressed);
        }

        if scheduler.is_finished() {
            return Ok(PassOutcome::Progressed);
        }

        if !self.task_session.is_empty() && now_ms.saturating_sub(self.last_progress_at) >= self.idle_timeout.as_millis() as u64 {
            let stuck: Vec<TaskId> = self.task_session.keys().copied().collect();
            let elapsed_secs = self.idle_timeout.as_secs();
            for task_id in stuck {
                let agent = assigned_agent.get(&task_id).cloned().unwrap_or_default();
                scheduler.finish(task_id, false)?;
                self.notify(task_id, &agent, "task_failed", "idle timeout", format!("idle timeout after {elapsed_secs}s"));
            }
            self.task_session.clear();
            self.session_task.clear();
            self.busy_sessions.clear();
            return Ok(PassOutcome::Stalled);
        }

        if ready.is_empty() && self.busy_sessions.is_empty() {
            return Ok(PassOutcome::Stalled);
        }

        Ok(PassOutcome::Progressed)
    }

    async fn dispatch(
        &mut self,
        task_id: TaskId,
        agent: &str,
        scheduler: &mut Scheduler,
        now_ms: u64,
    ) -> Result<bool, OrchestratorError> {
        let session_id = match self.agent_sessions.get(agent) {
            Some(id) => id.clone(),
            None => {
                let id = self
                    .session_api
                    .create_session(agent)
                    .await
                    .map_err(|e| OrchestratorError::transient(e.to_string()))?;
                self.agent_sessions.insert(agent.to_string(), id.clone());
                id
            }
        };

        let task = self.tasks.get(&task_id).cloned().ok_or_else(|| OrchestratorError::logic(format!("unknown task {task_id}")))?;
        let prompt = build_prompt(&task, &self.artifacts_dir.to_string_lossy());

        match self.session_api.reply(&session_id, "user", &prompt).await {
            Err(e) => {
                // The task is still `ready` here, not `running` — `finish`
                // requires `running`, so mark it started before failing it.
                scheduler.start(task_id)?;
                scheduler.finish(task_id, false)?;
                self.notify(task_id, agent, "task_failed", "dispatch failed", e.to_string());
                Ok(true)
            }
            Ok(_) => {
                scheduler.start(task_id)?;
                self.busy_sessions.insert(session_id.clone());
                self.task_session.insert(task_id, session_id.clone());
                self.session_task.insert(session_id, task_id);
                self.notify(task_id, agent, "task_dispatched", &task.title, "");
                self.last_progress_at = now_ms;
                Ok(true)
            }
        }
    }

    async fn poll(
        &mut self,
        session_id: &str,
        scheduler: &mut Scheduler,
        now_ms: u64,
    ) -> Result<Option<PassOutcome>, OrchestratorError> {
        let Some(&task_id) = self.session_task.get(session_id) else { return Ok(None) };
        let after = self.session_cursor.get(session_id).cloned();

        let messages = self
            .session_api
            .poll_messages(session_id, after.as_deref())
            .await
            .map_err(|e| OrchestratorError::transient(e.to_string()))?;
        if messages.is_empty() {
            return Ok(None);
        }
        if let Some(last) = messages.last() {
            self.session_cursor.insert(session_id.to_string(), last.id.clone());
        }

        let text = messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n");
        let results = parse_directives(&text);
        let Some(terminal) = first_terminal(&results).cloned() else { return Ok(None) };

        let task = self.tasks.get(&task_id).cloned().ok_or_else(|| OrchestratorError::logic(format!("unknown task {task_id}")))?;
        let agent = task.assigned_to.clone().unwrap_or_default();

        let outcome = match terminal {
            TerminalResult::Done(_) => {
                let violations = validate_outputs(&task.outputs, &self.artifacts_dir, self.output_policy);
                if violations.is_empty() {
                    scheduler.finish(task_id, true)?;
                    self.notify(task_id, &agent, "task_completed", &task.title, "");
                } else {
                    let detail = violations.iter().map(|v| v.describe()).collect::<Vec<_>>().join(", ");
                    scheduler.finish(task_id, false)?;
                    self.notify(task_id, &agent, "task_failed", &task.title, format!("missing outputs: {detail}"));
                }
                PassOutcome::Progressed
            }
            TerminalResult::Failed(payload) => {
                let detail = match payload {
                    crate::parser::TerminalPayload::Text(t) => t,
                    crate::parser::TerminalPayload::Json(v) => v.to_string(),
                    crate::parser::TerminalPayload::Empty => "task reported failure".to_string(),
                };
                scheduler.finish(task_id, false)?;
                self.notify(task_id, &agent, "task_failed", &task.title, detail);
                PassOutcome::Progressed
            }
            TerminalResult::Waiting(question) => {
                self.waiting_tasks.insert(task_id, question.clone());
                self.notify(task_id, &agent, "task_waiting", &task.title, question.clone());
                PassOutcome::Waiting(task_id, question)
            }
            TerminalResult::Malformed => unreachable!("first_terminal filters out malformed results"),
        };

        // A `waiting` result ends this executor call without finishing the
        // task (§4.6 step 2) — keep the session/task mapping alive so a
        // later resume (human or auto) can reply into the same session.
        if !matches!(outcome, PassOutcome::Waiting(..)) {
            self.busy_sessions.remove(session_id);
            self.task_session.remove(&task_id);
            self.session_task.remove(session_id);
        }
        self.last_progress_at = now_ms;

        Ok(Some(outcome))
    }

    /// Relay a resume answer (human or auto) into the session still
    /// waiting on `task_id`, re-arming it for the next poll pass.
    pub async fn resume_waiting(&mut self, task_id: TaskId, answer: &str) -> Result<(), OrchestratorError> {
        let session_id = self
            .task_session
            .get(&task_id)
            .cloned()
            .ok_or_else(|| OrchestratorError::logic(format!("task {task_id} is not waiting")))?;
        self.waiting_tasks.remove(&task_id);
        self.session_api
            .reply(&session_id, "user", answer)
            .await
            .map_err(|e| OrchestratorError::transient(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
