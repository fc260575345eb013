// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Scheduler (C3, §4.3): tracks task readiness over a frozen [`Dag`] and
//! selects batches for dispatch respecting per-agent and global
//! parallelism caps.

use std::collections::{HashMap, HashSet};

use agentflow_core::{OrchestratorError, TaskId};

use crate::dag::Dag;

const WILDCARD_AGENT: &str = "*";

/// Per-run task bookkeeping, independent of the per-task persisted
/// [`agentflow_core::TaskState`] — this is pure in-memory set membership
/// the orchestrator loop drives each pass.
#[derive(Debug, Clone)]
pub struct Scheduler {
    forward_adjacency: HashMap<TaskId, Vec<TaskId>>,
    remaining_deps: HashMap<TaskId, u32>,
    ready: HashSet<TaskId>,
    running: HashSet<TaskId>,
    done: HashSet<TaskId>,
    failed: HashSet<TaskId>,
}

impl Scheduler {
    pub fn new(dag: &Dag) -> Self {
        let ready = dag.initial_ready.iter().copied().collect();
        Self {
            forward_adjacency: dag.forward_adjacency.clone(),
            remaining_deps: dag.in_degree.clone(),
            ready,
            running: HashSet::new(),
            done: HashSet::new(),
            failed: HashSet::new(),
        }
    }

    /// Ready tasks in stable (sorted) order (§4.3).
    pub fn ready_tasks(&self) -> Vec<TaskId> {
        let mut r: Vec<TaskId> = self.ready.iter().copied().collect();
        r.sort_by_key(|id| id.to_string());
        r
    }

    pub fn is_finished(&self) -> bool {
        self.ready.is_empty() && self.running.is_empty()
    }

    pub fn done(&self) -> &HashSet<TaskId> {
        &self.done
    }

    pub fn failed(&self) -> &HashSet<TaskId> {
        &self.failed
    }

    pub fn start(&mut self, task_id: TaskId) -> Result<(), OrchestratorError> {
        if !self.ready.remove(&task_id) {
            return Err(OrchestratorError::logic(format!("task {task_id} is not ready")));
        }
        self.running.insert(task_id);
        Ok(())
    }

    /// Record a task outcome. On success, unlock children whose remaining
    /// dependency count reaches zero. On failure, cascade-fail every
    /// transitive descendant (§9 OQ3: descendants only, not siblings).
    pub fn finish(&mut self, task_id: TaskId, success: bool) -> Result<(), OrchestratorError> {
        if !self.running.remove(&task_id) {
            return Err(OrchestratorError::logic(format!("task {task_id} is not running")));
        }
        if success {
            self.done.insert(task_id);
            if let Some(children) = self.forward_adjacency.get(&task_id).cloned() {
                for child in children {
                    if let Some(d) = self.remaining_deps.get_mut(&child) {
                        *d = d.saturating_sub(1);
                        if *d == 0 && !self.done.contains(&child) && !self.failed.contains(&child) {
                            self.ready.insert(child);
                        }
                    }
                }
            }
        } else {
            self.failed.insert(task_id);
            self.cascade_fail(task_id);
        }
        Ok(())
    }

    fn cascade_fail(&mut self, from: TaskId) {
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            let Some(children) = self.forward_adjacency.get(&current).cloned() else { continue };
            for child in children {
                self.ready.remove(&child);
                if self.failed.insert(child) {
                    stack.push(child);
                }
            }
        }
    }
}

/// Per-agent parallelism caps parsed from `ORCH_AGENT_LIMITS` (§6.6):
/// `{"agent": N, "*": M}`. An agent with no explicit entry falls back to
/// the wildcard entry, then to the global cap.
#[derive(Debug, Clone, Default)]
pub struct AgentLimits {
    pub per_agent: HashMap<String, u32>,
}

impl AgentLimits {
    pub fn cap_for(&self, agent: &str) -> Option<u32> {
        self.per_agent.get(agent).or_else(|| self.per_agent.get(WILDCARD_AGENT)).copied()
    }
}

/// Select a dispatch batch from `ready`, respecting `agent_limits` and
/// `global_cap`, given how many tasks are already running per agent and
/// in total. If caps would otherwise produce an empty batch from a
/// non-empty ready list, force a single task through to avoid deadlock
/// (§4.3 "forced single-task dispatch").
pub fn select_batch(
    ready: &[(TaskId, String)],
    running_per_agent: &HashMap<String, u32>,
    total_running: u32,
    agent_limits: &AgentLimits,
    global_cap: u32,
) -> Vec<TaskId> {
    let mut selected = Vec::new();
    let mut running_per_agent = running_per_agent.clone();
    let mut total_running = total_running;

    for (task_id, agent) in ready {
        if total_running >= global_cap {
            break;
        }
        let agent_running = *running_per_agent.get(agent).unwrap_or(&0);
        if let Some(cap) = agent_limits.cap_for(agent) {
            if agent_running >= cap {
                continue;
            }
        }
        selected.push(*task_id);
        *running_per_agent.entry(agent.clone()).or_insert(0) += 1;
        total_running += 1;
    }

    if selected.is_empty() && !ready.is_empty() {
        selected.push(ready[0].0);
    }

    selected
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
