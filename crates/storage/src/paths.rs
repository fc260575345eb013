// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Canonical on-disk layout (§6.5).

use std::path::{Path, PathBuf};

/// Resolves every path the orchestrator reads or writes for one project,
/// rooted at `<BASE_PATH>/<project_id>/`.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(base_path: impl AsRef<Path>, project_id: &str) -> Self {
        Self { root: base_path.as_ref().join(project_id) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn orchestrator_dir(&self) -> PathBuf {
        self.root.join(".orchestrator")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.orchestrator_dir().join("state")
    }

    pub fn db_path(&self) -> PathBuf {
        self.state_dir().join("orchestrator.db")
    }

    pub fn wal_path(&self) -> PathBuf {
        self.state_dir().join("orchestrator.wal")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir().join("orchestrator.lock")
    }

    pub fn job_snapshot_path(&self, job_id: &str) -> PathBuf {
        self.state_dir().join("jobs").join(format!("{job_id}.snapshot.json"))
    }

    pub fn temporal_signals_path(&self) -> PathBuf {
        self.state_dir().join("temporal_signals.json")
    }

    pub fn temporal_runs_path(&self) -> PathBuf {
        self.state_dir().join("temporal_runs.json")
    }

    pub fn waiting_path(&self, run_id: &str) -> PathBuf {
        self.state_dir().join(format!("waiting_{run_id}.json"))
    }

    pub fn audit_path(&self, run_id: &str) -> PathBuf {
        self.state_dir().join(format!("audit_{run_id}.json"))
    }

    pub fn scheduler_exceptions_path(&self) -> PathBuf {
        self.state_dir().join("scheduler_exceptions.jsonl")
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.orchestrator_dir().join("tasks")
    }

    pub fn task_path(&self, task_id: &str) -> PathBuf {
        self.tasks_dir().join(format!("{task_id}.json"))
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.orchestrator_dir().join("runs")
    }

    pub fn run_report_path(&self, run_id: &str) -> PathBuf {
        self.runs_dir().join(format!("report_{run_id}.json"))
    }

    pub fn latest_run_pointer_path(&self, run_tag: &str) -> PathBuf {
        self.runs_dir().join(format!("latest-{run_tag}.json"))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.orchestrator_dir().join("logs")
    }

    /// Legacy queue compat path (§9 Open Question 1), gated behind
    /// `ORCH_LEGACY_QUEUE_COMPAT`.
    pub fn legacy_queue_job_path(&self, job_id: &str) -> PathBuf {
        self.orchestrator_dir().join("queue").join("jobs").join(format!("{job_id}.json"))
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join("artifacts")
    }

    /// Create every durable directory this project needs. Idempotent.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.state_dir(),
            self.state_dir().join("jobs"),
            self.tasks_dir(),
            self.runs_dir(),
            self.logs_dir(),
            self.orchestrator_dir().join("queue").join("jobs"),
            self.artifacts_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Resolve `BASE_PATH`, falling back to `./workspace` if unset or the
/// configured root is unwritable (§6.6).
pub fn resolve_base_path(configured: Option<&str>) -> PathBuf {
    let candidate = configured.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./workspace"));
    if std::fs::create_dir_all(&candidate).is_ok() {
        candidate
    } else {
        PathBuf::from("./workspace")
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
