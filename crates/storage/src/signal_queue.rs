// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Durable queue for operator control signals (§3, §4.9, §6.4). The CLI
//! enqueues here; the daemon drains on its poll loop and applies each
//! signal against the `Store`'s WAL. Signals outlive a daemon restart
//! because they live on disk, not in the daemon's memory.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use agentflow_core::ControlSignal;

use crate::error::{StorageError, StorageResult};
use crate::paths::ProjectPaths;

pub struct SignalQueue {
    path: PathBuf,
    /// Mirror each enqueued signal to the legacy per-job queue layout
    /// (§9 Open Question 1), gated behind `ORCH_LEGACY_QUEUE_COMPAT`.
    legacy_compat: bool,
    legacy_dir: Option<PathBuf>,
}

impl SignalQueue {
    pub fn new(paths: &ProjectPaths, legacy_compat: bool) -> Self {
        Self {
            path: paths.state_dir().join("control_signals.jsonl"),
            legacy_compat,
            legacy_dir: legacy_compat.then(|| paths.orchestrator_dir().join("queue").join("jobs")),
        }
    }

    pub fn enqueue(&self, signal: &ControlSignal) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io { path: parent.display().to_string(), source })?;
        }
        let mut line = serde_json::to_vec(signal)?;
        line.push(b'\n');
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| StorageError::Io { path: self.path.display().to_string(), source })?;
        file.write_all(&line).map_err(|source| StorageError::Io { path: self.path.display().to_string(), source })?;
        file.sync_data().map_err(|source| StorageError::Io { path: self.path.display().to_string(), source })?;

        if self.legacy_compat {
            self.mirror_legacy(signal)?;
        }
        Ok(())
    }

    fn mirror_legacy(&self, signal: &ControlSignal) -> StorageResult<()> {
        let dir = self.legacy_dir.as_ref().expect("legacy_dir set when legacy_compat is true");
        std::fs::create_dir_all(dir).map_err(|source| StorageError::Io { path: dir.display().to_string(), source })?;
        let path = dir.join(format!("{}.{}.json", signal.job_id, signal.signal_seq));
        let bytes = serde_json::to_vec_pretty(signal)?;
        std::fs::write(&path, bytes).map_err(|source| StorageError::Io { path: path.display().to_string(), source })
    }

    /// Read every queued signal and truncate the queue. Signals already
    /// applied are re-filtered by the caller using `Store`'s
    /// request_id/dedupe_key history, so a crash between drain and apply
    /// never loses a signal: redelivery is at-least-once, application is
    /// idempotent.
    pub fn drain(&self) -> StorageResult<Vec<ControlSignal>> {
        let Ok(file) = std::fs::File::open(&self.path) else {
            return Ok(Vec::new());
        };
        let reader = BufReader::new(file);
        let mut signals = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|source| StorageError::Io { path: self.path.display().to_string(), source })?;
            if line.trim().is_empty() {
                continue;
            }
            signals.push(serde_json::from_str(&line)?);
        }
        std::fs::write(&self.path, b"").map_err(|source| StorageError::Io { path: self.path.display().to_string(), source })?;
        Ok(signals)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "signal_queue_tests.rs"]
mod tests;
