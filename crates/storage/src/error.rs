// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

use agentflow_core::{JobId, RunId};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error at {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("corrupt record in {file} at line {line}: {reason}")]
    Corrupt { file: String, line: usize, reason: String },

    #[error("job {0} not found")]
    JobNotFound(JobId),

    #[error("run {0} not found")]
    RunNotFound(RunId),

    #[error("job {job_id} is not claimable in status {status}")]
    NotClaimable { job_id: JobId, status: String },

    #[error("lock held by another process: {0}")]
    Locked(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;
