// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Durable append-only event log. One line of JSON per [`EventRecord`],
//! fsynced before `append` returns so a crash never loses an acknowledged
//! event.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use agentflow_core::EventRecord;

use crate::error::{StorageError, StorageResult};

#[derive(Debug)]
pub struct Wal {
    path: PathBuf,
    file: File,
}

impl Wal {
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StorageError::Io { path: path.display().to_string(), source })?;
        Ok(Self { path, file })
    }

    /// Append one record and block until it is durable on disk.
    pub fn append(&mut self, record: &EventRecord) -> StorageResult<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.file
            .write_all(&line)
            .map_err(|source| StorageError::Io { path: self.path.display().to_string(), source })?;
        self.file
            .sync_data()
            .map_err(|source| StorageError::Io { path: self.path.display().to_string(), source })?;
        Ok(())
    }

    /// Replay every record previously appended. A truncated final line
    /// (a crash mid-write) is tolerated and dropped; a corrupt line that
    /// is *not* the last one is a hard error — the log is not trustworthy
    /// past that point.
    pub fn replay(path: impl AsRef<Path>) -> StorageResult<Vec<EventRecord>> {
        let path = path.as_ref();
        let Ok(file) = File::open(path) else {
            return Ok(Vec::new());
        };
        let reader = BufReader::new(file);
        let lines: Vec<String> = reader
            .lines()
            .collect::<std::io::Result<_>>()
            .map_err(|source| StorageError::Io { path: path.display().to_string(), source })?;

        let mut records = Vec::with_capacity(lines.len());
        let last = lines.len().saturating_sub(1);
        for (idx, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<EventRecord>(line) {
                Ok(record) => records.push(record),
                Err(err) if idx == last => {
                    tracing::warn!(path = %path.display(), "dropping truncated tail WAL record: {err}");
                }
                Err(err) => {
                    return Err(StorageError::Corrupt {
                        file: path.display().to_string(),
                        line: idx + 1,
                        reason: err.to_string(),
                    });
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
