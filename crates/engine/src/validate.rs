// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Output validation (§4.6 core + supplemented policy knobs).
//!
//! Every declared output must exist as a file under the shared artifacts
//! directory, resolved as `basename(name)` (§4.6). Beyond bare presence,
//! a run may opt into non-emptiness, JSON-parseability, and freshness
//! checks, grounded in the preflight validator's `--non-empty`/
//! `--json-schema`/`--freshness-minutes` flags.

use std::path::Path;
use std::time::{Duration, SystemTime};

/// Per-run output validation policy. Defaults to presence-only, matching
/// the bare §4.6 contract, when a run doesn't opt into stricter checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputPolicy {
    pub require_nonempty: bool,
    pub require_json: bool,
    pub max_age_minutes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputViolation {
    Missing(String),
    Empty(String),
    InvalidJson(String),
    Stale(String),
}

impl OutputViolation {
    pub fn describe(&self) -> String {
        match self {
            OutputViolation::Missing(name) => format!("missing output: {name}"),
            OutputViolation::Empty(name) => format!("empty output: {name}"),
            OutputViolation::InvalidJson(name) => format!("invalid JSON output: {name}"),
            OutputViolation::Stale(name) => format!("stale output: {name}"),
        }
    }
}

/// Validate every declared `output` name exists under `artifacts_dir`
/// (resolved to its basename), applying `policy`'s optional stricter
/// checks. Returns every violation found, in declaration order.
pub fn validate_outputs(outputs: &[String], artifacts_dir: &Path, policy: OutputPolicy) -> Vec<OutputViolation> {
    let mut violations = Vec::new();

    for name in outputs {
        let basename = match Path::new(name).file_name().and_then(|f| f.to_str()) {
            Some(b) => b,
            None => {
                violations.push(OutputViolation::Missing(name.clone()));
                continue;
            }
        };
        let target = artifacts_dir.join(basename);

        let metadata = match std::fs::metadata(&target) {
            Ok(m) => m,
            Err(_) => {
                violations.push(OutputViolation::Missing(basename.to_string()));
                continue;
            }
        };

        if policy.require_nonempty && metadata.len() == 0 {
            violations.push(OutputViolation::Empty(basename.to_string()));
            continue;
        }

        if policy.require_json && target.extension().and_then(|e| e.to_str()) == Some("json") {
            match std::fs::read_to_string(&target) {
                Ok(contents) if serde_json::from_str::<serde_json::Value>(&contents).is_ok() => {}
                _ => {
                    violations.push(OutputViolation::InvalidJson(basename.to_string()));
                    continue;
                }
            }
        }

        if let Some(max_age) = policy.max_age_minutes {
            if let Ok(modified) = metadata.modified() {
                let age = SystemTime::now().duration_since(modified).unwrap_or(Duration::ZERO);
                if age > Duration::from_secs(max_age * 60) {
                    violations.push(OutputViolation::Stale(basename.to_string()));
                }
            }
        }
    }

    violations
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
