// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Task Terminal Parser (C5, §4.5/§6.3): extracts `[TASK_DONE]`,
//! `[TASK_FAILED]`, and `[TASK_WAITING]` directives from assistant chat
//! text. Restartable and lazy — the executor feeds it an arbitrary
//! message sequence and takes the first terminal result per task per
//! poll cycle.

use serde_json::Value;

const TASK_DONE: &str = "[TASK_DONE]";
const TASK_FAILED: &str = "[TASK_FAILED]";
const TASK_WAITING: &str = "[TASK_WAITING]";

#[derive(Debug, Clone, PartialEq)]
pub enum TerminalPayload {
    Json(Value),
    Text(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TerminalResult {
    Done(TerminalPayload),
    Failed(TerminalPayload),
    Waiting(String),
    /// Marker present but the JSON payload failed to parse. Treated as no
    /// terminal by the executor (§4.5).
    Malformed,
}

/// Parse every line of `text` for a terminal directive, in order.
pub fn parse_directives(text: &str) -> Vec<TerminalResult> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<TerminalResult> {
    for (marker, build) in [
        (TASK_DONE, (&build_done) as &dyn Fn(&str) -> TerminalResult),
        (TASK_FAILED, &build_failed),
        (TASK_WAITING, &build_waiting),
    ] {
        if let Some(idx) = line.find(marker) {
            let payload = line[idx + marker.len()..].trim();
            return Some(build(payload));
        }
    }
    None
}

fn parse_payload(payload: &str) -> Result<TerminalPayload, ()> {
    if payload.is_empty() {
        return Ok(TerminalPayload::Empty);
    }
    if payload.starts_with('{') {
        return serde_json::from_str(payload).map(TerminalPayload::Json).map_err(|_| ());
    }
    Ok(TerminalPayload::Text(payload.to_string()))
}

fn build_done(payload: &str) -> TerminalResult {
    match parse_payload(payload) {
        Ok(p) => TerminalResult::Done(p),
        Err(()) => TerminalResult::Malformed,
    }
}

fn build_failed(payload: &str) -> TerminalResult {
    match parse_payload(payload) {
        Ok(p) => TerminalResult::Failed(p),
        Err(()) => TerminalResult::Malformed,
    }
}

fn build_waiting(payload: &str) -> TerminalResult {
    TerminalResult::Waiting(payload.to_string())
}

/// The executor's "first terminal per poll cycle" rule: scan in order and
/// return the first non-malformed terminal, ignoring everything after it
/// and skipping malformed lines as if they weren't terminals.
pub fn first_terminal(results: &[TerminalResult]) -> Option<&TerminalResult> {
    results.iter().find(|r| !matches!(r, TerminalResult::Malformed))
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
