// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Centralized retry policy object, replacing hidden recursive retries
//! with explicit, inspectable configuration (§9).

use std::time::Duration;

/// One policy per task step (`dispatch`/`wait_signal`/`validate`/
/// `terminal`), per §9.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub backoff_coefficient: f64,
    pub max_interval: Duration,
}

impl RetryPolicy {
    pub const fn new(
        max_attempts: u32,
        initial_interval: Duration,
        backoff_coefficient: f64,
        max_interval: Duration,
    ) -> Self {
        Self { max_attempts, initial_interval, backoff_coefficient, max_interval }
    }

    /// Delay before the given 1-indexed attempt, capped at `max_interval`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return self.initial_interval;
        }
        let scaled = self.initial_interval.as_secs_f64()
            * self.backoff_coefficient.powi((attempt - 1) as i32);
        Duration::from_secs_f64(scaled).min(self.max_interval)
    }

    pub fn is_exhausted(&self, attempts_made: u32) -> bool {
        attempts_made >= self.max_attempts
    }

    /// Dispatch a task prompt to a session: one shot, dispatch errors fail
    /// the task immediately per §4.6 step 1c.
    pub const fn dispatch() -> Self {
        Self::new(1, Duration::from_secs(0), 1.0, Duration::from_secs(0))
    }

    /// Waiting on an external control signal (`wait_signal`): no automatic
    /// retry budget; governed by the waiting-human policy in §4.7 step 8.
    pub const fn wait_signal() -> Self {
        Self::new(1, Duration::from_secs(0), 1.0, Duration::from_secs(0))
    }

    /// Output validation after a `[TASK_DONE]` directive: a couple of
    /// quick retries to absorb filesystem write latency.
    pub const fn validate() -> Self {
        Self::new(3, Duration::from_millis(200), 2.0, Duration::from_secs(2))
    }

    /// Network calls to LLM / SessionAPI: bounded exponential backoff
    /// (§5, §7 `transient`).
    pub const fn http_call() -> Self {
        Self::new(3, Duration::from_millis(500), 2.0, Duration::from_secs(10))
    }

    /// Notifier delivery: "bounded exponential backoff (default 1 retry,
    /// 3-second delay)" (§4.11).
    pub const fn notify() -> Self {
        Self::new(2, Duration::from_secs(3), 1.0, Duration::from_secs(3))
    }

    /// Task-level retry budget consulted by the orchestrator, not the
    /// scheduler, on task failure (§4.3 "Retries").
    pub const fn terminal(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::from_secs(0), 1.0, Duration::from_secs(0))
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
