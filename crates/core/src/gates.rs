// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Gates & Metrics (C12, §4.12): audit payload completeness, SLO
//! evaluation, and canary-rollout decisions.

use serde::{Deserialize, Serialize};

/// Sentinel filled into any missing required field of the audit payload
/// (§4.7 step 6, §4.12, §8 invariant 8).
pub fn unknown_field(field: &str) -> String {
    format!("UNKNOWN (missing {field})")
}

/// The 7 required fields of the `AUDIT_GATE` payload (§4.7 step 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditPayload {
    pub status: String,
    pub job_id: String,
    pub run_id: String,
    pub goal: String,
    pub impact_scope: String,
    pub risk_items: String,
    pub command_preview: String,
    pub user_instruction: String,
    pub missing_fields: Vec<String>,
}

/// Builder that fills any absent field with the `UNKNOWN (missing …)`
/// sentinel and records it in `missing_fields`, guaranteeing completeness
/// (§8 invariant 8) regardless of which upstream fields were available.
#[derive(Debug, Clone, Default)]
pub struct AuditPayloadBuilder {
    status: Option<String>,
    job_id: Option<String>,
    run_id: Option<String>,
    goal: Option<String>,
    impact_scope: Option<String>,
    risk_items: Option<String>,
    command_preview: Option<String>,
    user_instruction: Option<String>,
}

impl AuditPayloadBuilder {
    crate::setters! {
        option {
            status: String,
            job_id: String,
            run_id: String,
            goal: String,
            impact_scope: String,
            risk_items: String,
            command_preview: String,
            user_instruction: String,
        }
    }

    pub fn build(self) -> AuditPayload {
        let mut missing_fields = Vec::new();
        macro_rules! fill {
            ($field:ident, $name:literal) => {
                self.$field.unwrap_or_else(|| {
                    missing_fields.push($name.to_string());
                    unknown_field($name)
                })
            };
        }
        AuditPayload {
            status: fill!(status, "status"),
            job_id: fill!(job_id, "job_id"),
            run_id: fill!(run_id, "run_id"),
            goal: fill!(goal, "goal"),
            impact_scope: fill!(impact_scope, "impact_scope"),
            risk_items: fill!(risk_items, "risk_items"),
            command_preview: fill!(command_preview, "command_preview"),
            user_instruction: fill!(user_instruction, "user_instruction"),
            missing_fields,
        }
    }
}

/// Observed metrics feeding the SLO gates (§4.12 M1-M3).
#[derive(Debug, Clone, Copy, Default)]
pub struct SloMetrics {
    pub stalled_rate_pct: f64,
    pub resume_success_rate_pct: f64,
    pub terminal_once_violations: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SloGate {
    StalledRate,
    ResumeSuccessRate,
    TerminalOnce,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SloEvaluation {
    pub gate: SloGate,
    pub passed: bool,
    pub detail: String,
}

/// Evaluate the three SLO gates (§4.12): M1 stalled-rate ≤ 2%, M2
/// resume-success-rate ≥ 99%, M3 terminal-once-violations = 0.
pub fn evaluate_slo_gates(metrics: SloMetrics) -> Vec<SloEvaluation> {
    vec![
        SloEvaluation {
            gate: SloGate::StalledRate,
            passed: metrics.stalled_rate_pct <= 2.0,
            detail: format!("stalled_rate={:.2}% (threshold <= 2%)", metrics.stalled_rate_pct),
        },
        SloEvaluation {
            gate: SloGate::ResumeSuccessRate,
            passed: metrics.resume_success_rate_pct >= 99.0,
            detail: format!(
                "resume_success_rate={:.2}% (threshold >= 99%)",
                metrics.resume_success_rate_pct
            ),
        },
        SloEvaluation {
            gate: SloGate::TerminalOnce,
            passed: metrics.terminal_once_violations == 0,
            detail: format!("terminal_once_violations={}", metrics.terminal_once_violations),
        },
    ]
}

pub fn all_slo_gates_pass(evaluations: &[SloEvaluation]) -> bool {
    evaluations.iter().all(|e| e.passed)
}

/// Canary rollout stage, percent of traffic/workers on the new path
/// (§4.12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CanaryStage {
    Pct5,
    Pct20,
    Pct50,
    Pct100,
}

impl CanaryStage {
    pub fn percent(self) -> u8 {
        match self {
            CanaryStage::Pct5 => 5,
            CanaryStage::Pct20 => 20,
            CanaryStage::Pct50 => 50,
            CanaryStage::Pct100 => 100,
        }
    }

    pub fn next(self) -> Option<CanaryStage> {
        match self {
            CanaryStage::Pct5 => Some(CanaryStage::Pct20),
            CanaryStage::Pct20 => Some(CanaryStage::Pct50),
            CanaryStage::Pct50 => Some(CanaryStage::Pct100),
            CanaryStage::Pct100 => None,
        }
    }
}

/// Health signals evaluated at a canary stage (§4.12 rollback triggers).
#[derive(Debug, Clone, Copy, Default)]
pub struct CanaryHealth {
    pub stalled_rate_rebound_pct: f64,
    pub terminal_reversal_count: u64,
    pub resume_failure_spike_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanaryDecision {
    Promote { to: CanaryStageDto },
    HoldAtFullRollout,
    Rollback { reason: String },
}

/// Serializable mirror of [`CanaryStage`] (kept distinct so the core enum
/// can stay `Copy`/`Ord` without serde requirements leaking into it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanaryStageDto {
    Pct5,
    Pct20,
    Pct50,
    Pct100,
}

impl From<CanaryStage> for CanaryStageDto {
    fn from(s: CanaryStage) -> Self {
        match s {
            CanaryStage::Pct5 => CanaryStageDto::Pct5,
            CanaryStage::Pct20 => CanaryStageDto::Pct20,
            CanaryStage::Pct50 => CanaryStageDto::Pct50,
            CanaryStage::Pct100 => CanaryStageDto::Pct100,
        }
    }
}

/// Decide whether to promote, hold, or roll back a canary stage (§4.12).
pub fn canary_decision(current: CanaryStage, health: CanaryHealth) -> CanaryDecision {
    if health.stalled_rate_rebound_pct > 5.0 {
        return CanaryDecision::Rollback {
            reason: format!("stalled_rate_rebound={:.2}% > 5%", health.stalled_rate_rebound_pct),
        };
    }
    if health.terminal_reversal_count > 0 {
        return CanaryDecision::Rollback {
            reason: format!("terminal_reversal={}", health.terminal_reversal_count),
        };
    }
    if health.resume_failure_spike_pct > 3.0 {
        return CanaryDecision::Rollback {
            reason: format!("resume_failure_spike={:.2}% > 3%", health.resume_failure_spike_pct),
        };
    }
    match current.next() {
        Some(next) => CanaryDecision::Promote { to: next.into() },
        None => CanaryDecision::HoldAtFullRollout,
    }
}

/// Release gate (§4.12): canary decision is not a rollback AND all SLO
/// gates pass.
pub fn release_gate(decision: &CanaryDecision, slo_evaluations: &[SloEvaluation]) -> bool {
    !matches!(decision, CanaryDecision::Rollback { .. }) && all_slo_gates_pass(slo_evaluations)
}

#[cfg(test)]
#[path = "gates_tests.rs"]
mod tests;
