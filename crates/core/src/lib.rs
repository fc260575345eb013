// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agentflow-core: tagged-sum data model, error kinds, and pure
//! decision functions shared by every other crate in the workspace.

pub mod macros;

pub mod agent_registry;
pub mod clock;
pub mod control;
pub mod error;
pub mod event;
pub mod gates;
pub mod id;
pub mod job;
pub mod retry;
pub mod run;
pub mod status;
pub mod task;
pub mod task_id;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use agent_registry::{AgentRecord, AgentRegistry, RegistryValidationError, RoutingRule};
pub use clock::{Clock, FakeClock, SystemClock};
pub use control::{resume_dedupe_key, ControlAction, ControlOutcome, ControlPayload, ControlSignal};
pub use error::{ErrorKind, FailureRecovery, FailureResponse, OrchestratorError, SchedulerExceptionRecord};
pub use event::{Event, EventRecord};
pub use gates::{
    all_slo_gates_pass, canary_decision, evaluate_slo_gates, unknown_field, AuditPayload,
    AuditPayloadBuilder, CanaryDecision, CanaryHealth, CanaryStage, CanaryStageDto, SloEvaluation,
    SloGate, SloMetrics,
};
pub use id::{short, IdBuf};
pub use retry::RetryPolicy;
#[cfg(any(test, feature = "test-support"))]
pub use job::JobBuilder;
pub use job::{Audit, AuditDecision, HumanInput, Job, JobId, JobStatus, LastResult};
pub use run::{Run, RunId, RunStatus};
pub use status::{divergence, status_view, DivergenceSeverity, StatusDivergence, StatusView, UnmappedStatusCombination};
pub use task::{
    validate_task_plan, Task, TaskPlanError, TaskRuntimeStatus, TaskSchemaStatus, TaskState,
    TaskType, TerminalStateViolation,
};
pub use task_id::TaskId;
