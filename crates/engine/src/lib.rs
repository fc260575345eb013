// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agentflow-engine: DAG build, scheduling, routing, terminal-directive
//! parsing, prompt construction, output validation, session dispatch, and
//! the single-run orchestration pipeline that wires them together (§4.2-§4.7).

pub mod dag;
pub mod executor;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod router;
pub mod scheduler;
pub mod validate;

pub use dag::{build_dag, Dag, DagError};
pub use executor::{Executor, PassOutcome, DEFAULT_IDLE_TIMEOUT};
pub use orchestrator::{Orchestrator, OrchestratorConfig, PipelineOutcome, RunReport, WaitingHumanPolicy};
pub use parser::{first_terminal, parse_directives, TerminalPayload, TerminalResult};
pub use prompt::build_prompt;
pub use router::{Router, RoutingDecision};
pub use scheduler::{select_batch, AgentLimits, Scheduler};
pub use validate::{validate_outputs, OutputPolicy, OutputViolation};
