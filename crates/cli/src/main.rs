// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! `control`: the operator CLI (C9, §6.4). Validates arguments, builds a
//! [`agentflow_core::ControlSignal`], and appends it to the durable
//! signal queue for the daemon to drain and apply.

mod control;
mod exit_error;

use clap::{Parser, Subcommand};

use agentflow_storage::{resolve_base_path, ProjectPaths, SignalQueue};
use exit_error::ExitError;

#[derive(Parser)]
#[command(name = "control", version, about = "Operator control plane for agentflow jobs")]
struct Cli {
    /// Project namespace (falls back to `PROJECT_ID`, then "default_project")
    #[arg(long, global = true)]
    project_id: Option<String>,
    /// Client-provided idempotency key; generated if omitted
    #[arg(long, global = true)]
    request_id: Option<String>,
    /// Explicit sequence number for this job's signal lineage
    #[arg(long, global = true)]
    signal_seq: Option<u64>,
    /// Mirror enqueued signals into the legacy per-job queue layout too
    #[arg(long, global = true)]
    legacy_queue_compat: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Approve a job awaiting audit
    Approve { job_id: String },
    /// Send a job back for revision
    Revise { job_id: String, revision: String },
    /// Answer a job waiting on human input
    Resume {
        job_id: String,
        answer: String,
        #[arg(long)]
        task_id: Option<String>,
    },
    /// Cancel a job
    Cancel { job_id: String },
}

impl Command {
    fn job_id(&self) -> &str {
        match self {
            Command::Approve { job_id } | Command::Revise { job_id, .. } | Command::Resume { job_id, .. } | Command::Cancel { job_id } => job_id,
        }
    }
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.code);
        }
    }
}

fn run(cli: &Cli) -> Result<(), ExitError> {
    let job_id = cli.command.job_id();
    let signal = control::build_signal(&cli.command, job_id, cli.request_id.clone(), cli.signal_seq)?;

    let project_id = cli.project_id.clone().or_else(|| std::env::var("PROJECT_ID").ok()).unwrap_or_else(|| "default_project".to_string());
    let base_path = resolve_base_path(std::env::var("BASE_PATH").ok().as_deref());
    let paths = ProjectPaths::new(&base_path, &project_id);
    let queue = SignalQueue::new(&paths, cli.legacy_queue_compat);

    control::enqueue(&queue, &signal)?;
    println!("queued {} for job {} (request_id={})", signal.action, signal.job_id, signal.request_id);
    Ok(())
}
