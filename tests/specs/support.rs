//! Shared end-to-end harness: spawns the real `agentflowd` binary against
//! a `wiremock` stand-in for the LLM and SessionAPI collaborators, and
//! drives it with the real `control` binary. Every scenario in this
//! package gets its own temp `BASE_PATH` and its own `MockServer`, so
//! scenarios never share state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use agentflow_core::{Job, JobId, JobStatus, SystemClock};
use agentflow_storage::{ProjectPaths, Store};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const PROJECT_ID: &str = "e2e-project";

/// Poll `cond` every 50ms until it returns `true` or `max_ms` elapses.
/// Mirrors the polling idiom the rest of this repo's specs use to avoid
/// sleeping a fixed duration for an event that usually fires much sooner.
pub fn wait_for(max_ms: u64, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Open a `Store` just long enough to seed a job, then drop it so the
/// exclusive lock releases before the daemon subprocess starts.
pub fn seed_job(base: &std::path::Path, goal: &str) -> JobId {
    let paths = ProjectPaths::new(base, PROJECT_ID);
    let store = Store::open(paths, SystemClock).expect("open store to seed job");
    let job = store.create_job(PROJECT_ID, goal, 3).expect("create job");
    job.job_id
}

/// Read the job's on-disk snapshot (written by the daemon via
/// `Store::write_job_snapshot`), if it exists yet.
pub fn read_job(base: &std::path::Path, job_id: JobId) -> Option<Job> {
    let paths = ProjectPaths::new(base, PROJECT_ID);
    let bytes = std::fs::read(paths.job_snapshot_path(job_id.as_str())).ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub fn wait_for_status(base: &std::path::Path, job_id: JobId, status: JobStatus, max_ms: u64) -> Option<Job> {
    let mut last = None;
    let found = wait_for(max_ms, || match read_job(base, job_id) {
        Some(job) if job.status == status => {
            last = Some(job.clone());
            true
        }
        Some(job) => {
            last = Some(job);
            false
        }
        None => false,
    });
    if found {
        last
    } else {
        None
    }
}

/// One decompose plan, expressed as the raw JSON the LLM "returns" (i.e.
/// the string the orchestrator's decompose step `serde_json::from_str`s).
pub fn decompose_plan(tasks: &[(&str, &str)]) -> String {
    let tasks: Vec<_> = tasks
        .iter()
        .map(|(id, title)| {
            serde_json::json!({
                "id": id,
                "title": title,
                "task_type": "implement",
                "done_when": ["the agent reports done"],
                "outputs": [],
            })
        })
        .collect();
    serde_json::json!({ "tasks": tasks }).to_string()
}

/// Stub LLM: every request is decompose-shaped here (routing is covered
/// entirely by hard `RoutingRule`s in the seeded agent registry, so the
/// orchestrator never falls back to an LLM routing call). Each call pops
/// the next queued plan; once exhausted, the last plan is repeated.
pub struct DecomposeResponder {
    plans: Mutex<Vec<String>>,
}

impl DecomposeResponder {
    pub fn new(plans: Vec<String>) -> Self {
        Self { plans: Mutex::new(plans) }
    }
}

impl Respond for DecomposeResponder {
    fn respond(&self, _req: &Request) -> ResponseTemplate {
        let mut plans = self.plans.lock().unwrap();
        let plan = if plans.len() > 1 { plans.remove(0) } else { plans.first().cloned().unwrap_or_default() };
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "content": plan } }]
        }))
    }
}

/// Stub SessionAPI. Sessions are created with a fresh id per call;
/// `reply` records the prompt just sent to a session, and `messages`
/// answers with a single directive derived from that prompt: a prompt
/// whose task title contains `waiting_keyword` yields `[TASK_WAITING]`,
/// everything else yields `[TASK_DONE]`.
pub struct SessionStub {
    sessions: Arc<AtomicU64>,
    messages: Arc<AtomicU64>,
    prompts: Arc<Mutex<HashMap<String, String>>>,
    waiting_keyword: &'static str,
}

impl SessionStub {
    pub fn new(waiting_keyword: &'static str) -> Self {
        Self {
            sessions: Arc::new(AtomicU64::new(0)),
            messages: Arc::new(AtomicU64::new(0)),
            prompts: Arc::new(Mutex::new(HashMap::new())),
            waiting_keyword,
        }
    }

    pub fn create_responder(&self) -> CreateSessionResponder {
        CreateSessionResponder { counter: self.sessions.clone() }
    }

    pub fn reply_responder(&self) -> ReplyResponder {
        ReplyResponder { counter: self.messages.clone(), prompts: self.prompts.clone() }
    }

    pub fn messages_responder(&self) -> MessagesResponder {
        MessagesResponder { counter: self.messages.clone(), prompts: self.prompts.clone(), waiting_keyword: self.waiting_keyword }
    }
}

pub struct CreateSessionResponder {
    counter: Arc<AtomicU64>,
}

impl Respond for CreateSessionResponder {
    fn respond(&self, _req: &Request) -> ResponseTemplate {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "session_id": format!("sess-{id}") }))
    }
}

pub struct ReplyResponder {
    counter: Arc<AtomicU64>,
    prompts: Arc<Mutex<HashMap<String, String>>>,
}

impl Respond for ReplyResponder {
    fn respond(&self, req: &Request) -> ResponseTemplate {
        let session_id = session_id_from_path(req.url.path());
        if let Ok(body) = serde_json::from_slice::<serde_json::Value>(&req.body) {
            if let Some(content) = body.get("content").and_then(|c| c.as_str()) {
                self.prompts.lock().unwrap().insert(session_id, content.to_string());
            }
        }
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "message_id": format!("m{id}") }))
    }
}

pub struct MessagesResponder {
    counter: Arc<AtomicU64>,
    prompts: Arc<Mutex<HashMap<String, String>>>,
    waiting_keyword: &'static str,
}

impl Respond for MessagesResponder {
    fn respond(&self, req: &Request) -> ResponseTemplate {
        let session_id = session_id_from_path(req.url.path());
        let prompt = self.prompts.lock().unwrap().get(&session_id).cloned().unwrap_or_default();
        let content = if prompt.contains(self.waiting_keyword) {
            "[TASK_WAITING]\n{\"question\":\"is this ok to proceed?\"}".to_string()
        } else {
            "[TASK_DONE]\n{}".to_string()
        };
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "messages": [{ "id": format!("a{id}"), "role": "assistant", "content": content }]
        }))
    }
}

fn session_id_from_path(p: &str) -> String {
    // "/sessions/{id}/reply" or "/sessions/{id}/messages"
    p.split('/').nth(2).unwrap_or_default().to_string()
}

/// Stand up a `MockServer` wired to the given plans and waiting keyword,
/// serving both the LLM and SessionAPI contracts from the same origin
/// (the daemon is pointed at the same base URL for both via distinct env
/// vars, but nothing stops them sharing a listener in a test).
pub async fn start_stub(plans: Vec<String>, waiting_keyword: &'static str) -> MockServer {
    let server = MockServer::start().await;
    let decompose = DecomposeResponder::new(plans);
    Mock::given(method("POST")).and(path("/llm")).respond_with(decompose).mount(&server).await;

    let sessions = SessionStub::new(waiting_keyword);
    Mock::given(method("POST")).and(path("/sessions")).respond_with(sessions.create_responder()).mount(&server).await;
    Mock::given(method("POST")).and(path_regex(r"^/sessions/[^/]+/reply$")).respond_with(sessions.reply_responder()).mount(&server).await;
    Mock::given(method("GET")).and(path_regex(r"^/sessions/[^/]+/messages$")).respond_with(sessions.messages_responder()).mount(&server).await;
    server
}

/// Agent registry JSON accepted via `ORCH_AGENTS_CONFIG`: one agent and
/// one hard routing rule so the router never needs to fall back to the
/// LLM for a `model: "router"` call.
pub fn write_agent_registry(dir: &std::path::Path, keyword: &str) -> PathBuf {
    let path = dir.join("agents.json");
    let body = serde_json::json!({
        "agents": [{ "name": "coder", "description": "does the work" }],
        "rules": [{ "agent": "coder", "keywords": [keyword] }],
        "default_agent": "coder",
    });
    std::fs::write(&path, serde_json::to_vec_pretty(&body).unwrap()).unwrap();
    path
}

/// Wraps a spawned `agentflowd` child process, killing it on drop so a
/// failing assertion never leaves an orphaned daemon bound to the temp
/// `BASE_PATH`.
pub struct Daemon {
    child: Child,
}

impl Daemon {
    pub fn spawn(base: &std::path::Path, registry_path: &std::path::Path, llm_url: &str, session_url: &str) -> Self {
        Self::spawn_with_audit(base, registry_path, llm_url, session_url, false)
    }

    pub fn spawn_with_audit(base: &std::path::Path, registry_path: &std::path::Path, llm_url: &str, session_url: &str, audit_gate: bool) -> Self {
        let bin = assert_cmd::cargo::cargo_bin("agentflowd");
        let child = Command::new(bin)
            .env("BASE_PATH", base)
            .env("PROJECT_ID", PROJECT_ID)
            .env("ORCH_AGENTS_CONFIG", registry_path)
            .env("LLM_URL", llm_url)
            .env("LLM_API_KEY", "test-key")
            .env("OPENCLAW_API_BASE_URL", session_url)
            .env("OPENCLAW_API_KEY", "test-key")
            .env("ORCH_AUDIT_GATE", audit_gate.to_string())
            .env("ORCH_WORKER_JOB_TIMEOUT_SECONDS", "30")
            .env("ORCH_EXECUTOR_IDLE_TIMEOUT_SECONDS", "15")
            .env("RUST_LOG", "warn")
            .spawn()
            .expect("spawn agentflowd");
        Self { child }
    }

    /// Kill and reap the child deterministically, instead of leaning on
    /// `Drop` alone, when a scenario wants to assert state after the
    /// daemon stops (e.g. idempotent-resume tests reusing the same store).
    pub fn shutdown(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Invoke the real `control` binary against the same `BASE_PATH`/project.
pub fn control(base: &std::path::Path, args: &[&str]) -> std::process::Output {
    let bin = assert_cmd::cargo::cargo_bin("control");
    Command::new(bin)
        .env("BASE_PATH", base)
        .env("PROJECT_ID", PROJECT_ID)
        .args(args)
        .output()
        .expect("run control")
}
