// SPDX-License-Identifier: MIT

//! Session controller (C5, spec.md §4.3). Starts/stops agent sessions in a
//! detached multiplexer window, persists sidecar metadata for crash
//! recovery, builds evaluation-informed resume prompts, and enforces the
//! max-session-duration timeout on scan ticks.

use async_trait::async_trait;
use fleetd_adapters::session::{SessionAdapter, SessionError};
use fleetd_core::{Clock, Evaluation, Project, SessionName, SessionRecord};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Default wait after spawning a window for the agent CLI to initialize
/// (spec.md §4.3 step 4).
pub const SESSION_INIT_WAIT: Duration = Duration::from_secs(8);
/// Wait after Ctrl-C before a hard kill (spec.md §4.3 stop contract).
pub const STOP_GRACE_WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct SessionControllerConfig {
    pub max_concurrent_sessions: u32,
    pub max_session_duration_ms: i64,
    pub agent_command: String,
}

impl Default for SessionControllerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 5,
            max_session_duration_ms: 2_700_000,
            agent_command: "agent".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub success: bool,
    pub message: String,
}

impl StartOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Persists session sidecar metadata so a crashed daemon can recover which
/// projects had a live session (spec.md §6 "Sidecar files per project").
#[async_trait]
pub trait SidecarStore: Send + Sync {
    async fn save(&self, project: &str, record: &SessionRecord);
    async fn load(&self, project: &str) -> Option<SessionRecord>;
    async fn clear(&self, project: &str);
}

/// In-memory sidecar store. A real deployment would persist this under
/// `<projectDir>/.orchestrator/session.json`; tests and early bring-up use
/// this instead of touching the filesystem.
#[derive(Default)]
pub struct MemorySidecarStore {
    records: Mutex<HashMap<String, SessionRecord>>,
}

#[async_trait]
impl SidecarStore for MemorySidecarStore {
    async fn save(&self, project: &str, record: &SessionRecord) {
        self.records.lock().insert(project.to_string(), record.clone());
    }

    async fn load(&self, project: &str) -> Option<SessionRecord> {
        self.records.lock().get(project).cloned()
    }

    async fn clear(&self, project: &str) {
        self.records.lock().remove(project);
    }
}

pub struct SessionController<S: SessionAdapter, Si: SidecarStore, C: Clock> {
    sessions: S,
    sidecars: Si,
    clock: C,
    config: SessionControllerConfig,
    /// Adapter-assigned session ids, keyed by project. `spawn` hands back an
    /// id distinct from the requested window name (tmux prefixes it, the
    /// fake adapter assigns a counter) — every later call must address the
    /// session by that id, not by the name we asked for.
    live_ids: Mutex<HashMap<String, String>>,
}

impl<S: SessionAdapter, Si: SidecarStore, C: Clock> SessionController<S, Si, C> {
    pub fn new(sessions: S, sidecars: Si, clock: C, config: SessionControllerConfig) -> Self {
        Self {
            sessions,
            sidecars,
            clock,
            config,
            live_ids: Mutex::new(HashMap::new()),
        }
    }

    fn session_id(&self, project: &str) -> String {
        self.live_ids
            .lock()
            .get(project)
            .cloned()
            .unwrap_or_else(|| SessionName::for_project(project).as_str().to_string())
    }

    /// Start contract (spec.md §4.3 steps 1-7). `live_count` is the caller's
    /// current count of live `orch-` windows, since the multiplexer contract
    /// has no "list all sessions" operation.
    pub async fn start(
        &self,
        project: &Project,
        prompt: String,
        head_before: Option<String>,
        live_count: u32,
        mcp_config_path: Option<String>,
    ) -> StartOutcome {
        if !project.working_dir.exists() {
            return StartOutcome::fail("project directory does not exist");
        }

        let session_name = SessionName::for_project(&project.name);
        if self
            .sessions
            .is_alive(&self.session_id(&project.name))
            .await
            .unwrap_or(false)
        {
            return StartOutcome::fail("live session already exists for project");
        }
        if live_count >= self.config.max_concurrent_sessions {
            return StartOutcome::fail("max concurrent sessions reached");
        }

        let id = match self
            .sessions
            .spawn(
                session_name.as_str(),
                &project.working_dir,
                &self.config.agent_command,
                &[],
            )
            .await
        {
            Ok(id) => id,
            Err(e) => return StartOutcome::fail(format!("spawn failed: {e}")),
        };

        tokio::time::sleep(SESSION_INIT_WAIT).await;

        if let Err(e) = self.sessions.send_literal(&id, &prompt).await {
            return StartOutcome::fail(format!("failed to send prompt: {e}"));
        }
        if let Err(e) = self.sessions.send_enter(&id).await {
            return StartOutcome::fail(format!("failed to submit prompt: {e}"));
        }

        if let Some(path) = &mcp_config_path {
            let _ = self
                .sessions
                .configure(&id, &serde_json::json!({ "mcpConfigPath": path }))
                .await;
        }

        self.live_ids.lock().insert(project.name.clone(), id);

        let mut record = SessionRecord::new(&project.name, prompt, self.clock.now_ms());
        record.head_before = head_before;
        self.sidecars.save(&project.name, &record).await;

        StartOutcome::ok("session started")
    }

    /// Stop contract: Ctrl-C, wait, kill, update sidecar. Never errors on
    /// absence (spec.md §4.3).
    pub async fn stop(&self, project: &str) -> StartOutcome {
        let id = self.session_id(project);

        let _ = self.sessions.send(&id, "C-c").await;
        tokio::time::sleep(STOP_GRACE_WAIT).await;
        let _ = self.sessions.kill(&id).await;
        self.live_ids.lock().remove(project);

        if let Some(mut record) = self.sidecars.load(project).await {
            record.ended = true;
            self.sidecars.save(project, &record).await;
        }

        StartOutcome::ok("session stopped")
    }

    /// Builds the resume prompt: a compact summary of the most recent
    /// evaluation, followed by the generic resume prologue (spec.md §4.3
    /// "Resume prompt construction").
    pub fn resume_prompt(last_evaluation: Option<&Evaluation>) -> String {
        const PROLOGUE: &str = "Resume work on this project from where the last session left off.";

        match last_evaluation {
            Some(eval) => format!(
                "Last session scored {}/5. Completed: {}. Failed: {}. Continue from: {}.\n{}",
                eval.score_clamped(),
                join_or_none(&eval.accomplishments),
                join_or_none(&eval.failures),
                eval.reasoning,
                PROLOGUE
            ),
            None => PROLOGUE.to_string(),
        }
    }

    /// On every scan tick: sessions running longer than
    /// `maxSessionDurationMs` are flagged for forced stop (spec.md §4.3
    /// "Timeout enforcement"). Returns the projects whose sessions timed out.
    pub fn timed_out_projects(&self, live_sessions: &[SessionRecord], now_ms: i64) -> Vec<String> {
        live_sessions
            .iter()
            .filter(|s| s.duration_ms(now_ms) > self.config.max_session_duration_ms)
            .map(|s| s.project.clone())
            .collect()
    }

    pub async fn capture_tail(&self, project: &str, lines: u32) -> Result<String, SessionError> {
        self.sessions.capture_output(&self.session_id(project), lines).await
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
