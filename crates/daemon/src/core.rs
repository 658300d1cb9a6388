// SPDX-License-Identifier: MIT

//! Shared daemon state: the concrete adapter wiring behind the engine's
//! seam traits (`ExecutionTarget`, `EvaluationNotifier`), plus the bits of
//! bookkeeping (live-session tracking, project list) that don't belong to
//! any single engine component.

use async_trait::async_trait;
use fleetd_adapters::health::SystemHealthTransport;
use fleetd_adapters::session::TmuxAdapter;
use fleetd_adapters::sms::MessagesSmsTransport;
use fleetd_adapters::vcs::{GitAdapter, VcsAdapter};
use fleetd_core::{HealthCheckResult, NotificationTier, Project, SessionRecord, SystemClock};
use fleetd_engine::{
    EvaluationNotifier, ExecuteError, ExecutionTarget, HealthMonitor, MemorySidecarStore,
    NotificationManager, SessionController,
};
use fleetd_storage::{Database, FsStateWriter, ProcessStateStore};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tokio::sync::{Mutex as AsyncMutex, RwLock};

use crate::config::RuntimeConfig;

/// Everything wired together once at startup and shared by the supervisor's
/// loops and the command router.
pub struct Core {
    pub config: RuntimeConfig,
    pub clock: SystemClock,
    pub db: Database,
    pub state: std::sync::Arc<Mutex<ProcessStateStore<FsStateWriter>>>,
    pub projects: RwLock<Vec<Project>>,
    pub sessions: SessionController<TmuxAdapter, MemorySidecarStore, SystemClock>,
    pub notifier: NotificationManager<MessagesSmsTransport>,
    pub health: AsyncMutex<HealthMonitor<SystemHealthTransport>>,
    pub vcs: GitAdapter,
    /// Direct reply channel for the command router, separate from
    /// `notifier`'s tiered/queued outbound path.
    pub sms: MessagesSmsTransport,
    pub last_sms_row_id: Mutex<i64>,
    pub last_health: Mutex<Vec<HealthCheckResult>>,
    /// Runtime override for `config.ai.enabled`, toggled by the `ai on`/`ai
    /// off` commands without touching the on-disk config document.
    pub ai_enabled: std::sync::atomic::AtomicBool,
    live: Mutex<HashMap<String, SessionRecord>>,
}

impl Core {
    pub fn new(
        config: RuntimeConfig,
        db: Database,
        state: std::sync::Arc<Mutex<ProcessStateStore<FsStateWriter>>>,
        projects: Vec<Project>,
        sessions: SessionController<TmuxAdapter, MemorySidecarStore, SystemClock>,
        notifier: NotificationManager<MessagesSmsTransport>,
        health: HealthMonitor<SystemHealthTransport>,
        sms: MessagesSmsTransport,
    ) -> Self {
        let ai_enabled = config.config.ai.enabled;
        Self {
            config,
            clock: SystemClock,
            db,
            state,
            projects: RwLock::new(projects),
            sessions,
            notifier,
            health: AsyncMutex::new(health),
            vcs: GitAdapter::new(),
            sms,
            last_sms_row_id: Mutex::new(0),
            last_health: Mutex::new(Vec::new()),
            ai_enabled: std::sync::atomic::AtomicBool::new(ai_enabled),
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Records a session the executor or router just started, so
    /// `live_count`/`is_live`/`live_records` see it immediately.
    pub fn track_live(&self, record: SessionRecord) {
        self.live.lock().insert(record.project.clone(), record);
    }

    pub fn untrack_live(&self, project: &str) {
        self.live.lock().remove(project);
    }

    pub fn live_count(&self) -> u32 {
        self.live.lock().len() as u32
    }

    pub fn is_live(&self, project: &str) -> bool {
        self.live.lock().contains_key(project)
    }

    /// Snapshot of every tracked live session, for context assembly and
    /// scan-tick timeout checks.
    pub fn live_records(&self) -> Vec<SessionRecord> {
        self.live.lock().values().cloned().collect()
    }

    pub async fn find_project(&self, name: &str) -> Option<Project> {
        self.projects.read().await.iter().find(|p| p.name == name).cloned()
    }

    pub async fn known_project_names(&self) -> HashSet<String> {
        self.projects.read().await.iter().map(|p| p.name.clone()).collect()
    }

    /// Current free physical memory in MiB, best-effort via `/proc/meminfo`.
    /// A parse failure (e.g. non-Linux) returns a generous default so the
    /// precondition never spuriously blocks a start in that case.
    pub fn free_memory_mb(&self) -> u64 {
        read_proc_meminfo_available_mb().unwrap_or(8192)
    }
}

fn read_proc_meminfo_available_mb() -> Option<u64> {
    let content = std::fs::read_to_string("/proc/meminfo").ok()?;
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("MemAvailable:") {
            let kb: u64 = rest.trim().trim_end_matches(" kB").trim().parse().ok()?;
            return Some(kb / 1024);
        }
    }
    None
}

/// Implements the executor's narrow view of session/notification dispatch
/// against the concrete session controller and notification manager held
/// in [`Core`].
pub struct ExecutorTarget {
    pub core: std::sync::Arc<Core>,
}

#[async_trait]
impl ExecutionTarget for ExecutorTarget {
    async fn session_is_live(&self, project: &str) -> bool {
        self.core.is_live(project)
    }

    async fn live_session_count(&self) -> u32 {
        self.core.live_count()
    }

    async fn free_memory_mb(&self) -> u64 {
        self.core.free_memory_mb()
    }

    async fn project_blocked(&self, project: &str) -> bool {
        match self.core.find_project(project).await {
            Some(p) => !p.snapshot.blockers.is_empty(),
            None => true,
        }
    }

    async fn start_session(&self, project: &str, prompt: Option<String>) -> Result<(), ExecuteError> {
        let proj = self
            .core
            .find_project(project)
            .await
            .ok_or_else(|| fleetd_adapters::session::SessionError::NotFound(project.to_string()))?;
        let head_before = self.core.vcs.head(&proj.working_dir).await.ok();
        let prompt = prompt.unwrap_or_else(|| "Continue working on this project.".to_string());
        let now_ms = self.core.clock_now_ms();
        let outcome = self
            .core
            .sessions
            .start(&proj, prompt.clone(), head_before.clone(), self.core.live_count(), None)
            .await;
        if !outcome.success {
            return Err(fleetd_adapters::session::SessionError::SpawnFailed(outcome.message).into());
        }
        let mut record = SessionRecord::new(project, prompt, now_ms);
        record.head_before = head_before;
        self.core.track_live(record);
        Ok(())
    }

    async fn stop_session(&self, project: &str) -> Result<(), ExecuteError> {
        self.core.sessions.stop(project).await;
        self.core.untrack_live(project);
        Ok(())
    }

    async fn restart_session(&self, project: &str, prompt: Option<String>) -> Result<(), ExecuteError> {
        self.stop_session(project).await?;
        self.start_session(project, prompt).await
    }

    async fn send_notification(
        &self,
        project: &str,
        tier: NotificationTier,
        text: String,
    ) -> Result<(), ExecuteError> {
        let now_ms = self.core.clock_now_ms();
        self.core.notifier.notify(project, tier, text, now_ms).await;
        Ok(())
    }
}

impl Core {
    pub fn clock_now_ms(&self) -> i64 {
        use fleetd_core::Clock;
        self.clock.now_ms()
    }
}

/// Routes evaluator notifications (a score of 2 or below notifies at tier
/// Action) through the same notification manager as the executor.
pub struct EvaluatorNotifier {
    pub core: std::sync::Arc<Core>,
}

#[async_trait]
impl EvaluationNotifier for EvaluatorNotifier {
    async fn notify(&self, project: &str, tier: NotificationTier, text: String) {
        let now_ms = self.core.clock_now_ms();
        self.core.notifier.notify(project, tier, text, now_ms).await;
    }
}
