// SPDX-License-Identifier: MIT

//! Decision executor (C4, spec.md §4.2). Two phases: `evaluate()` gates a
//! batch of oracle recommendations against the allowlist, protected-project
//! set, cooldowns, and the autonomy matrix; `execute()` re-checks
//! just-in-time preconditions and dispatches the approved side effect.

use crate::error::ExecuteError;
use async_trait::async_trait;
use fleetd_core::{
    autonomy_matrix, ActionKind, AutonomyLevel, AutonomyVerdict, Decision, ExecutionOutcome,
    ExecutionRecord, NotificationTier, Recommendation,
};
use fleetd_storage::{ProcessStateStore, StateWriter};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Approved, about-to-run side effect. The executor's internal vocabulary:
/// everything downstream of `evaluate()` dispatches through one of these
/// instead of the raw [`ActionKind`], so logging and dispatch share one shape.
#[derive(Debug, Clone)]
pub enum Effect {
    StartSession {
        project: String,
        prompt: Option<String>,
    },
    StopSession {
        project: String,
    },
    RestartSession {
        project: String,
        prompt: Option<String>,
    },
    SendNotification {
        project: String,
        tier: NotificationTier,
        text: String,
    },
    RestartService {
        service: String,
    },
    FireReminder {
        reminder_id: String,
    },
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::StartSession { .. } => "start_session",
            Effect::StopSession { .. } => "stop_session",
            Effect::RestartSession { .. } => "restart_session",
            Effect::SendNotification { .. } => "send_notification",
            Effect::RestartService { .. } => "restart_service",
            Effect::FireReminder { .. } => "fire_reminder",
        }
    }
}

/// Read-only queries and session/notification dispatch the executor needs
/// from C5/C8 to run its just-in-time preconditions and approved effects.
/// Kept as a trait so tests can supply a fake without wiring the real
/// multiplexer or SMS transport.
#[async_trait]
pub trait ExecutionTarget: Send + Sync {
    async fn session_is_live(&self, project: &str) -> bool;
    async fn live_session_count(&self) -> u32;
    async fn free_memory_mb(&self) -> u64;
    async fn project_blocked(&self, project: &str) -> bool;
    async fn start_session(
        &self,
        project: &str,
        prompt: Option<String>,
    ) -> Result<(), ExecuteError>;
    async fn stop_session(&self, project: &str) -> Result<(), ExecuteError>;
    async fn restart_session(
        &self,
        project: &str,
        prompt: Option<String>,
    ) -> Result<(), ExecuteError>;
    async fn send_notification(
        &self,
        project: &str,
        tier: NotificationTier,
        text: String,
    ) -> Result<(), ExecuteError>;
}

#[derive(Debug, Clone)]
pub struct DecisionExecutorConfig {
    pub protected_projects: HashSet<String>,
    pub same_action_ms: i64,
    pub same_project_ms: i64,
    pub max_concurrent_sessions: u32,
    pub min_free_memory_mb: u64,
    pub max_error_retries: u32,
}

impl Default for DecisionExecutorConfig {
    fn default() -> Self {
        Self {
            protected_projects: HashSet::new(),
            same_action_ms: 300_000,
            same_project_ms: 600_000,
            max_concurrent_sessions: 5,
            min_free_memory_mb: 2048,
            max_error_retries: 3,
        }
    }
}

#[derive(Default)]
struct CooldownTracker {
    same_action: HashMap<(String, ActionKind), i64>,
    same_project: HashMap<String, i64>,
}

impl CooldownTracker {
    fn blocked(
        &self,
        project: &str,
        action: ActionKind,
        now_ms: i64,
        cfg: &DecisionExecutorConfig,
    ) -> bool {
        if let Some(&last) = self.same_action.get(&(project.to_string(), action)) {
            if now_ms - last < cfg.same_action_ms {
                return true;
            }
        }
        if let Some(&last) = self.same_project.get(project) {
            if now_ms - last < cfg.same_project_ms {
                return true;
            }
        }
        false
    }

    fn record(&mut self, project: &str, action: ActionKind, now_ms: i64) {
        self.same_action.insert((project.to_string(), action), now_ms);
        self.same_project.insert(project.to_string(), now_ms);
    }
}

/// Validates and dispatches oracle recommendations (spec.md §4.2).
pub struct DecisionExecutor<T: ExecutionTarget, W: StateWriter> {
    config: DecisionExecutorConfig,
    target: T,
    state: Arc<Mutex<ProcessStateStore<W>>>,
    cooldowns: Mutex<CooldownTracker>,
}

impl<T: ExecutionTarget, W: StateWriter> DecisionExecutor<T, W> {
    pub fn new(
        config: DecisionExecutorConfig,
        target: T,
        state: Arc<Mutex<ProcessStateStore<W>>>,
    ) -> Self {
        Self {
            config,
            target,
            state,
            cooldowns: Mutex::new(CooldownTracker::default()),
        }
    }

    fn current_autonomy_level(&self) -> AutonomyLevel {
        self.state.lock().state().runtime_autonomy_level
    }

    /// Phase 1: gate the batch of recommendations against the allowlist,
    /// protected-project set, cooldowns, and the autonomy matrix. Does not
    /// perform any side effect; preserves input order (spec.md §5 ordering).
    pub fn evaluate(
        &self,
        recommendations: Vec<Recommendation>,
        known_projects: &HashSet<String>,
        now_ms: i64,
    ) -> Vec<Decision> {
        let level = self.current_autonomy_level();
        let cooldowns = self.cooldowns.lock();

        recommendations
            .into_iter()
            .map(|rec| {
                if !known_projects.contains(&rec.project) {
                    return Decision::rejected(rec, "unknown project", now_ms);
                }
                if self.config.protected_projects.contains(&rec.project) {
                    return Decision::rejected(rec, "protected project", now_ms);
                }
                if cooldowns.blocked(&rec.project, rec.action, now_ms, &self.config) {
                    return Decision::rejected(rec, "cooldown active", now_ms);
                }

                match autonomy_matrix(level, rec.action) {
                    AutonomyVerdict::Execute => Decision::accepted(rec, false, now_ms),
                    AutonomyVerdict::SmsOnly => Decision::accepted(rec, true, now_ms),
                    AutonomyVerdict::Log => Decision::rejected(rec, "logged only", now_ms),
                }
            })
            .collect()
    }

    /// Phase 2: run the just-in-time precondition re-check and dispatch the
    /// approved effect for one accepted, non-`observeOnly` decision.
    pub async fn execute(&self, decision: &Decision, now_ms: i64) -> ExecutionOutcome {
        let rec = &decision.recommendation;
        let level = self.current_autonomy_level();

        let span =
            tracing::info_span!("execute", action = rec.action.as_str(), project = %rec.project);
        let _guard = span.enter();
        tracing::info!("dispatching approved decision");

        let outcome = match rec.action {
            ActionKind::Start => self.execute_start(rec).await,
            ActionKind::Stop => self.execute_stop(rec).await,
            ActionKind::Restart => self.execute_restart(rec).await,
            ActionKind::Notify => self.execute_notify(rec).await,
            ActionKind::Skip => ExecutionOutcome::Skipped {
                reason: rec.reason.clone(),
            },
        };

        match &outcome {
            ExecutionOutcome::Failed { error } => tracing::warn!(error, "execution failed"),
            ExecutionOutcome::Rejected { reason } => tracing::debug!(reason, "execution rejected"),
            _ => tracing::info!(?outcome, "execution complete"),
        }

        if matches!(outcome, ExecutionOutcome::Executed) {
            self.cooldowns.lock().record(&rec.project, rec.action, now_ms);
        }
        if rec.action == ActionKind::Restart && rec.reason.to_ascii_lowercase().contains("error") {
            self.record_error_retry(&rec.project);
        }

        let state_version = self.state.lock().state().state_version.current();
        let record = ExecutionRecord {
            action: rec.action,
            project: rec.project.clone(),
            result: outcome.clone(),
            timestamp_ms: now_ms,
            state_version,
            autonomy_level: level,
        };
        let _ = self.state.lock().with_state(|state| {
            state.push_execution(serde_json::to_value(&record).unwrap_or_default());
        });

        outcome
    }

    fn record_error_retry(&self, project: &str) {
        let _ = self.state.lock().with_state(|state| {
            *state.error_retry_counts.entry(project.to_string()).or_insert(0) += 1;
        });
    }

    fn error_retry_count(&self, project: &str) -> u32 {
        self.state
            .lock()
            .state()
            .error_retry_counts
            .get(project)
            .copied()
            .unwrap_or(0)
    }

    async fn execute_start(&self, rec: &Recommendation) -> ExecutionOutcome {
        if self.target.session_is_live(&rec.project).await {
            return ExecutionOutcome::Rejected {
                reason: "session already live".to_string(),
            };
        }
        if self.target.live_session_count().await >= self.config.max_concurrent_sessions {
            return ExecutionOutcome::Rejected {
                reason: "max concurrent sessions reached".to_string(),
            };
        }
        if self.target.free_memory_mb().await < self.config.min_free_memory_mb {
            return ExecutionOutcome::Rejected {
                reason: "insufficient free memory".to_string(),
            };
        }
        if self.target.project_blocked(&rec.project).await {
            return ExecutionOutcome::Rejected {
                reason: "project blocked".to_string(),
            };
        }

        match self
            .target
            .start_session(&rec.project, rec.prompt.clone())
            .await
        {
            Ok(()) => ExecutionOutcome::Executed,
            Err(e) => ExecutionOutcome::Failed { error: e.to_string() },
        }
    }

    async fn execute_stop(&self, rec: &Recommendation) -> ExecutionOutcome {
        if !self.target.session_is_live(&rec.project).await {
            return ExecutionOutcome::Rejected {
                reason: "no live session".to_string(),
            };
        }
        match self.target.stop_session(&rec.project).await {
            Ok(()) => ExecutionOutcome::Executed,
            Err(e) => ExecutionOutcome::Failed { error: e.to_string() },
        }
    }

    async fn execute_restart(&self, rec: &Recommendation) -> ExecutionOutcome {
        let is_recovery = rec.reason.to_ascii_lowercase().contains("error");
        if is_recovery && self.error_retry_count(&rec.project) >= self.config.max_error_retries {
            let escalation = Recommendation {
                project: rec.project.clone(),
                action: ActionKind::Notify,
                reason: format!(
                    "escalating: {} recovery attempts already made on {}",
                    self.error_retry_count(&rec.project),
                    rec.project
                ),
                priority: 5,
                prompt: None,
                confidence: None,
                notification_tier: Some(NotificationTier::Action),
            };
            return self.execute_notify(&escalation).await;
        }

        if self.target.session_is_live(&rec.project).await {
            if let Err(e) = self.target.stop_session(&rec.project).await {
                return ExecutionOutcome::Failed { error: e.to_string() };
            }
        }
        match self
            .target
            .restart_session(&rec.project, rec.prompt.clone())
            .await
        {
            Ok(()) => ExecutionOutcome::Executed,
            Err(e) => ExecutionOutcome::Failed { error: e.to_string() },
        }
    }

    async fn execute_notify(&self, rec: &Recommendation) -> ExecutionOutcome {
        let tier = rec.notification_tier.unwrap_or(NotificationTier::Action);
        match self
            .target
            .send_notification(&rec.project, tier, rec.reason.clone())
            .await
        {
            Ok(()) => ExecutionOutcome::Executed,
            Err(e) => ExecutionOutcome::Failed { error: e.to_string() },
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
