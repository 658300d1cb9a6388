// SPDX-License-Identifier: MIT

//! The supervisor: the four periodic loops that drive the orchestrator
//! (message poll, scan, think, scheduled jobs), and the wiring that turns
//! the engine's seam traits into calls against [`Core`].

use crate::core::{Core, EvaluatorNotifier, ExecutorTarget};
use crate::cron::{CronSchedule, ScheduleGuard};
use crate::router;
use fleetd_adapters::oracle::{CliOracleRunner, OracleInvocation, OracleModel};
use fleetd_adapters::session::TmuxAdapter;
use fleetd_adapters::vcs::GitAdapter;
use fleetd_core::{ConversationEntry, Evaluation, Role, SystemClock, UuidIdGen};
use fleetd_engine::{
    DecisionExecutor, DecisionExecutorConfig, EvaluationLearning, HealthTick, OracleGateway,
    OracleOutcome, PromptContext, ReminderEngine, ResourceSnapshot, ServiceRegistry,
    SessionEvaluator,
};
use std::sync::Arc;
use std::time::Duration;

const MIN_THINK_INTERVAL_MS: i64 = 60_000;
const MAX_THINK_INTERVAL_MS: i64 = 1_800_000;
const EVENING_WINDDOWN_CRON: &str = "0 20 * * *";
const WEEKLY_REVENUE_SUMMARY_CRON: &str = "0 9 * * 0";

struct Schedules {
    morning_digest: (CronSchedule, ScheduleGuard),
    evening_winddown: (CronSchedule, ScheduleGuard),
    weekly_revenue_summary: (CronSchedule, ScheduleGuard),
    trust_promotion_check: (CronSchedule, ScheduleGuard),
}

/// Everything needed to drive one daemon lifetime: the shared adapter
/// wiring in [`Core`], plus the engine components built against it.
pub struct Supervisor {
    core: Arc<Core>,
    oracle: OracleGateway<CliOracleRunner, SystemClock>,
    executor: DecisionExecutor<ExecutorTarget, fleetd_storage::FsStateWriter>,
    evaluator: SessionEvaluator<TmuxAdapter, GitAdapter, EvaluatorNotifier>,
    reminders: ReminderEngine<UuidIdGen>,
    registry: ServiceRegistry,
    schedules: tokio::sync::Mutex<Schedules>,
    thinking: std::sync::atomic::AtomicBool,
}

impl Supervisor {
    pub fn new(core: Arc<Core>) -> anyhow::Result<Self> {
        let registry = ServiceRegistry::validate(
            core.config.config.health.services.clone(),
            &core.config.own_launch_label,
        )?;

        let oracle = OracleGateway::new(
            CliOracleRunner::new(core.config.oracle_binary.clone()),
            SystemClock,
            core.config.config.ai.resource_limits.max_concurrent_thinks as usize,
        );

        let executor_target = ExecutorTarget { core: core.clone() };
        let executor_config = DecisionExecutorConfig {
            protected_projects: core.config.config.ai.protected_projects.iter().cloned().collect(),
            same_action_ms: core.config.config.ai.cooldowns.same_action_ms as i64,
            same_project_ms: core.config.config.ai.cooldowns.same_project_ms as i64,
            max_concurrent_sessions: core.config.config.max_concurrent_sessions,
            min_free_memory_mb: core.config.config.ai.resource_limits.min_free_memory_mb as u64,
            max_error_retries: core.config.config.ai.max_error_retries,
        };
        let executor = DecisionExecutor::new(executor_config, executor_target, core.state.clone());

        let evaluator = SessionEvaluator::new(
            TmuxAdapter::default(),
            GitAdapter::new(),
            EvaluatorNotifier { core: core.clone() },
            core.db.clone(),
        );

        let reminders = ReminderEngine::new(core.db.clone(), UuidIdGen);

        let schedules = tokio::sync::Mutex::new(Schedules {
            morning_digest: (
                CronSchedule::parse(&core.config.config.morning_digest.cron)?,
                ScheduleGuard::default(),
            ),
            evening_winddown: (CronSchedule::parse(EVENING_WINDDOWN_CRON)?, ScheduleGuard::default()),
            weekly_revenue_summary: (
                CronSchedule::parse(WEEKLY_REVENUE_SUMMARY_CRON)?,
                ScheduleGuard::default(),
            ),
            trust_promotion_check: (
                CronSchedule::parse(&core.config.config.trust.promotion_check_cron)?,
                ScheduleGuard::default(),
            ),
        });

        Ok(Self {
            core,
            oracle,
            executor,
            evaluator,
            reminders,
            registry,
            schedules,
            thinking: std::sync::atomic::AtomicBool::new(false),
        })
    }

    /// Runs all periodic loops until `shutdown` resolves (SIGINT/SIGTERM).
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let poll_ms = self.core.config.config.poll_interval_ms.clamp(2_000, 10_000);
        let mut poll_tick = tokio::time::interval(Duration::from_millis(poll_ms));
        let mut scan_tick = tokio::time::interval(Duration::from_millis(
            self.core.config.config.scan_interval_ms,
        ));
        let mut cron_tick = tokio::time::interval(Duration::from_secs(30));

        let think_ms = (self.core.config.config.ai.think_interval_ms as i64)
            .clamp(MIN_THINK_INTERVAL_MS, MAX_THINK_INTERVAL_MS);
        let mut think_tick = tokio::time::interval(Duration::from_millis(think_ms as u64));

        loop {
            tokio::select! {
                _ = poll_tick.tick() => self.poll_messages().await,
                _ = scan_tick.tick() => self.scan().await,
                _ = think_tick.tick() => self.think().await,
                _ = cron_tick.tick() => self.run_due_schedules().await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("shutdown signal received, stopping supervisor loops");
                        break;
                    }
                }
            }
        }
    }

    async fn poll_messages(&self) {
        let since = *self.core.last_sms_row_id.lock();
        let messages = match self.core.sms.get_new_messages(since).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(error = %e, "sms poll failed");
                return;
            }
        };
        for message in messages {
            *self.core.last_sms_row_id.lock() = message.row_id.max(*self.core.last_sms_row_id.lock());

            let entry = ConversationEntry::new(Role::User, &message.text, self.core.clock_now_ms());
            if let Err(e) = self.core.db.insert_conversation_entry(&entry).await {
                tracing::warn!(error = %e, "failed to persist inbound message");
            }

            let reply = router::route(self, &message.text).await;

            let reply_entry = ConversationEntry::new(Role::Assistant, &reply, self.core.clock_now_ms());
            if let Err(e) = self.core.db.insert_conversation_entry(&reply_entry).await {
                tracing::warn!(error = %e, "failed to persist reply");
            }
            if let Err(e) = self.core.sms.send(&reply).await {
                tracing::warn!(error = %e, "failed to send reply");
            }
        }
    }

    /// Scan tick: refresh project snapshots, enforce session timeouts,
    /// drain queued notifications, fire due reminders, run health checks.
    async fn scan(&self) {
        let now_ms = self.core.clock_now_ms();

        let live = self.core.live_records();
        for project in self.core.sessions.timed_out_projects(&live, now_ms) {
            tracing::info!(project, "session exceeded max duration, stopping");
            self.handle_session_timeout(&project, now_ms).await;
        }

        self.core.notifier.drain_quiet_queue(now_ms).await;
        self.core.notifier.flush_batch_if_due(now_ms).await;

        match self.reminders.check_and_fire(now_ms).await {
            Ok(due) => {
                for reminder in due {
                    self.core
                        .notifier
                        .notify(
                            "reminders",
                            fleetd_core::NotificationTier::Urgent,
                            reminder.text,
                            now_ms,
                        )
                        .await;
                }
            }
            Err(e) => tracing::warn!(error = %e, "reminder check failed"),
        }

        if self.core.config.config.health.enabled {
            let autonomy = self.autonomy_level();
            let tick: HealthTick = self.core.health.lock().await.check_all(&self.registry, autonomy, now_ms).await;
            *self.core.last_health.lock() = tick.results.clone();
            for alert in &tick.urgent_alerts {
                self.core
                    .notifier
                    .notify(
                        alert,
                        fleetd_core::NotificationTier::Urgent,
                        format!("{alert} has failed consecutive health checks"),
                        now_ms,
                    )
                    .await;
            }
            if let Some(summary) = &tick.correlated_failure {
                self.core
                    .notifier
                    .notify("health", fleetd_core::NotificationTier::Urgent, summary.clone(), now_ms)
                    .await;
            }
        }
    }

    /// Captures the last lines of scrollback, stops the session, fires an
    /// action-tier notification carrying that output, and runs an
    /// evaluation of the just-ended session.
    async fn handle_session_timeout(&self, project: &str, now_ms: i64) {
        let tail = self.core.sessions.capture_tail(project, 5).await.unwrap_or_default();
        let record = self
            .core
            .live_records()
            .into_iter()
            .find(|r| r.project == project);

        self.core.sessions.stop(project).await;
        self.core.untrack_live(project);

        self.core
            .notifier
            .notify(
                project,
                fleetd_core::NotificationTier::Action,
                format!("Session {project} timed out after {}min. Last output: {tail}",
                    self.core.config.config.ai.max_session_duration_ms / 60_000),
                now_ms,
            )
            .await;

        if let (Some(record), Some(proj)) = (record, self.core.find_project(project).await) {
            if let Err(e) = self.evaluate_stopped_session(&record, &proj.working_dir).await {
                tracing::warn!(project, error = %e, "post-timeout evaluation failed");
            }
        }
    }

    /// Think cycle: assemble context, query the oracle, gate and dispatch
    /// its recommendations. Reentrancy-guarded so a slow oracle call never
    /// overlaps with the next scheduled tick.
    async fn think(&self) {
        if !self.core.ai_enabled.load(std::sync::atomic::Ordering::SeqCst) {
            return;
        }
        if self
            .thinking
            .compare_exchange(
                false,
                true,
                std::sync::atomic::Ordering::SeqCst,
                std::sync::atomic::Ordering::SeqCst,
            )
            .is_err()
        {
            tracing::debug!("think cycle already in progress, skipping tick");
            return;
        }

        let outcome = self.run_think_cycle().await;
        if let Err(e) = outcome {
            tracing::warn!(error = %e, "think cycle failed");
        }
        self.thinking.store(false, std::sync::atomic::Ordering::SeqCst);
    }

    async fn run_think_cycle(&self) -> anyhow::Result<()> {
        let context = self.assemble_context().await?;
        let now_ms = context.now_ms;
        let rendered = context.render();
        let truncated: String = rendered
            .chars()
            .take(self.core.config.config.ai.max_prompt_length)
            .collect();

        let invocation = OracleInvocation {
            model: model_for(&self.core.config.config.ai.model),
            ..OracleInvocation::decision(truncated)
        };
        let outcome = self.oracle.query(invocation).await;

        let recommendations = match outcome {
            OracleOutcome::Decoded(value) => decode_recommendations(value),
            other => {
                tracing::warn!(?other, "oracle produced no usable recommendations this cycle");
                Vec::new()
            }
        };

        let known = self.core.known_project_names().await;
        let decisions = self.executor.evaluate(recommendations, &known, now_ms);
        for decision in decisions {
            if !decision.validated || decision.observe_only {
                continue;
            }
            self.executor.execute(&decision, now_ms).await;
        }
        Ok(())
    }

    async fn assemble_context(&self) -> anyhow::Result<PromptContext> {
        let now_ms = self.core.clock_now_ms();
        let projects = self.core.projects.read().await.clone();
        let trust = self.core.db.load_trust_ledger().await?;
        let conversation = self.core.db.recent_conversation(20).await?;

        let mut evaluation_learnings = Vec::with_capacity(projects.len());
        for project in &projects {
            let recent = self.core.db.recent_evaluations_for_project(&project.name, 5).await?;
            evaluation_learnings.push(EvaluationLearning {
                project: project.name.clone(),
                recent,
            });
        }

        Ok(PromptContext {
            now_ms,
            autonomy_level: self.autonomy_level(),
            projects,
            sessions: self.core.live_records(),
            resource: ResourceSnapshot {
                free_memory_mb: self.core.free_memory_mb(),
                live_session_count: self.core.live_count(),
            },
            service_health: self.core.last_health.lock().clone(),
            revenue: Vec::new(),
            trust,
            conversation,
            evaluation_learnings,
            recent_decisions: Vec::new(),
        })
    }

    fn autonomy_level(&self) -> fleetd_core::AutonomyLevel {
        self.core.state.lock().state().runtime_autonomy_level
    }

    async fn run_due_schedules(&self) {
        let now_ms = self.core.clock_now_ms();
        let at = match chrono::DateTime::<chrono::Utc>::from_timestamp_millis(now_ms) {
            Some(at) => at,
            None => return,
        };

        let mut schedules = self.schedules.lock().await;
        if schedules.morning_digest.1.should_fire(&schedules.morning_digest.0, at) {
            self.run_morning_digest().await;
        }
        if schedules.evening_winddown.1.should_fire(&schedules.evening_winddown.0, at) {
            self.run_evening_winddown().await;
        }
        if schedules
            .weekly_revenue_summary
            .1
            .should_fire(&schedules.weekly_revenue_summary.0, at)
        {
            self.run_weekly_revenue_summary().await;
        }
        if schedules
            .trust_promotion_check
            .1
            .should_fire(&schedules.trust_promotion_check.0, at)
        {
            self.run_trust_promotion_check().await;
        }
    }

    async fn run_morning_digest(&self) {
        let now_ms = self.core.clock_now_ms();
        let projects = self.core.projects.read().await;
        let needing_attention: Vec<&str> = projects
            .iter()
            .filter(|p| p.snapshot.needs_attention)
            .map(|p| p.name.as_str())
            .collect();
        let text = if needing_attention.is_empty() {
            format!("Morning digest: {} projects, none need attention.", projects.len())
        } else {
            format!(
                "Morning digest: {} projects, attention needed on: {}",
                projects.len(),
                needing_attention.join(", ")
            )
        };
        drop(projects);
        self.core
            .notifier
            .notify("digest", fleetd_core::NotificationTier::Summary, text, now_ms)
            .await;
    }

    async fn run_evening_winddown(&self) {
        let now_ms = self.core.clock_now_ms();
        let live = self.core.live_records();
        let text = format!("Evening wind-down: {} session(s) still live.", live.len());
        self.core
            .notifier
            .notify("digest", fleetd_core::NotificationTier::Summary, text, now_ms)
            .await;
    }

    async fn run_weekly_revenue_summary(&self) {
        if !self.core.config.config.revenue.enabled {
            return;
        }
        let now_ms = self.core.clock_now_ms();
        self.core
            .notifier
            .notify(
                "revenue",
                fleetd_core::NotificationTier::Summary,
                "Weekly revenue summary: no sources configured.".to_string(),
                now_ms,
            )
            .await;
    }

    async fn run_trust_promotion_check(&self) {
        if !self.core.config.config.trust.enabled {
            return;
        }
        let now_ms = self.core.clock_now_ms();
        let level = self.autonomy_level();
        let Some(next) = level.next() else {
            return;
        };
        let ledger = match self.core.db.load_trust_ledger().await {
            Ok(ledger) => ledger,
            Err(e) => {
                tracing::warn!(error = %e, "trust ledger load failed");
                return;
            }
        };
        let Some(summary) = ledger.get(level) else {
            return;
        };
        // promotion is never applied automatically; only surfaced as a recommendation.
        if summary.sessions_launched >= 10 && summary.average_score().unwrap_or(0.0) >= 3.5 {
            self.core
                .notifier
                .notify(
                    "trust",
                    fleetd_core::NotificationTier::Action,
                    format!("Trust promotion available: {level} -> {next}. Reply \"ai level {next}\" to apply."),
                    now_ms,
                )
                .await;
        }
    }

    /// Runs the session-end evaluation pipeline for a stopped project and
    /// routes score-gated notifications through the shared manager. Called
    /// by the router's `stop` command and by the scan loop's timeout
    /// handling.
    pub async fn evaluate_stopped_session(
        &self,
        record: &fleetd_core::SessionRecord,
        working_dir: &std::path::Path,
    ) -> anyhow::Result<Evaluation> {
        let invocation = OracleInvocation::decision(format!(
            "Evaluate the session that just ended for project {}. Score 1-5 and explain.",
            record.project
        ));
        let oracle_response = self.oracle.query(invocation).await;
        let stopped_at_ms = self.core.clock_now_ms();
        let evaluation = self
            .evaluator
            .evaluate(record, working_dir, &oracle_response, stopped_at_ms)
            .await?;
        Ok(evaluation)
    }

    pub fn core(&self) -> &Arc<Core> {
        &self.core
    }

    pub fn reminders(&self) -> &ReminderEngine<UuidIdGen> {
        &self.reminders
    }

    pub fn oracle(&self) -> &OracleGateway<CliOracleRunner, SystemClock> {
        &self.oracle
    }

    /// Runs one think cycle immediately, ignoring its usual interval
    /// (the router's `ai think` command).
    pub async fn trigger_think(&self) {
        self.think().await;
    }
}

/// A bare `{...}` decision object is wrapped into a single-element list;
/// a malformed shape yields an empty batch rather than failing the whole
/// cycle.
fn decode_recommendations(value: serde_json::Value) -> Vec<fleetd_core::Recommendation> {
    let value = match value {
        serde_json::Value::Array(_) => value,
        object @ serde_json::Value::Object(_) => serde_json::Value::Array(vec![object]),
        other => other,
    };
    serde_json::from_value(value).unwrap_or_default()
}

fn model_for(name: &str) -> OracleModel {
    match name {
        "small" => OracleModel::Small,
        "large" => OracleModel::Large,
        _ => OracleModel::Default,
    }
}
