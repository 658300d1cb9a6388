// SPDX-License-Identifier: MIT

//! Health monitor (C7, spec.md §4.5). Owns interval gating, alert
//! thresholds, correlated-failure detection, and the auto-restart budget;
//! `fleetd_adapters::health::HealthTransport` only answers "is it up" and
//! runs the restart command.

use fleetd_adapters::health::HealthTransport;
use fleetd_core::{AutonomyLevel, HealthCheckResult, HealthConfig, ServiceDefinition, ServiceKind};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("service registry contains the daemon's own launch-agent label: {0}")]
    SelfReferential(String),
}

/// Validated set of services to check. Construction is the only way to get
/// one, so a self-referential registry can never reach `checkAll`.
pub struct ServiceRegistry {
    services: Vec<ServiceDefinition>,
}

impl ServiceRegistry {
    /// Rejects a registry containing the daemon's own launch-agent label
    /// (spec.md §4.5 "Self-exclusion").
    pub fn validate(
        services: Vec<ServiceDefinition>,
        own_launch_label: &str,
    ) -> Result<Self, ConfigError> {
        for svc in &services {
            if let ServiceKind::Process { launch_label } = &svc.kind {
                if launch_label == own_launch_label {
                    tracing::error!(label = launch_label, "service registry is self-referential");
                    return Err(ConfigError::SelfReferential(launch_label.clone()));
                }
            }
        }
        Ok(Self { services })
    }

    pub fn services(&self) -> &[ServiceDefinition] {
        &self.services
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartVerdict {
    Restarted,
    SkippedNotRestartable,
    SkippedBudgetExhausted,
    SkippedCorrelatedFailure,
    SkippedAutonomyTooLow,
}

struct ServiceState {
    consecutive_fails: u32,
    last_checked_ms: i64,
    alerted_at_current_streak: bool,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self {
            consecutive_fails: 0,
            last_checked_ms: i64::MIN,
            alerted_at_current_streak: false,
        }
    }
}

/// One tick's worth of side effects the caller (supervisor) must act on.
#[derive(Debug, Clone)]
pub struct HealthTick {
    pub results: Vec<HealthCheckResult>,
    pub urgent_alerts: Vec<String>,
    pub correlated_failure: Option<String>,
    pub restarts: Vec<(String, RestartVerdict)>,
}

pub struct HealthMonitor<T: HealthTransport> {
    transport: T,
    config: HealthConfig,
    state: HashMap<String, ServiceState>,
    restart_log_ms: Vec<i64>,
}

impl<T: HealthTransport> HealthMonitor<T> {
    pub fn new(transport: T, config: HealthConfig) -> Self {
        Self {
            transport,
            config,
            state: HashMap::new(),
            restart_log_ms: Vec::new(),
        }
    }

    /// Runs due checks, applies alert gating and correlated-failure
    /// detection, and issues restarts the auto-restart gate allows
    /// (spec.md §4.5). `autonomy` gates whether restarts are attempted.
    pub async fn check_all(
        &mut self,
        registry: &ServiceRegistry,
        autonomy: AutonomyLevel,
        now_ms: i64,
    ) -> HealthTick {
        let due: Vec<&ServiceDefinition> = registry
            .services()
            .iter()
            .filter(|svc| self.is_due(svc, now_ms))
            .collect();

        let (parallel_due, sequential_due): (Vec<_>, Vec<_>) = due
            .into_iter()
            .partition(|svc| matches!(svc.kind, ServiceKind::Http { .. } | ServiceKind::Tcp { .. }));

        let mut results = Vec::new();
        let parallel_checks = parallel_due
            .iter()
            .map(|svc| self.run_check(svc, now_ms));
        results.extend(futures_util::future::join_all(parallel_checks).await);

        for svc in &sequential_due {
            results.push(self.run_check(svc, now_ms).await);
        }

        let mut urgent_alerts = Vec::new();
        for result in &results {
            let entry = self.state.entry(result.dependency.clone()).or_default();
            entry.last_checked_ms = now_ms;
            if result.is_up() {
                entry.consecutive_fails = 0;
                entry.alerted_at_current_streak = false;
            } else {
                entry.consecutive_fails = result.consecutive_fails;
                if entry.consecutive_fails == self.config.consecutive_fails_before_alert
                    && !entry.alerted_at_current_streak
                {
                    entry.alerted_at_current_streak = true;
                    urgent_alerts.push(result.dependency.clone());
                }
            }
        }

        let down_count = results.iter().filter(|r| !r.is_up()).count() as u32;
        let correlated_failure = if down_count >= self.config.correlated_failure_threshold {
            let names: Vec<String> = results
                .iter()
                .filter(|r| !r.is_up())
                .map(|r| r.dependency.clone())
                .collect();
            Some(format!("infrastructure event: {} services down ({})", down_count, names.join(", ")))
        } else {
            None
        };

        let mut restarts = Vec::new();
        if correlated_failure.is_none() {
            for result in &results {
                if result.is_up() {
                    continue;
                }
                let Some(svc) = registry.services().iter().find(|s| s.name == result.dependency) else {
                    continue;
                };
                let verdict = self.attempt_restart(svc, autonomy, now_ms).await;
                restarts.push((svc.name.clone(), verdict));
            }
        }

        HealthTick {
            results,
            urgent_alerts,
            correlated_failure,
            restarts,
        }
    }

    fn is_due(&self, svc: &ServiceDefinition, now_ms: i64) -> bool {
        match self.state.get(&svc.name) {
            Some(state) => now_ms - state.last_checked_ms >= svc.interval_ms as i64,
            None => true,
        }
    }

    async fn run_check(&self, svc: &ServiceDefinition, now_ms: i64) -> HealthCheckResult {
        let timeout = Duration::from_millis(svc.timeout_ms);
        let fails_so_far = self.state.get(&svc.name).map(|s| s.consecutive_fails).unwrap_or(0);

        match &svc.kind {
            ServiceKind::Http { url } => match self.transport.http_check(url, timeout).await {
                Ok(()) => HealthCheckResult::up(&svc.name, 0, now_ms),
                Err(e) => HealthCheckResult::down(&svc.name, e.to_string(), fails_so_far + 1, now_ms),
            },
            ServiceKind::Tcp { host, port } => match self.transport.tcp_check(host, *port, timeout).await {
                Ok(()) => HealthCheckResult::up(&svc.name, 0, now_ms),
                Err(e) => HealthCheckResult::down(&svc.name, e.to_string(), fails_so_far + 1, now_ms),
            },
            ServiceKind::Process { launch_label } => {
                match self.transport.process_check(launch_label).await {
                    Ok(true) => HealthCheckResult::up(&svc.name, 0, now_ms),
                    Ok(false) => HealthCheckResult::down(&svc.name, "no pid", fails_so_far + 1, now_ms),
                    Err(e) => HealthCheckResult::down(&svc.name, e.to_string(), fails_so_far + 1, now_ms),
                }
            }
            ServiceKind::Docker { container_names } => {
                match self.transport.container_check(container_names).await {
                    Ok(statuses) if statuses.iter().all(|up| *up) => {
                        HealthCheckResult::up(&svc.name, 0, now_ms)
                    }
                    Ok(_) => HealthCheckResult::down(&svc.name, "container down", fails_so_far + 1, now_ms),
                    Err(e) => HealthCheckResult::down(&svc.name, e.to_string(), fails_so_far + 1, now_ms),
                }
            }
        }
    }

    async fn attempt_restart(
        &mut self,
        svc: &ServiceDefinition,
        autonomy: AutonomyLevel,
        now_ms: i64,
    ) -> RestartVerdict {
        if !matches!(autonomy, AutonomyLevel::Moderate | AutonomyLevel::Full) {
            return RestartVerdict::SkippedAutonomyTooLow;
        }
        if !svc.is_restartable() {
            return RestartVerdict::SkippedNotRestartable;
        }

        self.restart_log_ms.retain(|&ts| now_ms - ts < 3_600_000);
        if self.restart_log_ms.len() as u32 >= self.config.restart_budget.max_per_hour {
            return RestartVerdict::SkippedBudgetExhausted;
        }

        let result = match &svc.kind {
            ServiceKind::Process { launch_label } => self.transport.restart_process(launch_label).await,
            ServiceKind::Docker { container_names } => match container_names.first() {
                Some(name) => self.transport.restart_container(name).await,
                None => return RestartVerdict::SkippedNotRestartable,
            },
            _ => return RestartVerdict::SkippedNotRestartable,
        };

        match result {
            Ok(()) => {
                self.restart_log_ms.push(now_ms);
                RestartVerdict::Restarted
            }
            Err(_) => RestartVerdict::SkippedNotRestartable,
        }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
