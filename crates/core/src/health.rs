// SPDX-License-Identifier: MIT

//! Health check results (spec.md §3 "Health check result", §4.7 health monitor).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Up,
    Down,
}

/// A registered dependency's type-specific check fields (spec.md §4.5
/// "Registry of services from config").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceKind {
    Http { url: String },
    Tcp { host: String, port: u16 },
    Process { launch_label: String },
    Docker { container_names: Vec<String> },
}

/// One entry in the health monitor's service registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    pub name: String,
    #[serde(flatten)]
    pub kind: ServiceKind,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_interval_ms() -> u64 {
    60_000
}

fn default_timeout_ms() -> u64 {
    5_000
}

impl ServiceDefinition {
    /// Whether a restart can be attempted for this kind of service (spec.md
    /// §4.5 auto-restart gate: "process service has a launch-label;
    /// container service has a container list").
    pub fn is_restartable(&self) -> bool {
        matches!(
            self.kind,
            ServiceKind::Process { .. } | ServiceKind::Docker { .. }
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub dependency: String,
    pub status: HealthStatus,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
    pub consecutive_fails: u32,
    pub checked_at_ms: i64,
}

impl HealthCheckResult {
    pub fn up(dependency: impl Into<String>, latency_ms: u64, checked_at_ms: i64) -> Self {
        Self {
            dependency: dependency.into(),
            status: HealthStatus::Up,
            latency_ms: Some(latency_ms),
            error: None,
            consecutive_fails: 0,
            checked_at_ms,
        }
    }

    pub fn down(
        dependency: impl Into<String>,
        error: impl Into<String>,
        consecutive_fails: u32,
        checked_at_ms: i64,
    ) -> Self {
        Self {
            dependency: dependency.into(),
            status: HealthStatus::Down,
            latency_ms: None,
            error: Some(error.into()),
            consecutive_fails,
            checked_at_ms,
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
