// SPDX-License-Identifier: MIT

//! Configuration schema (spec.md §6 "Configuration file"). Deserialized
//! from a single JSON document; every field has the documented default so
//! an absent key never fails the load.

use crate::autonomy::AutonomyLevel;
use crate::health::ServiceDefinition;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub projects_dir: PathBuf,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,
    #[serde(default = "default_idle_threshold_minutes")]
    pub idle_threshold_minutes: u32,
    #[serde(default)]
    pub quiet_hours: QuietHours,
    #[serde(default)]
    pub morning_digest: MorningDigest,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub revenue: RevenueConfig,
    #[serde(default)]
    pub trust: TrustConfig,
    #[serde(default)]
    pub reminders: RemindersConfig,
}

fn default_max_concurrent_sessions() -> u32 {
    5
}
fn default_poll_interval_ms() -> u64 {
    15_000
}
fn default_scan_interval_ms() -> u64 {
    60_000
}
fn default_idle_threshold_minutes() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuietHours {
    #[serde(default = "default_quiet_start")]
    pub start: String,
    #[serde(default = "default_quiet_end")]
    pub end: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_quiet_start() -> String {
    "22:00".to_string()
}
fn default_quiet_end() -> String {
    "07:00".to_string()
}
fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            start: default_quiet_start(),
            end: default_quiet_end(),
            timezone: default_timezone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MorningDigest {
    #[serde(default = "default_digest_cron")]
    pub cron: String,
}

fn default_digest_cron() -> String {
    "0 8 * * *".to_string()
}

impl Default for MorningDigest {
    fn default() -> Self {
        Self {
            cron: default_digest_cron(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cooldowns {
    #[serde(default = "default_same_project_ms")]
    pub same_project_ms: u64,
    #[serde(default = "default_same_action_ms")]
    pub same_action_ms: u64,
}

fn default_same_project_ms() -> u64 {
    600_000
}
fn default_same_action_ms() -> u64 {
    300_000
}

impl Default for Cooldowns {
    fn default() -> Self {
        Self {
            same_project_ms: default_same_project_ms(),
            same_action_ms: default_same_action_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLimits {
    #[serde(default = "default_min_free_memory_mb")]
    pub min_free_memory_mb: u32,
    #[serde(default = "default_max_concurrent_thinks")]
    pub max_concurrent_thinks: u32,
}

fn default_min_free_memory_mb() -> u32 {
    2048
}
fn default_max_concurrent_thinks() -> u32 {
    1
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            min_free_memory_mb: default_min_free_memory_mb(),
            max_concurrent_thinks: default_max_concurrent_thinks(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsConfig {
    #[serde(default = "default_daily_budget")]
    pub daily_budget: u32,
    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,
    #[serde(default = "default_urgent_bypass_quiet")]
    pub urgent_bypass_quiet: bool,
}

fn default_daily_budget() -> u32 {
    20
}
fn default_batch_interval_ms() -> u64 {
    14_400_000
}
fn default_urgent_bypass_quiet() -> bool {
    true
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            daily_budget: default_daily_budget(),
            batch_interval_ms: default_batch_interval_ms(),
            urgent_bypass_quiet: default_urgent_bypass_quiet(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_think_interval_ms")]
    pub think_interval_ms: u64,
    #[serde(default = "default_max_prompt_length")]
    pub max_prompt_length: usize,
    #[serde(default)]
    pub autonomy_level: AutonomyLevel,
    #[serde(default)]
    pub protected_projects: Vec<String>,
    #[serde(default)]
    pub cooldowns: Cooldowns,
    #[serde(default)]
    pub resource_limits: ResourceLimits,
    #[serde(default = "default_max_session_duration_ms")]
    pub max_session_duration_ms: u64,
    #[serde(default = "default_max_error_retries")]
    pub max_error_retries: u32,
    #[serde(default = "default_staleness_days")]
    pub staleness_days: u32,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

fn default_model() -> String {
    "default".to_string()
}
fn default_think_interval_ms() -> u64 {
    300_000
}
fn default_max_prompt_length() -> usize {
    8_000
}
fn default_max_session_duration_ms() -> u64 {
    2_700_000
}
fn default_max_error_retries() -> u32 {
    3
}
fn default_staleness_days() -> u32 {
    3
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: default_model(),
            think_interval_ms: default_think_interval_ms(),
            max_prompt_length: default_max_prompt_length(),
            autonomy_level: AutonomyLevel::default(),
            protected_projects: Vec::new(),
            cooldowns: Cooldowns::default(),
            resource_limits: ResourceLimits::default(),
            max_session_duration_ms: default_max_session_duration_ms(),
            max_error_retries: default_max_error_retries(),
            staleness_days: default_staleness_days(),
            notifications: NotificationsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartBudget {
    #[serde(default = "default_max_per_hour")]
    pub max_per_hour: u32,
}

fn default_max_per_hour() -> u32 {
    2
}

impl Default for RestartBudget {
    fn default() -> Self {
        Self {
            max_per_hour: default_max_per_hour(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub services: Vec<ServiceDefinition>,
    #[serde(default = "default_consecutive_fails_before_alert")]
    pub consecutive_fails_before_alert: u32,
    #[serde(default)]
    pub restart_budget: RestartBudget,
    #[serde(default = "default_correlated_failure_threshold")]
    pub correlated_failure_threshold: u32,
}

fn default_consecutive_fails_before_alert() -> u32 {
    3
}
fn default_correlated_failure_threshold() -> u32 {
    3
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            services: Vec::new(),
            consecutive_fails_before_alert: default_consecutive_fails_before_alert(),
            restart_budget: RestartBudget::default(),
            correlated_failure_threshold: default_correlated_failure_threshold(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default = "default_collection_interval_scans")]
    pub collection_interval_scans: u32,
}

fn default_collection_interval_scans() -> u32 {
    5
}

impl RevenueConfig {
    pub fn collection_interval_scans_or_default(&self) -> u32 {
        if self.collection_interval_scans == 0 {
            default_collection_interval_scans()
        } else {
            self.collection_interval_scans
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_promotion_check_cron")]
    pub promotion_check_cron: String,
}

fn default_promotion_check_cron() -> String {
    "0 9 * * 1".to_string()
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            promotion_check_cron: default_promotion_check_cron(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemindersConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
