// SPDX-License-Identifier: MIT

//! Decision types: the oracle's proposed recommendation plus the executor's
//! verdict (spec.md §3 "Decision").

use crate::autonomy::ActionKind;
use crate::notify_tier::NotificationTier;
use serde::{Deserialize, Serialize};

/// A single recommendation returned by the oracle gateway for one think
/// cycle. Oracle-facing fields are optional/defaulted since the oracle is
/// an untrusted external process whose JSON is schema-constrained but still
/// parsed defensively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub project: String,
    pub action: ActionKind,
    pub reason: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_tier: Option<NotificationTier>,
}

fn default_priority() -> u8 {
    3
}

impl Recommendation {
    pub fn priority_clamped(&self) -> u8 {
        self.priority.clamp(1, 5)
    }
}

/// The executor's verdict on a [`Recommendation`], appended to
/// `decisionHistory`/`executionHistory` (spec.md §3, cap 50 / cap 100
/// respectively, enforced by the storage layer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub recommendation: Recommendation,
    pub validated: bool,
    pub observe_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at_ms: i64,
}

impl Decision {
    pub fn accepted(recommendation: Recommendation, observe_only: bool, now_ms: i64) -> Self {
        Self {
            recommendation,
            validated: true,
            observe_only,
            rejection_reason: None,
            created_at_ms: now_ms,
        }
    }

    pub fn rejected(recommendation: Recommendation, reason: impl Into<String>, now_ms: i64) -> Self {
        Self {
            recommendation,
            validated: false,
            observe_only: false,
            rejection_reason: Some(reason.into()),
            created_at_ms: now_ms,
        }
    }
}

/// One entry in `executionHistory`: what was attempted, and what happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub action: ActionKind,
    pub project: String,
    pub result: ExecutionOutcome,
    pub timestamp_ms: i64,
    pub state_version: u64,
    pub autonomy_level: crate::autonomy::AutonomyLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Executed,
    Rejected { reason: String },
    ObserveOnly,
    Skipped { reason: String },
    Failed { error: String },
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
