// SPDX-License-Identifier: MIT

//! Trust summary: per-autonomy-level track record used to decide whether a
//! promotion recommendation is warranted (spec.md §3 "Trust summary", §4.9).

use crate::autonomy::AutonomyLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustSummary {
    pub sessions_launched: u32,
    pub score_sum: u64,
    pub error_recovery_count: u32,
    pub false_alert_count: u32,
    pub days_at_level: u32,
}

impl TrustSummary {
    pub fn average_score(&self) -> Option<f64> {
        if self.sessions_launched == 0 {
            None
        } else {
            Some(self.score_sum as f64 / self.sessions_launched as f64)
        }
    }

    pub fn record_session(&mut self, score: u8) {
        self.sessions_launched += 1;
        self.score_sum += score as u64;
    }
}

/// Trust summaries keyed by autonomy level, persisted as the `trust_summary`
/// table (spec.md §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustLedger {
    #[serde(flatten)]
    pub by_level: BTreeMap<AutonomyLevel, TrustSummary>,
}

impl TrustLedger {
    pub fn entry(&mut self, level: AutonomyLevel) -> &mut TrustSummary {
        self.by_level.entry(level).or_default()
    }

    pub fn get(&self, level: AutonomyLevel) -> Option<&TrustSummary> {
        self.by_level.get(&level)
    }
}

#[cfg(test)]
#[path = "trust_tests.rs"]
mod tests;
