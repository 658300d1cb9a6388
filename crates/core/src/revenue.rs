// SPDX-License-Identifier: MIT

//! Revenue snapshots: periodic samples of external revenue sources, surfaced
//! in status summaries (spec.md §3 "Revenue snapshot", §4.8).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueSnapshot {
    pub source: String,
    pub timestamp_ms: i64,
    pub reading: RevenueReading,
}

/// A source reads either a concrete value, a known-unreachable failure, or
/// an explicit "unknown" when the source has never reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueReading {
    Value { raw_cents: i64 },
    Unreachable { error: String },
    Unknown,
}

impl RevenueSnapshot {
    pub fn value(source: impl Into<String>, raw_cents: i64, timestamp_ms: i64) -> Self {
        Self {
            source: source.into(),
            timestamp_ms,
            reading: RevenueReading::Value { raw_cents },
        }
    }

    pub fn unreachable(source: impl Into<String>, error: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            source: source.into(),
            timestamp_ms,
            reading: RevenueReading::Unreachable { error: error.into() },
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self.reading, RevenueReading::Value { .. })
    }
}

#[cfg(test)]
#[path = "revenue_tests.rs"]
mod tests;
