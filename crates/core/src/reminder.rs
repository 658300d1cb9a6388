// SPDX-License-Identifier: MIT

//! Reminder domain type (spec.md §3 "Reminder", §4.8 reminder engine).

use serde::{Deserialize, Serialize};

crate::define_id! {
    pub struct ReminderId;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub text: String,
    pub fire_at_ms: i64,
    pub created_at_ms: i64,
    pub fired: bool,
}

impl Reminder {
    pub fn new(id: ReminderId, text: impl Into<String>, fire_at_ms: i64, created_at_ms: i64) -> Self {
        Self {
            id,
            text: text.into(),
            fire_at_ms,
            created_at_ms,
            fired: false,
        }
    }

    /// Past timestamps are accepted at insert time and fire on the next
    /// `checkAndFire` tick (spec.md §4.8).
    pub fn is_due(&self, now_ms: i64) -> bool {
        !self.fired && self.fire_at_ms <= now_ms
    }

    pub fn mark_fired(&mut self) {
        self.fired = true;
    }

    pub fn matches_query(&self, query: &str) -> bool {
        fuzzy_contains(&self.text, query)
    }
}

/// Loose substring/Levenshtein-adjacent match used by `cancelByText`: an
/// exact case-insensitive substring hit, or a short edit distance against
/// the whole reminder text for near-misses like typos.
fn fuzzy_contains(haystack: &str, query: &str) -> bool {
    let haystack_lower = haystack.to_ascii_lowercase();
    let query_lower = query.to_ascii_lowercase();
    if haystack_lower.contains(&query_lower) {
        return true;
    }
    let distance = levenshtein::levenshtein(&haystack_lower, &query_lower);
    let threshold = (query_lower.len() / 4).max(1);
    distance <= threshold
}

#[cfg(test)]
#[path = "reminder_tests.rs"]
mod tests;
