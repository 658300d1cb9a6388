// SPDX-License-Identifier: MIT

//! Short-term conversation memory (spec.md §3 "Conversation entry", §4.9).

use crate::redact::redact;
use serde::{Deserialize, Serialize};

pub const TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;
pub const MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub text: String,
    pub timestamp_ms: i64,
}

impl ConversationEntry {
    /// Construct an entry with credential-looking substrings redacted
    /// before it ever reaches storage (spec.md §8 invariant 13).
    pub fn new(role: Role, text: impl AsRef<str>, timestamp_ms: i64) -> Self {
        Self {
            role,
            text: redact(text.as_ref()),
            timestamp_ms,
        }
    }
}

/// Prune entries older than [`TTL_MS`], then trim to [`MAX_ENTRIES`] keeping
/// the most recent. `entries` is assumed ordered oldest-first.
pub fn prune(entries: &mut Vec<ConversationEntry>, now_ms: i64) {
    entries.retain(|entry| now_ms - entry.timestamp_ms < TTL_MS);
    if entries.len() > MAX_ENTRIES {
        let excess = entries.len() - MAX_ENTRIES;
        entries.drain(0..excess);
    }
}

#[cfg(test)]
#[path = "conversation_tests.rs"]
mod tests;
