// SPDX-License-Identifier: MIT

//! Notification tiers (spec.md §3 "Decision", §4.7).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NotificationTier {
    /// Send immediately; bypasses quiet hours and the daily budget.
    Urgent = 1,
    /// Send immediately outside quiet hours; queued during quiet hours;
    /// counts against budget; downgrades to Summary when budget is exhausted.
    Action = 2,
    /// Appended to the batch queue, flushed on interval or piggy-backed.
    Summary = 3,
    /// Logged only, never transmitted.
    Debug = 4,
}

impl NotificationTier {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Urgent),
            2 => Some(Self::Action),
            3 => Some(Self::Summary),
            4 => Some(Self::Debug),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NotificationTier::Urgent => "URGENT",
            NotificationTier::Action => "ACTION",
            NotificationTier::Summary => "SUMMARY",
            NotificationTier::Debug => "DEBUG",
        }
    }
}

impl Default for NotificationTier {
    fn default() -> Self {
        NotificationTier::Summary
    }
}

#[cfg(test)]
#[path = "notify_tier_tests.rs"]
mod tests;
