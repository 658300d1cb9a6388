// SPDX-License-Identifier: MIT

//! Autonomy level: a totally ordered policy label controlling which actions
//! the decision executor may perform outright vs. only recommend (spec.md
//! §3 "Autonomy level", §4.2 autonomy matrix).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyLevel {
    Observe,
    Cautious,
    Moderate,
    Full,
}

impl AutonomyLevel {
    /// Fallback level when config is absent or unparsable.
    pub const DEFAULT: AutonomyLevel = AutonomyLevel::Observe;

    pub fn as_str(&self) -> &'static str {
        match self {
            AutonomyLevel::Observe => "observe",
            AutonomyLevel::Cautious => "cautious",
            AutonomyLevel::Moderate => "moderate",
            AutonomyLevel::Full => "full",
        }
    }

    /// `observe -> cautious` promotion is never automated (spec.md §3); this
    /// returns the next level purely for display in promotion
    /// recommendations, never for self-application.
    pub fn next(&self) -> Option<AutonomyLevel> {
        match self {
            AutonomyLevel::Observe => Some(AutonomyLevel::Cautious),
            AutonomyLevel::Cautious => Some(AutonomyLevel::Moderate),
            AutonomyLevel::Moderate => Some(AutonomyLevel::Full),
            AutonomyLevel::Full => None,
        }
    }

    pub fn at_least(&self, other: AutonomyLevel) -> bool {
        *self >= other
    }
}

impl Default for AutonomyLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for AutonomyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AutonomyLevel {
    type Err = ParseAutonomyLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "observe" => Ok(AutonomyLevel::Observe),
            "cautious" => Ok(AutonomyLevel::Cautious),
            "moderate" => Ok(AutonomyLevel::Moderate),
            "full" => Ok(AutonomyLevel::Full),
            other => Err(ParseAutonomyLevelError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown autonomy level: {0}")]
pub struct ParseAutonomyLevelError(String);

/// The action kinds the decision executor recognizes (spec.md §3 "Decision").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Start,
    Stop,
    Restart,
    Notify,
    Skip,
}

impl ActionKind {
    pub const ALLOWLIST: [ActionKind; 5] = [
        ActionKind::Start,
        ActionKind::Stop,
        ActionKind::Restart,
        ActionKind::Notify,
        ActionKind::Skip,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Start => "start",
            ActionKind::Stop => "stop",
            ActionKind::Restart => "restart",
            ActionKind::Notify => "notify",
            ActionKind::Skip => "skip",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ParseActionKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(ActionKind::Start),
            "stop" => Ok(ActionKind::Stop),
            "restart" => Ok(ActionKind::Restart),
            "notify" => Ok(ActionKind::Notify),
            "skip" => Ok(ActionKind::Skip),
            other => Err(ParseActionKindError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown action kind: {0}")]
pub struct ParseActionKindError(String);

/// What the autonomy matrix says to do with a given (level, action) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutonomyVerdict {
    /// Execute the action directly.
    Execute,
    /// Downgrade to a notification to the operator; never executed.
    SmsOnly,
    /// No side effect; logged only.
    Log,
}

/// The autonomy matrix from spec.md §4.2. `skip` is always `Log` regardless
/// of level; `start`/`restart`/`notify` execute from `cautious` upward;
/// `stop` requires `moderate` or above.
pub fn autonomy_matrix(level: AutonomyLevel, action: ActionKind) -> AutonomyVerdict {
    use ActionKind::*;
    use AutonomyLevel::*;
    use AutonomyVerdict::*;

    if action == Skip {
        return Log;
    }

    match (level, action) {
        (Observe, _) => SmsOnly,
        (Cautious, Stop) => SmsOnly,
        (Cautious, _) => Execute,
        (Moderate, _) | (Full, _) => Execute,
    }
}

#[cfg(test)]
#[path = "autonomy_tests.rs"]
mod tests;
