// SPDX-License-Identifier: MIT

//! Session evaluation types (spec.md §3 "Evaluation", §4.6 session evaluator).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the session evaluator recommends doing with a just-finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationRecommendation {
    Continue,
    Retry,
    Escalate,
    Complete,
}

impl EvaluationRecommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationRecommendation::Continue => "continue",
            EvaluationRecommendation::Retry => "retry",
            EvaluationRecommendation::Escalate => "escalate",
            EvaluationRecommendation::Complete => "complete",
        }
    }
}

impl fmt::Display for EvaluationRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EvaluationRecommendation {
    type Err = ParseEvaluationRecommendationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "retry" => Ok(Self::Retry),
            "escalate" => Ok(Self::Escalate),
            "complete" => Ok(Self::Complete),
            other => Err(ParseEvaluationRecommendationError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown evaluation recommendation: {0}")]
pub struct ParseEvaluationRecommendationError(String);

/// The style of prompt used to (re)start a session, recorded so the next
/// think cycle can vary its approach instead of repeating a failing prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    Resume,
    Fix,
    Implement,
    Explore,
    Custom,
}

impl PromptStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptStyle::Resume => "resume",
            PromptStyle::Fix => "fix",
            PromptStyle::Implement => "implement",
            PromptStyle::Explore => "explore",
            PromptStyle::Custom => "custom",
        }
    }
}

impl fmt::Display for PromptStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The outcome recorded for a stopped session (spec.md §3 "Evaluation").
/// Capped at 100 entries in `evaluationHistory` by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub session_name: String,
    pub project: String,
    pub started_at_ms: i64,
    pub stopped_at_ms: i64,
    pub files_changed: u32,
    pub lines_added: u32,
    pub lines_removed: u32,
    /// 1 (no progress) through 5 (task complete).
    pub score: u8,
    pub recommendation: EvaluationRecommendation,
    pub prompt_style: PromptStyle,
    pub accomplishments: Vec<String>,
    pub failures: Vec<String>,
    pub reasoning: String,
}

impl Evaluation {
    pub fn duration_minutes(&self) -> f64 {
        let ms = (self.stopped_at_ms - self.started_at_ms).max(0);
        ms as f64 / 60_000.0
    }

    pub fn score_clamped(&self) -> u8 {
        self.score.clamp(1, 5)
    }

    pub fn made_no_progress(&self) -> bool {
        self.files_changed == 0 && self.lines_added == 0 && self.lines_removed == 0
    }
}

#[cfg(test)]
#[path = "evaluation_tests.rs"]
mod tests;
