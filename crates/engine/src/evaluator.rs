// SPDX-License-Identifier: MIT

//! Session evaluator (C6, spec.md §4.4). Runs when a session ends or times
//! out, scores the work via the oracle, persists the evaluation, and routes
//! low-score sessions to the notification manager.

use crate::oracle::OracleOutcome;
use fleetd_adapters::session::SessionAdapter;
use fleetd_adapters::vcs::VcsAdapter;
use fleetd_core::{
    Evaluation, EvaluationRecommendation, NotificationTier, PromptStyle, SessionName, SessionRecord,
};
use fleetd_storage::Database;
use std::path::Path;

/// How evaluations notify the operator without pulling in the full
/// notification manager as a compile-time dependency (mirrors the
/// executor's `ExecutionTarget` seam).
#[async_trait::async_trait]
pub trait EvaluationNotifier: Send + Sync {
    async fn notify(&self, project: &str, tier: NotificationTier, text: String);
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluateError {
    #[error("session error: {0}")]
    Session(#[from] fleetd_adapters::session::SessionError),
    #[error("vcs error: {0}")]
    Vcs(#[from] fleetd_adapters::vcs::VcsError),
    #[error("storage error: {0}")]
    Storage(#[from] fleetd_storage::DbError),
    #[error("oracle returned no usable output: {0:?}")]
    OracleFailed(OracleOutcome),
    #[error("evaluation already recorded for this session")]
    AlreadyEvaluated,
}

/// Total evaluations required before pattern aggregation is trustworthy
/// (spec.md §4.4 step 5).
pub const PATTERN_THRESHOLD: i64 = 50;

pub struct SessionEvaluator<S: SessionAdapter, V: VcsAdapter, N: EvaluationNotifier> {
    sessions: S,
    vcs: V,
    notifier: N,
    db: Database,
}

impl<S: SessionAdapter, V: VcsAdapter, N: EvaluationNotifier> SessionEvaluator<S, V, N> {
    pub fn new(sessions: S, vcs: V, notifier: N, db: Database) -> Self {
        Self {
            sessions,
            vcs,
            notifier,
            db,
        }
    }

    /// Runs the full evaluation pipeline for an ended session, given the
    /// oracle's already-decoded JSON response (the caller owns the gateway
    /// call so this module stays decoupled from concurrency/retry policy).
    pub async fn evaluate(
        &self,
        record: &SessionRecord,
        working_dir: &Path,
        oracle_response: &OracleOutcome,
        stopped_at_ms: i64,
    ) -> Result<Evaluation, EvaluateError> {
        if self.already_evaluated(&record.project, record.started_at_ms).await? {
            return Err(EvaluateError::AlreadyEvaluated);
        }

        let session_name = SessionName::for_project(&record.project);
        let scrollback = self.sessions.capture_output(session_name.as_str(), 100).await?;
        let head_before = record.head_before.as_deref().unwrap_or("HEAD");
        let diff_stat = self.vcs.diff_stat(working_dir, head_before).await?;
        let commits = self.vcs.log_oneline(working_dir, head_before).await?;

        let decoded = match oracle_response {
            OracleOutcome::Decoded(value) => value,
            other => return Err(EvaluateError::OracleFailed(other.clone())),
        };

        let evaluation = decode_evaluation(
            decoded,
            record,
            stopped_at_ms,
            diff_stat.files_changed,
            diff_stat.insertions,
            diff_stat.deletions,
            &scrollback,
            &commits,
        );

        self.db
            .insert_evaluation(session_name.as_str(), &evaluation)
            .await?;

        if evaluation.score_clamped() <= 2 {
            let summary: String = evaluation.reasoning.chars().take(200).collect();
            self.notifier
                .notify(&record.project, NotificationTier::Action, summary)
                .await;
        }

        Ok(evaluation)
    }

    async fn already_evaluated(&self, project: &str, started_at_ms: i64) -> Result<bool, EvaluateError> {
        match self.db.latest_evaluation_started_at(project).await? {
            Some(last_started_at) => Ok(last_started_at >= started_at_ms),
            None => Ok(false),
        }
    }

    /// Pattern aggregation over recent evaluations for a project, gated on
    /// `PATTERN_THRESHOLD` total evaluations across the whole learner store
    /// (spec.md §4.4 step 5).
    pub fn pattern_summary(total_evaluations: i64, recent: &[(String, u8)]) -> String {
        if total_evaluations < PATTERN_THRESHOLD {
            return format!("insufficient data ({}/{})", total_evaluations, PATTERN_THRESHOLD);
        }
        let avg: f64 = if recent.is_empty() {
            0.0
        } else {
            recent.iter().map(|(_, score)| *score as f64).sum::<f64>() / recent.len() as f64
        };
        format!("average score {:.1}/5 over {} recent sessions", avg, recent.len())
    }
}

/// Fixed-keyword `prompt_style` classifier (spec.md §4.4 step 3).
pub fn classify_prompt_style(prompt: &str) -> PromptStyle {
    let lower = prompt.to_ascii_lowercase();
    if lower.contains("fix") || lower.contains("bug") {
        PromptStyle::Fix
    } else if lower.contains("implement") || lower.contains("add") || lower.contains("create") {
        PromptStyle::Implement
    } else if lower.contains("explore") || lower.contains("read") || lower.contains("understand") {
        PromptStyle::Explore
    } else if lower.contains("resume") || lower.contains("continue") {
        PromptStyle::Resume
    } else {
        PromptStyle::Custom
    }
}

#[allow(clippy::too_many_arguments)]
fn decode_evaluation(
    decoded: &serde_json::Value,
    record: &SessionRecord,
    stopped_at_ms: i64,
    files_changed: u32,
    lines_added: u32,
    lines_removed: u32,
    _scrollback: &str,
    _commits: &[String],
) -> Evaluation {
    let score = decoded.get("score").and_then(|v| v.as_u64()).unwrap_or(1) as u8;
    let reasoning = decoded
        .get("reasoning")
        .and_then(|v| v.as_str())
        .unwrap_or("no reasoning provided")
        .to_string();
    let accomplishments = string_array(decoded, "accomplishments");
    let failures = string_array(decoded, "failures");
    let recommendation = decoded
        .get("recommendation")
        .and_then(|v| v.as_str())
        .map(parse_recommendation)
        .unwrap_or(EvaluationRecommendation::Continue);

    Evaluation {
        session_name: record.session_name.as_str().to_string(),
        project: record.project.clone(),
        started_at_ms: record.started_at_ms,
        stopped_at_ms,
        files_changed,
        lines_added,
        lines_removed,
        score,
        recommendation,
        prompt_style: classify_prompt_style(&record.prompt),
        accomplishments,
        failures,
        reasoning,
    }
}

fn string_array(value: &serde_json::Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn parse_recommendation(raw: &str) -> EvaluationRecommendation {
    match raw.to_ascii_lowercase().as_str() {
        "retry" => EvaluationRecommendation::Retry,
        "escalate" => EvaluationRecommendation::Escalate,
        "complete" => EvaluationRecommendation::Complete,
        _ => EvaluationRecommendation::Continue,
    }
}

#[cfg(test)]
#[path = "evaluator_tests.rs"]
mod tests;
