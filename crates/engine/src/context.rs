// SPDX-License-Identifier: MIT

//! Context assembler (C3, spec.md §2 overview row). Produces a
//! [`PromptContext`] struct rather than a raw string so callers can assert
//! on structure; [`PromptContext::render`] is the single place the struct
//! becomes the text handed to the oracle.

use fleetd_core::{
    AutonomyLevel, ConversationEntry, HealthCheckResult, Project, Recommendation, RevenueSnapshot,
    SessionRecord, TrustLedger,
};
use std::fmt::Write as _;

/// A resource headroom snapshot checked by the executor's just-in-time
/// preconditions (spec.md §4.2 `start` precondition (c)).
#[derive(Debug, Clone, Copy)]
pub struct ResourceSnapshot {
    pub free_memory_mb: u64,
    pub live_session_count: u32,
}

/// A single project's most recent evaluation history, surfaced so the
/// oracle can avoid repeating a failing approach (spec.md §4.4 step 3).
#[derive(Debug, Clone)]
pub struct EvaluationLearning {
    pub project: String,
    pub recent: Vec<(String, u8)>,
}

#[derive(Debug, Clone)]
pub struct PromptContext {
    pub now_ms: i64,
    pub autonomy_level: AutonomyLevel,
    pub projects: Vec<Project>,
    pub sessions: Vec<SessionRecord>,
    pub resource: ResourceSnapshot,
    pub service_health: Vec<HealthCheckResult>,
    pub revenue: Vec<RevenueSnapshot>,
    pub trust: TrustLedger,
    pub conversation: Vec<ConversationEntry>,
    pub evaluation_learnings: Vec<EvaluationLearning>,
    pub recent_decisions: Vec<Recommendation>,
}

impl PromptContext {
    /// Render to the text handed to the oracle gateway. Sectioned so each
    /// piece of world state is easy to spot (and to drop) in a transcript.
    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "# Orchestrator snapshot");
        let _ = writeln!(out, "now_ms={} autonomy={}", self.now_ms, self.autonomy_level);
        let _ = writeln!(
            out,
            "resource: free_memory_mb={} live_sessions={}",
            self.resource.free_memory_mb, self.resource.live_session_count
        );

        let _ = writeln!(out, "\n## Projects");
        for project in &self.projects {
            let snap = &project.snapshot;
            let _ = writeln!(
                out,
                "- {}: phase={:?} needs_attention={} blockers={:?}",
                project.name, snap.phase, snap.needs_attention, snap.blockers
            );
        }

        let _ = writeln!(out, "\n## Live sessions");
        if self.sessions.is_empty() {
            let _ = writeln!(out, "(none)");
        }
        for session in &self.sessions {
            let duration_ms = session.duration_ms(self.now_ms);
            let _ = writeln!(
                out,
                "- {} ({}): running {}ms, prompt={:?}",
                session.session_name.as_str(),
                session.project,
                duration_ms,
                session.prompt
            );
        }

        let _ = writeln!(out, "\n## Service health");
        for result in &self.service_health {
            let _ = writeln!(
                out,
                "- {}: {:?} fails={} error={:?}",
                result.dependency, result.status, result.consecutive_fails, result.error
            );
        }

        let _ = writeln!(out, "\n## Revenue");
        for snapshot in &self.revenue {
            let _ = writeln!(out, "- {}: {:?}", snapshot.source, snapshot.reading);
        }

        let _ = writeln!(out, "\n## Trust");
        for (level, summary) in &self.trust.by_level {
            let _ = writeln!(
                out,
                "- {}: sessions={} avg_score={:?} days_at_level={}",
                level,
                summary.sessions_launched,
                summary.average_score(),
                summary.days_at_level
            );
        }

        let _ = writeln!(out, "\n## Recent conversation");
        for entry in &self.conversation {
            let _ = writeln!(out, "- {:?}: {}", entry.role, entry.text);
        }

        let _ = writeln!(out, "\n## Evaluation learnings");
        for learning in &self.evaluation_learnings {
            if learning.recent.is_empty() {
                let _ = writeln!(out, "- {}: (no prior evaluations)", learning.project);
            } else {
                let _ = writeln!(out, "- {}: {:?}", learning.project, learning.recent);
            }
        }

        let _ = writeln!(out, "\n## Recent decisions");
        for rec in &self.recent_decisions {
            let _ = writeln!(out, "- {} {}: {}", rec.project, rec.action, rec.reason);
        }

        out
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
