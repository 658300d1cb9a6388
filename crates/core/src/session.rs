// SPDX-License-Identifier: MIT

//! Agent session types (spec.md §3 "Session").
//!
//! A session identifies an interactive agent process inside a detached
//! multiplexer window. The window name itself is the identity: `orch-<project>`.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a session, formatted `orch-<sanitized-project>`.
    pub struct SessionName;
}

impl SessionName {
    /// Build the canonical window name for a project.
    pub fn for_project(project: &str) -> Self {
        Self::new(format!("orch-{}", sanitize(project)))
    }

    pub fn project_part(&self) -> Option<&str> {
        self.0.strip_prefix("orch-")
    }
}

/// Sanitize a project name into a multiplexer-window-safe token: lowercase
/// ASCII alphanumerics and hyphens, everything else collapsed to `-`.
fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

/// A live or recently-live agent session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub project: String,
    pub session_name: SessionName,
    /// Unix millis when the session was started.
    pub started_at_ms: i64,
    /// VCS head SHA captured at start, used to compute diff stats on stop.
    pub head_before: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub last_output: Option<String>,
    #[serde(default)]
    pub ended: bool,
}

impl SessionRecord {
    pub fn new(project: impl Into<String>, prompt: impl Into<String>, started_at_ms: i64) -> Self {
        let project = project.into();
        let session_name = SessionName::for_project(&project);
        Self {
            project,
            session_name,
            started_at_ms,
            head_before: None,
            prompt: prompt.into(),
            last_output: None,
            ended: false,
        }
    }

    pub fn duration_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.started_at_ms).max(0)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
