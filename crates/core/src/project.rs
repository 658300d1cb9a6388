// SPDX-License-Identifier: MIT

//! Project identity and scan-derived snapshot (spec.md §3 "Project").

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A project the orchestrator supervises: a working directory enumerated at
/// boot from config and refreshed every scan tick. Projects are never
/// deleted at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique name (a relative path under `projectsDir`).
    pub name: String,
    pub working_dir: PathBuf,
    #[serde(default)]
    pub snapshot: ProjectSnapshot,
}

impl Project {
    pub fn new(name: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            working_dir: working_dir.into(),
            snapshot: ProjectSnapshot::default(),
        }
    }
}

/// The mutable, scan-refreshed slice of project state: phase/progress parsed
/// from the project's state-file markdown, plus attention flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectSnapshot {
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub progress: Option<String>,
    #[serde(default)]
    pub needs_attention: bool,
    #[serde(default)]
    pub attention_reason: Option<String>,
    #[serde(default)]
    pub blockers: Vec<String>,
    #[serde(default)]
    pub pending_overrides: Vec<String>,
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
