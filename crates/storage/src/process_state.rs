// SPDX-License-Identifier: MIT

//! The process-wide JSON state file (spec.md §6 "Process-wide JSON state
//! file"). A single-writer document mutated in place, not an event log:
//! callers go through [`ProcessStateStore::with_state`] so every mutation is
//! paired with a version bump and a durable write.

use chrono::{DateTime, Utc};
use fleetd_core::{AutonomyLevel, StateVersion};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DECISION_HISTORY_CAP: usize = 50;
const EXECUTION_HISTORY_CAP: usize = 100;
const EVALUATION_HISTORY_CAP: usize = 100;
const HEALTH_RESTART_HISTORY_CAP: usize = 100;

#[derive(Debug, Error)]
pub enum ProcessStateError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Top-level document, one-to-one with the JSON keys in spec.md §6.
/// Absent keys default rather than failing the load: there is no schema
/// versioning, only additive fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessState {
    #[serde(default)]
    pub last_row_id: u64,
    #[serde(default)]
    pub last_scan: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_digest: Option<DateTime<Utc>>,
    #[serde(default)]
    pub alert_history: Vec<serde_json::Value>,
    #[serde(default)]
    pub ai_decision_history: Vec<serde_json::Value>,
    #[serde(default)]
    pub execution_history: Vec<serde_json::Value>,
    #[serde(default)]
    pub evaluation_history: Vec<serde_json::Value>,
    #[serde(default)]
    pub error_retry_counts: HashMap<String, u32>,
    #[serde(default)]
    pub runtime_autonomy_level: AutonomyLevel,
    #[serde(default)]
    pub state_version: StateVersion,
    #[serde(default)]
    pub health_restart_history: Vec<serde_json::Value>,
}

impl ProcessState {
    pub fn push_decision(&mut self, entry: serde_json::Value) {
        push_capped(&mut self.ai_decision_history, entry, DECISION_HISTORY_CAP);
    }

    pub fn push_execution(&mut self, entry: serde_json::Value) {
        push_capped(&mut self.execution_history, entry, EXECUTION_HISTORY_CAP);
    }

    pub fn push_evaluation(&mut self, entry: serde_json::Value) {
        push_capped(&mut self.evaluation_history, entry, EVALUATION_HISTORY_CAP);
    }

    pub fn push_health_restart(&mut self, entry: serde_json::Value) {
        push_capped(
            &mut self.health_restart_history,
            entry,
            HEALTH_RESTART_HISTORY_CAP,
        );
    }
}

fn push_capped(history: &mut Vec<serde_json::Value>, entry: serde_json::Value, cap: usize) {
    history.push(entry);
    if history.len() > cap {
        let excess = history.len() - cap;
        history.drain(0..excess);
    }
}

/// Abstracts the filesystem writes behind checkpointing so tests can inject
/// failures without touching a real disk.
pub trait StateWriter: Send + Sync {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), ProcessStateError>;
    fn fsync_file(&self, path: &Path) -> Result<(), ProcessStateError>;
    fn rename(&self, from: &Path, to: &Path) -> Result<(), ProcessStateError>;
}

#[derive(Clone, Default)]
pub struct FsStateWriter;

impl StateWriter for FsStateWriter {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), ProcessStateError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(data)?;
        Ok(())
    }

    fn fsync_file(&self, path: &Path) -> Result<(), ProcessStateError> {
        File::open(path)?.sync_all()?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), ProcessStateError> {
        std::fs::rename(from, to)?;
        Ok(())
    }
}

/// Single-owner handle to the process state file: every read or mutation
/// goes through [`ProcessStateStore::with_state`], which reloads nothing (the
/// in-memory copy is authoritative) and persists atomically after the
/// closure runs.
pub struct ProcessStateStore<W: StateWriter = FsStateWriter> {
    path: PathBuf,
    writer: W,
    state: ProcessState,
}

impl ProcessStateStore<FsStateWriter> {
    /// Load from `path`, or start from a default document if it doesn't
    /// exist yet (first run).
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ProcessStateError> {
        Self::load_with_writer(FsStateWriter, path)
    }
}

impl<W: StateWriter> ProcessStateStore<W> {
    pub fn load_with_writer(writer: W, path: impl Into<PathBuf>) -> Result<Self, ProcessStateError> {
        let path = path.into();
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            ProcessState::default()
        };
        Ok(Self { path, writer, state })
    }

    pub fn state(&self) -> &ProcessState {
        &self.state
    }

    /// Run `f` against the live state, bump the state version, and persist
    /// atomically (write-temp, fsync, rename) before returning.
    pub fn with_state<R>(
        &mut self,
        f: impl FnOnce(&mut ProcessState) -> R,
    ) -> Result<R, ProcessStateError> {
        let result = f(&mut self.state);
        self.state.state_version.bump();
        self.persist()?;
        Ok(result)
    }

    fn persist(&self) -> Result<(), ProcessStateError> {
        let tmp_path = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&self.state)?;
        self.writer.write_tmp(&tmp_path, &bytes)?;
        self.writer.fsync_file(&tmp_path)?;
        self.writer.rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "process_state_tests.rs"]
mod tests;
