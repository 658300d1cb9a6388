// SPDX-License-Identifier: MIT

//! VCS adapter: wraps the `git` CLI for diff stats and commit logs feeding
//! the session evaluator.

use crate::subprocess::{run_with_timeout, GIT_TIMEOUT};
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("git command failed: {0}")]
    CommandFailed(String),
}

/// Summary of a working tree's divergence from a base commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStat {
    pub files_changed: u32,
    pub insertions: u32,
    pub deletions: u32,
}

#[async_trait]
pub trait VcsAdapter: Send + Sync + 'static {
    /// Current HEAD commit SHA.
    async fn head(&self, repo: &Path) -> Result<String, VcsError>;

    /// `diff --stat` totals against `since`.
    async fn diff_stat(&self, repo: &Path, since: &str) -> Result<DiffStat, VcsError>;

    /// `log --oneline` subjects since `since`, oldest first.
    async fn log_oneline(&self, repo: &Path, since: &str) -> Result<Vec<String>, VcsError>;
}

#[derive(Clone, Copy, Default)]
pub struct GitAdapter;

impl GitAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VcsAdapter for GitAdapter {
    async fn head(&self, repo: &Path) -> Result<String, VcsError> {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(repo).args(["rev-parse", "HEAD"]);
        let output = run_with_timeout(cmd, GIT_TIMEOUT, "git rev-parse")
            .await
            .map_err(VcsError::CommandFailed)?;

        if !output.status.success() {
            return Err(VcsError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn diff_stat(&self, repo: &Path, since: &str) -> Result<DiffStat, VcsError> {
        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(repo)
            .args(["diff", "--shortstat", since]);
        let output = run_with_timeout(cmd, GIT_TIMEOUT, "git diff --shortstat")
            .await
            .map_err(VcsError::CommandFailed)?;

        if !output.status.success() {
            return Err(VcsError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(parse_shortstat(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn log_oneline(&self, repo: &Path, since: &str) -> Result<Vec<String>, VcsError> {
        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(repo)
            .args(["log", "--oneline", &format!("{since}..HEAD")]);
        let output = run_with_timeout(cmd, GIT_TIMEOUT, "git log --oneline")
            .await
            .map_err(VcsError::CommandFailed)?;

        if !output.status.success() {
            return Err(VcsError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .rev()
            .map(|line| line.to_string())
            .collect())
    }
}

/// Parses a line like " 3 files changed, 10 insertions(+), 4 deletions(-)".
fn parse_shortstat(text: &str) -> DiffStat {
    let mut stat = DiffStat::default();
    for part in text.split(',') {
        let part = part.trim();
        let Some((count, _)) = part.split_once(' ') else {
            continue;
        };
        let Ok(n) = count.parse::<u32>() else {
            continue;
        };
        if part.contains("file") {
            stat.files_changed = n;
        } else if part.contains("insertion") {
            stat.insertions = n;
        } else if part.contains("deletion") {
            stat.deletions = n;
        }
    }
    stat
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeVcsAdapter;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeState {
        heads: HashMap<std::path::PathBuf, String>,
        diff_stats: HashMap<std::path::PathBuf, DiffStat>,
        logs: HashMap<std::path::PathBuf, Vec<String>>,
    }

    #[derive(Clone, Default)]
    pub struct FakeVcsAdapter {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakeVcsAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_head(&self, repo: &Path, sha: impl Into<String>) {
            self.inner
                .lock()
                .heads
                .insert(repo.to_path_buf(), sha.into());
        }

        pub fn set_diff_stat(&self, repo: &Path, stat: DiffStat) {
            self.inner
                .lock()
                .diff_stats
                .insert(repo.to_path_buf(), stat);
        }

        pub fn set_log(&self, repo: &Path, lines: Vec<String>) {
            self.inner.lock().logs.insert(repo.to_path_buf(), lines);
        }
    }

    #[async_trait]
    impl VcsAdapter for FakeVcsAdapter {
        async fn head(&self, repo: &Path) -> Result<String, VcsError> {
            Ok(self
                .inner
                .lock()
                .heads
                .get(repo)
                .cloned()
                .unwrap_or_default())
        }

        async fn diff_stat(&self, repo: &Path, _since: &str) -> Result<DiffStat, VcsError> {
            Ok(self
                .inner
                .lock()
                .diff_stats
                .get(repo)
                .copied()
                .unwrap_or_default())
        }

        async fn log_oneline(&self, repo: &Path, _since: &str) -> Result<Vec<String>, VcsError> {
            Ok(self.inner.lock().logs.get(repo).cloned().unwrap_or_default())
        }
    }
}

#[cfg(test)]
#[path = "vcs_tests.rs"]
mod tests;
