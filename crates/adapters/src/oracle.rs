// SPDX-License-Identifier: MIT

//! Oracle subprocess runner: the raw boundary that shells out to the
//! reasoning CLI. Concurrency gating, circuit breaking, and response
//! parsing are the engine's job; this module only runs the subprocess and
//! hands back its raw stdout/exit status.

use crate::subprocess::run_with_timeout;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// One of {small, default, large}, per the oracle gateway contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleModel {
    Small,
    Default,
    Large,
}

impl OracleModel {
    fn as_cli_flag(self) -> &'static str {
        match self {
            OracleModel::Small => "small",
            OracleModel::Default => "default",
            OracleModel::Large => "large",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Parameters for a single oracle invocation, per spec.md's gateway options.
#[derive(Debug, Clone)]
pub struct OracleInvocation {
    pub prompt: String,
    pub max_turns: u32,
    pub model: OracleModel,
    pub output_format: OutputFormat,
    pub json_schema: Option<String>,
    pub allowed_tools: Vec<String>,
    pub timeout: Duration,
    /// When set, the prompt is piped on stdin instead of passed as an
    /// argument, for prompts exceeding a platform argument-length budget.
    pub via_stdin: bool,
}

impl OracleInvocation {
    pub fn decision(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_turns: 1,
            model: OracleModel::Default,
            output_format: OutputFormat::Json,
            json_schema: None,
            allowed_tools: Vec::new(),
            timeout: Duration::from_secs(30),
            via_stdin: false,
        }
    }
}

/// Raw result of a subprocess invocation: success with stdout, or one of
/// the gateway's named failure modes.
#[derive(Debug, Clone)]
pub enum OracleRawResult {
    Completed { stdout: String, exit_code: i32 },
    TimedOut,
    Unavailable { reason: String },
}

#[derive(Debug, Error)]
pub enum OracleRunnerError {
    #[error("oracle binary unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait OracleRunner: Send + Sync + 'static {
    async fn run(&self, invocation: &OracleInvocation) -> OracleRawResult;
}

/// Shells out to the real oracle CLI binary.
pub struct CliOracleRunner {
    binary: String,
}

impl CliOracleRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl OracleRunner for CliOracleRunner {
    async fn run(&self, invocation: &OracleInvocation) -> OracleRawResult {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--max-turns").arg(invocation.max_turns.to_string());
        cmd.arg("--model").arg(invocation.model.as_cli_flag());
        cmd.arg("--output-format").arg(match invocation.output_format {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        });
        if let Some(schema) = &invocation.json_schema {
            cmd.arg("--json-schema").arg(schema);
        }
        for tool in &invocation.allowed_tools {
            cmd.arg("--allowed-tool").arg(tool);
        }

        if invocation.via_stdin {
            cmd.stdin(std::process::Stdio::piped());
        } else {
            cmd.arg("--prompt").arg(&invocation.prompt);
        }
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());

        if invocation.via_stdin {
            let prompt = invocation.prompt.clone();
            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => return OracleRawResult::Unavailable { reason: e.to_string() },
            };
            if let Some(mut stdin) = child.stdin.take() {
                if stdin.write_all(prompt.as_bytes()).await.is_err() {
                    return OracleRawResult::Unavailable {
                        reason: "failed writing prompt to stdin".to_string(),
                    };
                }
            }
            match tokio::time::timeout(invocation.timeout, child.wait_with_output()).await {
                Ok(Ok(output)) => OracleRawResult::Completed {
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    exit_code: output.status.code().unwrap_or(-1),
                },
                Ok(Err(e)) => OracleRawResult::Unavailable { reason: e.to_string() },
                Err(_) => OracleRawResult::TimedOut,
            }
        } else {
            match run_with_timeout(cmd, invocation.timeout, "oracle invocation").await {
                Ok(output) => OracleRawResult::Completed {
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    exit_code: output.status.code().unwrap_or(-1),
                },
                Err(msg) if msg.contains("timed out") => OracleRawResult::TimedOut,
                Err(msg) => OracleRawResult::Unavailable { reason: msg },
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeOracleRunner;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    pub struct FakeOracleRunner {
        queued: Arc<Mutex<VecDeque<OracleRawResult>>>,
        invocations: Arc<Mutex<Vec<OracleInvocation>>>,
    }

    impl FakeOracleRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_result(&self, result: OracleRawResult) {
            self.queued.lock().push_back(result);
        }

        pub fn invocations(&self) -> Vec<OracleInvocation> {
            self.invocations.lock().clone()
        }
    }

    #[async_trait]
    impl OracleRunner for FakeOracleRunner {
        async fn run(&self, invocation: &OracleInvocation) -> OracleRawResult {
            self.invocations.lock().push(invocation.clone());
            self.queued.lock().pop_front().unwrap_or(OracleRawResult::Unavailable {
                reason: "no fake result queued".to_string(),
            })
        }
    }
}

#[cfg(test)]
#[path = "oracle_tests.rs"]
mod tests;
