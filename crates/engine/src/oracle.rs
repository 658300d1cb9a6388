// SPDX-License-Identifier: MIT

//! Oracle gateway (C2) and per-provider circuit breaker (C11), spec.md
//! §4.1/§4.6. The gateway is the only path through which the daemon calls
//! the reasoning subprocess: it gates concurrency with a semaphore, checks
//! circuit breakers for the tools an invocation requests, then hands the
//! raw subprocess result to a parser with a three-step fallback.

use fleetd_adapters::oracle::{OracleInvocation, OracleRawResult, OracleRunner};
use fleetd_core::{CircuitBreaker, Clock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Decoded oracle response, or a typed failure the caller treats as a
/// no-op cycle. The raw text is always retained for audit.
#[derive(Debug, Clone)]
pub enum OracleOutcome {
    Decoded(serde_json::Value),
    ParseFailed { raw: String },
    Timeout,
    Unavailable,
    Runtime { raw: String, exit_code: i32 },
}

/// Per-named-dependency breaker state, guarding the external tools an
/// oracle invocation may be granted (spec.md §4.6). Unknown providers pass
/// through with no breaker, forward-compatible with new tool names.
#[derive(Default)]
pub struct CircuitBreakerRegistry {
    breakers: Mutex<HashMap<String, CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any of `providers` currently has an open breaker.
    pub fn any_open(&self, providers: &[String], now_ms: i64) -> bool {
        let mut breakers = self.breakers.lock();
        providers
            .iter()
            .any(|p| breakers.entry(p.clone()).or_default().is_open(now_ms))
    }

    pub fn record_success(&self, provider: &str) {
        self.breakers
            .lock()
            .entry(provider.to_string())
            .or_default()
            .record_success();
    }

    pub fn record_failure(&self, provider: &str, now_ms: i64) {
        self.breakers
            .lock()
            .entry(provider.to_string())
            .or_default()
            .record_failure(now_ms);
    }
}

/// The only path through which the control loop calls the reasoning
/// subprocess.
pub struct OracleGateway<R: OracleRunner, C: Clock> {
    runner: R,
    clock: C,
    semaphore: Arc<Semaphore>,
    breakers: CircuitBreakerRegistry,
}

impl<R: OracleRunner, C: Clock> OracleGateway<R, C> {
    /// `max_concurrent`: at most this many subprocesses run simultaneously;
    /// further calls queue FIFO (spec.md §4.1 "Global concurrency semaphore").
    pub fn new(runner: R, clock: C, max_concurrent: usize) -> Self {
        Self {
            runner,
            clock,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            breakers: CircuitBreakerRegistry::new(),
        }
    }

    pub fn breakers(&self) -> &CircuitBreakerRegistry {
        &self.breakers
    }

    /// Runs one oracle invocation. Checked breakers are "before acquiring a
    /// semaphore slot, so open breakers do not waste oracle concurrency."
    pub async fn query(&self, invocation: OracleInvocation) -> OracleOutcome {
        let now_ms = self.clock.now_ms();
        if self.breakers.any_open(&invocation.allowed_tools, now_ms) {
            tracing::warn!(tools = ?invocation.allowed_tools, "oracle call rejected: circuit open");
            return OracleOutcome::Unavailable;
        }

        let _permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return OracleOutcome::Unavailable,
        };

        match self.runner.run(&invocation).await {
            OracleRawResult::Completed { stdout, exit_code } if exit_code == 0 => {
                parse_response(&stdout)
            }
            OracleRawResult::Completed { stdout, exit_code } => {
                tracing::warn!(exit_code, "oracle exited non-zero");
                OracleOutcome::Runtime {
                    raw: stdout,
                    exit_code,
                }
            }
            OracleRawResult::TimedOut => {
                tracing::warn!("oracle invocation timed out");
                OracleOutcome::Timeout
            }
            OracleRawResult::Unavailable { reason } => {
                tracing::error!(reason, "oracle binary unavailable");
                OracleOutcome::Unavailable
            }
        }
    }
}

/// Parse policy: primary JSON, fallback 1 strip markdown code fences,
/// fallback 2 extract the outermost balanced `{...}`/`[...]`.
fn parse_response(raw: &str) -> OracleOutcome {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
        return OracleOutcome::Decoded(value);
    }

    let stripped = strip_code_fences(raw);
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(stripped) {
        return OracleOutcome::Decoded(value);
    }

    if let Some(extracted) = extract_balanced(stripped) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&extracted) {
            return OracleOutcome::Decoded(value);
        }
    }

    OracleOutcome::ParseFailed {
        raw: raw.to_string(),
    }
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let after_open = after_open
        .strip_prefix("json")
        .unwrap_or(after_open)
        .trim_start_matches('\n');
    after_open.strip_suffix("```").unwrap_or(after_open).trim()
}

/// Scans for the first `{` or `[` and returns the text up to its matching
/// close, tracking string literals so braces inside strings don't confuse
/// the balance count.
fn extract_balanced(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{' || b == b'[')?;
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
#[path = "oracle_tests.rs"]
mod tests;
