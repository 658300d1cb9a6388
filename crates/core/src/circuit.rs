// SPDX-License-Identifier: MIT

//! Per-dependency circuit breaker state machine (spec.md §4.6).

use serde::{Deserialize, Serialize};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_RESET_TIME_MS: i64 = 300_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// State for one named dependency. Mutated only through `record_success`,
/// `record_failure`, and `is_open`; never assigned to directly outside this
/// module so the transition table stays the single source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreaker {
    state: BreakerState,
    consecutive_failures: u32,
    last_failure_ms: Option<i64>,
    failure_threshold: u32,
    reset_time_ms: i64,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_time_ms: i64) -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            last_failure_ms: None,
            failure_threshold,
            reset_time_ms,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Check (and, if the cooldown has elapsed, transition) whether calls
    /// should be rejected. Must be called before acquiring a semaphore slot
    /// so an open breaker never wastes oracle concurrency (spec.md §4.6).
    pub fn is_open(&mut self, now_ms: i64) -> bool {
        if self.state == BreakerState::Open {
            let elapsed = self
                .last_failure_ms
                .map(|last| now_ms - last)
                .unwrap_or(i64::MAX);
            if elapsed >= self.reset_time_ms {
                self.state = BreakerState::HalfOpen;
            }
        }
        self.state == BreakerState::Open
    }

    pub fn record_success(&mut self) {
        self.state = BreakerState::Closed;
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self, now_ms: i64) {
        self.last_failure_ms = Some(now_ms);
        match self.state {
            BreakerState::HalfOpen => {
                self.state = BreakerState::Open;
            }
            BreakerState::Closed | BreakerState::Open => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.failure_threshold {
                    self.state = BreakerState::Open;
                }
            }
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD, DEFAULT_RESET_TIME_MS)
    }
}

#[cfg(test)]
#[path = "circuit_tests.rs"]
mod tests;
