// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Control-loop logic for the fleet orchestrator daemon: oracle gateway and
//! circuit breaker (C2, C11), context assembler (C3), decision executor
//! (C4), session controller (C5), session evaluator (C6), health monitor
//! (C7), notification manager (C8), reminder engine (C12). The supervisor
//! (C1) and command router (C9) live in `fleetd-daemon`, which wires these
//! together.

mod context;
mod error;
mod evaluator;
mod executor;
mod health;
mod notify;
mod oracle;
mod reminders;
mod session;

pub use context::{EvaluationLearning, PromptContext, ResourceSnapshot};
pub use error::{ExecuteError, HealthError};
pub use evaluator::{classify_prompt_style, EvaluateError, EvaluationNotifier, SessionEvaluator, PATTERN_THRESHOLD};
pub use executor::{DecisionExecutor, DecisionExecutorConfig, Effect, ExecutionTarget};
pub use health::{ConfigError, HealthMonitor, HealthTick, RestartVerdict, ServiceRegistry};
pub use notify::NotificationManager;
pub use oracle::{CircuitBreakerRegistry, OracleGateway, OracleOutcome};
pub use reminders::{ReminderEngine, ReminderError};
pub use session::{
    MemorySidecarStore, SessionController, SessionControllerConfig, SidecarStore, StartOutcome,
};
