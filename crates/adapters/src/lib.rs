// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Boundary implementations behind small traits: terminal multiplexer,
//! SMS transport, oracle subprocess runner, health check transports, and
//! a VCS CLI wrapper.

pub mod health;
pub mod oracle;
pub mod session;
pub mod sms;
pub mod subprocess;
pub mod vcs;

pub use health::{HealthTransport, HealthTransportError, SystemHealthTransport};
pub use oracle::{CliOracleRunner, OracleInvocation, OracleRawResult, OracleRunner};
pub use session::{NoOpSessionAdapter, SessionAdapter, TmuxAdapter};
pub use sms::{MessagesSmsTransport, SmsError, SmsMessage, SmsTransport};
pub use vcs::{DiffStat, GitAdapter, VcsAdapter, VcsError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use health::FakeHealthTransport;
#[cfg(any(test, feature = "test-support"))]
pub use oracle::FakeOracleRunner;
#[cfg(any(test, feature = "test-support"))]
pub use session::{FakeSession, FakeSessionAdapter, SessionCall};
#[cfg(any(test, feature = "test-support"))]
pub use sms::FakeSmsTransport;
#[cfg(any(test, feature = "test-support"))]
pub use vcs::FakeVcsAdapter;
