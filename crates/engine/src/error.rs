// SPDX-License-Identifier: MIT

//! Error types for the control-loop engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("session error: {0}")]
    Session(#[from] fleetd_adapters::session::SessionError),
    #[error("storage error: {0}")]
    Storage(#[from] fleetd_storage::DbError),
    #[error("process state error: {0}")]
    ProcessState(#[from] fleetd_storage::ProcessStateError),
}

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("the health registry contains the daemon's own launch-agent label: {0}")]
    SelfReferential(String),
}
