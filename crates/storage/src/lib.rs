// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Persistence layer (C10): the process-wide JSON state file and the
//! embedded SQLite database.

mod db;
mod process_state;

pub use db::{Database, DbError, DbResult};
pub use process_state::{
    FsStateWriter, ProcessState, ProcessStateError, ProcessStateStore, StateWriter,
};
