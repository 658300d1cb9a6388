// SPDX-License-Identifier: MIT

//! Monotonic state version counter (spec.md §3 "State version", §8 invariant 14).
//!
//! Incremented explicitly by components on meaningful state mutations; used
//! only as a correlation tag in decision/execution logs, never as an MVCC
//! lock.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct StateVersion(AtomicU64);

impl StateVersion {
    pub fn new(initial: u64) -> Self {
        Self(AtomicU64::new(initial))
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Clone for StateVersion {
    fn clone(&self) -> Self {
        Self::new(self.current())
    }
}

impl Serialize for StateVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.current().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StateVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::new(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
#[path = "state_version_tests.rs"]
mod tests;
