// SPDX-License-Identifier: MIT

//! Reminder engine (C12, spec.md §4.8). Stores reminders via
//! `fleetd_storage::Database` and fires them through the notification
//! manager at tier 1, bypassing quiet hours like any other urgent send.

use fleetd_core::{IdGen, Reminder, ReminderId};
use fleetd_storage::{Database, DbError};

#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error("storage error: {0}")]
    Storage(#[from] DbError),
    #[error("no pending reminder matches \"{0}\"")]
    NoMatch(String),
}

pub struct ReminderEngine<G: IdGen> {
    db: Database,
    ids: G,
}

impl<G: IdGen> ReminderEngine<G> {
    pub fn new(db: Database, ids: G) -> Self {
        Self { db, ids }
    }

    /// Inserts a reminder and returns its id. `fire_at_ms` in the past is
    /// accepted and fires on the next `check_and_fire` tick (spec.md §4.8).
    pub async fn set(&self, text: &str, fire_at_ms: i64) -> Result<ReminderId, ReminderError> {
        let id = ReminderId::new(self.ids.next());
        self.db.insert_reminder(&id, text, fire_at_ms).await?;
        Ok(id)
    }

    /// Fuzzy-matches `query` against pending reminder text and cancels the
    /// first hit (spec.md §4.8 `cancelByText`).
    pub async fn cancel_by_text(&self, query: &str) -> Result<Reminder, ReminderError> {
        let pending = self.db.list_pending_reminders().await?;
        let hit = pending
            .into_iter()
            .find(|r| r.matches_query(query))
            .ok_or_else(|| ReminderError::NoMatch(query.to_string()))?;
        self.db.cancel_reminder(&hit.id).await?;
        Ok(hit)
    }

    pub async fn list_pending(&self) -> Result<Vec<Reminder>, ReminderError> {
        Ok(self.db.list_pending_reminders().await?)
    }

    /// Selects due, unfired reminders and marks each fired, returning them
    /// for the caller to route through the notification manager at tier 1.
    pub async fn check_and_fire(&self, now_ms: i64) -> Result<Vec<Reminder>, ReminderError> {
        let due = self.db.due_reminders(now_ms).await?;
        for reminder in &due {
            self.db.mark_reminder_fired(&reminder.id).await?;
        }
        Ok(due)
    }
}

#[cfg(test)]
#[path = "reminders_tests.rs"]
mod tests;
