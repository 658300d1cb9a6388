// SPDX-License-Identifier: MIT

//! SMS transport: reads newest rows from a local chat database and sends
//! replies through an OS-level scripting bridge.
//!
//! Mirrors the notify adapters' shape (a small trait plus `Fake`/real
//! implementations) rather than inventing a new convention.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from SMS transport operations.
#[derive(Debug, Error)]
pub enum SmsError {
    #[error("chat database error: {0}")]
    Database(String),
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// A single inbound message row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsMessage {
    pub row_id: i64,
    pub text: String,
}

/// Boundary trait for the SMS channel. The core requires no other behavior
/// than reading the latest row id, polling for new messages since a row id,
/// and sending a reply.
#[async_trait]
pub trait SmsTransport: Send + Sync + 'static {
    async fn get_latest_row_id(&self) -> Result<i64, SmsError>;
    async fn get_new_messages(&self, since_row_id: i64) -> Result<Vec<SmsMessage>, SmsError>;
    async fn send(&self, text: &str) -> Result<(), SmsError>;
}

/// Reads the macOS Messages chat database directly and sends replies by
/// driving Messages.app through `osascript`.
///
/// Best-effort: the chat database's schema varies across macOS releases,
/// so `message_row` table/column names are treated as the common subset.
#[derive(Clone)]
pub struct MessagesSmsTransport {
    chat_db_path: PathBuf,
    recipient: String,
}

impl MessagesSmsTransport {
    pub fn new(chat_db_path: impl Into<PathBuf>, recipient: impl Into<String>) -> Self {
        Self {
            chat_db_path: chat_db_path.into(),
            recipient: recipient.into(),
        }
    }

    async fn connect(&self) -> Result<sqlx::SqlitePool, SmsError> {
        let opts = sqlx::sqlite::SqliteConnectOptions::new()
            .filename(&self.chat_db_path)
            .read_only(true);
        sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(|e| SmsError::Database(e.to_string()))
    }
}

#[async_trait]
impl SmsTransport for MessagesSmsTransport {
    async fn get_latest_row_id(&self) -> Result<i64, SmsError> {
        let pool = self.connect().await?;
        let row: (i64,) = sqlx::query_as("SELECT COALESCE(MAX(ROWID), 0) FROM message")
            .fetch_one(&pool)
            .await
            .map_err(|e| SmsError::Database(e.to_string()))?;
        Ok(row.0)
    }

    async fn get_new_messages(&self, since_row_id: i64) -> Result<Vec<SmsMessage>, SmsError> {
        let pool = self.connect().await?;
        let rows: Vec<(i64, Option<String>)> = sqlx::query_as(
            "SELECT ROWID, text FROM message WHERE ROWID > ? AND is_from_me = 0 ORDER BY ROWID ASC",
        )
        .bind(since_row_id)
        .fetch_all(&pool)
        .await
        .map_err(|e| SmsError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|(row_id, text)| text.map(|text| SmsMessage { row_id, text }))
            .collect())
    }

    async fn send(&self, text: &str) -> Result<(), SmsError> {
        let script = format!(
            "tell application \"Messages\"\n\
             set targetBuddy to \"{recipient}\"\n\
             set targetService to id of 1st service whose service type = iMessage\n\
             set theBuddy to participant targetBuddy of service id targetService\n\
             send \"{body}\" to theBuddy\n\
             end tell",
            recipient = self.recipient.replace('"', "\\\""),
            body = text.replace('"', "\\\""),
        );

        let output = tokio::process::Command::new("osascript")
            .arg("-e")
            .arg(&script)
            .output()
            .await
            .map_err(|e| SmsError::SendFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(SmsError::SendFailed(stderr));
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSmsTransport;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeState {
        latest_row_id: i64,
        inbox: Vec<SmsMessage>,
        sent: Vec<String>,
    }

    /// In-memory SMS transport for tests.
    #[derive(Clone, Default)]
    pub struct FakeSmsTransport {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakeSmsTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_inbound(&self, row_id: i64, text: impl Into<String>) {
            let mut state = self.inner.lock();
            state.latest_row_id = state.latest_row_id.max(row_id);
            state.inbox.push(SmsMessage {
                row_id,
                text: text.into(),
            });
        }

        pub fn sent(&self) -> Vec<String> {
            self.inner.lock().sent.clone()
        }
    }

    #[async_trait]
    impl SmsTransport for FakeSmsTransport {
        async fn get_latest_row_id(&self) -> Result<i64, SmsError> {
            Ok(self.inner.lock().latest_row_id)
        }

        async fn get_new_messages(&self, since_row_id: i64) -> Result<Vec<SmsMessage>, SmsError> {
            Ok(self
                .inner
                .lock()
                .inbox
                .iter()
                .filter(|m| m.row_id > since_row_id)
                .cloned()
                .collect())
        }

        async fn send(&self, text: &str) -> Result<(), SmsError> {
            self.inner.lock().sent.push(text.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "sms_tests.rs"]
mod tests;
