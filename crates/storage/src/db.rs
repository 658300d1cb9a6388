// SPDX-License-Identifier: MIT

//! Embedded SQLite database for revenue snapshots, trust summary, reminders,
//! conversations, and session evaluations (spec.md §6 "Embedded DB schema").
//! One shared file, WAL mode for concurrent reads, all writes single-writer
//! through this handle.

use chrono::Utc;
use fleetd_core::{
    ConversationEntry, Evaluation, Reminder, ReminderId, Role, RevenueReading, RevenueSnapshot,
    TrustLedger, TrustSummary,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("invalid stored value: {0}")]
    Invalid(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Handle to the shared embedded database.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(path: &Path) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
            .map_err(DbError::Sqlx)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    #[cfg(any(test, feature = "test-support"))]
    pub async fn connect_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> DbResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reminders (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                fire_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                fired INTEGER NOT NULL DEFAULT 0,
                sms_text TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_reminders_pending ON reminders (fired, fire_at)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                role TEXT NOT NULL,
                text TEXT NOT NULL,
                ts INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_conversations_ts ON conversations (ts)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_evaluations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                project_name TEXT NOT NULL,
                started_at TEXT NOT NULL,
                stopped_at TEXT NOT NULL,
                duration_minutes REAL NOT NULL,
                insertions INTEGER NOT NULL,
                deletions INTEGER NOT NULL,
                files_changed INTEGER NOT NULL,
                score INTEGER NOT NULL,
                recommendation TEXT NOT NULL,
                prompt_style TEXT NOT NULL,
                evaluated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_evaluations_project ON session_evaluations (project_name)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_evaluations_score ON session_evaluations (score)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS revenue_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                captured_at TEXT NOT NULL,
                value_atomic INTEGER,
                metadata TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trust_summary (
                level TEXT PRIMARY KEY,
                sessions_launched INTEGER NOT NULL DEFAULT 0,
                score_sum INTEGER NOT NULL DEFAULT 0,
                error_recovery_count INTEGER NOT NULL DEFAULT 0,
                false_alert_count INTEGER NOT NULL DEFAULT 0,
                days_at_level INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // -- reminders --------------------------------------------------------

    pub async fn insert_reminder(&self, id: &ReminderId, text: &str, fire_at_ms: i64) -> DbResult<()> {
        let now = Utc::now().to_rfc3339();
        let fire_at = chrono::DateTime::<Utc>::from_timestamp_millis(fire_at_ms)
            .unwrap_or_else(Utc::now)
            .to_rfc3339();
        sqlx::query(
            "INSERT INTO reminders (id, text, fire_at, created_at, fired) VALUES (?1, ?2, ?3, ?4, 0)",
        )
        .bind(id.as_str())
        .bind(text)
        .bind(fire_at)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_pending_reminders(&self) -> DbResult<Vec<Reminder>> {
        let rows = sqlx::query(
            "SELECT id, text, fire_at, created_at, fired FROM reminders WHERE fired = 0 ORDER BY fire_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_reminder).collect()
    }

    pub async fn due_reminders(&self, now_ms: i64) -> DbResult<Vec<Reminder>> {
        let now = chrono::DateTime::<Utc>::from_timestamp_millis(now_ms)
            .unwrap_or_else(Utc::now)
            .to_rfc3339();
        let rows = sqlx::query(
            "SELECT id, text, fire_at, created_at, fired FROM reminders WHERE fired = 0 AND fire_at <= ?1 ORDER BY fire_at ASC",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_reminder).collect()
    }

    pub async fn mark_reminder_fired(&self, id: &ReminderId) -> DbResult<()> {
        sqlx::query("UPDATE reminders SET fired = 1 WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn cancel_reminder(&self, id: &ReminderId) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = ?1 AND fired = 0")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -- conversations ------------------------------------------------------

    pub async fn insert_conversation_entry(&self, entry: &ConversationEntry) -> DbResult<()> {
        let role = match entry.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        sqlx::query("INSERT INTO conversations (role, text, ts, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(role)
            .bind(&entry.text)
            .bind(entry.timestamp_ms)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn recent_conversation(&self, limit: i64) -> DbResult<Vec<ConversationEntry>> {
        let rows = sqlx::query("SELECT role, text, ts FROM conversations ORDER BY ts DESC LIMIT ?1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        let mut entries: Vec<ConversationEntry> = rows
            .into_iter()
            .map(|row| {
                let role = match row.get::<String, _>("role").as_str() {
                    "assistant" => Role::Assistant,
                    "system" => Role::System,
                    _ => Role::User,
                };
                ConversationEntry {
                    role,
                    text: row.get("text"),
                    timestamp_ms: row.get("ts"),
                }
            })
            .collect();
        entries.reverse();
        Ok(entries)
    }

    pub async fn prune_conversation(&self, cutoff_ms: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM conversations WHERE ts < ?1")
            .bind(cutoff_ms)
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "DELETE FROM conversations WHERE id NOT IN (SELECT id FROM conversations ORDER BY ts DESC LIMIT 100)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -- session evaluations -------------------------------------------------

    pub async fn insert_evaluation(&self, session_id: &str, eval: &Evaluation) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO session_evaluations (
                session_id, project_name, started_at, stopped_at, duration_minutes,
                insertions, deletions, files_changed, score, recommendation,
                prompt_style, evaluated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(session_id)
        .bind(&eval.project)
        .bind(eval.started_at_ms)
        .bind(eval.stopped_at_ms)
        .bind(eval.duration_minutes())
        .bind(eval.lines_added as i64)
        .bind(eval.lines_removed as i64)
        .bind(eval.files_changed as i64)
        .bind(eval.score_clamped() as i64)
        .bind(eval.recommendation.as_str())
        .bind(eval.prompt_style.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent evaluation's `started_at_ms` for a project, used by the
    /// session evaluator's double-evaluation guard (spec.md §4.4: "checking
    /// that any existing evaluation record is older than `startedAt`").
    pub async fn latest_evaluation_started_at(&self, project: &str) -> DbResult<Option<i64>> {
        let row = sqlx::query(
            "SELECT started_at FROM session_evaluations WHERE project_name = ?1 ORDER BY id DESC LIMIT 1",
        )
        .bind(project)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get::<i64, _>("started_at")))
    }

    pub async fn recent_evaluations_for_project(
        &self,
        project: &str,
        limit: i64,
    ) -> DbResult<Vec<(String, u8)>> {
        let rows = sqlx::query(
            "SELECT recommendation, score FROM session_evaluations WHERE project_name = ?1 ORDER BY id DESC LIMIT ?2",
        )
        .bind(project)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.get::<String, _>("recommendation"), row.get::<i64, _>("score") as u8))
            .collect())
    }

    /// Total evaluations ever recorded, gating pattern aggregation (spec.md
    /// §4.4 step 5).
    pub async fn total_evaluation_count(&self) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM session_evaluations")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("count"))
    }

    // -- revenue snapshots ----------------------------------------------------

    pub async fn insert_revenue_snapshot(&self, snapshot: &RevenueSnapshot) -> DbResult<()> {
        let (value_atomic, metadata): (Option<i64>, Option<String>) = match &snapshot.reading {
            RevenueReading::Value { raw_cents } => (Some(*raw_cents), None),
            RevenueReading::Unreachable { error } => (None, Some(error.clone())),
            RevenueReading::Unknown => (None, None),
        };
        sqlx::query(
            "INSERT INTO revenue_snapshots (source, captured_at, value_atomic, metadata) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&snapshot.source)
        .bind(
            chrono::DateTime::<Utc>::from_timestamp_millis(snapshot.timestamp_ms)
                .unwrap_or_else(Utc::now)
                .to_rfc3339(),
        )
        .bind(value_atomic)
        .bind(metadata)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -- trust summary ----------------------------------------------------

    pub async fn upsert_trust_summary(
        &self,
        level: fleetd_core::AutonomyLevel,
        summary: &TrustSummary,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO trust_summary (level, sessions_launched, score_sum, error_recovery_count, false_alert_count, days_at_level)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(level) DO UPDATE SET
                sessions_launched = excluded.sessions_launched,
                score_sum = excluded.score_sum,
                error_recovery_count = excluded.error_recovery_count,
                false_alert_count = excluded.false_alert_count,
                days_at_level = excluded.days_at_level
            "#,
        )
        .bind(level.as_str())
        .bind(summary.sessions_launched as i64)
        .bind(summary.score_sum as i64)
        .bind(summary.error_recovery_count as i64)
        .bind(summary.false_alert_count as i64)
        .bind(summary.days_at_level as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load_trust_ledger(&self) -> DbResult<TrustLedger> {
        let rows = sqlx::query(
            "SELECT level, sessions_launched, score_sum, error_recovery_count, false_alert_count, days_at_level FROM trust_summary",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut ledger = TrustLedger::default();
        for row in rows {
            let level_str: String = row.get("level");
            let level = level_str
                .parse::<fleetd_core::AutonomyLevel>()
                .map_err(|e| DbError::Invalid(e.to_string()))?;
            let summary = TrustSummary {
                sessions_launched: row.get::<i64, _>("sessions_launched") as u32,
                score_sum: row.get::<i64, _>("score_sum") as u64,
                error_recovery_count: row.get::<i64, _>("error_recovery_count") as u32,
                false_alert_count: row.get::<i64, _>("false_alert_count") as u32,
                days_at_level: row.get::<i64, _>("days_at_level") as u32,
            };
            *ledger.entry(level) = summary;
        }
        Ok(ledger)
    }
}

fn row_to_reminder(row: sqlx::sqlite::SqliteRow) -> DbResult<Reminder> {
    let id: String = row.get("id");
    let text: String = row.get("text");
    let fire_at: String = row.get("fire_at");
    let created_at: String = row.get("created_at");
    let fired: i64 = row.get("fired");

    let fire_at_ms = chrono::DateTime::parse_from_rfc3339(&fire_at)
        .map_err(|e| DbError::Invalid(e.to_string()))?
        .timestamp_millis();
    let created_at_ms = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| DbError::Invalid(e.to_string()))?
        .timestamp_millis();

    Ok(Reminder {
        id: ReminderId::new(id),
        text,
        fire_at_ms,
        created_at_ms,
        fired: fired != 0,
    })
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
