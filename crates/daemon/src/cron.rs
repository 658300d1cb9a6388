// SPDX-License-Identifier: MIT

//! Minimal cron-field matcher for the supervisor's four scheduled jobs
//! (morning digest, evening wind-down, weekly revenue summary, trust
//! promotion check). Each job needs only minute/hour/day-of-week matching
//! against `*` or a comma-separated integer list, so this is a small
//! purpose-built parser rather than a general cron expression engine.

use chrono::{DateTime, Datelike, Timelike, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CronError {
    #[error("cron expression must have 5 fields, got {0}")]
    WrongFieldCount(usize),
    #[error("invalid field {field:?} in cron expression")]
    InvalidField { field: String },
}

#[derive(Debug, Clone)]
enum Field {
    Any,
    List(Vec<u32>),
}

impl Field {
    fn parse(raw: &str) -> Result<Self, CronError> {
        if raw == "*" {
            return Ok(Field::Any);
        }
        let mut values = Vec::new();
        for part in raw.split(',') {
            let value: u32 = part
                .trim()
                .parse()
                .map_err(|_| CronError::InvalidField { field: raw.to_string() })?;
            values.push(value);
        }
        Ok(Field::List(values))
    }

    fn matches(&self, value: u32) -> bool {
        match self {
            Field::Any => true,
            Field::List(values) => values.contains(&value),
        }
    }
}

/// A parsed `minute hour day-of-month month day-of-week` expression.
/// Day-of-month and month are accepted for shape compatibility with
/// standard cron strings but only `*` is meaningful for them here: every
/// scheduled job is either daily or weekly.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    minute: Field,
    hour: Field,
    day_of_week: Field,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronError::WrongFieldCount(fields.len()));
        }
        Ok(Self {
            minute: Field::parse(fields[0])?,
            hour: Field::parse(fields[1])?,
            day_of_week: Field::parse(fields[4])?,
        })
    }

    /// True if `at` falls on this schedule's minute. Cron's day-of-week is
    /// 0-6 with 0 = Sunday; `chrono::Weekday::num_days_from_sunday` matches.
    pub fn matches(&self, at: DateTime<Utc>) -> bool {
        self.minute.matches(at.minute())
            && self.hour.matches(at.hour())
            && self.day_of_week.matches(at.weekday().num_days_from_sunday())
    }
}

/// Tracks which minute a schedule last fired on so a scan tick landing
/// twice in the same minute (or a scan interval shorter than 60s) doesn't
/// fire a job more than once.
#[derive(Debug, Default)]
pub struct ScheduleGuard {
    last_fired_minute_key: Option<i64>,
}

impl ScheduleGuard {
    /// Returns true and records the firing if `schedule` matches `at` and
    /// hasn't already fired this same minute.
    pub fn should_fire(&mut self, schedule: &CronSchedule, at: DateTime<Utc>) -> bool {
        if !schedule.matches(at) {
            return false;
        }
        let minute_key = at.timestamp() / 60;
        if self.last_fired_minute_key == Some(minute_key) {
            return false;
        }
        self.last_fired_minute_key = Some(minute_key);
        true
    }
}
