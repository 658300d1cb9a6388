// SPDX-License-Identifier: MIT

//! Notification manager (C8, spec.md §4.7). Owns the four-tier policy
//! (quiet hours, daily budget, batching); `fleetd_adapters::sms::SmsTransport`
//! only knows how to send one message. Callers never reach the transport
//! directly, so chunking/truncation always happens in one place.

use fleetd_adapters::sms::SmsTransport;
use fleetd_core::{NotificationTier, NotificationsConfig, QuietHours};
use parking_lot::Mutex;

const BATCH_TRUNCATE_CHARS: usize = 1_500;
const BUDGET_WARNING_RATIO: f64 = 0.8;
const DAY_MS: i64 = 86_400_000;

fn quiet_minutes(value: &str) -> Option<u32> {
    let (h, m) = value.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    Some(h * 60 + m)
}

/// Minutes since local midnight, assuming `quiet_hours.timezone` is a fixed
/// UTC offset in hours (e.g. the config schema's default "UTC"). Unknown
/// timezone strings fall back to UTC rather than failing the check.
fn minute_of_day(now_ms: i64, timezone: &str) -> u32 {
    let offset_hours: i64 = timezone.trim_start_matches("UTC").parse().unwrap_or(0);
    let shifted = now_ms + offset_hours * 3_600_000;
    let day_ms = shifted.rem_euclid(DAY_MS);
    (day_ms / 60_000) as u32
}

fn is_quiet_hour(now_ms: i64, quiet_hours: &QuietHours) -> bool {
    let (Some(start), Some(end)) = (
        quiet_minutes(&quiet_hours.start),
        quiet_minutes(&quiet_hours.end),
    ) else {
        return false;
    };
    let now = minute_of_day(now_ms, &quiet_hours.timezone);
    if start <= end {
        now >= start && now < end
    } else {
        // wraps past midnight, e.g. 22:00-07:00
        now >= start || now < end
    }
}

#[derive(Default)]
struct BudgetState {
    day_key: i64,
    sent_today: u32,
    warned_today: bool,
}

#[derive(Clone, Debug)]
struct QueuedMessage {
    project: String,
    text: String,
}

pub struct NotificationManager<S: SmsTransport> {
    transport: S,
    config: NotificationsConfig,
    quiet_hours: QuietHours,
    budget: Mutex<BudgetState>,
    quiet_queue: Mutex<Vec<QueuedMessage>>,
    batch_queue: Mutex<Vec<QueuedMessage>>,
    batch_started_ms: Mutex<Option<i64>>,
}

impl<S: SmsTransport> NotificationManager<S> {
    pub fn new(transport: S, config: NotificationsConfig, quiet_hours: QuietHours) -> Self {
        Self {
            transport,
            config,
            quiet_hours,
            budget: Mutex::new(BudgetState::default()),
            quiet_queue: Mutex::new(Vec::new()),
            batch_queue: Mutex::new(Vec::new()),
            batch_started_ms: Mutex::new(None),
        }
    }

    fn enqueue_summary(&self, msg: QueuedMessage, now_ms: i64) {
        let mut queue = self.batch_queue.lock();
        if queue.is_empty() {
            *self.batch_started_ms.lock() = Some(now_ms);
        }
        queue.push(msg);
    }

    /// Routes one notification per the tier table (spec.md §4.7).
    pub async fn notify(&self, project: &str, tier: NotificationTier, text: String, now_ms: i64) {
        match tier {
            NotificationTier::Debug => {
                tracing::debug!(project, text, "notification suppressed (debug tier)");
            }
            NotificationTier::Urgent => {
                self.send_now(project, NotificationTier::Urgent, &text).await;
            }
            NotificationTier::Action => self.route_action(project, text, now_ms).await,
            NotificationTier::Summary => {
                self.enqueue_summary(
                    QueuedMessage {
                        project: project.to_string(),
                        text,
                    },
                    now_ms,
                );
            }
        }
    }

    async fn route_action(&self, project: &str, text: String, now_ms: i64) {
        if is_quiet_hour(now_ms, &self.quiet_hours) {
            self.quiet_queue.lock().push(QueuedMessage {
                project: project.to_string(),
                text,
            });
            return;
        }
        if self.try_consume_budget(now_ms) {
            self.send_now(project, NotificationTier::Action, &text).await;
        } else {
            // budget exhausted: downgrade to Summary.
            self.enqueue_summary(
                QueuedMessage {
                    project: project.to_string(),
                    text,
                },
                now_ms,
            );
        }
    }

    /// Called on each scan tick: releases any Action messages that were
    /// queued while quiet hours were in effect, once they have ended.
    pub async fn drain_quiet_queue(&self, now_ms: i64) {
        if is_quiet_hour(now_ms, &self.quiet_hours) {
            return;
        }
        let queued = std::mem::take(&mut *self.quiet_queue.lock());
        for msg in queued {
            if self.try_consume_budget(now_ms) {
                self.send_now(&msg.project, NotificationTier::Action, &msg.text).await;
            } else {
                self.enqueue_summary(msg, now_ms);
            }
        }
    }

    /// Flushes the Summary batch if `batchIntervalMs` has elapsed since the
    /// oldest message currently queued. Safe to call every scan tick; a
    /// no-op when nothing is due.
    pub async fn flush_batch_if_due(&self, now_ms: i64) {
        let due = match *self.batch_started_ms.lock() {
            Some(started) => now_ms - started >= self.config.batch_interval_ms as i64,
            None => false,
        };
        if due {
            self.flush_batch(now_ms).await;
        }
    }

    /// Unconditionally flushes the Summary batch (e.g. piggy-backed on a
    /// tier-1/2 send). No-op when the queue is empty.
    pub async fn flush_batch(&self, now_ms: i64) {
        let queued = std::mem::take(&mut *self.batch_queue.lock());
        *self.batch_started_ms.lock() = None;
        if queued.is_empty() {
            return;
        }

        let mut body = String::new();
        for msg in &queued {
            body.push_str(&format!("[{}] {}\n", msg.project, msg.text));
        }
        if body.len() > BATCH_TRUNCATE_CHARS {
            body.truncate(BATCH_TRUNCATE_CHARS);
            body.push_str("... (truncated)");
        }

        let label = NotificationTier::Summary.label();
        let _ = self.transport.send(&format!("[{label}] {body}")).await;
    }

    async fn send_now(&self, project: &str, tier: NotificationTier, text: &str) {
        let label = tier.label();
        let formatted = format!("[{label}] {project}: {text}");
        if let Err(e) = self.transport.send(&formatted).await {
            tracing::warn!(project, error = %e, "notification send failed");
        }
    }

    fn try_consume_budget(&self, now_ms: i64) -> bool {
        let day_key = now_ms.div_euclid(DAY_MS);
        let mut state = self.budget.lock();
        if state.day_key != day_key {
            state.day_key = day_key;
            state.sent_today = 0;
            state.warned_today = false;
        }
        if state.sent_today >= self.config.daily_budget {
            return false;
        }
        state.sent_today += 1;

        let ratio = state.sent_today as f64 / self.config.daily_budget.max(1) as f64;
        if ratio >= BUDGET_WARNING_RATIO && !state.warned_today {
            state.warned_today = true;
            tracing::warn!(
                sent_today = state.sent_today,
                daily_budget = self.config.daily_budget,
                "notification budget at or above 80% utilization"
            );
        }
        true
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
