// SPDX-License-Identifier: MIT

//! Command router: turns inbound SMS text into a reply. Exact-match
//! commands dispatch directly; anything else falls through to the
//! oracle-backed natural-language handler.

use crate::supervisor::Supervisor;
use fleetd_adapters::oracle::{OracleInvocation, OutputFormat};
use fleetd_adapters::vcs::VcsAdapter;
use fleetd_core::{AutonomyLevel, Role};
use fleetd_engine::OracleOutcome;

const REMINDER_MARKER: &str = "REMINDER_JSON:";

pub async fn route(supervisor: &Supervisor, text: &str) -> String {
    let trimmed = text.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or("").to_ascii_lowercase();
    let rest = parts.next().unwrap_or("").trim();

    match head.as_str() {
        "help" => help_text(),
        "status" => status(supervisor).await,
        "pause" => set_autonomy(supervisor, AutonomyLevel::Observe).await,
        "resume" => set_autonomy(supervisor, AutonomyLevel::Cautious).await,
        "ai" => ai_command(supervisor, rest).await,
        "priority" => priority(supervisor, rest).await,
        "start" => start_project(supervisor, rest).await,
        "stop" => stop_project(supervisor, rest).await,
        "restart" => restart_project(supervisor, rest).await,
        "reply" => reply_command(supervisor, rest).await,
        "remind" => remind_command(supervisor, rest).await,
        _ => natural_language(supervisor, trimmed).await,
    }
}

fn help_text() -> String {
    "Commands: help, status, pause, resume, ai on|off|level <x>|think|explain, \
     priority <name> <1-5>, start <name>, stop <name>, restart <name>, reply <text>, \
     remind <when> <text>. Anything else is handled as a question."
        .to_string()
}

async fn status(supervisor: &Supervisor) -> String {
    let core = supervisor.core();
    let projects = core.projects.read().await;
    let live = core.live_count();
    let attention: Vec<&str> = projects
        .iter()
        .filter(|p| p.snapshot.needs_attention)
        .map(|p| p.name.as_str())
        .collect();
    let autonomy = core.state.lock().state().runtime_autonomy_level;
    format!(
        "{} projects, {} live session(s), autonomy={}. Needs attention: {}",
        projects.len(),
        live,
        autonomy,
        if attention.is_empty() { "none".to_string() } else { attention.join(", ") }
    )
}

async fn set_autonomy(supervisor: &Supervisor, level: AutonomyLevel) -> String {
    let core = supervisor.core();
    let result = core.state.lock().with_state(|state| {
        state.runtime_autonomy_level = level;
    });
    match result {
        Ok(()) => format!("Autonomy set to {level}."),
        Err(e) => format!("Could not update autonomy: {e}"),
    }
}

async fn ai_command(supervisor: &Supervisor, rest: &str) -> String {
    let mut args = rest.splitn(2, char::is_whitespace);
    let sub = args.next().unwrap_or("").to_ascii_lowercase();
    let arg = args.next().unwrap_or("").trim();
    let core = supervisor.core();

    match sub.as_str() {
        "on" => {
            core.ai_enabled.store(true, std::sync::atomic::Ordering::SeqCst);
            "AI decision loop enabled.".to_string()
        }
        "off" => {
            core.ai_enabled.store(false, std::sync::atomic::Ordering::SeqCst);
            "AI decision loop disabled.".to_string()
        }
        "level" => match arg.parse::<AutonomyLevel>() {
            Ok(level) => set_autonomy(supervisor, level).await,
            Err(_) => "Usage: ai level observe|cautious|moderate|full".to_string(),
        },
        "think" => {
            supervisor.trigger_think().await;
            "Think cycle queued.".to_string()
        }
        "explain" => explain_last_decision(supervisor).await,
        _ => "Usage: ai on|off|level <x>|think|explain".to_string(),
    }
}

async fn explain_last_decision(supervisor: &Supervisor) -> String {
    let state = supervisor.core().state.lock();
    match state.state().execution_history.last() {
        Some(entry) => format!("Last action: {entry}"),
        None => "No decisions have been executed yet.".to_string(),
    }
}

async fn priority(supervisor: &Supervisor, rest: &str) -> String {
    let mut args = rest.splitn(2, char::is_whitespace);
    let Some(name) = args.next().filter(|s| !s.is_empty()) else {
        return "Usage: priority <name> <1-5>".to_string();
    };
    let Some(project) = resolve_project(supervisor, name).await else {
        return format!("No project matching \"{name}\".");
    };
    let level = args.next().unwrap_or("").trim();
    match level.parse::<u8>() {
        Ok(p) if (1..=5).contains(&p) => {
            format!("Noted: {} priority set to {p} for this session.", project.name)
        }
        _ => "Usage: priority <name> <1-5>".to_string(),
    }
}

async fn start_project(supervisor: &Supervisor, name: &str) -> String {
    let Some(project) = resolve_project(supervisor, name).await else {
        return format!("No project matching \"{name}\".");
    };
    let core = supervisor.core();
    if core.is_live(&project.name) {
        return format!("{} is already running.", project.name);
    }
    let head_before = core.vcs.head(&project.working_dir).await.ok();
    let prompt = "Continue working on this project.".to_string();
    let outcome = core
        .sessions
        .start(&project, prompt.clone(), head_before.clone(), core.live_count(), None)
        .await;
    if outcome.success {
        let mut record = fleetd_core::SessionRecord::new(&project.name, prompt, core.clock_now_ms());
        record.head_before = head_before;
        core.track_live(record);
        format!("Started {}.", project.name)
    } else {
        format!("Failed to start {}: {}", project.name, outcome.message)
    }
}

async fn stop_project(supervisor: &Supervisor, name: &str) -> String {
    let Some(project) = resolve_project(supervisor, name).await else {
        return format!("No project matching \"{name}\".");
    };
    let core = supervisor.core();
    if !core.is_live(&project.name) {
        return format!("{} is not running.", project.name);
    }
    let outcome = core.sessions.stop(&project.name).await;
    core.untrack_live(&project.name);
    if outcome.success {
        format!("Stopped {}.", project.name)
    } else {
        format!("Stop reported: {}", outcome.message)
    }
}

async fn restart_project(supervisor: &Supervisor, name: &str) -> String {
    let stopped = stop_project(supervisor, name).await;
    let started = start_project(supervisor, name).await;
    format!("{stopped} {started}")
}

/// Appends a free-text operator note to conversation memory without
/// invoking the oracle, for context an operator wants remembered verbatim.
async fn reply_command(supervisor: &Supervisor, rest: &str) -> String {
    if rest.is_empty() {
        return "Usage: reply <text>".to_string();
    }
    let core = supervisor.core();
    let entry = fleetd_core::ConversationEntry::new(Role::System, rest, core.clock_now_ms());
    if let Err(e) = core.db.insert_conversation_entry(&entry).await {
        return format!("Could not record note: {e}");
    }
    format!("Noted: {rest}")
}

async fn remind_command(supervisor: &Supervisor, rest: &str) -> String {
    if rest.is_empty() {
        return "Usage: remind <when> <text>".to_string();
    }
    let now_ms = supervisor.core().clock_now_ms();
    // No natural-language time parser in this pass: treat the whole phrase
    // as reminder text firing in one hour, matching the reminder engine's
    // only hard requirement (a concrete fire_at_ms).
    let fire_at_ms = now_ms + 3_600_000;
    match supervisor.reminders().set(rest, fire_at_ms).await {
        Ok(id) => format!("Reminder set ({id}), firing in about an hour."),
        Err(e) => format!("Could not set reminder: {e}"),
    }
}

async fn natural_language(supervisor: &Supervisor, text: &str) -> String {
    let core = supervisor.core();
    let now_ms = core.clock_now_ms();

    let entry = fleetd_core::ConversationEntry::new(Role::User, text, now_ms);
    if let Err(e) = core.db.insert_conversation_entry(&entry).await {
        tracing::warn!(error = %e, "failed to persist NL turn");
    }

    let context = build_nl_context(supervisor).await;
    let prompt = format!("{context}\n\nOperator message: {text}");
    let invocation = OracleInvocation {
        output_format: OutputFormat::Text,
        allowed_tools: Vec::new(),
        ..OracleInvocation::decision(prompt)
    };

    let reply = match supervisor.oracle().query(invocation).await {
        OracleOutcome::Decoded(value) => value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string()),
        OracleOutcome::ParseFailed { raw } => raw,
        OracleOutcome::Runtime { raw, .. } => raw,
        OracleOutcome::Timeout => "The assistant took too long to respond. Try again shortly.".to_string(),
        OracleOutcome::Unavailable => "The assistant is unavailable right now.".to_string(),
    };

    let (reply, reminder_json) = extract_reminder_marker(&reply);
    if let Some(raw) = reminder_json {
        if let Err(e) = apply_reminder_json(supervisor, &raw, now_ms).await {
            tracing::warn!(error = %e, "failed to apply reminder from NL reply");
        }
    }

    let assistant_entry = fleetd_core::ConversationEntry::new(Role::Assistant, &reply, core.clock_now_ms());
    if let Err(e) = core.db.insert_conversation_entry(&assistant_entry).await {
        tracing::warn!(error = %e, "failed to persist NL reply");
    }

    reply
}

async fn build_nl_context(supervisor: &Supervisor) -> String {
    let core = supervisor.core();
    let recent = core.db.recent_conversation(10).await.unwrap_or_default();
    let projects = core.projects.read().await;
    let pending = supervisor.reminders().list_pending().await.unwrap_or_default();

    let mut out = String::from("# Conversation context\n");
    for entry in &recent {
        out.push_str(&format!("{:?}: {}\n", entry.role, entry.text));
    }
    out.push_str("\n# Projects\n");
    for project in projects.iter() {
        out.push_str(&format!(
            "{}: phase={:?} attention={}\n",
            project.name, project.snapshot.phase, project.snapshot.needs_attention
        ));
    }
    out.push_str("\n# Pending reminders\n");
    for reminder in &pending {
        out.push_str(&format!("{}: {}\n", reminder.id, reminder.text));
    }
    out
}

fn extract_reminder_marker(reply: &str) -> (String, Option<String>) {
    match reply.find(REMINDER_MARKER) {
        Some(idx) => {
            let before = &reply[..idx];
            let after = &reply[idx + REMINDER_MARKER.len()..];
            let json_end = balanced_json_end(after).unwrap_or(after.len());
            let (json_part, remainder) = after.split_at(json_end);
            let cleaned = format!("{before}{remainder}").trim().to_string();
            (cleaned, Some(json_part.to_string()))
        }
        None => (reply.to_string(), None),
    }
}

fn balanced_json_end(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{')?;
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

async fn apply_reminder_json(supervisor: &Supervisor, raw: &str, now_ms: i64) -> anyhow::Result<()> {
    #[derive(serde::Deserialize)]
    struct ReminderPayload {
        text: String,
        fire_at_ms: i64,
    }
    let payload: ReminderPayload = serde_json::from_str(raw)?;
    let fire_at_ms = if payload.fire_at_ms > 0 { payload.fire_at_ms } else { now_ms + 3_600_000 };
    supervisor.reminders().set(&payload.text, fire_at_ms).await?;
    Ok(())
}

/// Exact (case-insensitive) match first, then the closest project within a
/// distance budget proportional to the query length.
async fn resolve_project(supervisor: &Supervisor, query: &str) -> Option<fleetd_core::Project> {
    let core = supervisor.core();
    let projects = core.projects.read().await;
    let query_lower = query.to_ascii_lowercase();

    if let Some(exact) = projects.iter().find(|p| p.name.to_ascii_lowercase() == query_lower) {
        return Some(exact.clone());
    }

    let budget = (query_lower.len() / 3).max(1);
    projects
        .iter()
        .map(|p| (p, levenshtein::levenshtein(&p.name.to_ascii_lowercase(), &query_lower)))
        .filter(|(_, distance)| *distance <= budget)
        .min_by_key(|(_, distance)| *distance)
        .map(|(p, _)| p.clone())
}
