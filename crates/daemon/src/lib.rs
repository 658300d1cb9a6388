// SPDX-License-Identifier: MIT

//! Daemon internals, exposed as a library so `fleetd-cli` can share the
//! config loader and the shared [`core::Core`] wiring without duplicating
//! startup logic.

pub mod config;
pub mod core;
pub mod cron;
pub mod router;
pub mod supervisor;

pub use config::{ConfigError, RuntimeConfig};
pub use core::Core;
pub use supervisor::Supervisor;

use fleetd_adapters::health::SystemHealthTransport;
use fleetd_adapters::session::TmuxAdapter;
use fleetd_adapters::sms::MessagesSmsTransport;
use fleetd_core::{Project, SystemClock};
use fleetd_engine::{HealthMonitor, MemorySidecarStore, NotificationManager, SessionController, SessionControllerConfig};
use fleetd_storage::{Database, ProcessStateStore};
use parking_lot::Mutex;
use std::sync::Arc;

/// Builds every piece of adapter wiring a running daemon needs and hands
/// back the shared [`Core`]. Shared by `fleetd`'s main loop and
/// `fleetd-cli`'s `status`/`config validate` subcommands, which only need
/// the config/db/project-list slice of this and never call
/// [`Supervisor::run`].
pub async fn bootstrap(config: RuntimeConfig) -> anyhow::Result<Arc<Core>> {
    let db = Database::connect(&config.db_path).await?;
    let state = Arc::new(Mutex::new(ProcessStateStore::load(&config.process_state_path)?));
    let projects = discover_projects(&config);

    let session_config = SessionControllerConfig {
        max_concurrent_sessions: config.config.max_concurrent_sessions,
        max_session_duration_ms: config.config.ai.max_session_duration_ms as i64,
        agent_command: std::env::var("FLEETD_AGENT_COMMAND").unwrap_or_else(|_| "agent".to_string()),
    };
    let sessions = SessionController::new(
        TmuxAdapter::default(),
        MemorySidecarStore::default(),
        SystemClock,
        session_config,
    );

    let sms = MessagesSmsTransport::new(config.chat_db_path.clone(), config.sms_recipient.clone());
    let notifier = NotificationManager::new(
        sms.clone(),
        config.config.ai.notifications.clone(),
        config.config.quiet_hours.clone(),
    );

    let health = HealthMonitor::new(SystemHealthTransport::default(), config.config.health.clone());

    let core = Core::new(config, db, state, projects, sessions, notifier, health, sms);
    Ok(Arc::new(core))
}

/// Projects are enumerated from config at boot, never discovered by
/// scanning the filesystem for state-file markdown — that parsing is left
/// to an external collaborator.
fn discover_projects(config: &RuntimeConfig) -> Vec<Project> {
    config
        .config
        .projects
        .iter()
        .map(|name| Project::new(name.clone(), config.config.projects_dir.join(name)))
        .collect()
}
