// SPDX-License-Identifier: MIT

//! fleetd: the autonomous project-orchestration daemon.
//!
//! Polls an SMS channel for operator commands, periodically consults an
//! external reasoning oracle about which projects need attention, and
//! dispatches session starts/stops/restarts and notifications under a
//! configurable autonomy policy. See `fleetd-cli` for the operator-facing
//! control surface; this binary is the long-running supervisor itself.

use fs2::FileExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use fleetd_daemon::supervisor::Supervisor;
use fleetd_daemon::RuntimeConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("fleetd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("Usage: fleetd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config_path = config_path();
    let config = RuntimeConfig::load(&config_path)?;

    rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config)?;
    let _log_guard = setup_logging(&config)?;

    info!("starting fleetd");

    let lock_file = match acquire_lock(&config.lock_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("fleetd is already running (lock held at {})", config.lock_path.display());
            error!("failed to acquire daemon lock: {e}");
            return Err(e.into());
        }
    };

    let core = match fleetd_daemon::bootstrap(config).await {
        Ok(core) => core,
        Err(e) => {
            error!("failed to initialize daemon: {e}");
            return Err(e.into());
        }
    };

    let supervisor = match Supervisor::new(core) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("failed to build supervisor: {e}");
            return Err(e.into());
        }
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let run_handle = tokio::spawn(supervisor.clone().run(shutdown_rx));

    println!("READY");
    info!("daemon ready");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    let _ = shutdown_tx.send(true);
    let _ = run_handle.await;
    drop(lock_file);
    info!("daemon stopped");
    Ok(())
}

fn print_help() {
    println!("fleetd {}", env!("CARGO_PKG_VERSION"));
    println!("Autonomous project-orchestration daemon.");
    println!();
    println!("USAGE:");
    println!("    fleetd");
    println!();
    println!("Configuration is read from $FLEETD_CONFIG (default: ./fleetd.json).");
    println!("Use the `fleetd-cli` binary to inspect or control a running daemon.");
}

fn config_path() -> PathBuf {
    std::env::var("FLEETD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("fleetd.json"))
}

fn acquire_lock(lock_path: &std::path::Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)?;
    file.try_lock_exclusive()?;
    use std::io::Write;
    let mut file = file;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
const MAX_ROTATED_LOGS: u32 = 3;

/// Shifts `daemon.log` -> `daemon.log.1` -> ... before the current run
/// starts appending, so a single run's log never grows unbounded.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }
    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn write_startup_marker(config: &RuntimeConfig) -> std::io::Result<()> {
    use std::io::Write;
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "--- fleetd: starting (pid: {}) ---\n", std::process::id())
}

fn setup_logging(
    config: &RuntimeConfig,
) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().unwrap_or(std::path::Path::new(".")),
        config.log_path.file_name().unwrap_or_default(),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
