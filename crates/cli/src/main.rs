// SPDX-License-Identifier: MIT

//! fleetd-cli: thin operator CLI around the `fleetd-daemon` library.
//!
//! There is no socket protocol here to connect to a running daemon over —
//! `fleetd` is a single self-contained process. This CLI instead reuses the
//! daemon's config loader and `Core` wiring directly: `status` and `config
//! validate` read the on-disk state and config without starting anything,
//! and `run` boots the same supervisor loop the `fleetd` binary does, for
//! foreground/manual use.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use fleetd_daemon::{RuntimeConfig, Supervisor};
use fleetd_storage::ProcessStateStore;

#[derive(Parser)]
#[command(name = "fleetd-cli", version, about = "Operator CLI for fleetd")]
struct Cli {
    /// Path to the config file (defaults to $FLEETD_CONFIG or ./fleetd.json)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show project, session, and autonomy state without starting the daemon
    Status,
    /// Run the supervisor loop in the foreground
    Run,
    /// Validate the config file
    Config(ConfigArgs),
}

#[derive(clap::Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Parse the config file and check the health service registry
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| std::env::var("FLEETD_CONFIG").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("fleetd.json")));

    match cli.command {
        Commands::Status => status(&config_path).await,
        Commands::Run => run_foreground(&config_path).await,
        Commands::Config(args) => match args.command {
            ConfigCommand::Validate => validate(&config_path),
        },
    }
}

async fn status(config_path: &std::path::Path) -> Result<()> {
    let config = RuntimeConfig::load(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let process_state = ProcessStateStore::load(&config.process_state_path)
        .with_context(|| format!("loading process state from {}", config.process_state_path.display()))?;
    let state = process_state.state();

    println!("autonomy level: {:?}", state.runtime_autonomy_level);
    println!("known projects: {}", config.config.projects.len());
    for name in &config.config.projects {
        println!("  - {name}");
    }
    println!("ai enabled (config default): {}", config.config.ai.enabled);
    println!("health checks enabled: {}", config.config.health.enabled);

    match state.execution_history.last() {
        Some(last) => println!("last decision: {last}"),
        None => println!("last decision: none recorded yet"),
    }

    Ok(())
}

fn validate(config_path: &std::path::Path) -> Result<()> {
    let config = RuntimeConfig::load(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    fleetd_engine::ServiceRegistry::validate(config.config.health.services.clone(), &config.own_launch_label)
        .context("health service registry")?;

    println!("{} is valid", config_path.display());
    println!("  state dir: {}", config.state_dir.display());
    println!("  projects: {}", config.config.projects.len());
    println!("  health services: {}", config.config.health.services.len());
    Ok(())
}

async fn run_foreground(config_path: &std::path::Path) -> Result<()> {
    let config = RuntimeConfig::load(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let core = fleetd_daemon::bootstrap(config).await.context("initializing daemon")?;
    let supervisor = Arc::new(Supervisor::new(core).context("building supervisor")?);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let run_handle = tokio::spawn(supervisor.run(shutdown_rx));

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    println!("shutting down...");
    let _ = shutdown_tx.send(true);
    let _ = run_handle.await;
    Ok(())
}
