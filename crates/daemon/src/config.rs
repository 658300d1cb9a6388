// SPDX-License-Identifier: MIT

//! Runtime configuration: the JSON config document (`fleetd_core::Config`)
//! plus the operational paths a running daemon needs that the document itself
//! doesn't carry (state directory, process lock, log file, chat database).
//!
//! Splits a user-supplied config from fixed-path runtime state under
//! `~/.local/state/<name>` (or `$XDG_STATE_HOME`/an explicit override).

use fleetd_core::Config;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine state directory")]
    NoStateDir,
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything the daemon needs to run: the config document plus fixed
/// operational paths under the state directory.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub config: Config,
    pub state_dir: PathBuf,
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub process_state_path: PathBuf,
    pub db_path: PathBuf,
    pub chat_db_path: PathBuf,
    pub sms_recipient: String,
    pub oracle_binary: String,
    pub own_launch_label: String,
}

impl RuntimeConfig {
    /// Loads the JSON config document from `config_path` and fills in the
    /// fixed runtime paths derived from the state directory. Absent
    /// operational env vars fall back to reasonable local defaults so a
    /// fresh checkout can run without extra setup.
    pub fn load(config_path: &std::path::Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })?;

        let state_dir = state_dir()?;
        Ok(Self {
            lock_path: state_dir.join("daemon.lock"),
            log_path: state_dir.join("daemon.log"),
            process_state_path: state_dir.join("state.json"),
            db_path: state_dir.join("fleetd.sqlite3"),
            chat_db_path: chat_db_path(),
            sms_recipient: std::env::var("FLEETD_SMS_RECIPIENT").unwrap_or_default(),
            oracle_binary: std::env::var("FLEETD_ORACLE_BINARY").unwrap_or_else(|_| "oracle".to_string()),
            own_launch_label: std::env::var("FLEETD_LAUNCH_LABEL")
                .unwrap_or_else(|_| "com.fleetd.daemon".to_string()),
            state_dir,
            config,
        })
    }
}

/// `FLEETD_STATE_DIR` takes priority (used by tests for isolation), then
/// `$XDG_STATE_HOME/fleetd`, then `~/.local/state/fleetd`.
fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("FLEETD_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("fleetd"));
    }
    dirs::home_dir()
        .map(|home| home.join(".local/state/fleetd"))
        .ok_or(ConfigError::NoStateDir)
}

fn chat_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("FLEETD_CHAT_DB") {
        return PathBuf::from(path);
    }
    dirs::home_dir()
        .map(|home| home.join("Library/Messages/chat.db"))
        .unwrap_or_else(|| PathBuf::from("chat.db"))
}
