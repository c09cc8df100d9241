//! External configuration: identity, gate endpoint, leaderboard location.
//!
//! Reads `config.toml` from the snakecast config directory (or a path given
//! on the command line). Every field is optional; missing file means all
//! defaults. CLI flags override file values.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "snakecast";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Resolved settings the app runs with.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Wallet-style address; absent disables submission, not gameplay.
    pub wallet_address: Option<String>,
    /// Verified social handle; absent disables submission and auto-share.
    pub username: Option<String>,
    /// Confirmation endpoint; absent means the dry-run gate.
    pub gate_endpoint: Option<String>,
    /// Optional confirmation timeout. Absent: wait for an explicit outcome.
    pub gate_timeout_secs: Option<u64>,
    /// Share webhook; absent means shares are logged only.
    pub share_endpoint: Option<String>,
    /// Leaderboard file; defaults to the config directory.
    pub leaderboard_path: Option<PathBuf>,
}

impl Settings {
    /// Load from `path`, or from the default config file when `path` is
    /// `None`. A missing file yields defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_dir().join("config.toml"),
        };
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        Ok(Self::from_toml(&text)?)
    }

    fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        let raw: TomlConfig = toml::from_str(text)?;
        Ok(Self {
            wallet_address: raw.identity.wallet_address,
            username: raw.identity.username,
            gate_endpoint: raw.gate.endpoint,
            gate_timeout_secs: raw.gate.timeout_secs,
            share_endpoint: raw.share.endpoint,
            leaderboard_path: raw.leaderboard.path,
        })
    }

    /// Where the leaderboard lives when no path is configured.
    pub fn default_leaderboard_path() -> PathBuf {
        config_dir().join("leaderboard.json")
    }

    /// Log file next to the config; stdout belongs to the TUI.
    pub fn log_path() -> PathBuf {
        config_dir().join("snakecast.log")
    }
}

/// `$XDG_CONFIG_HOME/snakecast`, falling back to `~/.config/snakecast`.
fn config_dir() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if xdg.is_empty() {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".config")
        } else {
            PathBuf::from(xdg)
        }
    } else {
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from("."))
    };
    base.join(APP_DIR)
}

// TOML schema. Sections and fields all default so partial files parse.

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    identity: TomlIdentity,
    #[serde(default)]
    gate: TomlGate,
    #[serde(default)]
    share: TomlShare,
    #[serde(default)]
    leaderboard: TomlLeaderboard,
}

#[derive(Deserialize, Debug, Default)]
struct TomlIdentity {
    wallet_address: Option<String>,
    username: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlGate {
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlShare {
    endpoint: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlLeaderboard {
    path: Option<PathBuf>,
}
