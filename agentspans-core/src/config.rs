//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/agentspans/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/agentspans/` (~/.config/agentspans/)
//! - State/Logs: `$XDG_STATE_HOME/agentspans/` (~/.local/state/agentspans/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Event log source overrides
    #[serde(default)]
    pub sources: SourceOverrides,

    /// Batch reconstruction settings
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Override paths for event log roots
#[derive(Debug, Deserialize, Default)]
pub struct SourceOverrides {
    /// Override path for Claude Code data (defaults to ~/.claude)
    pub claude_code_path: Option<PathBuf>,
}

/// Batch reconstruction configuration
#[derive(Debug, Deserialize)]
pub struct ScanConfig {
    /// Upper bound on streams open at the same time
    #[serde(default = "default_max_open_streams")]
    pub max_open_streams: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_open_streams: default_max_open_streams(),
        }
    }
}

fn default_max_open_streams() -> usize {
    8
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration, returning an error for unusable values
    pub fn validate(&self) -> Result<()> {
        if self.scan.max_open_streams == 0 {
            return Err(Error::Config(
                "scan.max_open_streams must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/agentspans/config.toml` (~/.config/agentspans/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("agentspans").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/agentspans/` (~/.local/state/agentspans/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("agentspans")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/agentspans/agentspans.log` (~/.local/state/agentspans/agentspans.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("agentspans.log")
    }

    /// Returns the Claude Code root to scan for session logs.
    ///
    /// Uses `sources.claude_code_path` when set, otherwise `~/.claude`.
    pub fn claude_root(&self) -> PathBuf {
        self.sources
            .claude_code_path
            .clone()
            .unwrap_or_else(|| home_dir().join(".claude"))
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
