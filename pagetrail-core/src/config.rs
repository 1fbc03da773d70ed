//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/pagetrail/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/pagetrail/` (~/.config/pagetrail/)
//! - State/Logs: `$XDG_STATE_HOME/pagetrail/` (~/.local/state/pagetrail/)

use crate::error::{Error, Result};
use crate::types::{CaptureTiming, Properties};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

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

    /// Navigation tracking configuration
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Integration name to integration settings, passed to `initialize`
    #[serde(default)]
    pub integrations: toml::Table,

    /// Options passed to `initialize`
    #[serde(default)]
    pub options: toml::Table,
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

/// Navigation tracking configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TrackingConfig {
    /// Emit the landing page view and intercept navigation after startup
    #[serde(default = "default_autorun")]
    pub autorun: bool,

    /// Capture delay for pushState navigations
    #[serde(default)]
    pub virtual_delay_ms: u64,

    /// Capture delay for back/forward navigations
    #[serde(default = "default_popstate_delay")]
    pub popstate_delay_ms: u64,

    /// Capture delay for the landing page view
    #[serde(default)]
    pub first_load_delay_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            autorun: default_autorun(),
            virtual_delay_ms: 0,
            popstate_delay_ms: default_popstate_delay(),
            first_load_delay_ms: 0,
        }
    }
}

fn default_autorun() -> bool {
    true
}

fn default_popstate_delay() -> u64 {
    50
}

/// Upper bound for any capture delay
const MAX_CAPTURE_DELAY_MS: u64 = 10_000;

impl TrackingConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("virtual_delay_ms", self.virtual_delay_ms),
            ("popstate_delay_ms", self.popstate_delay_ms),
            ("first_load_delay_ms", self.first_load_delay_ms),
        ] {
            if value > MAX_CAPTURE_DELAY_MS {
                return Err(Error::Config(format!(
                    "tracking.{name} must be at most {MAX_CAPTURE_DELAY_MS}"
                )));
            }
        }
        Ok(())
    }

    /// Capture delays as used by the navigation tracker
    pub fn timing(&self) -> CaptureTiming {
        CaptureTiming {
            virtual_delay: Duration::from_millis(self.virtual_delay_ms),
            popstate_delay: Duration::from_millis(self.popstate_delay_ms),
            first_load_delay: Duration::from_millis(self.first_load_delay_ms),
        }
    }
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

        config.tracking.validate()?;
        Ok(config)
    }

    /// Integrations as the JSON mapping `init` expects
    pub fn integrations_json(&self) -> Result<Properties> {
        table_to_json(&self.integrations)
    }

    /// Options as the JSON mapping `init` expects
    pub fn options_json(&self) -> Result<Properties> {
        table_to_json(&self.options)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/pagetrail/config.toml` (~/.config/pagetrail/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("pagetrail").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/pagetrail/` (~/.local/state/pagetrail/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("pagetrail")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/pagetrail/pagetrail.log` (~/.local/state/pagetrail/pagetrail.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("pagetrail.log")
    }
}

fn table_to_json(table: &toml::Table) -> Result<Properties> {
    match serde_json::to_value(table)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(Error::Config(format!("expected a table, got {other}"))),
    }
}
