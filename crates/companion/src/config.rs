//! Configuration management for the tabfloat companion.
//!
//! Configuration is loaded from TOML files in the following locations (in order):
//! 1. `%APPDATA%/tabfloat/config.toml` (Windows standard)
//! 2. `~/.config/tabfloat/config.toml` (Unix-style, for WSL compatibility)
//! 3. `./config.toml` (current directory, for development)

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Upper bound for `topmost.find_retries`.
pub const MAX_FIND_RETRIES: u32 = 50;

/// Upper bound for `topmost.retry_delay_ms`.
pub const MAX_RETRY_DELAY_MS: u64 = 5_000;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the companion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Behavior configuration.
    pub behavior: BehaviorConfig,
    /// Log output configuration.
    pub logging: LoggingConfig,
    /// Window lookup configuration.
    pub topmost: TopmostConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Where log output goes. Stdout carries the native messaging protocol,
/// so logs never go there.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file path. Defaults to `tabfloat-companion.log` in the data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Resolved log file path.
    pub fn path(&self) -> PathBuf {
        self.file.clone().unwrap_or_else(default_log_path)
    }
}

/// How hard to look for the popup's OS window before giving up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopmostConfig {
    /// Lookup attempts per request. The popup may not be mapped yet when
    /// the request arrives.
    #[serde(default = "default_find_retries")]
    pub find_retries: u32,

    /// Delay between lookup attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for TopmostConfig {
    fn default() -> Self {
        Self {
            find_retries: default_find_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_find_retries() -> u32 {
    10
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn default_log_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("tabfloat-companion.log"))
        .unwrap_or_else(|| PathBuf::from("tabfloat-companion.log"))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "tabfloat")
}

/// A config value that was out of range and has been replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
}

impl Config {
    /// Load configuration from standard locations.
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self> {
        let paths = config_paths();

        for path in &paths {
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Clamp out-of-range values, reporting each change.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let level = self.behavior.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            warnings.push(ConfigWarning {
                field: "behavior.log_level",
                message: format!("unknown level {:?}, using \"info\"", self.behavior.log_level),
            });
            self.behavior.log_level = default_log_level();
        }

        let retries = self.topmost.find_retries.clamp(1, MAX_FIND_RETRIES);
        if retries != self.topmost.find_retries {
            warnings.push(ConfigWarning {
                field: "topmost.find_retries",
                message: format!("{} is out of range, using {}", self.topmost.find_retries, retries),
            });
            self.topmost.find_retries = retries;
        }

        if self.topmost.retry_delay_ms > MAX_RETRY_DELAY_MS {
            warnings.push(ConfigWarning {
                field: "topmost.retry_delay_ms",
                message: format!(
                    "{} is out of range, using {}",
                    self.topmost.retry_delay_ms, MAX_RETRY_DELAY_MS
                ),
            });
            self.topmost.retry_delay_ms = MAX_RETRY_DELAY_MS;
        }

        warnings
    }
}

/// Get all possible config file paths in priority order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Windows standard: %APPDATA%/tabfloat/config.toml
    if let Some(proj_dirs) = project_dirs() {
        paths.push(proj_dirs.config_dir().join("config.toml"));
    }

    // 2. Unix-style: ~/.config/tabfloat/config.toml
    if let Some(home) = dirs_home() {
        paths.push(home.join(".config").join("tabfloat").join("config.toml"));
    }

    // 3. Current directory: ./config.toml
    paths.push(PathBuf::from("config.toml"));

    paths
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
