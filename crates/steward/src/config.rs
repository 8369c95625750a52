//! Configuration management for steward.
//!
//! Configuration is loaded from multiple sources with precedence:
//! 1. Command-line flags (`--database`)
//! 2. Environment variables (STEWARD_*, GEMINI_API_KEY)
//! 3. Config file ($STEWARD_CONFIG or the platform config dir)
//! 4. Default values

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use steward_sdk::StewardConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Agent settings (goal, oracle, memory, retention, schedule)
    #[serde(flatten)]
    pub agent: StewardConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset (default: info)
    pub level: String,

    /// Directory for per-run log files (default: <data dir>/logs)
    pub dir: Option<PathBuf>,

    /// Write a log file for each `run` invocation
    pub file: bool,

    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            file: true,
            json: false,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "steward", "steward")
}

fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".steward"))
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// An explicitly named file must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();

        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => match env("STEWARD_CONFIG") {
                Some(path) => (PathBuf::from(path), true),
                None => (Self::default_config_path(), false),
            },
        };

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else if required {
            bail!("Config file not found: {}", path.display());
        } else {
            Config::default()
        };

        config.apply_env(env)?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides using the given lookup
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = env("STEWARD_DATABASE_PATH") {
            self.agent.database_path = Some(PathBuf::from(path));
        }
        if let Some(key) = env("GEMINI_API_KEY") {
            self.agent.oracle.api_key = Some(key);
        }
        if let Some(interval) = env("STEWARD_CHECK_INTERVAL") {
            self.agent.schedule.check_interval_secs = interval
                .trim()
                .parse()
                .with_context(|| format!("STEWARD_CHECK_INTERVAL is not a number: {}", interval))?;
        }
        if let Some(level) = env("STEWARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(dir) = env("STEWARD_LOG_DIR") {
            self.logging.dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Get the default config file path.
    pub fn default_config_path() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| default_data_dir().join("config.toml"))
    }

    /// Database file, falling back to `<data dir>/steward.db`
    pub fn database_path(&self) -> PathBuf {
        self.agent
            .database_path
            .clone()
            .unwrap_or_else(|| default_data_dir().join("steward.db"))
    }

    /// Directory for per-run log files
    pub fn log_dir(&self) -> PathBuf {
        self.logging
            .dir
            .clone()
            .unwrap_or_else(|| default_data_dir().join("logs"))
    }
}
