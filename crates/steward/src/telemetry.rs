//! Logging setup.
//!
//! Builds a subscriber for this process without installing it globally. The
//! command future runs under [`Telemetry::dispatch`]; `run` additionally gets
//! a log file per invocation named `agent_run_<YYYYmmdd_HHMMSS>.log`.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Dispatch, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;

/// Logging handle owned by `main`
pub struct Telemetry {
    dispatch: Dispatch,
    log_file: Option<(PathBuf, Arc<File>)>,
}

/// Filter directive for a configured level.
///
/// A bare level applies to steward's own crates only; anything containing
/// `=` or `,` is taken as a full directive.
pub fn filter_directive(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("warn,steward={}", level)
    }
}

fn log_file_name() -> String {
    format!("agent_run_{}.log", Utc::now().format("%Y%m%d_%H%M%S"))
}

impl Telemetry {
    /// Build the subscriber. When `log_dir` is set a new log file is created in it.
    pub fn init(config: &LoggingConfig, log_dir: Option<&Path>) -> Result<Self> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(filter_directive(&config.level))
                .with_context(|| format!("Invalid log level: {}", config.level))?,
        };

        let log_file = match log_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).context("Failed to create log directory")?;
                let path = dir.join(log_file_name());
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create log file {}", path.display()))?;
                Some((path, Arc::new(file)))
            }
            None => None,
        };

        let text_layer = (!config.json).then(|| fmt::layer().with_writer(std::io::stderr));
        let json_layer = config
            .json
            .then(|| fmt::layer().json().with_writer(std::io::stderr));
        let file_layer = log_file
            .as_ref()
            .map(|(_, file)| fmt::layer().with_ansi(false).with_writer(file.clone()));

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(text_layer)
            .with(json_layer)
            .with(file_layer);

        let telemetry = Self {
            dispatch: Dispatch::new(subscriber),
            log_file,
        };
        if let Some(path) = telemetry.log_file_path() {
            tracing::dispatcher::with_default(&telemetry.dispatch, || {
                info!(log_file = %path.display(), "Agent run started");
            });
        }
        Ok(telemetry)
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn log_file_path(&self) -> Option<&Path> {
        self.log_file.as_ref().map(|(path, _)| path.as_path())
    }

    /// Write the closing line and flush the log file
    pub fn close(self) {
        if let Some((path, file)) = &self.log_file {
            tracing::dispatcher::with_default(&self.dispatch, || {
                info!(log_file = %path.display(), "Agent run finished");
            });
            let _ = (&**file).flush();
        }
    }
}
