//! steward - goal agent CLI
//!
//! Runs the decision loop and exposes read-only views and maintenance
//! commands over its memory.

use anyhow::Result;
use clap::Parser;
use tracing::instrument::WithSubscriber;

mod cli;
mod commands;
mod config;
mod telemetry;

use cli::{Cli, Commands};
use config::Config;
use telemetry::Telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.database {
        config.agent.database_path = Some(path);
    }

    // Only `run` gets a per-invocation log file
    let log_dir = (matches!(cli.command, Commands::Run { .. }) && config.logging.file)
        .then(|| config.log_dir());
    let telemetry = Telemetry::init(&config.logging, log_dir.as_deref())?;

    let result = commands::execute(cli.command, &config)
        .with_subscriber(telemetry.dispatch().clone())
        .await;

    telemetry.close();
    result
}
