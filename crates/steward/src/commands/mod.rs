//! Command implementations for the steward CLI.

pub mod history;
pub mod maintenance;
pub mod run;

use anyhow::{Context, Result};
use std::sync::Arc;
use steward_core::Database;

use crate::cli::Commands;
use crate::config::Config;

/// Execute a parsed command.
pub async fn execute(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run { once, dry_run } => run::execute(once, dry_run, config).await,
        Commands::Decisions { hours, json } => history::decisions(hours, json, config),
        Commands::Notes { limit, category } => history::notes(limit, category.as_deref(), config),
        Commands::Summaries {
            limit,
            summary_type,
            json,
        } => history::summaries(limit, summary_type.map(Into::into), json, config),
        Commands::Patterns => history::patterns(config),
        Commands::Summarize { summary_type, date } => {
            maintenance::summarize(summary_type.into(), date, config)
        }
        Commands::Prune { days } => maintenance::prune(days, config),
        Commands::Tools => maintenance::tools(config),
        Commands::Status => maintenance::status(config),
        Commands::Version => {
            println!("steward {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Open the configured database, creating it if needed.
pub fn open_database(config: &Config) -> Result<Arc<Database>> {
    let path = config.database_path();
    let db = Database::open(&path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(Arc::new(db))
}
