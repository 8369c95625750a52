//! Maintenance commands: forced summaries, pruning, tools and status.

use anyhow::{Context, Result, bail};
use chrono::{Days, NaiveDate};
use colored::Colorize;
use steward_core::memory::{
    DbMemoryStore, DecisionStore, NoteStore, RetentionPolicy, SummaryStore, SummaryWindow,
    create_summary,
};
use steward_core::types::SummaryType;
use steward_sdk::ToolRegistry;

use super::history::print_summary;
use super::open_database;
use crate::config::Config;

/// Create the summary for the window ending on `date` (default: yesterday).
pub fn summarize(summary_type: SummaryType, date: Option<NaiveDate>, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let today = db.clock().now().date_naive();
    let last = match date {
        Some(date) => date,
        None => today
            .checked_sub_days(Days::new(1))
            .context("Date out of range")?,
    };

    let window = SummaryWindow::ending_on(summary_type, last);
    let store = DbMemoryStore::new(db);
    let existing = store.find_summary(summary_type, window.start, window.end)?;
    let summary = create_summary(&store, summary_type, window.start, window.end)
        .context("Failed to create summary")?;

    if existing.is_some() {
        println!("{} Summary already existed", "⚠".yellow());
    } else {
        println!("{} Created summary", "✓".green());
    }
    print_summary(&summary);
    Ok(())
}

/// Delete decisions and unprotected notes older than `days` days.
pub fn prune(days: Option<u32>, config: &Config) -> Result<()> {
    let days = days.unwrap_or(config.agent.retention.horizon_days);
    if days == 0 {
        bail!("--days must be at least 1");
    }

    let db = open_database(config)?;
    let now = db.clock().now();
    let store = DbMemoryStore::new(db);
    let policy = RetentionPolicy::new(config.agent.retention.protected_categories.clone());
    let report = policy
        .prune_older_than(&store, now, days)
        .context("Failed to prune")?;

    println!(
        "{} Removed {} decisions and {} notes older than {}",
        "✓".green(),
        report.decisions_removed,
        report.notes_removed,
        report.cutoff.format("%Y-%m-%d %H:%M")
    );
    println!(
        "  Protected categories: {}",
        policy.keep_categories().join(", ").dimmed()
    );
    Ok(())
}

/// List the tools available to the agent.
pub fn tools(config: &Config) -> Result<()> {
    let registry = ToolRegistry::with_defaults(open_database(config)?)?;

    println!("{} {} tools:", "✓".green(), registry.len());
    println!();
    for name in registry.list_tools() {
        if let Some(tool) = registry.get(name) {
            println!("  {} {}", tool.name().bold(), format!("[{}]", tool.kind()).dimmed());
            println!("     {}", tool.describe());
        }
    }
    Ok(())
}

/// Show database and configuration status.
pub fn status(config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let store = DbMemoryStore::new(db);

    println!("{} Steward Status", "📊".cyan());
    println!();

    let goal = &config.agent.goal.description;
    if goal.trim().is_empty() {
        println!("  Goal:      {}", "not configured".yellow());
    } else {
        println!("  Goal:      {}", goal.bold());
    }
    println!(
        "  Oracle:    {:?} ({})",
        config.agent.oracle.provider, config.agent.oracle.model
    );
    println!("  Database:  {}", config.database_path().display());
    println!();

    println!("  Decisions: {}", store.decision_count()?.to_string().bold());
    println!("  Notes:     {}", store.note_count()?.to_string().bold());
    println!("  Summaries: {}", store.summary_count()?.to_string().bold());
    match store.last_action_time()? {
        Some(at) => println!("  Last action: {}", at.format("%Y-%m-%d %H:%M UTC")),
        None => println!("  Last action: {}", "none".dimmed()),
    }

    println!();
    println!("  Summarized through:");
    for summary_type in SummaryType::ALL {
        let mark = store
            .summary_watermark(summary_type)?
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("    {:<8} {}", summary_type.as_str(), mark);
    }
    Ok(())
}
