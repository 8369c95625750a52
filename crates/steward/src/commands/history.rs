//! Read-only views over decision memory.

use anyhow::{Context, Result};
use colored::Colorize;
use steward_core::memory::{
    ContextAssembler, DbMemoryStore, DecisionStore, MemoryConfig, NoteStore, SummaryStore,
};
use steward_core::types::{DecisionRecord, SummaryRecord, SummaryType};

use super::open_database;
use crate::config::Config;

/// Show decisions from the last `hours` hours, newest first.
pub fn decisions(hours: i64, json: bool, config: &Config) -> Result<()> {
    let store = DbMemoryStore::new(open_database(config)?);
    let decisions = store.recent(hours).context("Failed to load decisions")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&decisions)?);
        return Ok(());
    }

    if decisions.is_empty() {
        println!("{} No decisions in the last {}h", "⚠".yellow(), hours);
        return Ok(());
    }

    println!(
        "{} {} decisions in the last {}h:",
        "✓".green(),
        decisions.len(),
        hours
    );
    println!();
    for decision in &decisions {
        print_decision(decision);
    }
    Ok(())
}

fn print_decision(decision: &DecisionRecord) {
    let marker = match (decision.tool(), &decision.result) {
        (Some(_), Some(result)) if result.is_success() => "●".green(),
        (Some(_), Some(_)) => "●".red(),
        (Some(_), None) => "●".yellow(),
        _ => "○".dimmed(),
    };

    println!(
        "{} #{} {} {}",
        marker,
        decision.id,
        decision.timestamp.format("%Y-%m-%d %H:%M").to_string().dimmed(),
        decision.kind
    );
    if let Some(tool) = decision.tool() {
        println!("     Tool: {}", tool.bold());
    }
    if !decision.analysis.is_empty() {
        println!("     {}", decision.analysis);
    }
    if !decision.next_check.is_empty() {
        println!("     Next check: {}", decision.next_check.dimmed());
    }
}

/// Show recent notes.
pub fn notes(limit: usize, category: Option<&str>, config: &Config) -> Result<()> {
    let store = DbMemoryStore::new(open_database(config)?);
    let notes = store
        .read_recent(limit, category)
        .context("Failed to load notes")?;

    if notes.is_empty() {
        println!("{} No notes found", "⚠".yellow());
        return Ok(());
    }

    println!("{} {} notes:", "✓".green(), notes.len());
    println!();
    for note in &notes {
        println!(
            "  [{}] {} {}",
            note.category.cyan(),
            note.content,
            note.timestamp.format("(%Y-%m-%d %H:%M)").to_string().dimmed()
        );
    }
    Ok(())
}

/// Show stored summaries, newest first.
pub fn summaries(
    limit: usize,
    summary_type: Option<SummaryType>,
    json: bool,
    config: &Config,
) -> Result<()> {
    let store = DbMemoryStore::new(open_database(config)?);
    let summaries = match summary_type {
        Some(summary_type) => store.summaries_of_type(summary_type, limit),
        None => store.recent_summaries(limit),
    }
    .context("Failed to load summaries")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("{} No summaries yet", "⚠".yellow());
        return Ok(());
    }

    println!("{} {} summaries:", "✓".green(), summaries.len());
    println!();
    for summary in &summaries {
        print_summary(summary);
    }
    Ok(())
}

pub(crate) fn print_summary(summary: &SummaryRecord) {
    let payload = &summary.payload;
    println!(
        "  {} {} to {}",
        summary.summary_type.to_string().bold(),
        summary.start_date.format("%Y-%m-%d"),
        summary.end_date.format("%Y-%m-%d")
    );
    println!(
        "     {} decisions, {} actions, {} successful ({:.0}%)",
        payload.total_decisions,
        payload.actions_taken,
        payload.successful_actions,
        payload.period_analysis.effectiveness.overall_rate * 100.0
    );
    if !payload.period_analysis.common_actions.is_empty() {
        let common: Vec<String> = payload
            .period_analysis
            .common_actions
            .iter()
            .map(|a| format!("{} ({})", a.tool, a.count))
            .collect();
        println!("     Common actions: {}", common.join(", "));
    }
    for pattern in &payload.period_analysis.patterns {
        println!("     {}", pattern.description.dimmed());
    }
}

/// Show the patterns the next cycle would see.
pub fn patterns(config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let now = db.clock().now();
    let store = DbMemoryStore::new(db);
    let last_action = store.last_action_time()?;
    let assembler = ContextAssembler::new(store, MemoryConfig::from(&config.agent.memory));

    let context = assembler
        .build_context(now, last_action)
        .context("Failed to build context")?;

    if context.patterns.is_empty() {
        println!("{} No patterns detected yet", "⚠".yellow());
        return Ok(());
    }

    println!("{} {} patterns:", "✓".green(), context.patterns.len());
    println!();
    for pattern in &context.patterns {
        println!("  {} {}", pattern.kind.as_str().cyan(), pattern.description);
    }
    Ok(())
}
