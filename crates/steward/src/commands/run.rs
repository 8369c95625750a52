//! Run command: the decision loop.

use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;
use steward_sdk::oracle::{self, Oracle, ScriptedOracle};
use steward_sdk::types::DecisionKind;
use steward_sdk::{Agent, CycleReport, Runner};
use tokio::sync::watch;
use tracing::instrument::WithSubscriber;
use tracing::warn;

use super::open_database;
use crate::config::Config;

/// Execute run command.
pub async fn execute(once: bool, dry_run: bool, config: &Config) -> Result<()> {
    let db = open_database(config)?;

    let oracle: Arc<dyn Oracle> = if dry_run {
        Arc::new(ScriptedOracle::idle())
    } else {
        oracle::from_config(&config.agent.oracle).context("Failed to configure oracle")?
    };

    let mut agent =
        Agent::new(config.agent.clone(), db, oracle).context("Failed to start agent")?;

    if once {
        let report = agent.run_cycle().await?;
        print_report(&report);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    let _ = shutdown_tx.send(true);
                }
                Err(e) => {
                    // Dropping the sender would stop the loop, so hold it
                    warn!(error = %e, "Unable to listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            }
        }
        .with_current_subscriber(),
    );

    println!(
        "{} Working towards: {}",
        "▶".green(),
        config.agent.goal.description.bold()
    );
    println!(
        "  Checking every {}s. Press Ctrl-C to stop.",
        config.agent.schedule.check_interval_secs
    );

    let completed = Runner::new(agent).run(shutdown_rx).await?;
    println!("{} Stopped after {} cycles", "✓".green(), completed);
    Ok(())
}

fn print_report(report: &CycleReport) {
    let decision = &report.decision;
    let kind = match decision.kind {
        DecisionKind::Action => decision.kind.to_string().cyan(),
        DecisionKind::NoAction => decision.kind.to_string().dimmed(),
    };

    println!("{} Cycle {} recorded decision #{}", "✓".green(), report.cycle, decision.id);
    if report.oracle_failed {
        println!("  {} Oracle failed, fallback decision recorded", "⚠".yellow());
    }
    println!("  Decision:   {}", kind);
    if let Some(tool) = decision.tool() {
        let status = match &decision.result {
            Some(result) if result.is_success() => "success".green(),
            Some(_) => "error".red(),
            None => "no result".dimmed(),
        };
        println!("  Tool:       {} ({})", tool.bold(), status);
        if let Some(message) = decision.result.as_ref().and_then(|r| r.message.as_deref()) {
            println!("  Message:    {}", message);
        }
    }
    println!("  Analysis:   {}", decision.analysis);
    println!("  Reasoning:  {}", decision.reasoning);
    if !decision.next_check.is_empty() {
        println!("  Next check: {}", decision.next_check);
    }

    for summary in &report.summaries_created {
        println!(
            "  {} {} summary {} to {}",
            "+".green(),
            summary.summary_type,
            summary.start_date.format("%Y-%m-%d"),
            summary.end_date.format("%Y-%m-%d")
        );
    }
    if let Some(prune) = report.prune.as_ref().filter(|p| p.has_changes()) {
        println!(
            "  Pruned {} decisions and {} notes",
            prune.decisions_removed, prune.notes_removed
        );
    }
}
