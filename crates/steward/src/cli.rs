//! CLI argument definitions using clap derive macros.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use steward_core::types::SummaryType;

/// Steward - goal agent with decision memory
///
/// Runs a reasoning loop towards a configured goal, remembers every decision
/// and compacts history into daily, weekly and monthly summaries.
#[derive(Parser, Debug)]
#[command(name = "steward")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to $STEWARD_CONFIG or the platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long, global = true, value_name = "PATH")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the decision loop
    Run {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,

        /// Use a scripted oracle that never acts (no network)
        #[arg(long)]
        dry_run: bool,
    },

    /// Show recent decisions
    Decisions {
        /// Window in hours
        #[arg(long, default_value_t = 24)]
        hours: i64,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show recent notes
    Notes {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        #[arg(short, long)]
        category: Option<String>,
    },

    /// Show stored summaries, newest first
    Summaries {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Only summaries of this type
        #[arg(short = 't', long = "type")]
        summary_type: Option<SummaryKind>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show patterns detected over recent history
    Patterns,

    /// Create the summary for the window ending on a date
    Summarize {
        summary_type: SummaryKind,

        /// Last day of the window (defaults to yesterday)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Delete old decisions and unprotected notes
    Prune {
        /// Keep this many days (defaults to retention.horizon_days)
        #[arg(long)]
        days: Option<u32>,
    },

    /// List available tools
    Tools,

    /// Show database and configuration status
    Status,

    /// Print version
    Version,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummaryKind {
    Daily,
    Weekly,
    Monthly,
}

impl From<SummaryKind> for SummaryType {
    fn from(kind: SummaryKind) -> Self {
        match kind {
            SummaryKind::Daily => SummaryType::Daily,
            SummaryKind::Weekly => SummaryType::Weekly,
            SummaryKind::Monthly => SummaryType::Monthly,
        }
    }
}
