//! Steward SDK - the goal-agent decision loop
//!
//! This crate composes the core memory engine with the collaborators a running
//! agent needs:
//!
//! # Core Modules (from steward-core)
//!
//! - **db** - Direct SQLite database access
//! - **memory** - Decision, note and summary stores, patterns, summaries, retention
//! - **types** - Decision, note and summary records
//!
//! # SDK Modules
//!
//! - **oracle** - Reasoning oracle interface, Gemini client and scripted oracle
//! - **tools** - Tool contract, registry and the note-taking, calculator and todo tools
//! - **agent** - Single decision cycle and the long-running runner
//! - **config** - Configuration for all of the above
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use steward_sdk::{Agent, Database, Runner, StewardConfig, oracle};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = StewardConfig::new("Run three times a week");
//!     let db = Arc::new(Database::open("steward.db")?);
//!     let oracle = oracle::from_config(&config.oracle)?;
//!
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     let mut runner = Runner::new(Agent::new(config, db, oracle)?);
//!     runner.run(shutdown_rx).await?;
//!     Ok(())
//! }
//! ```

// ─────────────────────────────────────────────────────────────────────────────
// Re-export core modules from steward-core
// ─────────────────────────────────────────────────────────────────────────────

/// Direct SQLite database access
pub use steward_core::db;

/// Decision memory engine
pub use steward_core::memory;

/// Record types
pub use steward_core::types;

/// Injectable time source
pub use steward_core::clock;

pub use steward_core::{Clock, Database};

// ─────────────────────────────────────────────────────────────────────────────
// SDK modules
// ─────────────────────────────────────────────────────────────────────────────

pub mod agent;
pub mod config;
pub mod error;
pub mod oracle;
pub mod tools;

pub use agent::{Agent, CycleReport, Runner};
pub use config::{ConfigValidationError, StewardConfig};
pub use error::{AgentError, AgentResult};
pub use oracle::{Oracle, OracleDecision, OracleError};
pub use tools::{Tool, ToolKind, ToolParams, ToolRegistry};
