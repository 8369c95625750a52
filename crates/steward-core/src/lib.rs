//! steward-core - Core library for Steward
//!
//! This crate owns every record the decision loop produces and the logic that
//! turns raw history back into context:
//!
//! - **db**: Direct SQLite database access (decisions, notes, summaries)
//! - **memory**: Stores, pattern detection, summarization, context assembly, retention
//! - **types**: Record types shared with the SDK and CLI
//! - **clock**: Injectable time source used for store-assigned timestamps

pub mod clock;
pub mod db;
pub mod error;
pub mod memory;
pub mod types;

// Re-export commonly used types
pub use clock::Clock;
pub use db::Database;
pub use error::{Error, Result};
