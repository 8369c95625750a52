//! Schema migrations
//!
//! SQL migrations are embedded as strings and executed when a database is opened.
//! Every statement is `IF NOT EXISTS`, so running them again is harmless.

use crate::error::Result;
use rusqlite::Connection;

/// Decisions, summaries, notes and summary watermarks (001)
pub const CORE_TABLES_SQL: &str = include_str!("001_core_tables.sql");

/// Run all core migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(CORE_TABLES_SQL)?;
    Ok(())
}
