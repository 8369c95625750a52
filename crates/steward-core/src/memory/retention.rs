//! Retention policy for decisions and notes.
//!
//! Summaries are never pruned: they stay valid after the decisions they were
//! computed from are gone.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use super::traits::MemoryStore;

/// Note categories that survive pruning by default
pub const PROTECTED_CATEGORIES: [&str; 2] = ["important", "milestone"];

/// Result of a retention run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub cutoff: DateTime<Utc>,
    pub decisions_removed: usize,
    pub notes_removed: usize,
}

impl PruneReport {
    pub fn has_changes(&self) -> bool {
        self.decisions_removed > 0 || self.notes_removed > 0
    }
}

#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    keep_categories: Vec<String>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(PROTECTED_CATEGORIES.iter().map(|c| c.to_string()).collect())
    }
}

impl RetentionPolicy {
    pub fn new(keep_categories: Vec<String>) -> Self {
        Self { keep_categories }
    }

    pub fn keep_categories(&self) -> &[String] {
        &self.keep_categories
    }

    /// Delete decisions older than `cutoff` and notes older than `cutoff`
    /// outside the protected categories.
    pub fn prune<S: MemoryStore + ?Sized>(
        &self,
        store: &S,
        cutoff: DateTime<Utc>,
    ) -> Result<PruneReport> {
        let (decisions_removed, notes_removed) =
            store.prune_before(cutoff, &self.keep_categories)?;
        let report = PruneReport {
            cutoff,
            decisions_removed,
            notes_removed,
        };
        info!(
            cutoff = %cutoff,
            decisions_removed,
            notes_removed,
            "Retention pass complete"
        );
        Ok(report)
    }

    /// Prune everything older than `days` days before `now`.
    pub fn prune_older_than<S: MemoryStore + ?Sized>(
        &self,
        store: &S,
        now: DateTime<Utc>,
        days: u32,
    ) -> Result<PruneReport> {
        if days == 0 {
            return Err(Error::validation("days", "retention horizon must be at least one day"));
        }
        self.prune(store, now - Duration::days(i64::from(days)))
    }
}
