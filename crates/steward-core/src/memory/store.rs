//! Database-backed memory store implementation.

use crate::db::Database;
use crate::error::Result;
use crate::types::{
    DecisionRecord, JsonMap, NewDecision, NoteRecord, SummaryPayload, SummaryRecord, SummaryType,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::traits::{DecisionStore, MemoryStore, NoteStore, SummaryStore};

/// Database-backed memory store.
///
/// Uses SQLite via the Database struct for persistent storage. Cloning is
/// cheap and every clone shares the same connection.
#[derive(Clone)]
pub struct DbMemoryStore {
    db: Arc<Database>,
}

impl DbMemoryStore {
    /// Create a new database-backed memory store.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The underlying database.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }
}

impl DecisionStore for DbMemoryStore {
    fn append(&self, decision: &NewDecision) -> Result<i64> {
        self.db.append_decision(decision)
    }

    fn recent(&self, window_hours: i64) -> Result<Vec<DecisionRecord>> {
        self.db.recent_decisions(window_hours)
    }

    fn in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<DecisionRecord>> {
        self.db.decisions_in_range(start, end)
    }

    fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.db.delete_decisions_before(cutoff)
    }

    fn get(&self, id: i64) -> Result<Option<DecisionRecord>> {
        self.db.get_decision(id)
    }

    fn same_hour_cohort(
        &self,
        hour: u32,
        radius: u32,
        limit: usize,
    ) -> Result<Vec<DecisionRecord>> {
        self.db.same_hour_cohort(hour, radius, limit)
    }

    fn last_action_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.db.last_action_time()
    }

    fn earliest_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        self.db.earliest_decision_time()
    }

    fn decision_count(&self) -> Result<usize> {
        self.db.count_decisions()
    }
}

impl NoteStore for DbMemoryStore {
    fn write(
        &self,
        content: &str,
        category: Option<&str>,
        metadata: &JsonMap,
    ) -> Result<NoteRecord> {
        self.db.write_note(content, category, metadata)
    }

    fn read_recent(&self, limit: usize, category: Option<&str>) -> Result<Vec<NoteRecord>> {
        self.db.recent_notes(limit, category)
    }

    fn delete_notes_before(
        &self,
        cutoff: DateTime<Utc>,
        keep_categories: &[String],
    ) -> Result<usize> {
        self.db.delete_notes_before(cutoff, keep_categories)
    }

    fn note_count(&self) -> Result<usize> {
        self.db.count_notes()
    }
}

impl SummaryStore for DbMemoryStore {
    fn insert_summary(
        &self,
        summary_type: SummaryType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        payload: &SummaryPayload,
    ) -> Result<SummaryRecord> {
        self.db.insert_summary(summary_type, start, end, payload)
    }

    fn recent_summaries(&self, limit: usize) -> Result<Vec<SummaryRecord>> {
        self.db.recent_summaries(limit)
    }

    fn summaries_of_type(
        &self,
        summary_type: SummaryType,
        limit: usize,
    ) -> Result<Vec<SummaryRecord>> {
        self.db.summaries_of_type(summary_type, limit)
    }

    fn find_summary(
        &self,
        summary_type: SummaryType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<SummaryRecord>> {
        self.db.find_summary(summary_type, start, end)
    }

    fn summary_watermark(&self, summary_type: SummaryType) -> Result<Option<DateTime<Utc>>> {
        self.db.summary_watermark(summary_type)
    }

    fn set_summary_watermark(
        &self,
        summary_type: SummaryType,
        through: DateTime<Utc>,
    ) -> Result<()> {
        self.db.set_summary_watermark(summary_type, through)
    }

    fn summary_count(&self) -> Result<usize> {
        self.db.count_summaries()
    }
}

impl MemoryStore for DbMemoryStore {
    fn prune_before(
        &self,
        cutoff: DateTime<Utc>,
        keep_categories: &[String],
    ) -> Result<(usize, usize)> {
        self.db.prune_before(cutoff, keep_categories)
    }
}
