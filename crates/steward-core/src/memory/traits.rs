//! Store traits defining the interface for decision memory operations.

use crate::error::Result;
use crate::types::{
    DecisionRecord, JsonMap, NewDecision, NoteRecord, SummaryPayload, SummaryRecord, SummaryType,
};
use chrono::{DateTime, Utc};

/// Append-only log of decision records.
///
/// Implementations assign ids and timestamps; callers never supply them.
pub trait DecisionStore: Send + Sync {
    /// Append a decision, returning its id.
    fn append(&self, decision: &NewDecision) -> Result<i64>;

    /// Decisions with `timestamp > now - window_hours`, newest first.
    fn recent(&self, window_hours: i64) -> Result<Vec<DecisionRecord>>;

    /// Decisions with `start <= timestamp <= end`, oldest first.
    fn in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<DecisionRecord>>;

    /// Remove decisions with `timestamp < cutoff`. Irreversible.
    fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    fn get(&self, id: i64) -> Result<Option<DecisionRecord>>;

    /// Newest `limit` decisions made within `radius` hours of `hour` on any day,
    /// oldest first.
    fn same_hour_cohort(&self, hour: u32, radius: u32, limit: usize)
    -> Result<Vec<DecisionRecord>>;

    /// When a tool was last invoked.
    fn last_action_time(&self) -> Result<Option<DateTime<Utc>>>;

    fn earliest_timestamp(&self) -> Result<Option<DateTime<Utc>>>;

    fn decision_count(&self) -> Result<usize>;
}

/// Freeform timestamped notes.
pub trait NoteStore: Send + Sync {
    /// Store a note. Fails with a validation error when `content` is blank.
    fn write(&self, content: &str, category: Option<&str>, metadata: &JsonMap)
    -> Result<NoteRecord>;

    /// Newest notes first.
    fn read_recent(&self, limit: usize, category: Option<&str>) -> Result<Vec<NoteRecord>>;

    /// Remove notes older than `cutoff` whose category is not in `keep_categories`.
    fn delete_notes_before(&self, cutoff: DateTime<Utc>, keep_categories: &[String])
    -> Result<usize>;

    fn note_count(&self) -> Result<usize>;
}

/// Write-once summaries and their trigger watermarks. There is no delete.
pub trait SummaryStore: Send + Sync {
    /// Persist a summary; returns the existing row if the window was already summarised.
    fn insert_summary(
        &self,
        summary_type: SummaryType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        payload: &SummaryPayload,
    ) -> Result<SummaryRecord>;

    /// Most recently computed first.
    fn recent_summaries(&self, limit: usize) -> Result<Vec<SummaryRecord>>;

    fn summaries_of_type(&self, summary_type: SummaryType, limit: usize)
    -> Result<Vec<SummaryRecord>>;

    fn find_summary(
        &self,
        summary_type: SummaryType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<SummaryRecord>>;

    fn summary_watermark(&self, summary_type: SummaryType) -> Result<Option<DateTime<Utc>>>;

    fn set_summary_watermark(&self, summary_type: SummaryType, through: DateTime<Utc>)
    -> Result<()>;

    fn summary_count(&self) -> Result<usize>;
}

/// Combined memory store.
///
/// Provides all record families plus a pruning operation that spans them.
pub trait MemoryStore: DecisionStore + NoteStore + SummaryStore {
    /// Delete decisions and unprotected notes older than `cutoff`.
    ///
    /// Returns `(decisions_removed, notes_removed)`.
    fn prune_before(&self, cutoff: DateTime<Utc>, keep_categories: &[String])
    -> Result<(usize, usize)>;
}
