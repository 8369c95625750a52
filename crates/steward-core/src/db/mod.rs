//! Direct SQLite database access for steward.
//!
//! This module provides read/write access to the decision memory tables:
//! decisions, notes, memory summaries and summary watermarks. Tools that own
//! their own tables (the todo list) reach the same connection through
//! [`Database::with_connection`].
//!
//! Timestamps of decisions, notes and summaries are always assigned here from
//! the database's [`Clock`], never by callers.

pub mod migrations;

use crate::clock::{Clock, from_millis};
use crate::error::{Error, Result};
use crate::types::{
    DEFAULT_NOTE_CATEGORY, DecisionKind, DecisionRecord, JsonMap, NewDecision, NoteRecord,
    SummaryPayload, SummaryRecord, SummaryType,
};
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

const MILLIS_PER_HOUR: i64 = 3_600_000;

const DECISION_COLUMNS: &str =
    "id, timestamp, analysis, decision, reasoning, action_details, action_result, next_check";
const NOTE_COLUMNS: &str = "id, content, timestamp, category, metadata";
const SUMMARY_COLUMNS: &str = "id, summary_type, start_date, end_date, payload, created_at";

/// Database connection wrapper.
///
/// Thread-safe via internal Mutex. All database operations acquire the lock,
/// which gives the single-writer guarantee the decision loop relies on.
pub struct Database {
    conn: Mutex<Connection>,
    clock: Clock,
}

impl Database {
    /// Open (or create) the database at `path` using the system clock
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_clock(path, Clock::system())
    }

    /// Open (or create) the database at `path` with an explicit clock
    pub fn open_with_clock(path: impl AsRef<Path>, clock: Clock) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;
        migrations::run_migrations(&conn)?;
        debug!(path = %path.display(), "Opened decision database");

        Ok(Self {
            conn: Mutex::new(conn),
            clock,
        })
    }

    /// Open a private in-memory database using the system clock
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with_clock(Clock::system())
    }

    /// Open a private in-memory database with an explicit clock
    pub fn open_in_memory_with_clock(clock: Clock) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            clock,
        })
    }

    /// The clock used for store-assigned timestamps
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Check database connectivity
    pub fn ping(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Run `f` against the underlying connection while holding the lock.
    ///
    /// Used by components that own tables outside the core schema.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Decision Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a decision and return its id.
    ///
    /// The timestamp is `max(now, newest stored timestamp)`, so stored order never
    /// goes backwards even if the wall clock does. Records that break the
    /// action/result invariants are normalised, never rejected.
    pub fn append_decision(&self, decision: &NewDecision) -> Result<i64> {
        let mut decision = decision.clone();
        if decision.normalize() {
            warn!(
                kind = %decision.kind,
                "Dropped action fields inconsistent with decision kind"
            );
        }

        let action_details = decision
            .action
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let action_result = decision
            .result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.lock()?;
        let latest: Option<i64> =
            conn.query_row("SELECT MAX(timestamp) FROM decisions", [], |row| row.get(0))?;
        let now = self.clock.now().timestamp_millis();
        let timestamp = latest.map_or(now, |latest| latest.max(now));

        conn.execute(
            "INSERT INTO decisions
             (timestamp, analysis, decision, reasoning, action_details, action_result, next_check)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                timestamp,
                decision.analysis,
                decision.kind.as_str(),
                decision.reasoning,
                action_details,
                action_result,
                decision.next_check,
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(decision_id = id, kind = %decision.kind, "Appended decision");
        Ok(id)
    }

    /// Decisions newer than `now - window_hours`, newest first
    pub fn recent_decisions(&self, window_hours: i64) -> Result<Vec<DecisionRecord>> {
        let now = self.clock.now().timestamp_millis();
        let cutoff = now.saturating_sub(window_hours.saturating_mul(MILLIS_PER_HOUR));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DECISION_COLUMNS} FROM decisions
             WHERE timestamp > ?1
             ORDER BY timestamp DESC, id DESC"
        ))?;
        let decisions = stmt
            .query_map(params![cutoff], Self::map_decision)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(decisions)
    }

    /// Decisions with `start <= timestamp <= end`, oldest first
    pub fn decisions_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DecisionRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DECISION_COLUMNS} FROM decisions
             WHERE timestamp BETWEEN ?1 AND ?2
             ORDER BY timestamp ASC, id ASC"
        ))?;
        let decisions = stmt
            .query_map(
                params![start.timestamp_millis(), end.timestamp_millis()],
                Self::map_decision,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(decisions)
    }

    /// Get decision by ID
    pub fn get_decision(&self, id: i64) -> Result<Option<DecisionRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DECISION_COLUMNS} FROM decisions WHERE id = ?1"
        ))?;
        Ok(stmt.query_row(params![id], Self::map_decision).optional()?)
    }

    /// The newest `limit` decisions whose UTC hour-of-day lies within `radius`
    /// hours of `hour` (wrapping around midnight), oldest first
    pub fn same_hour_cohort(
        &self,
        hour: u32,
        radius: u32,
        limit: usize,
    ) -> Result<Vec<DecisionRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DECISION_COLUMNS} FROM (
                 SELECT *, CAST(strftime('%H', timestamp / 1000, 'unixepoch') AS INTEGER) AS hod
                 FROM decisions
             )
             WHERE (hod - ?1 + 24) % 24 <= ?2 OR (?1 - hod + 24) % 24 <= ?2
             ORDER BY timestamp DESC, id DESC
             LIMIT ?3"
        ))?;
        let mut decisions = stmt
            .query_map(
                params![i64::from(hour % 24), i64::from(radius), limit as i64],
                Self::map_decision,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        decisions.reverse();
        Ok(decisions)
    }

    /// Timestamp of the newest Action decision that named a tool
    pub fn last_action_time(&self) -> Result<Option<DateTime<Utc>>> {
        let conn = self.lock()?;
        let latest: Option<i64> = conn.query_row(
            "SELECT MAX(timestamp) FROM decisions
             WHERE decision = ?1 AND action_details IS NOT NULL",
            params![DecisionKind::Action.as_str()],
            |row| row.get(0),
        )?;
        Ok(latest.map(from_millis))
    }

    /// Timestamp of the oldest stored decision
    pub fn earliest_decision_time(&self) -> Result<Option<DateTime<Utc>>> {
        let conn = self.lock()?;
        let earliest: Option<i64> =
            conn.query_row("SELECT MIN(timestamp) FROM decisions", [], |row| row.get(0))?;
        Ok(earliest.map(from_millis))
    }

    pub fn count_decisions(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM decisions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Remove decisions with `timestamp < cutoff`
    pub fn delete_decisions_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM decisions WHERE timestamp < ?1",
            params![cutoff.timestamp_millis()],
        )?;
        Ok(removed)
    }

    fn map_decision(row: &rusqlite::Row) -> rusqlite::Result<DecisionRecord> {
        let kind: String = row.get(3)?;
        let kind = kind
            .parse::<DecisionKind>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into()))?;

        Ok(DecisionRecord {
            id: row.get(0)?,
            timestamp: from_millis(row.get(1)?),
            analysis: row.get(2)?,
            kind,
            reasoning: row.get(4)?,
            action: optional_json_column(row, 5)?,
            result: optional_json_column(row, 6)?,
            next_check: row.get(7)?,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Note Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a note. Blank content is rejected; a blank category becomes "general".
    pub fn write_note(
        &self,
        content: &str,
        category: Option<&str>,
        metadata: &JsonMap,
    ) -> Result<NoteRecord> {
        if content.trim().is_empty() {
            return Err(Error::validation("content", "note content is required"));
        }
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_NOTE_CATEGORY);
        let metadata_json = serde_json::to_string(metadata)?;
        let timestamp = self.clock.now();

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO notes (content, timestamp, category, metadata)
             VALUES (?1, ?2, ?3, ?4)",
            params![content, timestamp.timestamp_millis(), category, metadata_json],
        )?;
        let id = conn.last_insert_rowid();
        debug!(note_id = id, category, "Stored note");

        Ok(NoteRecord {
            id,
            content: content.to_string(),
            timestamp: from_millis(timestamp.timestamp_millis()),
            category: category.to_string(),
            metadata: metadata.clone(),
        })
    }

    /// Newest notes first, optionally restricted to one category
    pub fn recent_notes(&self, limit: usize, category: Option<&str>) -> Result<Vec<NoteRecord>> {
        let conn = self.lock()?;
        let notes = if let Some(category) = category {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes
                 WHERE category = ?1
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?2"
            ))?;
            stmt.query_map(params![category, limit as i64], Self::map_note)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1"
            ))?;
            stmt.query_map(params![limit as i64], Self::map_note)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };
        Ok(notes)
    }

    pub fn count_notes(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Remove notes with `timestamp < cutoff` unless their category is kept
    pub fn delete_notes_before(
        &self,
        cutoff: DateTime<Utc>,
        keep_categories: &[String],
    ) -> Result<usize> {
        let conn = self.lock()?;
        delete_notes(&conn, cutoff, keep_categories)
    }

    fn map_note(row: &rusqlite::Row) -> rusqlite::Result<NoteRecord> {
        Ok(NoteRecord {
            id: row.get(0)?,
            content: row.get(1)?,
            timestamp: from_millis(row.get(2)?),
            category: row.get(3)?,
            metadata: json_column(row, 4)?,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Retention
    // ─────────────────────────────────────────────────────────────────────────

    /// Delete old decisions and unprotected notes in one transaction.
    ///
    /// Returns `(decisions_removed, notes_removed)`. Summaries and watermarks
    /// are never touched.
    pub fn prune_before(
        &self,
        cutoff: DateTime<Utc>,
        keep_categories: &[String],
    ) -> Result<(usize, usize)> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let decisions = tx.execute(
            "DELETE FROM decisions WHERE timestamp < ?1",
            params![cutoff.timestamp_millis()],
        )?;
        let notes = delete_notes(&tx, cutoff, keep_categories)?;
        tx.commit()?;
        Ok((decisions, notes))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Summary Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist a summary for `(summary_type, start, end)`.
    ///
    /// Write-once: if a summary for the same window already exists it is
    /// returned unchanged and no row is added.
    pub fn insert_summary(
        &self,
        summary_type: SummaryType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        payload: &SummaryPayload,
    ) -> Result<SummaryRecord> {
        let payload_json = serde_json::to_string(payload)?;
        let created_at = self.clock.now().timestamp_millis();

        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO memory_summaries
             (summary_type, start_date, end_date, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                summary_type.as_str(),
                start.timestamp_millis(),
                end.timestamp_millis(),
                payload_json,
                created_at,
            ],
        )?;
        if inserted == 0 {
            debug!(
                summary_type = %summary_type,
                window_start = %start,
                window_end = %end,
                "Summary already exists for window"
            );
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM memory_summaries
             WHERE summary_type = ?1 AND start_date = ?2 AND end_date = ?3"
        ))?;
        let record = stmt.query_row(
            params![
                summary_type.as_str(),
                start.timestamp_millis(),
                end.timestamp_millis()
            ],
            Self::map_summary,
        )?;
        Ok(record)
    }

    /// Most recently computed summaries first
    pub fn recent_summaries(&self, limit: usize) -> Result<Vec<SummaryRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM memory_summaries
             ORDER BY created_at DESC, id DESC
             LIMIT ?1"
        ))?;
        let summaries = stmt
            .query_map(params![limit as i64], Self::map_summary)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    /// Summaries of one type, latest window first
    pub fn summaries_of_type(
        &self,
        summary_type: SummaryType,
        limit: usize,
    ) -> Result<Vec<SummaryRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM memory_summaries
             WHERE summary_type = ?1
             ORDER BY end_date DESC, id DESC
             LIMIT ?2"
        ))?;
        let summaries = stmt
            .query_map(params![summary_type.as_str(), limit as i64], Self::map_summary)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    pub fn find_summary(
        &self,
        summary_type: SummaryType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<SummaryRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM memory_summaries
             WHERE summary_type = ?1 AND start_date = ?2 AND end_date = ?3"
        ))?;
        Ok(stmt
            .query_row(
                params![
                    summary_type.as_str(),
                    start.timestamp_millis(),
                    end.timestamp_millis()
                ],
                Self::map_summary,
            )
            .optional()?)
    }

    pub fn count_summaries(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM memory_summaries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// End of the last window summarised for `summary_type`
    pub fn summary_watermark(&self, summary_type: SummaryType) -> Result<Option<DateTime<Utc>>> {
        let conn = self.lock()?;
        let through: Option<i64> = conn
            .query_row(
                "SELECT summarized_through FROM summary_watermarks WHERE summary_type = ?1",
                params![summary_type.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(through.map(from_millis))
    }

    /// Record that every window of `summary_type` ending at or before `through`
    /// has been handled. Watermarks only move forward.
    pub fn set_summary_watermark(
        &self,
        summary_type: SummaryType,
        through: DateTime<Utc>,
    ) -> Result<()> {
        let now = self.clock.now().timestamp_millis();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO summary_watermarks (summary_type, summarized_through, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(summary_type) DO UPDATE SET
                 summarized_through = MAX(summarized_through, excluded.summarized_through),
                 updated_at = excluded.updated_at",
            params![summary_type.as_str(), through.timestamp_millis(), now],
        )?;
        Ok(())
    }

    fn map_summary(row: &rusqlite::Row) -> rusqlite::Result<SummaryRecord> {
        let summary_type: String = row.get(1)?;
        let summary_type = summary_type
            .parse::<SummaryType>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, e.into()))?;

        Ok(SummaryRecord {
            id: row.get(0)?,
            summary_type,
            start_date: from_millis(row.get(2)?),
            end_date: from_millis(row.get(3)?),
            payload: json_column(row, 4)?,
            created_at: from_millis(row.get(5)?),
        })
    }
}

fn delete_notes(
    conn: &Connection,
    cutoff: DateTime<Utc>,
    keep_categories: &[String],
) -> Result<usize> {
    let mut sql = String::from("DELETE FROM notes WHERE timestamp < ?1");
    let mut values = vec![SqlValue::Integer(cutoff.timestamp_millis())];
    if !keep_categories.is_empty() {
        let placeholders: Vec<String> = (0..keep_categories.len())
            .map(|i| format!("?{}", i + 2))
            .collect();
        sql.push_str(&format!(" AND category NOT IN ({})", placeholders.join(", ")));
        values.extend(keep_categories.iter().cloned().map(SqlValue::Text));
    }
    Ok(conn.execute(&sql, params_from_iter(values))?)
}

fn json_column<T: DeserializeOwned>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_json_column<T: DeserializeOwned>(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|text| {
        serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionDetails, ActionResult};
    use chrono::{Duration, TimeZone};

    fn test_db() -> (Database, Clock) {
        let clock = Clock::manual(Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap());
        let db = Database::open_in_memory_with_clock(clock.clone()).unwrap();
        (db, clock)
    }

    fn action(tool: &str) -> NewDecision {
        NewDecision::action("analysis", "reasoning", ActionDetails::new(tool))
            .with_result(ActionResult::success())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Decisions
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_append_assigns_ids_and_timestamps() {
        let (db, clock) = test_db();
        let first = db.append_decision(&action("calculator")).unwrap();
        clock.advance(Duration::minutes(5));
        let second = db
            .append_decision(&NewDecision::no_action("quiet", "nothing to do"))
            .unwrap();
        assert!(second > first);

        let stored = db.get_decision(second).unwrap().unwrap();
        assert_eq!(stored.timestamp, clock.now());
        assert_eq!(stored.kind, DecisionKind::NoAction);
        assert!(stored.action.is_none());
        assert!(db.get_decision(999).unwrap().is_none());
    }

    #[test]
    fn test_append_never_goes_backwards() {
        let (db, clock) = test_db();
        db.append_decision(&action("a")).unwrap();
        clock.advance(Duration::hours(-2));
        let id = db.append_decision(&action("b")).unwrap();

        let all = db.recent_decisions(i64::MAX).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, id);
        assert!(all[0].timestamp >= all[1].timestamp);
    }

    #[test]
    fn test_append_normalizes_invariants() {
        let (db, _) = test_db();
        let mut decision = action("calculator");
        decision.kind = DecisionKind::NoAction;
        let id = db.append_decision(&decision).unwrap();

        let stored = db.get_decision(id).unwrap().unwrap();
        assert!(stored.action.is_none());
        assert!(stored.result.is_none());
    }

    #[test]
    fn test_recent_window_is_exclusive() {
        let (db, clock) = test_db();
        db.append_decision(&action("old")).unwrap();
        clock.advance(Duration::hours(24));
        db.append_decision(&action("new")).unwrap();

        let recent = db.recent_decisions(24).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].tool(), Some("new"));
    }

    #[test]
    fn test_in_range_is_inclusive_and_ascending() {
        let (db, clock) = test_db();
        let start = clock.now();
        for tool in ["a", "b", "c"] {
            db.append_decision(&action(tool)).unwrap();
            clock.advance(Duration::minutes(30));
        }
        let end = start + Duration::minutes(60);

        let window = db.decisions_in_range(start, end).unwrap();
        let tools: Vec<_> = window.iter().filter_map(|d| d.tool()).collect();
        assert_eq!(tools, vec!["a", "b", "c"]);

        let narrower = db
            .decisions_in_range(start + Duration::minutes(1), end)
            .unwrap();
        assert_eq!(narrower.len(), 2);
    }

    #[test]
    fn test_delete_decisions_before() {
        let (db, clock) = test_db();
        db.append_decision(&action("a")).unwrap();
        clock.advance(Duration::days(2));
        db.append_decision(&action("b")).unwrap();

        let removed = db
            .delete_decisions_before(clock.now() - Duration::days(1))
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(db.count_decisions().unwrap(), 1);
    }

    #[test]
    fn test_same_hour_cohort_wraps_midnight() {
        let clock = Clock::manual(Utc.with_ymd_and_hms(2025, 1, 1, 23, 30, 0).unwrap());
        let db = Database::open_in_memory_with_clock(clock.clone()).unwrap();
        db.append_decision(&action("late")).unwrap();
        clock.set(Utc.with_ymd_and_hms(2025, 1, 2, 0, 30, 0).unwrap());
        db.append_decision(&action("midnight")).unwrap();
        clock.set(Utc.with_ymd_and_hms(2025, 1, 2, 12, 0, 0).unwrap());
        db.append_decision(&action("noon")).unwrap();

        let cohort = db.same_hour_cohort(0, 1, 50).unwrap();
        let tools: Vec<_> = cohort.iter().filter_map(|d| d.tool()).collect();
        assert_eq!(tools, vec!["late", "midnight"]);

        let capped = db.same_hour_cohort(0, 1, 1).unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].tool(), Some("midnight"));
    }

    #[test]
    fn test_last_action_and_earliest() {
        let (db, clock) = test_db();
        assert!(db.last_action_time().unwrap().is_none());
        assert!(db.earliest_decision_time().unwrap().is_none());

        let first = clock.now();
        db.append_decision(&action("a")).unwrap();
        clock.advance(Duration::hours(1));
        let acted = clock.now();
        db.append_decision(&action("b")).unwrap();
        clock.advance(Duration::hours(1));
        db.append_decision(&NewDecision::no_action("", "")).unwrap();

        assert_eq!(db.last_action_time().unwrap(), Some(acted));
        assert_eq!(db.earliest_decision_time().unwrap(), Some(first));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notes
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_write_note_validation_and_default_category() {
        let (db, _) = test_db();
        let err = db.write_note("   ", None, &JsonMap::new()).unwrap_err();
        assert!(err.is_validation());

        let note = db.write_note("remember this", Some(""), &JsonMap::new()).unwrap();
        assert_eq!(note.category, "general");
        assert_eq!(db.count_notes().unwrap(), 1);
    }

    #[test]
    fn test_recent_notes_order_and_filter() {
        let (db, clock) = test_db();
        for (content, category) in [("one", "general"), ("two", "important"), ("three", "general")] {
            db.write_note(content, Some(category), &JsonMap::new()).unwrap();
            clock.advance(Duration::minutes(1));
        }

        let all = db.recent_notes(10, None).unwrap();
        let contents: Vec<_> = all.iter().map(|n| n.content.as_str()).collect();
        assert_eq!(contents, vec!["three", "two", "one"]);

        let general = db.recent_notes(1, Some("general")).unwrap();
        assert_eq!(general.len(), 1);
        assert_eq!(general[0].content, "three");
    }

    #[test]
    fn test_note_metadata_round_trip() {
        let (db, _) = test_db();
        let mut metadata = JsonMap::new();
        metadata.insert("source".into(), "calculator".into());
        db.write_note("avg was 4", None, &metadata).unwrap();

        let notes = db.recent_notes(1, None).unwrap();
        assert_eq!(notes[0].metadata, metadata);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Summaries
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_insert_summary_is_write_once() {
        let (db, clock) = test_db();
        let start = clock.now() - Duration::days(1);
        let end = clock.now();
        let payload = SummaryPayload {
            total_decisions: 4,
            ..Default::default()
        };

        let first = db.insert_summary(SummaryType::Daily, start, end, &payload).unwrap();
        clock.advance(Duration::hours(1));
        let other = SummaryPayload::default();
        let second = db.insert_summary(SummaryType::Daily, start, end, &other).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.payload.total_decisions, 4);
        assert_eq!(db.count_summaries().unwrap(), 1);

        let found = db.find_summary(SummaryType::Daily, start, end).unwrap();
        assert_eq!(found.map(|s| s.id), Some(first.id));
        assert!(db.find_summary(SummaryType::Weekly, start, end).unwrap().is_none());
    }

    #[test]
    fn test_recent_summaries_by_created_at() {
        let (db, clock) = test_db();
        let base = clock.now();
        for (i, ty) in SummaryType::ALL.iter().enumerate() {
            let start = base - Duration::days(i as i64 + 1);
            db.insert_summary(*ty, start, base, &SummaryPayload::default())
                .unwrap();
            clock.advance(Duration::minutes(1));
        }

        let recent = db.recent_summaries(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].summary_type, SummaryType::Monthly);
        assert_eq!(recent[1].summary_type, SummaryType::Weekly);

        let daily = db.summaries_of_type(SummaryType::Daily, 10).unwrap();
        assert_eq!(daily.len(), 1);
    }

    #[test]
    fn test_watermark_only_moves_forward() {
        let (db, clock) = test_db();
        assert!(db.summary_watermark(SummaryType::Daily).unwrap().is_none());

        let later = clock.now();
        let earlier = later - Duration::days(3);
        db.set_summary_watermark(SummaryType::Daily, later).unwrap();
        db.set_summary_watermark(SummaryType::Daily, earlier).unwrap();

        assert_eq!(db.summary_watermark(SummaryType::Daily).unwrap(), Some(later));
        assert!(db.summary_watermark(SummaryType::Weekly).unwrap().is_none());
    }

    #[test]
    fn test_prune_before_keeps_protected_notes() {
        let (db, clock) = test_db();
        db.append_decision(&action("a")).unwrap();
        db.write_note("old general", None, &JsonMap::new()).unwrap();
        db.write_note("old milestone", Some("milestone"), &JsonMap::new())
            .unwrap();
        db.insert_summary(
            SummaryType::Daily,
            clock.now() - Duration::days(1),
            clock.now(),
            &SummaryPayload::default(),
        )
        .unwrap();
        clock.advance(Duration::days(10));

        let keep = vec!["important".to_string(), "milestone".to_string()];
        let (decisions, notes) = db.prune_before(clock.now(), &keep).unwrap();
        assert_eq!((decisions, notes), (1, 1));

        let remaining = db.recent_notes(10, None).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].category, "milestone");
        assert_eq!(db.count_summaries().unwrap(), 1);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("steward.db");
        {
            let db = Database::open(&path).unwrap();
            db.append_decision(&action("persisted")).unwrap();
            db.ping().unwrap();
        }

        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.count_decisions().unwrap(), 1);
    }
}
