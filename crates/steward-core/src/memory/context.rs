//! Context assembly and periodic summary triggering.

use crate::clock::{day_end, day_start};
use crate::error::Result;
use crate::types::{DecisionRecord, NoteRecord, Pattern, SummaryRecord, SummaryType};
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Timelike, Utc, Weekday};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use super::patterns::detect_patterns;
use super::summarizer::create_summary;
use super::traits::MemoryStore;
use super::{MemoryConfig, SummaryTrigger};

const MAX_TEXT_CHARS: usize = 200;

/// Everything the reasoning oracle is shown about the past.
#[derive(Debug, Clone, Serialize)]
pub struct ContextBundle {
    pub generated_at: DateTime<Utc>,
    pub window_hours: i64,
    /// Newest first
    pub recent_decisions: Vec<DecisionRecord>,
    pub summaries: Vec<SummaryRecord>,
    pub patterns: Vec<Pattern>,
    pub notes: Vec<NoteRecord>,
    /// Hours since the last tool invocation, absent when none happened yet
    pub time_since_last_action_hours: Option<f64>,
}

impl ContextBundle {
    /// Render as the text block embedded in the prompt.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ContextBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time_since_last_action_hours {
            Some(hours) => writeln!(f, "Time since last action: {:.1} hours", hours)?,
            None => writeln!(f, "Time since last action: no action recorded yet")?,
        }

        writeln!(
            f,
            "\nRecent decisions (last {}h): {}",
            self.window_hours,
            self.recent_decisions.len()
        )?;
        for decision in &self.recent_decisions {
            let outcome = match (decision.tool(), &decision.result) {
                (Some(tool), Some(result)) => {
                    format!("{} via {} ({:?})", decision.kind, tool, result.status)
                }
                (Some(tool), None) => format!("{} via {}", decision.kind, tool),
                _ => decision.kind.to_string(),
            };
            writeln!(
                f,
                "- {} | {} | {}",
                decision.timestamp.format("%Y-%m-%d %H:%M"),
                outcome,
                truncate(&decision.analysis, MAX_TEXT_CHARS)
            )?;
        }

        if !self.patterns.is_empty() {
            writeln!(f, "\nObserved patterns:")?;
            for pattern in &self.patterns {
                writeln!(f, "- {}", pattern.description)?;
            }
        }

        if !self.summaries.is_empty() {
            writeln!(f, "\nHistorical summaries:")?;
            for summary in &self.summaries {
                let payload = &summary.payload;
                writeln!(
                    f,
                    "- {} {} to {}: {} decisions, {} actions, {} successful ({:.0}%)",
                    summary.summary_type,
                    summary.start_date.format("%Y-%m-%d"),
                    summary.end_date.format("%Y-%m-%d"),
                    payload.total_decisions,
                    payload.actions_taken,
                    payload.successful_actions,
                    payload.period_analysis.effectiveness.overall_rate * 100.0
                )?;
            }
        }

        if !self.notes.is_empty() {
            writeln!(f, "\nNotes:")?;
            for note in &self.notes {
                writeln!(
                    f,
                    "- [{}] {} ({})",
                    note.category,
                    truncate(&note.content, MAX_TEXT_CHARS),
                    note.timestamp.format("%Y-%m-%d %H:%M")
                )?;
            }
        }

        Ok(())
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// A calendar window eligible for summarization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryWindow {
    pub summary_type: SummaryType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SummaryWindow {
    fn days(summary_type: SummaryType, first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            summary_type,
            start: day_start(first),
            end: day_end(last),
        }
    }

    /// The window of `summary_type` whose last day is `last`: that day, the
    /// seven days up to it, or the month up to it.
    pub fn ending_on(summary_type: SummaryType, last: NaiveDate) -> Self {
        let first = match summary_type {
            SummaryType::Daily => last,
            SummaryType::Weekly => days_before(last, 6),
            SummaryType::Monthly => first_of_month(last),
        };
        Self::days(summary_type, first, last)
    }

    /// The window of the same type that ends the day before this one starts.
    pub fn preceding(&self) -> Self {
        Self::ending_on(self.summary_type, days_before(self.start.date_naive(), 1))
    }
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days))
        .unwrap_or(NaiveDate::MIN)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Windows due under the midnight-slot trigger.
///
/// Empty unless `now` is within the first 15 minutes after UTC midnight. The
/// weekly and monthly windows run to the end of the current day.
///
/// The weekly window here spans `[today - 7d, today]`, eight calendar days,
/// which is what this slot has always produced. [`completed_window`] uses
/// seven-day weeks; the two modes are not interchangeable.
pub fn trigger_windows(now: DateTime<Utc>, week_end: Weekday) -> Vec<SummaryWindow> {
    if now.hour() != 0 || now.minute() >= 15 {
        return Vec::new();
    }

    let today = now.date_naive();
    let yesterday = days_before(today, 1);
    let mut windows = vec![SummaryWindow::days(SummaryType::Daily, yesterday, yesterday)];

    if today.weekday() == week_end {
        windows.push(SummaryWindow::days(
            SummaryType::Weekly,
            days_before(today, 7),
            today,
        ));
    }

    if (now + Duration::days(1)).month() != now.month() {
        windows.push(SummaryWindow::days(
            SummaryType::Monthly,
            first_of_month(today),
            today,
        ));
    }

    windows
}

/// The most recent fully elapsed window of `summary_type` before `now`.
///
/// Daily is yesterday, weekly is the last week ending on `week_end` no later
/// than yesterday, monthly is the previous calendar month.
pub fn completed_window(
    summary_type: SummaryType,
    now: DateTime<Utc>,
    week_end: Weekday,
) -> SummaryWindow {
    let yesterday = days_before(now.date_naive(), 1);
    match summary_type {
        SummaryType::Daily => SummaryWindow::days(summary_type, yesterday, yesterday),
        SummaryType::Weekly => {
            let back = (yesterday.weekday().num_days_from_monday() + 7
                - week_end.num_days_from_monday())
                % 7;
            let last = days_before(yesterday, u64::from(back));
            SummaryWindow::days(summary_type, days_before(last, 6), last)
        }
        SummaryType::Monthly => {
            let last = days_before(first_of_month(now.date_naive()), 1);
            SummaryWindow::days(summary_type, first_of_month(last), last)
        }
    }
}

/// Builds context bundles and decides when summaries are due.
pub struct ContextAssembler<S> {
    store: S,
    config: MemoryConfig,
}

impl<S: MemoryStore> ContextAssembler<S> {
    pub fn new(store: S, config: MemoryConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Gather recent decisions, summaries, patterns and notes for the next cycle.
    pub fn build_context(
        &self,
        now: DateTime<Utc>,
        last_action_time: Option<DateTime<Utc>>,
    ) -> Result<ContextBundle> {
        let recent_decisions = self.store.recent(self.config.recent_window_hours)?;
        let summaries = self.store.recent_summaries(self.config.summary_limit)?;
        let notes = self.store.read_recent(self.config.note_limit, None)?;

        let hour = now.hour();
        let cohort = self.store.same_hour_cohort(
            hour,
            self.config.cohort_radius_hours,
            self.config.cohort_limit,
        )?;
        let mut window = recent_decisions.clone();
        window.reverse();
        let patterns = detect_patterns(&window, &cohort, hour);

        let time_since_last_action_hours =
            last_action_time.map(|at| (now - at).num_milliseconds() as f64 / 3_600_000.0);

        debug!(
            decisions = recent_decisions.len(),
            summaries = summaries.len(),
            patterns = patterns.len(),
            notes = notes.len(),
            "Built context bundle"
        );

        Ok(ContextBundle {
            generated_at: now,
            window_hours: self.config.recent_window_hours,
            recent_decisions,
            summaries,
            patterns,
            notes,
            time_since_last_action_hours,
        })
    }

    /// Create whatever summaries are due at `now`.
    pub fn maybe_summarize(&self, now: DateTime<Utc>) -> Result<Vec<SummaryRecord>> {
        match self.config.summary_trigger {
            SummaryTrigger::Window => trigger_windows(now, self.config.week_end_day)
                .into_iter()
                .map(|w| create_summary(&self.store, w.summary_type, w.start, w.end))
                .collect(),
            SummaryTrigger::Watermark => self.summarize_completed(now),
        }
    }

    fn summarize_completed(&self, now: DateTime<Utc>) -> Result<Vec<SummaryRecord>> {
        let earliest = self.store.earliest_timestamp()?;
        let mut created = Vec::new();

        for summary_type in SummaryType::ALL {
            let latest = completed_window(summary_type, now, self.config.week_end_day);
            let mark = self.store.summary_watermark(summary_type)?;
            if mark.is_some_and(|mark| mark >= latest.end) {
                continue;
            }

            // Every completed window after the watermark that overlaps history
            let mut pending = Vec::new();
            if let Some(first) = earliest {
                let mut window = latest;
                while window.end >= first && mark.is_none_or(|mark| window.end > mark) {
                    pending.push(window);
                    window = window.preceding();
                }
            }

            if pending.is_empty() {
                info!(
                    summary_type = %summary_type,
                    window_end = %latest.end,
                    "No history before window end, skipping summary"
                );
            }

            for window in pending.into_iter().rev() {
                created.push(create_summary(
                    &self.store,
                    summary_type,
                    window.start,
                    window.end,
                )?);
                self.store.set_summary_watermark(summary_type, window.end)?;
            }
            self.store.set_summary_watermark(summary_type, latest.end)?;
        }

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::db::Database;
    use crate::memory::{DbMemoryStore, DecisionStore, NoteStore, SummaryStore};
    use crate::types::{ActionDetails, ActionResult, JsonMap, NewDecision, PatternKind};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn assembler(now: DateTime<Utc>, trigger: SummaryTrigger) -> (ContextAssembler<DbMemoryStore>, Clock) {
        let clock = Clock::manual(now);
        let db = Database::open_in_memory_with_clock(clock.clone()).unwrap();
        let config = MemoryConfig {
            summary_trigger: trigger,
            ..Default::default()
        };
        (ContextAssembler::new(DbMemoryStore::new(Arc::new(db)), config), clock)
    }

    fn act(tool: &str) -> NewDecision {
        NewDecision::action("checked progress", "needed data", ActionDetails::new(tool))
            .with_result(ActionResult::success())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Context bundle
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_build_context_collects_everything() {
        let (assembler, clock) = assembler(at(2025, 3, 4, 9, 0), SummaryTrigger::Watermark);
        let store = assembler.store();

        // Outside the 24h window but inside the same-hour cohort
        store.append(&act("todo")).unwrap();
        clock.advance(Duration::days(1));
        for _ in 0..3 {
            store.append(&act("calculator")).unwrap();
            clock.advance(Duration::minutes(10));
        }
        store.write("goal is on track", Some("milestone"), &JsonMap::new()).unwrap();

        let now = clock.now();
        let last_action = now - Duration::minutes(90);
        let bundle = assembler.build_context(now, Some(last_action)).unwrap();

        assert_eq!(bundle.recent_decisions.len(), 3);
        assert!(bundle.recent_decisions[0].timestamp >= bundle.recent_decisions[2].timestamp);
        assert_eq!(bundle.notes.len(), 1);
        assert!(bundle.summaries.is_empty());
        assert_eq!(bundle.time_since_last_action_hours, Some(1.5));

        let kinds: Vec<_> = bundle.patterns.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PatternKind::TimePattern,
                PatternKind::ActionSequence,
                PatternKind::TimeEffectiveness,
                PatternKind::TimeBasedActions,
            ]
        );
        assert!(bundle.patterns[3].description.contains("calculator (3)"));
        assert!(bundle.patterns[3].description.contains("todo (1)"));
    }

    #[test]
    fn test_build_context_without_history() {
        let (assembler, clock) = assembler(at(2025, 3, 4, 9, 0), SummaryTrigger::Watermark);
        let bundle = assembler.build_context(clock.now(), None).unwrap();
        assert!(bundle.recent_decisions.is_empty());
        assert!(bundle.patterns.is_empty());
        assert!(bundle.time_since_last_action_hours.is_none());

        let text = bundle.render();
        assert!(text.contains("no action recorded yet"));
        assert!(text.contains("Recent decisions (last 24h): 0"));
    }

    #[test]
    fn test_render_sections() {
        let (assembler, clock) = assembler(at(2025, 3, 4, 9, 0), SummaryTrigger::Watermark);
        let store = assembler.store();
        store.append(&act("note_taking")).unwrap();
        store.write("remember the deadline", None, &JsonMap::new()).unwrap();

        let text = assembler
            .build_context(clock.now(), Some(clock.now()))
            .unwrap()
            .render();
        assert!(text.contains("Time since last action: 0.0 hours"));
        assert!(text.contains("Action via note_taking (Success)"));
        assert!(text.contains("Observed patterns:"));
        assert!(text.contains("- [general] remember the deadline"));
    }

    #[test]
    fn test_truncate_long_text() {
        let long = "x".repeat(300);
        let cut = truncate(&long, 20);
        assert_eq!(cut.chars().count(), 20);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("short", 20), "short");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Calendar windows
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_trigger_windows_only_after_midnight() {
        assert!(trigger_windows(at(2025, 3, 5, 0, 15), Weekday::Sun).is_empty());
        assert!(trigger_windows(at(2025, 3, 5, 1, 0), Weekday::Sun).is_empty());
        let windows = trigger_windows(at(2025, 3, 5, 0, 14), Weekday::Sun);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, at(2025, 3, 4, 0, 0));
        assert_eq!(windows[0].end, day_end(windows[0].start.date_naive()));
    }

    #[test]
    fn test_trigger_windows_on_week_end_day() {
        // 2025-03-02 is a Sunday
        let windows = trigger_windows(at(2025, 3, 2, 0, 5), Weekday::Sun);
        let types: Vec<_> = windows.iter().map(|w| w.summary_type).collect();
        assert_eq!(types, vec![SummaryType::Daily, SummaryType::Weekly]);
        assert_eq!(windows[1].start, at(2025, 2, 23, 0, 0));
        assert_eq!(windows[1].end, day_end(NaiveDate::from_ymd_opt(2025, 3, 2).unwrap()));
    }

    #[test]
    fn test_trigger_windows_on_last_day_of_month() {
        let windows = trigger_windows(at(2025, 3, 31, 0, 10), Weekday::Sun);
        let types: Vec<_> = windows.iter().map(|w| w.summary_type).collect();
        assert_eq!(types, vec![SummaryType::Daily, SummaryType::Monthly]);
        assert_eq!(windows[1].start, at(2025, 3, 1, 0, 0));
        assert_eq!(windows[1].end, day_end(NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()));
    }

    #[test]
    fn test_completed_windows() {
        // Wednesday
        let now = at(2025, 3, 5, 10, 0);
        let date = |m, d| NaiveDate::from_ymd_opt(2025, m, d).unwrap();

        let daily = completed_window(SummaryType::Daily, now, Weekday::Sun);
        assert_eq!((daily.start, daily.end), (day_start(date(3, 4)), day_end(date(3, 4))));

        let weekly = completed_window(SummaryType::Weekly, now, Weekday::Sun);
        assert_eq!((weekly.start, weekly.end), (day_start(date(2, 24)), day_end(date(3, 2))));

        let monthly = completed_window(SummaryType::Monthly, now, Weekday::Sun);
        assert_eq!((monthly.start, monthly.end), (day_start(date(2, 1)), day_end(date(2, 28))));

        // Week ending Monday: the day after yesterday's Tuesday is not done yet
        let weekly = completed_window(SummaryType::Weekly, now, Weekday::Mon);
        assert_eq!(weekly.end, day_end(date(3, 3)));
    }

    #[test]
    fn test_window_ending_on() {
        let date = |m, d| NaiveDate::from_ymd_opt(2025, m, d).unwrap();

        let weekly = SummaryWindow::ending_on(SummaryType::Weekly, date(3, 2));
        assert_eq!((weekly.start, weekly.end), (day_start(date(2, 24)), day_end(date(3, 2))));

        let monthly = SummaryWindow::ending_on(SummaryType::Monthly, date(3, 17));
        assert_eq!(monthly.start, day_start(date(3, 1)));

        let daily = SummaryWindow::ending_on(SummaryType::Daily, date(3, 17));
        assert_eq!(daily.start, day_start(date(3, 17)));
        assert_eq!(daily.end, day_end(date(3, 17)));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Summary triggering
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_watermark_trigger_is_idempotent() {
        let (assembler, clock) = assembler(at(2025, 3, 4, 10, 0), SummaryTrigger::Watermark);
        let store = assembler.store();
        store.append(&act("todo")).unwrap();
        store.append(&NewDecision::no_action("idle", "waiting")).unwrap();

        clock.set(at(2025, 3, 5, 10, 0));
        let created = assembler.maybe_summarize(clock.now()).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].summary_type, SummaryType::Daily);
        assert_eq!(created[0].payload.total_decisions, 2);

        // Weekly and monthly windows predate all history: watermarks moved, nothing written
        assert!(store.summary_watermark(SummaryType::Weekly).unwrap().is_some());
        assert!(store.summary_watermark(SummaryType::Monthly).unwrap().is_some());

        clock.advance(Duration::hours(3));
        assert!(assembler.maybe_summarize(clock.now()).unwrap().is_empty());
        assert_eq!(store.summary_count().unwrap(), 1);
    }

    #[test]
    fn test_watermark_trigger_survives_coarse_cadence() {
        let (assembler, clock) = assembler(at(2025, 3, 4, 10, 0), SummaryTrigger::Watermark);
        assembler.store().append(&act("todo")).unwrap();

        // The first check after the day rolls over happens mid-afternoon
        clock.set(at(2025, 3, 5, 15, 30));
        let created = assembler.maybe_summarize(clock.now()).unwrap();
        assert_eq!(created.len(), 1);
    }

    #[test]
    fn test_watermark_trigger_catches_up_after_downtime() {
        let (assembler, clock) = assembler(at(2025, 3, 4, 10, 0), SummaryTrigger::Watermark);
        let store = assembler.store();
        for day in 4..=6 {
            clock.set(at(2025, 3, day, 10, 0));
            store.append(&act("todo")).unwrap();
        }

        // Nothing ran between the 4th and the 7th
        clock.set(at(2025, 3, 7, 10, 0));
        let created = assembler.maybe_summarize(clock.now()).unwrap();
        let days: Vec<NaiveDate> = created.iter().map(|s| s.start_date.date_naive()).collect();
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 6).unwrap(),
            ]
        );
        assert!(created.iter().all(|s| s.payload.total_decisions == 1));

        assert!(assembler.maybe_summarize(clock.now()).unwrap().is_empty());
        assert_eq!(store.summary_count().unwrap(), 3);
    }

    #[test]
    fn test_preceding_window() {
        let week = SummaryWindow::ending_on(
            SummaryType::Weekly,
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
        );
        let before = week.preceding();
        assert_eq!(before.start.date_naive(), NaiveDate::from_ymd_opt(2025, 2, 24).unwrap());
        assert_eq!(before.end.date_naive(), NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());

        let march = SummaryWindow::ending_on(
            SummaryType::Monthly,
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        );
        let february = march.preceding();
        assert_eq!(february.start.date_naive(), NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(february.end.date_naive(), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }

    #[test]
    fn test_window_trigger() {
        let (assembler, clock) = assembler(at(2025, 3, 1, 18, 0), SummaryTrigger::Window);
        assembler.store().append(&act("calculator")).unwrap();

        clock.set(at(2025, 3, 2, 0, 30));
        assert!(assembler.maybe_summarize(clock.now()).unwrap().is_empty());

        clock.set(at(2025, 3, 2, 0, 5));
        let created = assembler.maybe_summarize(clock.now()).unwrap();
        let types: Vec<_> = created.iter().map(|s| s.summary_type).collect();
        assert_eq!(types, vec![SummaryType::Daily, SummaryType::Weekly]);
        assert_eq!(created[0].payload.actions_taken, 1);

        // Firing again inside the slot does not duplicate rows
        assembler.maybe_summarize(clock.now()).unwrap();
        assert_eq!(assembler.store().summary_count().unwrap(), 2);
    }
}
