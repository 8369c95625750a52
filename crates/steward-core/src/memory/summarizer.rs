//! Statistical rollups of decision windows.

use crate::error::{Error, Result};
use crate::types::{
    ActionCount, DecisionRecord, Effectiveness, KeyEvent, PeriodAnalysis, SummaryPayload,
    SummaryRecord, SummaryType,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::info;

use super::patterns::window_patterns;
use super::traits::{DecisionStore, SummaryStore};

/// Key events kept per summary
pub const KEY_EVENT_LIMIT: usize = 5;

const BASE_IMPORTANCE: f64 = 1.0;
const ACTION_FACTOR: f64 = 1.5;
const SUCCESS_FACTOR: f64 = 1.2;

/// Importance of a single decision.
///
/// Key events are already restricted to successful actions, so every key event
/// scores the same and ranking falls back to chronological order.
pub fn importance(decision: &DecisionRecord) -> f64 {
    let mut score = BASE_IMPORTANCE;
    if decision.is_action() {
        score *= ACTION_FACTOR;
    }
    if decision.succeeded() {
        score *= SUCCESS_FACTOR;
    }
    score
}

/// Successful actions ranked by importance, at most `limit`.
pub fn key_events(decisions: &[DecisionRecord], limit: usize) -> Vec<KeyEvent> {
    let mut events: Vec<KeyEvent> = decisions
        .iter()
        .filter(|d| d.is_action() && d.succeeded())
        .map(|d| KeyEvent {
            decision_id: d.id,
            timestamp: d.timestamp,
            tool: d.tool().unwrap_or_default().to_string(),
            analysis: d.analysis.clone(),
            importance: importance(d),
        })
        .collect();
    // Stable sort keeps insertion order on equal scores
    events.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    events.truncate(limit);
    events
}

/// Tool usage counts, most used first, ties by name.
pub fn common_actions(decisions: &[DecisionRecord]) -> Vec<ActionCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for tool in decisions.iter().filter_map(DecisionRecord::tool) {
        *counts.entry(tool).or_default() += 1;
    }

    let mut actions: Vec<ActionCount> = counts
        .into_iter()
        .map(|(tool, count)| ActionCount {
            tool: tool.to_string(),
            count,
        })
        .collect();
    actions.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tool.cmp(&b.tool)));
    actions
}

/// Overall and per-tool success rates. Zero, never NaN, when nothing was attempted.
pub fn effectiveness(decisions: &[DecisionRecord]) -> Effectiveness {
    let attempted = decisions.iter().filter(|d| d.is_action()).count();
    let succeeded = decisions.iter().filter(|d| d.succeeded()).count();

    let mut per_tool: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for decision in decisions {
        if let Some(tool) = decision.tool() {
            let entry = per_tool.entry(tool.to_string()).or_default();
            entry.0 += 1;
            if decision.succeeded() {
                entry.1 += 1;
            }
        }
    }

    Effectiveness {
        overall_rate: rate(succeeded, attempted),
        per_tool_rate: per_tool
            .into_iter()
            .map(|(tool, (attempts, successes))| (tool, rate(successes, attempts)))
            .collect(),
    }
}

fn rate(successes: usize, attempts: usize) -> f64 {
    if attempts == 0 {
        0.0
    } else {
        (successes as f64 / attempts as f64).min(1.0)
    }
}

/// Compute the payload for a window of decisions (ascending order).
pub fn compute_payload(decisions: &[DecisionRecord]) -> SummaryPayload {
    SummaryPayload {
        total_decisions: decisions.len(),
        actions_taken: decisions.iter().filter(|d| d.is_action()).count(),
        successful_actions: decisions.iter().filter(|d| d.succeeded()).count(),
        key_events: key_events(decisions, KEY_EVENT_LIMIT),
        period_analysis: PeriodAnalysis {
            common_actions: common_actions(decisions),
            effectiveness: effectiveness(decisions),
            patterns: window_patterns(decisions),
        },
    }
}

/// Summarise `[start, end]` and persist the result.
///
/// Creating a summary for a window that already has one returns the stored row.
pub fn create_summary<S>(
    store: &S,
    summary_type: SummaryType,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<SummaryRecord>
where
    S: DecisionStore + SummaryStore + ?Sized,
{
    if start > end {
        return Err(Error::validation(
            "window",
            format!("start {} is after end {}", start, end),
        ));
    }

    let decisions = store.in_range(start, end)?;
    let payload = compute_payload(&decisions);
    let record = store.insert_summary(summary_type, start, end, &payload)?;

    info!(
        summary_type = %summary_type,
        window_start = %start,
        window_end = %end,
        total_decisions = record.payload.total_decisions,
        "Created summary"
    );
    Ok(record)
}
