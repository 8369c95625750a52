//! Pattern detection over decision windows.
//!
//! Pure functions: the output depends only on the slice passed in, never on the
//! wall clock. Windows are expected in ascending timestamp order.

use crate::types::{DecisionRecord, Pattern, PatternKind};
use chrono::Timelike;
use serde_json::json;

use super::summarizer::{common_actions, effectiveness};

/// Number of hours reported by the time pattern
pub const PEAK_HOURS: usize = 3;

/// Shortest run of one tool that counts as a sequence
pub const MIN_SEQUENCE_RUN: usize = 3;

/// All patterns for a cycle: the recent window followed by the same-hour cohort.
pub fn detect_patterns(
    window: &[DecisionRecord],
    cohort: &[DecisionRecord],
    hour: u32,
) -> Vec<Pattern> {
    let mut patterns = window_patterns(window);
    patterns.extend(cohort_patterns(cohort, hour));
    patterns
}

/// Time and sequence patterns for one window.
pub fn window_patterns(window: &[DecisionRecord]) -> Vec<Pattern> {
    let mut patterns = Vec::new();
    patterns.extend(time_pattern(window));
    patterns.extend(action_sequences(window));
    patterns
}

/// Busiest hours of day (UTC), ties going to the earlier hour.
pub fn time_pattern(window: &[DecisionRecord]) -> Option<Pattern> {
    if window.is_empty() {
        return None;
    }

    let mut buckets = [0usize; 24];
    for decision in window {
        buckets[decision.timestamp.hour() as usize] += 1;
    }

    let mut ranked: Vec<(u32, usize)> = buckets
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .map(|(hour, count)| (hour as u32, *count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(PEAK_HOURS);

    let hours: Vec<String> = ranked.iter().map(|(hour, _)| hour.to_string()).collect();
    let peak_hours: Vec<[usize; 2]> = ranked
        .iter()
        .map(|(hour, count)| [*hour as usize, *count])
        .collect();

    Some(Pattern {
        kind: PatternKind::TimePattern,
        description: format!("Most active hours: [{}]", hours.join(", ")),
        details: json!({ "peakHours": peak_hours }),
    })
}

/// Runs of the same tool across consecutive Action decisions.
///
/// NoAction decisions do not break a run; only a different tool does. A run
/// still open at the end of the window is reported when it is long enough.
pub fn action_sequences(window: &[DecisionRecord]) -> Vec<Pattern> {
    let mut patterns = Vec::new();
    let mut current: Option<(&str, usize)> = None;

    for tool in window.iter().filter_map(DecisionRecord::tool) {
        current = match current {
            Some((active, run)) if active == tool => Some((active, run + 1)),
            previous => {
                if let Some((active, run)) = previous {
                    push_sequence(&mut patterns, active, run);
                }
                Some((tool, 1))
            }
        };
    }
    if let Some((active, run)) = current {
        push_sequence(&mut patterns, active, run);
    }

    patterns
}

fn push_sequence(patterns: &mut Vec<Pattern>, tool: &str, run: usize) {
    if run < MIN_SEQUENCE_RUN {
        return;
    }
    patterns.push(Pattern {
        kind: PatternKind::ActionSequence,
        description: format!("Repeated '{}' {} times in a row", tool, run),
        details: json!({ "action": tool, "count": run }),
    });
}

/// Effectiveness and common actions for decisions made around `hour` on other days.
///
/// Nothing is reported for a cohort without actions.
pub fn cohort_patterns(cohort: &[DecisionRecord], hour: u32) -> Vec<Pattern> {
    if !cohort.iter().any(DecisionRecord::is_action) {
        return Vec::new();
    }

    let rates = effectiveness(cohort);
    let common = common_actions(cohort);
    let listed: Vec<String> = common
        .iter()
        .map(|action| format!("{} ({})", action.tool, action.count))
        .collect();

    vec![
        Pattern {
            kind: PatternKind::TimeEffectiveness,
            description: format!(
                "Action success rate around {:02}:00: {:.0}%",
                hour,
                rates.overall_rate * 100.0
            ),
            details: json!({
                "hour": hour,
                "overallRate": rates.overall_rate,
                "perToolRate": rates.per_tool_rate,
            }),
        },
        Pattern {
            kind: PatternKind::TimeBasedActions,
            description: format!("Common actions around {:02}:00: {}", hour, listed.join(", ")),
            details: json!({ "hour": hour, "commonActions": common }),
        },
    ]
}
