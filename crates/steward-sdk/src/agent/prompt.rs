//! Prompt rendering for the reasoning oracle

use chrono::{DateTime, Utc};
use std::fmt::Write;
use steward_core::memory::ContextBundle;

use crate::config::GoalConfig;

const RESPONSE_FORMAT: &str = r#"Respond with a single JSON object and nothing else:
{
  "analysis": "Detailed analysis of the situation",
  "action_type": "Action" or "No Action",
  "reasoning": "Clear explanation of your decision",
  "action_details": {
    "tool": "tool_name",
    "parameters": {"action": "action_name", "content": "content_here"}
  },
  "next_check": "time period, e.g. 30 minutes, 2 hours, 1 day"
}
Omit action_details when action_type is "No Action"."#;

/// Build the prompt text for one cycle
pub fn render_prompt(
    goal: &GoalConfig,
    now: DateTime<Utc>,
    context: &ContextBundle,
    tool_descriptions: &str,
) -> String {
    let mut prompt = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(
        prompt,
        "You are an agent responsible for helping achieve the goal: {}",
        goal.description
    );
    if !goal.success_criteria.is_empty() {
        let _ = writeln!(prompt, "Success criteria:");
        for criterion in &goal.success_criteria {
            let _ = writeln!(prompt, "- {}", criterion);
        }
    }
    if let Some(due) = goal.due_date {
        let _ = writeln!(prompt, "Due date: {}", due.format("%Y-%m-%d"));
    }

    let _ = writeln!(prompt, "\nCurrent situation:");
    let _ = writeln!(prompt, "Time: {}", now.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(prompt, "{}", context.render().trim_end());

    let _ = writeln!(prompt, "\nAvailable tools:");
    if tool_descriptions.is_empty() {
        let _ = writeln!(prompt, "(none)");
    } else {
        let _ = writeln!(prompt, "{}", tool_descriptions);
    }

    let _ = writeln!(
        prompt,
        "\nDecide whether any action is needed right now.\n\n{}",
        RESPONSE_FORMAT
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn bundle(now: DateTime<Utc>) -> ContextBundle {
        ContextBundle {
            generated_at: now,
            window_hours: 24,
            recent_decisions: Vec::new(),
            summaries: Vec::new(),
            patterns: Vec::new(),
            notes: Vec::new(),
            time_since_last_action_hours: Some(2.5),
        }
    }

    #[test]
    fn test_prompt_sections() {
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap();
        let goal = GoalConfig {
            description: "Run a half marathon".into(),
            success_criteria: vec!["Finish under 2 hours".into()],
            due_date: NaiveDate::from_ymd_opt(2025, 6, 1),
        };

        let prompt = render_prompt(&goal, now, &bundle(now), "- calculator: stats");

        assert!(prompt.contains("goal: Run a half marathon"));
        assert!(prompt.contains("- Finish under 2 hours"));
        assert!(prompt.contains("Due date: 2025-06-01"));
        assert!(prompt.contains("Time: 2025-03-04 09:30 UTC"));
        assert!(prompt.contains("Time since last action: 2.5 hours"));
        assert!(prompt.contains("- calculator: stats"));
        assert!(prompt.contains("\"action_type\""));
    }

    #[test]
    fn test_prompt_without_optional_parts() {
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap();
        let goal = GoalConfig {
            description: "Read more".into(),
            ..Default::default()
        };

        let prompt = render_prompt(&goal, now, &bundle(now), "");
        assert!(!prompt.contains("Success criteria"));
        assert!(!prompt.contains("Due date"));
        assert!(prompt.contains("(none)"));
    }
}
