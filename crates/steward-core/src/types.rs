//! Record types owned by the decision memory.
//!
//! Everything here is a plain value: stores hand out copies, never references
//! into the database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Free-form JSON object used for tool parameters, action results and note metadata
pub type JsonMap = Map<String, Value>;

// ─────────────────────────────────────────────────────────────────────────────
// Decisions
// ─────────────────────────────────────────────────────────────────────────────

/// Whether a cycle chose to act
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionKind {
    #[serde(rename = "Action")]
    Action,
    #[serde(rename = "No Action")]
    NoAction,
}

impl DecisionKind {
    /// Convert to string for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Action => "Action",
            DecisionKind::NoAction => "No Action",
        }
    }
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DecisionKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "action" => Ok(DecisionKind::Action),
            "noaction" | "none" => Ok(DecisionKind::NoAction),
            _ => Err(format!("Invalid decision kind: {}", s)),
        }
    }
}

/// The tool a decision asked for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDetails {
    pub tool: String,
    #[serde(default)]
    pub parameters: JsonMap,
}

impl ActionDetails {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            parameters: JsonMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Error,
}

/// Outcome reported by a tool
///
/// Tools may attach arbitrary extra fields (a computed value, a todo id, a list
/// of notes); they are flattened next to `status` and `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: JsonMap,
}

impl ActionResult {
    pub fn success() -> Self {
        Self {
            status: ActionStatus::Success,
            message: None,
            data: JsonMap::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Error,
            message: Some(message.into()),
            data: JsonMap::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }
}

/// Input for appending a decision. Id and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDecision {
    pub analysis: String,
    pub reasoning: String,
    pub kind: DecisionKind,
    pub action: Option<ActionDetails>,
    pub result: Option<ActionResult>,
    pub next_check: String,
}

impl NewDecision {
    pub fn no_action(analysis: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            analysis: analysis.into(),
            reasoning: reasoning.into(),
            kind: DecisionKind::NoAction,
            action: None,
            result: None,
            next_check: String::new(),
        }
    }

    pub fn action(
        analysis: impl Into<String>,
        reasoning: impl Into<String>,
        details: ActionDetails,
    ) -> Self {
        Self {
            analysis: analysis.into(),
            reasoning: reasoning.into(),
            kind: DecisionKind::Action,
            action: Some(details),
            result: None,
            next_check: String::new(),
        }
    }

    pub fn with_result(mut self, result: ActionResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_next_check(mut self, next_check: impl Into<String>) -> Self {
        self.next_check = next_check.into();
        self
    }

    /// Drop fields that contradict the record invariants.
    ///
    /// `NoAction` never carries details, and a result never exists without
    /// details. Returns true when something was dropped.
    pub fn normalize(&mut self) -> bool {
        let mut changed = false;
        if self.kind == DecisionKind::NoAction && self.action.is_some() {
            self.action = None;
            changed = true;
        }
        if self.action.is_none() && self.result.is_some() {
            self.result = None;
            changed = true;
        }
        changed
    }
}

/// One persisted decision cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub analysis: String,
    pub reasoning: String,
    pub kind: DecisionKind,
    pub action: Option<ActionDetails>,
    pub result: Option<ActionResult>,
    pub next_check: String,
}

impl DecisionRecord {
    pub fn is_action(&self) -> bool {
        self.kind == DecisionKind::Action
    }

    /// Tool name for Action decisions that named one
    pub fn tool(&self) -> Option<&str> {
        match (&self.kind, &self.action) {
            (DecisionKind::Action, Some(details)) => Some(details.tool.as_str()),
            _ => None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.result.as_ref().is_some_and(ActionResult::is_success)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Notes
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_NOTE_CATEGORY: &str = "general";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub metadata: JsonMap,
}

// ─────────────────────────────────────────────────────────────────────────────
// Summaries
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryType {
    Daily,
    Weekly,
    Monthly,
}

impl SummaryType {
    pub const ALL: [SummaryType; 3] = [SummaryType::Daily, SummaryType::Weekly, SummaryType::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryType::Daily => "daily",
            SummaryType::Weekly => "weekly",
            SummaryType::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for SummaryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SummaryType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(SummaryType::Daily),
            "weekly" => Ok(SummaryType::Weekly),
            "monthly" => Ok(SummaryType::Monthly),
            _ => Err(format!("Invalid summary type: {}", s)),
        }
    }
}

/// Tool usage count within a window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCount {
    pub tool: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effectiveness {
    /// Successful actions / actions taken, 0 when nothing was attempted
    pub overall_rate: f64,
    pub per_tool_rate: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvent {
    pub decision_id: i64,
    pub timestamp: DateTime<Utc>,
    pub tool: String,
    pub analysis: String,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodAnalysis {
    pub common_actions: Vec<ActionCount>,
    pub effectiveness: Effectiveness,
    pub patterns: Vec<Pattern>,
}

/// Statistical rollup of a decision window
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryPayload {
    pub total_decisions: usize,
    pub actions_taken: usize,
    pub successful_actions: usize,
    pub key_events: Vec<KeyEvent>,
    pub period_analysis: PeriodAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub id: i64,
    pub summary_type: SummaryType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub payload: SummaryPayload,
    pub created_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    TimePattern,
    ActionSequence,
    TimeEffectiveness,
    TimeBasedActions,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::TimePattern => "time_pattern",
            PatternKind::ActionSequence => "action_sequence",
            PatternKind::TimeEffectiveness => "time_effectiveness",
            PatternKind::TimeBasedActions => "time_based_actions",
        }
    }
}

/// A derived observation about decision history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub description: String,
    pub details: Value,
}
