//! Reasoning oracle interface.
//!
//! An oracle turns prompt text into a structured decision. Responses are
//! parsed leniently; anything that cannot be parsed is an [`OracleError`],
//! which the agent replaces with [`OracleDecision::fallback`].

mod gemini;
mod scripted;

pub use gemini::GeminiOracle;
pub use scripted::ScriptedOracle;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use steward_core::types::{ActionDetails, DecisionKind, NewDecision};
use thiserror::Error;

use crate::config::{OracleConfig, OracleProvider};

/// Errors from reasoning oracles
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Oracle not configured: {0}")]
    NotConfigured(String),
    #[error("No scripted responses left")]
    Exhausted,
}

/// A decision as returned by the oracle, before any tool has run
#[derive(Debug, Clone, PartialEq)]
pub struct OracleDecision {
    pub analysis: String,
    pub kind: DecisionKind,
    pub reasoning: String,
    pub action: Option<ActionDetails>,
    pub next_check: String,
}

impl OracleDecision {
    /// Safe default used when the oracle fails or answers nonsense
    pub fn fallback(error: &OracleError) -> Self {
        Self {
            analysis: "Error in LLM processing".to_string(),
            kind: DecisionKind::NoAction,
            reasoning: format!("Error occurred: {}", error),
            action: None,
            next_check: "1 hour".to_string(),
        }
    }

    /// Whether a tool should be invoked for this decision
    pub fn is_actionable(&self) -> bool {
        self.kind == DecisionKind::Action && self.action.is_some()
    }

    pub fn into_new_decision(self) -> NewDecision {
        NewDecision {
            analysis: self.analysis,
            reasoning: self.reasoning,
            kind: self.kind,
            action: self.action,
            result: None,
            next_check: self.next_check,
        }
    }
}

/// Trait for reasoning oracles
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Get the oracle name
    fn name(&self) -> &str;

    /// Ask for a decision
    async fn decide(&self, prompt: &str) -> Result<OracleDecision, OracleError>;
}

/// Build the oracle selected by the configuration
pub fn from_config(config: &OracleConfig) -> Result<Arc<dyn Oracle>, OracleError> {
    match config.provider {
        OracleProvider::Gemini => Ok(Arc::new(GeminiOracle::from_config(config)?)),
        OracleProvider::Scripted => Ok(Arc::new(ScriptedOracle::idle())),
    }
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(default)]
    analysis: Option<String>,
    #[serde(default, alias = "decision", alias = "decision_kind")]
    action_type: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    action_details: Option<RawActionDetails>,
    #[serde(default)]
    next_check: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawActionDetails {
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    parameters: Option<Value>,
}

/// Parse oracle output into a decision.
///
/// Accepts a bare JSON object or one wrapped in Markdown code fences.
/// `action_type` may be spelled `Action`, `No Action`, `NoAction` or
/// `no_action` in any case. Action details are kept only for Action decisions
/// that name a tool.
pub fn parse_decision(text: &str) -> Result<OracleDecision, OracleError> {
    let body = extract_json(text)
        .ok_or_else(|| OracleError::Malformed("no JSON object in response".to_string()))?;
    let raw: RawDecision =
        serde_json::from_str(body).map_err(|e| OracleError::Malformed(e.to_string()))?;

    let kind = raw
        .action_type
        .as_deref()
        .ok_or_else(|| OracleError::Malformed("missing action_type".to_string()))?
        .parse::<DecisionKind>()
        .map_err(OracleError::Malformed)?;

    let action = match (kind, raw.action_details) {
        (DecisionKind::Action, Some(details)) => {
            let tool = details.tool.unwrap_or_default().trim().to_string();
            if tool.is_empty() {
                None
            } else {
                let parameters = match details.parameters {
                    None | Some(Value::Null) => Default::default(),
                    Some(Value::Object(map)) => map,
                    Some(other) => {
                        return Err(OracleError::Malformed(format!(
                            "action parameters must be an object, got {}",
                            other
                        )));
                    }
                };
                Some(ActionDetails { tool, parameters })
            }
        }
        _ => None,
    };

    Ok(OracleDecision {
        analysis: raw.analysis.unwrap_or_default(),
        kind,
        reasoning: raw.reasoning.unwrap_or_default(),
        action,
        next_check: raw.next_check.unwrap_or_default(),
    })
}

/// Locate the JSON object inside a response, dropping code fences and chatter
fn extract_json(text: &str) -> Option<&str> {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        // Drop the info string (```json) along with the opening fence
        body = rest.split_once('\n').map_or("", |(_, content)| content);
        if let Some(end) = body.rfind("```") {
            body = &body[..end];
        }
        body = body.trim();
    }

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}
