//! Scripted oracle for tests and dry runs

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{Oracle, OracleDecision, OracleError, parse_decision};

const IDLE_RESPONSE: &str = r#"{
    "analysis": "Dry run",
    "action_type": "No Action",
    "reasoning": "Scripted oracle never acts",
    "next_check": "1 hour"
}"#;

#[derive(Debug)]
enum Scripted {
    Text(String),
    Failure(String),
}

/// An oracle that replays canned responses in order.
///
/// Responses go through the same parser as a real oracle. Once the script runs
/// out, the default response is replayed if one is set, otherwise every call
/// fails with [`OracleError::Exhausted`].
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    script: Mutex<VecDeque<Scripted>>,
    default_response: Option<String>,
}

impl ScriptedOracle {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(responses.into_iter().map(|r| Scripted::Text(r.into())).collect()),
            default_response: None,
        }
    }

    /// An oracle that always declines to act
    pub fn idle() -> Self {
        Self::default().with_default(IDLE_RESPONSE)
    }

    /// Response replayed after the script is exhausted
    pub fn with_default(mut self, response: impl Into<String>) -> Self {
        self.default_response = Some(response.into());
        self
    }

    /// Queue another response
    pub fn push(&self, response: impl Into<String>) {
        self.lock().push_back(Scripted::Text(response.into()));
    }

    /// Queue a transport failure
    pub fn push_failure(&self, message: impl Into<String>) {
        self.lock().push_back(Scripted::Failure(message.into()));
    }

    pub fn remaining(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Scripted>> {
        self.script.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn decide(&self, _prompt: &str) -> Result<OracleDecision, OracleError> {
        let next = self.lock().pop_front();
        match next {
            Some(Scripted::Text(text)) => parse_decision(&text),
            Some(Scripted::Failure(message)) => Err(OracleError::RequestFailed(message)),
            None => match &self.default_response {
                Some(text) => parse_decision(text),
                None => Err(OracleError::Exhausted),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_core::types::DecisionKind;

    #[tokio::test]
    async fn test_replays_in_order() {
        let oracle = ScriptedOracle::new([
            r#"{"action_type": "Action", "action_details": {"tool": "calculator"}}"#,
            r#"{"action_type": "No Action"}"#,
        ]);
        assert_eq!(oracle.remaining(), 2);

        let first = oracle.decide("p").await.unwrap();
        assert_eq!(first.kind, DecisionKind::Action);
        let second = oracle.decide("p").await.unwrap();
        assert_eq!(second.kind, DecisionKind::NoAction);
        assert!(matches!(oracle.decide("p").await, Err(OracleError::Exhausted)));
    }

    #[tokio::test]
    async fn test_failures_and_default() {
        let oracle = ScriptedOracle::idle();
        oracle.push_failure("timeout");

        assert!(matches!(
            oracle.decide("p").await,
            Err(OracleError::RequestFailed(_))
        ));
        let decision = oracle.decide("p").await.unwrap();
        assert_eq!(decision.kind, DecisionKind::NoAction);
        assert_eq!(decision.next_check, "1 hour");
    }
}
