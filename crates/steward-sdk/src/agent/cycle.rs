//! One decision cycle: context, oracle, tool, persist, summarize, prune.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use steward_core::Database;
use steward_core::memory::{
    ContextAssembler, DbMemoryStore, DecisionStore, PruneReport, RetentionPolicy,
};
use steward_core::types::{DecisionKind, DecisionRecord, SummaryRecord};
use tracing::{Instrument, error, info, info_span, warn};

use super::prompt::render_prompt;
use crate::config::StewardConfig;
use crate::oracle::{Oracle, OracleDecision};
use crate::tools::ToolRegistry;
use crate::{AgentError, AgentResult};

/// Outcome of a completed cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    /// The persisted decision, as stored
    pub decision: DecisionRecord,
    pub summaries_created: Vec<SummaryRecord>,
    pub prune: Option<PruneReport>,
    /// The oracle failed and a fallback decision was recorded
    pub oracle_failed: bool,
}

/// Drives the decision loop against one database
pub struct Agent {
    config: StewardConfig,
    db: Arc<Database>,
    assembler: ContextAssembler<DbMemoryStore>,
    oracle: Arc<dyn Oracle>,
    tools: ToolRegistry,
    retention: RetentionPolicy,
    last_action_time: Option<DateTime<Utc>>,
    last_prune: Option<DateTime<Utc>>,
    cycles: u64,
}

impl Agent {
    /// Create an agent with the default tool set.
    ///
    /// The time of the last action is recovered from the decision log, so a
    /// restarted agent reports the same idle time as before.
    pub fn new(config: StewardConfig, db: Arc<Database>, oracle: Arc<dyn Oracle>) -> AgentResult<Self> {
        config.validate()?;

        let store = DbMemoryStore::new(db.clone());
        let last_action_time = store.last_action_time()?;
        let tools = ToolRegistry::with_defaults(db.clone())?;
        let retention = RetentionPolicy::new(config.retention.protected_categories.clone());
        let assembler = ContextAssembler::new(store, (&config.memory).into());

        info!(
            oracle = oracle.name(),
            tools = tools.len(),
            last_action = ?last_action_time,
            "Agent initialized"
        );

        Ok(Self {
            config,
            db,
            assembler,
            oracle,
            tools,
            retention,
            last_action_time,
            last_prune: None,
            cycles: 0,
        })
    }

    /// Replace the tool registry
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn config(&self) -> &StewardConfig {
        &self.config
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn store(&self) -> &DbMemoryStore {
        self.assembler.store()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn oracle(&self) -> &Arc<dyn Oracle> {
        &self.oracle
    }

    pub fn last_action_time(&self) -> Option<DateTime<Utc>> {
        self.last_action_time
    }

    /// Cycles started so far, including failed ones
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one cycle.
    ///
    /// Oracle and tool failures are absorbed into the recorded decision.
    /// Storage failures abort the cycle and are returned.
    pub async fn run_cycle(&mut self) -> AgentResult<CycleReport> {
        self.cycles += 1;
        let span = info_span!("cycle", cycle = self.cycles);

        let result = self.execute_cycle().instrument(span.clone()).await;
        if let Err(e) = &result {
            span.in_scope(|| error!(error = %e, "Cycle failed"));
        }
        result
    }

    async fn execute_cycle(&mut self) -> AgentResult<CycleReport> {
        let now = self.db.clock().now();

        let context = self.assembler.build_context(now, self.last_action_time)?;
        let prompt = render_prompt(&self.config.goal, now, &context, &self.tools.describe_all());

        let (decision, oracle_failed) = match self.oracle.decide(&prompt).await {
            Ok(decision) => (decision, false),
            Err(e) => {
                warn!(
                    oracle = self.oracle.name(),
                    error = %e,
                    "Oracle call failed, recording fallback decision"
                );
                (OracleDecision::fallback(&e), true)
            }
        };

        let mut decision = decision.into_new_decision();
        if decision.kind == DecisionKind::Action {
            if let Some(details) = &decision.action {
                self.last_action_time = Some(now);
                let result = self.tools.invoke(&details.tool, &details.parameters, now).await;
                if !result.is_success() {
                    warn!(
                        tool = %details.tool,
                        message = result.message.as_deref().unwrap_or_default(),
                        "Tool reported an error"
                    );
                }
                decision.result = Some(result);
            }
        }

        let store = self.assembler.store();
        let decision_id = store.append(&decision)?;
        info!(
            decision_id,
            kind = %decision.kind,
            tool = ?decision.action.as_ref().map(|a| a.tool.as_str()),
            next_check = %decision.next_check,
            "Decision recorded"
        );

        let summaries_created = self.assembler.maybe_summarize(now)?;
        let prune = self.maybe_prune(now)?;

        let decision = self
            .assembler
            .store()
            .get(decision_id)?
            .ok_or_else(|| AgentError::not_found("Decision", decision_id.to_string()))?;

        Ok(CycleReport {
            cycle: self.cycles,
            decision,
            summaries_created,
            prune,
            oracle_failed,
        })
    }

    fn maybe_prune(&mut self, now: DateTime<Utc>) -> AgentResult<Option<PruneReport>> {
        let retention = &self.config.retention;
        if !retention.enabled {
            return Ok(None);
        }

        let min_gap = Duration::hours(i64::from(retention.min_hours_between_runs));
        if self.last_prune.is_some_and(|last| now - last < min_gap) {
            return Ok(None);
        }

        let report =
            self.retention
                .prune_older_than(self.assembler.store(), now, retention.horizon_days)?;
        self.last_prune = Some(now);
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ScriptedOracle;
    use chrono::TimeZone;
    use steward_core::Clock;
    use steward_core::memory::{NoteStore, SummaryStore};
    use steward_core::types::{ActionDetails, ActionResult, NewDecision, SummaryType};

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, h, 0, 0).unwrap()
    }

    fn setup(now: DateTime<Utc>, responses: Vec<&str>) -> (Agent, Clock) {
        let clock = Clock::manual(now);
        let db = Arc::new(Database::open_in_memory_with_clock(clock.clone()).unwrap());
        let oracle = Arc::new(ScriptedOracle::new(responses));
        let agent = Agent::new(StewardConfig::new("Stay on top of training"), db, oracle).unwrap();
        (agent, clock)
    }

    const WRITE_NOTE: &str = r#"{
        "analysis": "Long run done",
        "action_type": "Action",
        "reasoning": "Log it",
        "action_details": {"tool": "note_taking", "parameters": {"action": "write", "content": "18km easy", "category": "milestone"}},
        "next_check": "2 hours"
    }"#;

    #[tokio::test]
    async fn test_action_cycle_invokes_tool() {
        let (mut agent, _) = setup(at(4, 9), vec![WRITE_NOTE]);

        let report = agent.run_cycle().await.unwrap();
        assert_eq!(report.cycle, 1);
        assert!(!report.oracle_failed);
        assert_eq!(report.decision.tool(), Some("note_taking"));
        assert!(report.decision.succeeded());
        assert_eq!(report.decision.next_check, "2 hours");
        assert_eq!(agent.last_action_time(), Some(at(4, 9)));
        assert_eq!(agent.tools().last_used("note_taking").await, Some(at(4, 9)));

        let notes = agent.store().read_recent(10, Some("milestone")).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "18km easy");
    }

    #[tokio::test]
    async fn test_restart_recovers_last_action_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steward.db");
        let clock = Clock::manual(at(4, 9));

        {
            let db = Arc::new(Database::open_with_clock(&path, clock.clone()).unwrap());
            let oracle = Arc::new(ScriptedOracle::new(vec![WRITE_NOTE]));
            let mut agent =
                Agent::new(StewardConfig::new("Stay on top of training"), db, oracle).unwrap();
            agent.run_cycle().await.unwrap();
        }

        clock.set(at(4, 15));
        let db = Arc::new(Database::open_with_clock(&path, clock.clone()).unwrap());
        let agent = Agent::new(
            StewardConfig::new("Stay on top of training"),
            db,
            Arc::new(ScriptedOracle::idle()),
        )
        .unwrap();
        assert_eq!(agent.last_action_time(), Some(at(4, 9)));
        assert_eq!(agent.store().note_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_oracle_failure_records_fallback() {
        let (mut agent, _) = setup(at(4, 9), vec!["<decision>not json</decision>"]);

        let report = agent.run_cycle().await.unwrap();
        assert!(report.oracle_failed);
        assert_eq!(report.decision.kind, DecisionKind::NoAction);
        assert_eq!(report.decision.analysis, "Error in LLM processing");
        assert!(report.decision.reasoning.starts_with("Error occurred:"));
        assert!(report.decision.action.is_none());
        assert_eq!(agent.store().decision_count().unwrap(), 1);
        assert!(agent.last_action_time().is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_recorded_as_error() {
        let (mut agent, _) = setup(
            at(4, 9),
            vec![r#"{"action_type": "Action", "action_details": {"tool": "ghost", "parameters": {}}}"#],
        );

        let report = agent.run_cycle().await.unwrap();
        assert_eq!(report.decision.tool(), Some("ghost"));
        let result = report.decision.result.as_ref().unwrap();
        assert!(!result.is_success());
        assert_eq!(result.message.as_deref(), Some("Tool ghost not found"));
    }

    #[tokio::test]
    async fn test_daily_summary_after_midnight() {
        let (mut agent, clock) = setup(
            at(3, 10),
            vec![r#"{"action_type": "No Action"}"#, r#"{"action_type": "No Action"}"#],
        );

        let first = agent.run_cycle().await.unwrap();
        assert!(first.summaries_created.is_empty());

        clock.set(at(4, 10));
        let second = agent.run_cycle().await.unwrap();
        assert_eq!(second.summaries_created.len(), 1);
        let summary = &second.summaries_created[0];
        assert_eq!(summary.summary_type, SummaryType::Daily);
        assert_eq!(summary.payload.total_decisions, 1);
        assert_eq!(agent.store().summary_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_prune_runs_at_most_once_per_gap() {
        let (mut agent, clock) = setup(
            at(4, 9),
            vec![r#"{"action_type": "No Action"}"#, r#"{"action_type": "No Action"}"#],
        );

        let first = agent.run_cycle().await.unwrap();
        assert!(first.prune.is_some());

        clock.advance(Duration::hours(1));
        let second = agent.run_cycle().await.unwrap();
        assert!(second.prune.is_none());
    }

    #[tokio::test]
    async fn test_last_action_recovered_on_start() {
        let clock = Clock::manual(at(4, 9));
        let db = Arc::new(Database::open_in_memory_with_clock(clock.clone()).unwrap());
        db.append_decision(
            &NewDecision::action("a", "r", ActionDetails::new("calculator"))
                .with_result(ActionResult::success()),
        )
        .unwrap();

        clock.set(at(4, 12));
        let agent = Agent::new(
            StewardConfig::new("goal"),
            db,
            Arc::new(ScriptedOracle::idle()),
        )
        .unwrap();
        assert_eq!(agent.last_action_time(), Some(at(4, 9)));
    }

    #[tokio::test]
    async fn test_storage_failure_is_returned() {
        let (mut agent, _) = setup(at(4, 9), vec![r#"{"action_type": "No Action"}"#]);
        agent
            .database()
            .with_connection(|conn| Ok(conn.execute_batch("DROP TABLE decisions")?))
            .unwrap();

        let err = agent.run_cycle().await.unwrap_err();
        assert!(err.is_storage());
        assert_eq!(agent.cycles(), 1);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let result = Agent::new(
            StewardConfig::default(),
            db,
            Arc::new(ScriptedOracle::idle()),
        );
        assert!(matches!(result, Err(AgentError::Config(_))));
    }
}
