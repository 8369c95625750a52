//! Long-running decision loop with clean shutdown

use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::Agent;
use crate::AgentResult;
use crate::config::{ErrorPolicy, ScheduleConfig};

/// Runs cycles one at a time until shutdown
pub struct Runner {
    agent: Agent,
    max_cycles: Option<u64>,
}

impl Runner {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            max_cycles: None,
        }
    }

    /// Stop after this many cycles have been started
    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn into_agent(self) -> Agent {
        self.agent
    }

    /// Run until `shutdown` becomes true, the sender is dropped, or the cycle
    /// limit is reached. Returns the number of cycles that completed.
    ///
    /// Shutdown is checked between cycles; an in-flight cycle always finishes.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> AgentResult<u64> {
        let schedule = self.agent.config().schedule.clone();
        let mut completed = 0;

        info!(
            check_interval_secs = schedule.check_interval_secs,
            follow_hints = schedule.follow_hints,
            "Starting decision loop"
        );

        loop {
            if *shutdown.borrow() {
                info!("Shutdown requested");
                break;
            }

            let delay = match self.agent.run_cycle().await {
                Ok(report) => {
                    completed += 1;
                    next_delay(&schedule, &report.decision.next_check)
                }
                Err(e) => match schedule.on_error {
                    ErrorPolicy::Halt => {
                        error!(error = %e, "Cycle failed, stopping");
                        return Err(e);
                    }
                    ErrorPolicy::Continue => {
                        warn!(error = %e, "Cycle failed, waiting for next slot");
                        Duration::from_secs(schedule.check_interval_secs)
                    }
                },
            };

            if self.max_cycles.is_some_and(|max| self.agent.cycles() >= max) {
                info!(cycles = self.agent.cycles(), "Cycle limit reached");
                break;
            }

            info!(delay_secs = delay.as_secs(), "Waiting for next cycle");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                // A dropped sender counts as shutdown
                _ = shutdown.wait_for(|stop| *stop) => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        Ok(completed)
    }
}

/// Delay before the next cycle.
///
/// Uses the fixed interval unless hints are followed and `hint` parses, in
/// which case the hinted delay is clamped to the configured bounds.
pub fn next_delay(schedule: &ScheduleConfig, hint: &str) -> Duration {
    let fixed = Duration::from_secs(schedule.check_interval_secs);
    if !schedule.follow_hints {
        return fixed;
    }

    match parse_next_check(hint) {
        Some(delay) => delay.clamp(
            Duration::from_secs(schedule.min_interval_secs),
            Duration::from_secs(schedule.max_interval_secs),
        ),
        None => fixed,
    }
}

/// Parse a free-text delay such as "30 minutes", "2 hours", "an hour", "45m"
/// or "1.5 days".
pub fn parse_next_check(hint: &str) -> Option<Duration> {
    let hint = hint.trim().to_ascii_lowercase();
    let hint = hint.strip_prefix("in ").unwrap_or(&hint).trim();

    let split = hint
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(hint.len());
    let (number, rest) = hint.split_at(split);

    let mut words = rest.split_whitespace();
    let (amount, unit) = if number.is_empty() {
        match words.next()? {
            "a" | "an" | "one" => (1.0, words.next()?),
            _ => return None,
        }
    } else {
        (number.parse::<f64>().ok()?, words.next()?)
    };

    let unit_secs = match unit.trim_end_matches(['.', ',']) {
        "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600.0,
        "d" | "day" | "days" => 86_400.0,
        "w" | "week" | "weeks" => 604_800.0,
        _ => return None,
    };

    let secs = amount * unit_secs;
    if secs <= 0.0 {
        return None;
    }
    // Oracle text is untrusted; out-of-range values must not panic
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StewardConfig;
    use crate::oracle::ScriptedOracle;
    use std::sync::Arc;
    use steward_core::Database;

    fn setup(schedule: ScheduleConfig) -> (Agent, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let config = StewardConfig::new("Keep the garden alive").with_schedule(schedule);
        let agent = Agent::new(config, db.clone(), Arc::new(ScriptedOracle::idle())).unwrap();
        (agent, db)
    }

    fn fast_schedule() -> ScheduleConfig {
        ScheduleConfig {
            check_interval_secs: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_next_check() {
        assert_eq!(parse_next_check("30 minutes"), Some(Duration::from_secs(1800)));
        assert_eq!(parse_next_check("2 hours"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_next_check("1 day"), Some(Duration::from_secs(86_400)));
        assert_eq!(parse_next_check("45m"), Some(Duration::from_secs(2700)));
        assert_eq!(parse_next_check("An hour"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_next_check("in 1.5 hours"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_next_check("2 weeks."), Some(Duration::from_secs(1_209_600)));

        assert_eq!(parse_next_check(""), None);
        assert_eq!(parse_next_check("soon"), None);
        assert_eq!(parse_next_check("0 hours"), None);
        assert_eq!(parse_next_check("3 fortnights"), None);
    }

    #[test]
    fn test_next_delay() {
        let mut schedule = ScheduleConfig::default();
        assert_eq!(next_delay(&schedule, "5 minutes"), Duration::from_secs(3600));

        schedule.follow_hints = true;
        assert_eq!(next_delay(&schedule, "10 minutes"), Duration::from_secs(600));
        assert_eq!(next_delay(&schedule, "1 minute"), Duration::from_secs(300));
        assert_eq!(next_delay(&schedule, "3 days"), Duration::from_secs(86_400));
        assert_eq!(next_delay(&schedule, "whenever"), Duration::from_secs(3600));
    }

    #[test]
    fn test_oversized_hint_falls_back_to_interval() {
        assert_eq!(parse_next_check("99999999999999999999 weeks"), None);

        let schedule = ScheduleConfig {
            follow_hints: true,
            ..Default::default()
        };
        assert_eq!(
            next_delay(&schedule, "99999999999999999999 weeks"),
            Duration::from_secs(schedule.check_interval_secs)
        );
    }

    #[tokio::test]
    async fn test_stops_at_cycle_limit() {
        let (agent, db) = setup(fast_schedule());
        let (_tx, rx) = watch::channel(false);

        let mut runner = Runner::new(agent).with_max_cycles(2);
        assert_eq!(runner.run(rx).await.unwrap(), 2);
        assert_eq!(db.count_decisions().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_before_start() {
        let (agent, db) = setup(ScheduleConfig::default());
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        assert_eq!(Runner::new(agent).run(rx).await.unwrap(), 0);
        assert_eq!(db.count_decisions().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_sleep() {
        let (agent, db) = setup(ScheduleConfig::default());
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move { Runner::new(agent).run(rx).await });

        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            while db.count_decisions().unwrap() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(waited.is_ok());

        tx.send(true).unwrap();
        let completed = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(completed, 1);
    }

    #[tokio::test]
    async fn test_dropped_sender_stops_loop() {
        let (agent, _) = setup(ScheduleConfig::default());
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let completed = tokio::time::timeout(Duration::from_secs(5), Runner::new(agent).run(rx))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(completed, 1);
    }

    #[tokio::test]
    async fn test_error_policy() {
        let (agent, db) = setup(fast_schedule());
        db.with_connection(|conn| Ok(conn.execute_batch("DROP TABLE decisions")?))
            .unwrap();
        let (_tx, rx) = watch::channel(false);
        assert!(Runner::new(agent).run(rx).await.is_err());

        let (agent, db) = setup(ScheduleConfig {
            on_error: ErrorPolicy::Continue,
            ..fast_schedule()
        });
        db.with_connection(|conn| Ok(conn.execute_batch("DROP TABLE decisions")?))
            .unwrap();
        let (_tx, rx) = watch::channel(false);
        let mut runner = Runner::new(agent).with_max_cycles(2);
        assert_eq!(runner.run(rx).await.unwrap(), 0);
        assert_eq!(runner.agent().cycles(), 2);
    }
}
