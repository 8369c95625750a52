//! SDK Configuration
//!
//! Defines configuration options for the decision loop. Every field has a
//! default, so a config file only needs the parts it changes.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use steward_core::memory::{PROTECTED_CATEGORIES, SummaryTrigger};

/// Steward configuration options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StewardConfig {
    /// Path to the SQLite database file (platform data dir when unset)
    pub database_path: Option<PathBuf>,

    /// The goal the loop works towards
    pub goal: GoalConfig,

    /// Reasoning oracle configuration
    pub oracle: OracleConfig,

    /// Context and summary configuration
    pub memory: MemoryConfig,

    /// Retention configuration
    pub retention: RetentionConfig,

    /// Cycle scheduling
    pub schedule: ScheduleConfig,
}

/// Goal description and success criteria
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalConfig {
    pub description: String,
    pub success_criteria: Vec<String>,
    /// Target date (YYYY-MM-DD)
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleProvider {
    /// Google Gemini over HTTPS
    #[default]
    Gemini,
    /// Canned no-action responses, no network
    Scripted,
}

/// Reasoning oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub provider: OracleProvider,

    /// Model name (default: gemini-1.5-pro)
    pub model: String,

    /// API key; usually supplied through GEMINI_API_KEY
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub base_url: String,

    /// Sampling temperature (default: 0.7)
    pub temperature: f32,

    /// Nucleus sampling (default: 0.95)
    pub top_p: f32,

    /// Top-k sampling (default: 40)
    pub top_k: u32,

    /// Maximum output tokens (default: 8192)
    pub max_output_tokens: u32,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: OracleProvider::Gemini,
            model: "gemini-1.5-pro".to_string(),
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            timeout_secs: 120,
        }
    }
}

/// Context and summary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Recent-decision window in hours (default: 24)
    pub recent_window_hours: i64,

    /// Summaries shown to the oracle (default: 5)
    pub summary_limit: usize,

    /// Notes shown to the oracle (default: 10)
    pub note_limit: usize,

    /// Same-hour cohort radius in hours (default: 1)
    pub cohort_radius_hours: u32,

    /// Same-hour cohort size cap (default: 50)
    pub cohort_limit: usize,

    /// Day a weekly summary window ends on (default: Sunday)
    pub week_end_day: Weekday,

    /// Summary trigger mode (default: watermark)
    pub summary_trigger: SummaryTrigger,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        let core = steward_core::memory::MemoryConfig::default();
        Self {
            recent_window_hours: core.recent_window_hours,
            summary_limit: core.summary_limit,
            note_limit: core.note_limit,
            cohort_radius_hours: core.cohort_radius_hours,
            cohort_limit: core.cohort_limit,
            week_end_day: core.week_end_day,
            summary_trigger: core.summary_trigger,
        }
    }
}

impl From<&MemoryConfig> for steward_core::memory::MemoryConfig {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            recent_window_hours: config.recent_window_hours,
            summary_limit: config.summary_limit,
            note_limit: config.note_limit,
            cohort_radius_hours: config.cohort_radius_hours,
            cohort_limit: config.cohort_limit,
            week_end_day: config.week_end_day,
            summary_trigger: config.summary_trigger,
        }
    }
}

/// Retention configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Prune opportunistically after cycles (default: true)
    pub enabled: bool,

    /// Keep decisions and notes this many days (default: 90)
    pub horizon_days: u32,

    /// Note categories never pruned
    pub protected_categories: Vec<String>,

    /// Minimum hours between opportunistic prune runs (default: 24)
    pub min_hours_between_runs: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            horizon_days: 90,
            protected_categories: PROTECTED_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            min_hours_between_runs: 24,
        }
    }
}

/// What the runner does when a cycle fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the loop and return the error
    #[default]
    Halt,
    /// Log the error and try again at the next slot
    Continue,
}

/// Cycle scheduling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds between cycles (default: 3600)
    pub check_interval_secs: u64,

    /// Use the oracle's next_check hint as the delay (default: false)
    pub follow_hints: bool,

    /// Lower clamp for hinted delays (default: 300)
    pub min_interval_secs: u64,

    /// Upper clamp for hinted delays (default: 86400)
    pub max_interval_secs: u64,

    pub on_error: ErrorPolicy,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 3600,
            follow_hints: false,
            min_interval_secs: 300,
            max_interval_secs: 86_400,
            on_error: ErrorPolicy::Halt,
        }
    }
}

impl StewardConfig {
    /// Create a config for the given goal
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: GoalConfig {
                description: goal.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Set the database path
    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Set goal configuration
    pub fn with_goal(mut self, goal: GoalConfig) -> Self {
        self.goal = goal;
        self
    }

    /// Set oracle configuration
    pub fn with_oracle(mut self, oracle: OracleConfig) -> Self {
        self.oracle = oracle;
        self
    }

    /// Set memory configuration
    pub fn with_memory(mut self, memory: MemoryConfig) -> Self {
        self.memory = memory;
        self
    }

    /// Set retention configuration
    pub fn with_retention(mut self, retention: RetentionConfig) -> Self {
        self.retention = retention;
        self
    }

    /// Set schedule configuration
    pub fn with_schedule(mut self, schedule: ScheduleConfig) -> Self {
        self.schedule = schedule;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.goal.description.trim().is_empty() {
            return Err(ConfigValidationError::MissingGoal);
        }

        if !(0.0..=2.0).contains(&self.oracle.temperature) {
            return Err(invalid("oracle.temperature", "must be between 0 and 2"));
        }

        if self.oracle.top_p <= 0.0 || self.oracle.top_p > 1.0 {
            return Err(invalid("oracle.top_p", "must be between 0 and 1"));
        }

        if self.memory.recent_window_hours <= 0 {
            return Err(invalid("memory.recent_window_hours", "must be greater than 0"));
        }

        if self.retention.enabled && self.retention.horizon_days == 0 {
            return Err(invalid("retention.horizon_days", "must be greater than 0"));
        }

        if self.schedule.check_interval_secs == 0 {
            return Err(invalid("schedule.check_interval_secs", "must be greater than 0"));
        }

        if self.schedule.min_interval_secs > self.schedule.max_interval_secs {
            return Err(invalid(
                "schedule.min_interval_secs",
                "must not exceed schedule.max_interval_secs",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigValidationError {
    ConfigValidationError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("goal.description is required")]
    MissingGoal,

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
