//! Decision memory for the steward loop.
//!
//! Turns the append-only decision log back into context for the next cycle and
//! compacts it over time:
//!
//! - **Stores**: decisions, notes and summaries behind small traits
//! - **Patterns**: activity hours, repeated tool runs, time-of-day effectiveness
//! - **Summarizer**: daily / weekly / monthly statistical rollups
//! - **Context**: the bundle handed to the reasoning oracle, plus summary triggering
//! - **Retention**: pruning of old decisions and unprotected notes
//!
//! ## Usage
//!
//! ```ignore
//! use steward_core::memory::{ContextAssembler, DbMemoryStore, MemoryConfig};
//!
//! let store = DbMemoryStore::new(db);
//! let assembler = ContextAssembler::new(store, MemoryConfig::default());
//!
//! let bundle = assembler.build_context(now, last_action_time)?;
//! let prompt_section = bundle.render();
//!
//! // Once per cycle, after the decision has been persisted
//! let created = assembler.maybe_summarize(now)?;
//! ```

mod context;
mod patterns;
mod retention;
mod store;
mod summarizer;
mod traits;

pub use context::*;
pub use patterns::*;
pub use retention::*;
pub use store::*;
pub use summarizer::*;
pub use traits::*;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// How periodic summaries are triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryTrigger {
    /// Fire only during the first 15 minutes after UTC midnight.
    ///
    /// A cadence coarser than 15 minutes can miss the slot entirely and a
    /// restart inside it can fire twice.
    Window,
    /// Compare completed calendar windows against persisted watermarks.
    #[default]
    Watermark,
}

impl SummaryTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryTrigger::Window => "window",
            SummaryTrigger::Watermark => "watermark",
        }
    }
}

/// Configuration for context assembly and summarization.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Recent-decision window in hours (default: 24).
    pub recent_window_hours: i64,
    /// Summaries included in the context bundle.
    pub summary_limit: usize,
    /// Notes included in the context bundle.
    pub note_limit: usize,
    /// Hours either side of the current hour that form the same-hour cohort.
    pub cohort_radius_hours: u32,
    /// Maximum decisions in the same-hour cohort.
    pub cohort_limit: usize,
    /// Day on which a weekly window ends.
    pub week_end_day: Weekday,
    pub summary_trigger: SummaryTrigger,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            recent_window_hours: 24,
            summary_limit: 5,
            note_limit: 10,
            cohort_radius_hours: 1,
            cohort_limit: 50,
            week_end_day: Weekday::Sun,
            summary_trigger: SummaryTrigger::Watermark,
        }
    }
}
