//! The decision loop.
//!
//! - **Agent**: runs a single cycle against the memory store, oracle and tools
//! - **Runner**: repeats cycles on a schedule until shutdown
//! - **Prompt**: renders goal, context and tool descriptions for the oracle

mod cycle;
mod prompt;
mod runner;

pub use cycle::{Agent, CycleReport};
pub use prompt::render_prompt;
pub use runner::{Runner, next_delay, parse_next_check};
