//! Pluggable action handlers.
//!
//! A tool is a named capability the oracle may ask the agent to invoke. Tools
//! take a JSON parameter object, validate it into their own typed request at
//! the boundary and always answer with an [`ActionResult`]. A failure inside a
//! tool is reported as `{status: "error", message}` and never raised.
//!
//! ```ignore
//! let registry = ToolRegistry::with_defaults(db);
//! let result = registry.invoke("calculator", &params, now).await;
//! ```

mod calculator;
mod note;
mod registry;
mod todo;

pub use calculator::CalculatorTool;
pub use note::NoteTool;
pub use registry::ToolRegistry;
pub use todo::{TodoStatus, TodoTool};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use steward_core::types::{ActionResult, JsonMap};

/// Parameters passed to a tool
pub type ToolParams = JsonMap;

/// Broad grouping of tools, shown alongside descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Memory,
    Analysis,
    Information,
    Planning,
    Integration,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Memory => "memory",
            ToolKind::Analysis => "analysis",
            ToolKind::Information => "information",
            ToolKind::Planning => "planning",
            ToolKind::Integration => "integration",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability contract for tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the oracle uses to address the tool
    fn name(&self) -> &str;

    fn kind(&self) -> ToolKind;

    /// Human-readable description, including accepted parameters
    fn describe(&self) -> String;

    /// Run the tool. Failures are reported in the result, never raised.
    async fn execute(&self, params: &ToolParams) -> ActionResult;
}

/// Deserialize tool parameters into a typed request
pub(crate) fn parse_params<T: DeserializeOwned>(params: &ToolParams) -> Result<T, String> {
    serde_json::from_value(Value::Object(params.clone()))
        .map_err(|e| format!("Invalid parameters: {}", e))
}
