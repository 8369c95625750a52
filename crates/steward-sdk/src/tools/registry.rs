//! Tool Registry
//!
//! Maps tool names to implementations and tracks when each was last used.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use steward_core::Database;
use steward_core::memory::DbMemoryStore;
use steward_core::types::ActionResult;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{CalculatorTool, NoteTool, TodoTool, Tool, ToolKind, ToolParams};
use crate::AgentResult;

/// Tool registry
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    last_used: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the note-taking, calculator and todo tools
    pub fn with_defaults(db: Arc<Database>) -> AgentResult<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(NoteTool::new(Arc::new(DbMemoryStore::new(db.clone())))));
        registry.register(Arc::new(CalculatorTool));
        registry.register(Arc::new(TodoTool::new(db)?));
        Ok(registry)
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "Replaced previously registered tool");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted
    pub fn list_tools(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn tools_by_kind(&self, kind: ToolKind) -> Vec<Arc<dyn Tool>> {
        self.tools
            .values()
            .filter(|tool| tool.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// When a tool was last invoked through this registry
    pub async fn last_used(&self, name: &str) -> Option<DateTime<Utc>> {
        self.last_used.read().await.get(name).copied()
    }

    /// One line per tool, as shown to the oracle
    pub fn describe_all(&self) -> String {
        self.tools
            .values()
            .map(|tool| format!("- {}: {}", tool.name(), tool.describe()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Invoke a tool by name.
    ///
    /// Unknown names produce an error result rather than an `Err`.
    pub async fn invoke(&self, name: &str, params: &ToolParams, now: DateTime<Utc>) -> ActionResult {
        let Some(tool) = self.get(name) else {
            warn!(tool = %name, "Requested tool is not registered");
            return ActionResult::error(format!("Tool {} not found", name));
        };

        self.last_used.write().await.insert(name.to_string(), now);
        let result = tool.execute(params).await;
        debug!(
            tool = %name,
            status = ?result.status,
            "Tool finished"
        );
        result
    }
}
