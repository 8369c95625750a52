//! Note-taking tool backed by the core note store

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use steward_core::memory::NoteStore;
use steward_core::types::{ActionResult, JsonMap};
use tracing::warn;

use super::{Tool, ToolKind, ToolParams, parse_params};

const DEFAULT_READ_LIMIT: usize = 20;

fn default_limit() -> usize {
    DEFAULT_READ_LIMIT
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum NoteRequest {
    Write {
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        metadata: JsonMap,
    },
    Read {
        #[serde(default)]
        category: Option<String>,
        #[serde(default = "default_limit")]
        limit: usize,
    },
}

/// Note-taking tool
pub struct NoteTool {
    store: Arc<dyn NoteStore>,
}

impl NoteTool {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    fn write(&self, content: Option<String>, category: Option<String>, metadata: JsonMap) -> ActionResult {
        let Some(content) = content.filter(|c| !c.trim().is_empty()) else {
            return ActionResult::error("Content is required for write action");
        };

        match self.store.write(&content, category.as_deref(), &metadata) {
            Ok(note) => match serde_json::to_value(&note) {
                Ok(value) => ActionResult::success()
                    .with_message("Note saved")
                    .with_field("note", value),
                Err(e) => ActionResult::error(e.to_string()),
            },
            Err(e) => {
                warn!(error = %e, "Failed to store note");
                ActionResult::error(e.to_string())
            }
        }
    }

    fn read(&self, category: Option<String>, limit: usize) -> ActionResult {
        match self.store.read_recent(limit, category.as_deref()) {
            Ok(notes) => {
                let count = notes.len();
                match serde_json::to_value(&notes) {
                    Ok(value) => ActionResult::success()
                        .with_field("count", count)
                        .with_field("notes", value),
                    Err(e) => ActionResult::error(e.to_string()),
                }
            }
            Err(e) => ActionResult::error(e.to_string()),
        }
    }
}

#[async_trait]
impl Tool for NoteTool {
    fn name(&self) -> &str {
        "note_taking"
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Information
    }

    fn describe(&self) -> String {
        "Write and read timestamped notes. Parameters: action (write or read); for write: content, \
         category (optional, e.g. important or milestone), metadata (optional object); for read: \
         category (optional), limit (optional, default 20)"
            .to_string()
    }

    async fn execute(&self, params: &ToolParams) -> ActionResult {
        if let Some(action) = params.get("action").and_then(Value::as_str) {
            if !matches!(action, "write" | "read") {
                return ActionResult::error(format!("Unknown action: {}", action));
            }
        }

        match parse_params::<NoteRequest>(params) {
            Ok(NoteRequest::Write {
                content,
                category,
                metadata,
            }) => self.write(content, category, metadata),
            Ok(NoteRequest::Read { category, limit }) => self.read(category, limit),
            Err(message) => ActionResult::error(message),
        }
    }
}
