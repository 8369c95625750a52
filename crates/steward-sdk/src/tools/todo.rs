//! Todo-list tool.
//!
//! Owns the `todos` table, created on construction next to the core schema.
//! Items carry a status, a 1-5 priority (1 is most urgent), an optional due
//! date, tags and free-form metadata.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use steward_core::Database;
use steward_core::clock::from_millis;
use steward_core::types::{ActionResult, JsonMap};
use tracing::debug;

use super::{Tool, ToolKind, ToolParams, parse_params};
use crate::{AgentError, AgentResult};

const TODOS_SQL: &str = "
CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'in_progress', 'completed', 'cancelled')),
    priority INTEGER NOT NULL DEFAULT 3,
    due_date TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    completed_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_todos_status ON todos(status, priority);
";

const TODO_COLUMNS: &str = "id, title, description, status, priority, due_date, tags, metadata, \
                            created_at, updated_at, completed_at";

const DEFAULT_PRIORITY: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Pending => "pending",
            TodoStatus::InProgress => "in_progress",
            TodoStatus::Completed => "completed",
            TodoStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TodoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TodoStatus::Pending),
            "in_progress" => Ok(TodoStatus::InProgress),
            "completed" => Ok(TodoStatus::Completed),
            "cancelled" => Ok(TodoStatus::Cancelled),
            _ => Err(format!("Invalid todo status: {}", s)),
        }
    }
}

/// A stored todo item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
    pub priority: i64,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub metadata: JsonMap,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Oracles send ids as numbers or strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TodoId {
    Number(i64),
    Text(String),
}

impl TodoId {
    fn resolve(id: Option<TodoId>) -> AgentResult<i64> {
        match id {
            Some(TodoId::Number(n)) => Ok(n),
            Some(TodoId::Text(s)) => s
                .trim()
                .parse()
                .map_err(|_| AgentError::tool("todo", format!("Invalid todo id: {}", s))),
            None => Err(AgentError::tool("todo", "Missing todo id")),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum TodoRequest {
    Add {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        status: Option<TodoStatus>,
        #[serde(default)]
        priority: Option<i64>,
        #[serde(default)]
        due_date: Option<NaiveDate>,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        metadata: JsonMap,
    },
    Update {
        #[serde(default)]
        id: Option<TodoId>,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        status: Option<TodoStatus>,
        #[serde(default)]
        priority: Option<i64>,
        #[serde(default)]
        due_date: Option<NaiveDate>,
        #[serde(default)]
        tags: Option<Vec<String>>,
        #[serde(default)]
        metadata: Option<JsonMap>,
    },
    Complete {
        #[serde(default)]
        id: Option<TodoId>,
    },
    List {
        #[serde(default)]
        status: Option<TodoStatus>,
        #[serde(default)]
        priority: Option<i64>,
        #[serde(default)]
        tags: Vec<String>,
    },
    Get {
        #[serde(default)]
        id: Option<TodoId>,
    },
    Delete {
        #[serde(default)]
        id: Option<TodoId>,
    },
}

const ACTIONS: [&str; 6] = ["add", "update", "complete", "list", "get", "delete"];

fn check_priority(priority: i64) -> AgentResult<i64> {
    if (1..=5).contains(&priority) {
        Ok(priority)
    } else {
        Err(AgentError::tool("todo", "Priority must be between 1 and 5"))
    }
}

fn todo_from_row(row: &Row) -> rusqlite::Result<Todo> {
    let status: String = row.get(3)?;
    let status = status
        .parse::<TodoStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into()))?;
    let due_date: Option<String> = row.get(5)?;
    let due_date = due_date
        .map(|d| d.parse::<NaiveDate>())
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    let tags: String = row.get(6)?;
    let tags = serde_json::from_str(&tags)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
    let metadata: String = row.get(7)?;
    let metadata = serde_json::from_str(&metadata)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;
    let completed_at: Option<i64> = row.get(10)?;

    Ok(Todo {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status,
        priority: row.get(4)?,
        due_date,
        tags,
        metadata,
        created_at: from_millis(row.get(8)?),
        updated_at: from_millis(row.get(9)?),
        completed_at: completed_at.map(from_millis),
    })
}

fn fetch(conn: &Connection, id: i64) -> steward_core::Result<Option<Todo>> {
    let todo = conn
        .query_row(
            &format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1"),
            params![id],
            todo_from_row,
        )
        .optional()?;
    Ok(todo)
}

/// Todo-list tool
pub struct TodoTool {
    db: Arc<Database>,
}

impl TodoTool {
    /// Create the tool, creating its table if needed
    pub fn new(db: Arc<Database>) -> AgentResult<Self> {
        db.with_connection(|conn| {
            conn.execute_batch(TODOS_SQL)?;
            Ok(())
        })?;
        Ok(Self { db })
    }

    fn now_millis(&self) -> i64 {
        self.db.clock().now().timestamp_millis()
    }

    fn get(&self, id: i64) -> AgentResult<Todo> {
        self.db
            .with_connection(|conn| fetch(conn, id))?
            .ok_or_else(|| AgentError::not_found("Todo", id.to_string()))
    }

    #[allow(clippy::too_many_arguments)]
    fn add(
        &self,
        title: Option<String>,
        description: Option<String>,
        status: Option<TodoStatus>,
        priority: Option<i64>,
        due_date: Option<NaiveDate>,
        tags: Vec<String>,
        metadata: JsonMap,
    ) -> AgentResult<ActionResult> {
        let Some(title) = title.filter(|t| !t.trim().is_empty()) else {
            return Err(AgentError::tool("todo", "Missing required fields: title"));
        };
        let priority = check_priority(priority.unwrap_or(DEFAULT_PRIORITY))?;
        let status = status.unwrap_or_default();
        let tags_json = serde_json::to_string(&tags)?;
        let metadata_json = serde_json::to_string(&metadata)?;
        let now = self.now_millis();
        let completed_at = (status == TodoStatus::Completed).then_some(now);

        let id = self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO todos (title, description, status, priority, due_date, tags, metadata,
                                    created_at, updated_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?9)",
                params![
                    title,
                    description,
                    status.as_str(),
                    priority,
                    due_date.map(|d| d.to_string()),
                    tags_json,
                    metadata_json,
                    now,
                    completed_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        debug!(todo_id = id, priority, "Created todo");

        Ok(ActionResult::success()
            .with_message("Todo created successfully")
            .with_field("todo_id", id))
    }

    #[allow(clippy::too_many_arguments)]
    fn update(
        &self,
        id: i64,
        title: Option<String>,
        description: Option<String>,
        status: Option<TodoStatus>,
        priority: Option<i64>,
        due_date: Option<NaiveDate>,
        tags: Option<Vec<String>>,
        metadata: Option<JsonMap>,
    ) -> AgentResult<ActionResult> {
        let now = self.now_millis();
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        if let Some(title) = title {
            sets.push("title = ?");
            values.push(title.into());
        }
        if let Some(description) = description {
            sets.push("description = ?");
            values.push(description.into());
        }
        if let Some(status) = status {
            sets.push("status = ?");
            values.push(status.as_str().to_string().into());
            sets.push("completed_at = ?");
            values.push((status == TodoStatus::Completed).then_some(now).into());
        }
        if let Some(priority) = priority {
            sets.push("priority = ?");
            values.push(check_priority(priority)?.into());
        }
        if let Some(due_date) = due_date {
            sets.push("due_date = ?");
            values.push(due_date.to_string().into());
        }
        if let Some(tags) = tags {
            sets.push("tags = ?");
            values.push(serde_json::to_string(&tags)?.into());
        }
        if let Some(metadata) = metadata {
            sets.push("metadata = ?");
            values.push(serde_json::to_string(&metadata)?.into());
        }

        if sets.is_empty() {
            return Err(AgentError::tool("todo", "No fields to update"));
        }
        sets.push("updated_at = ?");
        values.push(now.into());
        values.push(id.into());

        let sql = format!("UPDATE todos SET {} WHERE id = ?", sets.join(", "));
        let changed = self
            .db
            .with_connection(|conn| Ok(conn.execute(&sql, params_from_iter(values))?))?;
        if changed == 0 {
            return Err(AgentError::not_found("Todo", id.to_string()));
        }

        Ok(ActionResult::success()
            .with_message("Todo updated successfully")
            .with_field("todo_id", id))
    }

    fn complete(&self, id: i64) -> AgentResult<ActionResult> {
        let now = self.now_millis();
        let changed = self.db.with_connection(|conn| {
            Ok(conn.execute(
                "UPDATE todos SET status = 'completed', completed_at = ?1, updated_at = ?1
                 WHERE id = ?2",
                params![now, id],
            )?)
        })?;
        if changed == 0 {
            return Err(AgentError::not_found("Todo", id.to_string()));
        }

        Ok(ActionResult::success()
            .with_message("Todo marked as completed")
            .with_field("todo_id", id))
    }

    fn list(
        &self,
        status: Option<TodoStatus>,
        priority: Option<i64>,
        tags: Vec<String>,
    ) -> AgentResult<ActionResult> {
        let mut sql = format!("SELECT {TODO_COLUMNS} FROM todos WHERE 1 = 1");
        let mut values: Vec<SqlValue> = Vec::new();

        if let Some(status) = status {
            sql.push_str(" AND status = ?");
            values.push(status.as_str().to_string().into());
        }
        if let Some(priority) = priority {
            sql.push_str(" AND priority = ?");
            values.push(priority.into());
        }
        for tag in &tags {
            sql.push_str(" AND tags LIKE ?");
            values.push(format!("%\"{}\"%", tag).into());
        }
        sql.push_str(" ORDER BY priority ASC, created_at DESC, id DESC");

        let todos = self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let todos = stmt
                .query_map(params_from_iter(values), todo_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(todos)
        })?;

        Ok(ActionResult::success()
            .with_field("count", todos.len())
            .with_field("todos", serde_json::to_value(&todos)?))
    }

    fn delete(&self, id: i64) -> AgentResult<ActionResult> {
        let changed = self.db.with_connection(|conn| {
            Ok(conn.execute("DELETE FROM todos WHERE id = ?1", params![id])?)
        })?;
        if changed == 0 {
            return Err(AgentError::not_found("Todo", id.to_string()));
        }

        Ok(ActionResult::success()
            .with_message("Todo deleted successfully")
            .with_field("todo_id", id))
    }

    fn handle(&self, request: TodoRequest) -> AgentResult<ActionResult> {
        match request {
            TodoRequest::Add {
                title,
                description,
                status,
                priority,
                due_date,
                tags,
                metadata,
            } => self.add(title, description, status, priority, due_date, tags, metadata),
            TodoRequest::Update {
                id,
                title,
                description,
                status,
                priority,
                due_date,
                tags,
                metadata,
            } => self.update(
                TodoId::resolve(id)?,
                title,
                description,
                status,
                priority,
                due_date,
                tags,
                metadata,
            ),
            TodoRequest::Complete { id } => self.complete(TodoId::resolve(id)?),
            TodoRequest::List {
                status,
                priority,
                tags,
            } => self.list(status, priority, tags),
            TodoRequest::Get { id } => {
                let todo = self.get(TodoId::resolve(id)?)?;
                Ok(ActionResult::success().with_field("todo", serde_json::to_value(&todo)?))
            }
            TodoRequest::Delete { id } => self.delete(TodoId::resolve(id)?),
        }
    }
}

#[async_trait]
impl Tool for TodoTool {
    fn name(&self) -> &str {
        "todo"
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Planning
    }

    fn describe(&self) -> String {
        "Manage a todo list. Parameters: action (add, update, complete, list, get, delete); \
         add: title, description, status, priority (1-5, default 3), due_date (YYYY-MM-DD), tags, \
         metadata; update: id plus any add field; complete/get/delete: id; list: status, \
         priority, tags"
            .to_string()
    }

    async fn execute(&self, params: &ToolParams) -> ActionResult {
        if let Some(action) = params.get("action").and_then(serde_json::Value::as_str) {
            if !ACTIONS.contains(&action) {
                return ActionResult::error(format!("Unknown action: {}", action));
            }
        }

        let request = match parse_params::<TodoRequest>(params) {
            Ok(request) => request,
            Err(message) => return ActionResult::error(message),
        };

        match self.handle(request) {
            Ok(result) => result,
            Err(AgentError::Tool { message, .. }) => ActionResult::error(message),
            Err(AgentError::NotFound { entity_type, .. }) => {
                ActionResult::error(format!("{} not found", entity_type))
            }
            Err(e) => ActionResult::error(e.to_string()),
        }
    }
}
