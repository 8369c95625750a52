//! SDK Error Types
//!
//! Defines error types for the Steward SDK.

use thiserror::Error;

/// SDK Result type alias
pub type AgentResult<T> = Result<T, AgentError>;

/// SDK errors
#[derive(Debug, Error)]
pub enum AgentError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigValidationError),

    /// Store or validation error from the core
    #[error("{0}")]
    Core(#[from] steward_core::Error),

    /// Reasoning oracle error
    #[error("oracle error: {0}")]
    Oracle(#[from] crate::oracle::OracleError),

    /// Tool-level failure
    #[error("{tool}: {message}")]
    Tool { tool: String, message: String },

    /// Entry not found
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AgentError {
    /// Create a tool error
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Check if this error came from the persistence layer
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_storage())
    }

    /// Check if this error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error was caused by rejected input
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Core(e) => e.is_validation(),
            Self::Config(_) => true,
            _ => false,
        }
    }
}
