//! Unified Error Type System
//!
//! Centralized error types for the generation pipelines.
//!
//! ## Error Categories
//!
//! - **FatalConfig**: Missing resource or unresolvable budget (abort before any model call)
//! - **Transport**: Completion endpoint unreachable or erroring (abort, no retry)
//! - **Generation**: Parse or gate failures after the attempt budget is spent
//! - **Execution**: Query executor rejected the accepted SQL
//! - **Input**: Caller supplied an unusable request
//! - **System**: IO, JSON, database and pool plumbing
//!
//! Retries only ever happen inside the attempt loop. Every error that escapes a
//! pipeline is final and carries enough context to diagnose prompt regressions.

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories for log routing and exit reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    FatalConfig,
    Transport,
    Generation,
    Execution,
    Input,
    System,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FatalConfig => write!(f, "FATAL_CONFIG"),
            Self::Transport => write!(f, "TRANSPORT"),
            Self::Generation => write!(f, "GENERATION"),
            Self::Execution => write!(f, "EXECUTION"),
            Self::Input => write!(f, "INPUT"),
            Self::System => write!(f, "SYSTEM"),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum SpendError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Fatal Configuration
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    /// Required resource missing or unreadable
    #[error("Fatal configuration error: {0}")]
    FatalConfig(String),

    /// Budget id does not resolve to an owning user
    #[error("Unable to resolve user_id from budgetId={budget_id}")]
    BudgetNotFound { budget_id: i64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // -------------------------------------------------------------------------
    // Completion Endpoint
    // -------------------------------------------------------------------------
    #[error("Failed to call completion endpoint at {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    // -------------------------------------------------------------------------
    // Generation
    // -------------------------------------------------------------------------
    #[error(
        "{pipeline} failed after {attempts} attempts. Last failure: {last_failure}. Last output: {last_output}"
    )]
    RetriesExhausted {
        pipeline: String,
        attempts: u32,
        last_output: String,
        last_failure: String,
    },

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------
    #[error("Failed to execute query: {sql} | DB error: {cause}")]
    Execution { sql: String, cause: String },
}

pub type Result<T> = std::result::Result<T, SpendError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl SpendError {
    /// Create a transport error naming the endpoint
    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create an execution error carrying the offending SQL
    pub fn execution(sql: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Execution {
            sql: sql.into(),
            cause: cause.to_string(),
        }
    }

    /// Create an exhausted-retries error
    pub fn retries_exhausted(
        pipeline: impl Into<String>,
        attempts: u32,
        last_output: &str,
        last_failure: impl Into<String>,
    ) -> Self {
        let last_output = if last_output.trim().is_empty() {
            "<empty>".to_string()
        } else {
            last_output.to_string()
        };
        Self::RetriesExhausted {
            pipeline: pipeline.into(),
            attempts,
            last_output,
            last_failure: last_failure.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::FatalConfig(_) | Self::BudgetNotFound { .. } => {
                ErrorCategory::FatalConfig
            }
            Self::InvalidInput(_) => ErrorCategory::Input,
            Self::Transport { .. } => ErrorCategory::Transport,
            Self::RetriesExhausted { .. } => ErrorCategory::Generation,
            Self::Execution { .. } => ErrorCategory::Execution,
            Self::Io(_)
            | Self::Database(_)
            | Self::Pool(_)
            | Self::Json(_)
            | Self::Storage(_) => ErrorCategory::System,
        }
    }
}

/// Context extension trait for storage-layer errors
pub trait ResultExt<T> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Lazy variant of `with_context`
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| SpendError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| SpendError::Storage(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::FatalConfig.to_string(), "FATAL_CONFIG");
        assert_eq!(ErrorCategory::Transport.to_string(), "TRANSPORT");
        assert_eq!(ErrorCategory::Generation.to_string(), "GENERATION");
    }

    #[test]
    fn test_budget_not_found_is_fatal_config() {
        let err = SpendError::BudgetNotFound { budget_id: 42 };
        assert_eq!(err.category(), ErrorCategory::FatalConfig);
        assert!(err.to_string().contains("budgetId=42"));
    }

    #[test]
    fn test_transport_names_endpoint() {
        let err = SpendError::transport("http://localhost:11434/api/generate", "refused");
        assert_eq!(err.category(), ErrorCategory::Transport);
        assert!(err.to_string().contains("http://localhost:11434/api/generate"));
    }

    #[test]
    fn test_retries_exhausted_carries_last_output() {
        let err = SpendError::retries_exhausted(
            "SQL generation",
            3,
            "DELETE FROM transaction",
            "banned token",
        );
        let msg = err.to_string();
        assert!(msg.contains("after 3 attempts"));
        assert!(msg.contains("DELETE FROM transaction"));
        assert!(msg.contains("banned token"));
    }

    #[test]
    fn test_retries_exhausted_blank_output() {
        let err = SpendError::retries_exhausted("Insights", 3, "   ", "empty");
        match err {
            SpendError::RetriesExhausted { last_output, .. } => assert_eq!(last_output, "<empty>"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_execution_error_display() {
        let err = SpendError::execution("SELECT 1", "no such table: budget");
        assert_eq!(err.category(), ErrorCategory::Execution);
        assert_eq!(
            err.to_string(),
            "Failed to execute query: SELECT 1 | DB error: no such table: budget"
        );
    }
}
