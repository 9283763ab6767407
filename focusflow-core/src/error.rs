//! Error types for focusflow-core

use thiserror::Error;

/// Main error type for the focusflow-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Plan generation model error.
    ///
    /// Never reaches callers of plan generation; the generator recovers
    /// with the fallback plan.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Referenced entity does not exist or belongs to another user
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Plan was already materialized into a project
    #[error("plan already imported: {0}")]
    AlreadyImported(String),

    /// Malformed caller input
    #[error("validation error: {0}")]
    Validation(String),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Errors caused by the caller's request (4xx-equivalent, never retried).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. } | Error::AlreadyImported(_) | Error::Validation(_)
        )
    }

    /// Infrastructure failures that an idempotent caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Io(_))
    }
}

/// Result type alias for focusflow-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::not_found("plan", "p1").is_client_error());
        assert!(Error::AlreadyImported("p1".to_string()).is_client_error());
        assert!(Error::Validation("empty goal".to_string()).is_client_error());
        assert!(!Error::Llm("timeout".to_string()).is_client_error());

        let db_err = Error::Database(rusqlite::Error::InvalidQuery);
        assert!(db_err.is_retryable());
        assert!(!db_err.is_client_error());
        assert!(!Error::Validation("x".to_string()).is_retryable());
    }

    #[test]
    fn test_not_found_message() {
        let err = Error::not_found("task", "abc");
        assert_eq!(err.to_string(), "task not found: abc");
    }
}
