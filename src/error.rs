//! Structured error types for import runs.

use serde::Serialize;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (4xx-like)
    InvalidFieldValue,

    // Caller aborted the run
    Cancelled,

    // Internal errors
    DatabaseError,
}

/// An error that aborts an import invocation.
///
/// Soft outcomes (missing fields, duplicates, orphans) never surface here;
/// they are tallied into the run's result instead.
#[derive(Debug, Error)]
pub enum ImportError {
    /// A record failed validation. `index` is its position in the input.
    #[error("record {index}: invalid {field}: {reason}")]
    InvalidField {
        index: usize,
        field: &'static str,
        reason: String,
    },

    #[error("import cancelled")]
    Cancelled,

    #[error("store error: {0:#}")]
    Store(anyhow::Error),
}

impl ImportError {
    pub fn invalid(index: usize, field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            index,
            field,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ImportError::InvalidField { .. } => ErrorCode::InvalidFieldValue,
            ImportError::Cancelled => ErrorCode::Cancelled,
            ImportError::Store(_) => ErrorCode::DatabaseError,
        }
    }
}

// Errors cross the transaction closure as anyhow; recover the original class.
impl From<anyhow::Error> for ImportError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ImportError>() {
            Ok(import_err) => import_err,
            Err(err) => ImportError::Store(err),
        }
    }
}
