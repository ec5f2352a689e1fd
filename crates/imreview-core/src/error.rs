//! Error types for imreview-core

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for editorial engine operations
pub type Result<T> = std::result::Result<T, ReviewError>;

/// Main error type for editorial engine operations
#[derive(Error, Debug)]
pub enum ReviewError {
    /// Referenced manuscript or review does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Actor lacks the capability for the requested operation
    #[error("Actor {actor} is not authorized to {operation}")]
    Forbidden { actor: String, operation: String },

    /// Conditional status commit kept losing to other writers
    #[error("Manuscript {manuscript} was modified concurrently; gave up after {attempts} attempts")]
    ConcurrentModification { manuscript: String, attempts: u32 },

    /// Operation is not valid in the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Input failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Document store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration failure
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ReviewError {
    /// Build a `Forbidden` error for an actor and operation
    pub fn forbidden(actor: impl ToString, operation: impl Into<String>) -> Self {
        ReviewError::Forbidden {
            actor: actor.to_string(),
            operation: operation.into(),
        }
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReviewError::ConcurrentModification { .. }
                | ReviewError::Store(StoreError::Conflict { .. })
                | ReviewError::Store(StoreError::Database(_))
        )
    }
}

/// Document store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Record already exists
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    /// Optimistic precondition failed
    #[error("Version conflict: expected {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for ReviewError {
    fn from(err: rusqlite::Error) -> Self {
        ReviewError::Store(StoreError::Database(err.to_string()))
    }
}
