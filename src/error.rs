//! Error types for the fund tracker.
//!
//! The taxonomy mirrors how failures are absorbed by the sync pipeline:
//! `Unavailable` selects local-only mode, `Remote` and persistence errors are
//! logged and swallowed, `NotFound` and `Validation` reach the caller.

use thiserror::Error;

use crate::entities::CollectionKind;

/// Result type alias for fund tracker operations
pub type Result<T> = std::result::Result<T, FundError>;

#[derive(Error, Debug)]
pub enum FundError {
    /// Remote credential unset or session could not be opened
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// Remote read/write failed after the session was established
    #[error("remote {operation} failed: {message}")]
    Remote { operation: String, message: String },

    /// Update/delete target has no matching row
    #[error("{kind} with key '{key}' not found")]
    NotFound { kind: CollectionKind, key: String },

    /// Input rejected before any mutation was attempted
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Action not permitted for the signed-in role
    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("local storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FundError {
    pub fn remote(operation: &str, message: impl std::fmt::Display) -> Self {
        FundError::Remote {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    pub fn not_found(kind: CollectionKind, key: impl Into<String>) -> Self {
        FundError::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FundError::NotFound { .. })
    }
}

impl From<reqwest::Error> for FundError {
    fn from(err: reqwest::Error) -> Self {
        FundError::remote("request", err)
    }
}
