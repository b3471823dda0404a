//! Error types for Rota Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {reason}")]
    Validation {
        reason: String,
        /// Set when the rejection is caused by an identical pending request.
        duplicate_request: bool,
    },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Version conflict saving room {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(reason: impl Into<String>) -> Self {
        Error::Validation {
            reason: reason.into(),
            duplicate_request: false,
        }
    }

    pub fn duplicate(reason: impl Into<String>) -> Self {
        Error::Validation {
            reason: reason.into(),
            duplicate_request: true,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
