//! Error types for chat operations.

use database::{DatabaseError, ValidationError};
use thiserror::Error;

/// Errors raised by the registry and the conversation store.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The relational store rejected an operation.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Submitted fields failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The record is unknown to every store.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The local cache could not be read or written.
    #[error("cache error: {0}")]
    Cache(String),
}

impl ChatError {
    /// Whether the error means the record does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            ChatError::NotFound { .. } => true,
            ChatError::Database(err) => err.is_not_found(),
            _ => false,
        }
    }
}
