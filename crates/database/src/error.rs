//! Errors raised by the relational store.

use thiserror::Error;

use crate::validation::ValidationError;

/// Failure of an agent, conversation or message operation.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The pool or a query failed. Also raised once the pool is closed.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Embedded schema migrations could not be applied.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// No row with this id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A row with this id is already stored.
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// Fields rejected before reaching SQLite.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl DatabaseError {
    /// Whether the row simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }

    /// Whether the store itself is unreachable rather than the request
    /// being wrong.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DatabaseError::Sqlx(
                sqlx::Error::PoolClosed
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
            )
        )
    }
}

/// Result alias used by every store function.
pub type Result<T> = std::result::Result<T, DatabaseError>;
