//! Error types for the chat web shell.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chat::{ChatError, SendError};
use thiserror::Error;

/// Errors that can occur in the chat web shell.
#[derive(Debug, Error)]
pub enum WebError {
    /// Registry or store error.
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// A send could not complete.
    #[error(transparent)]
    Send(#[from] SendError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WebError {
    fn status(&self) -> StatusCode {
        match self {
            WebError::Chat(ChatError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            WebError::Chat(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            WebError::Chat(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WebError::Send(SendError::EmptyMessage)
            | WebError::Send(SendError::NoAgent)
            | WebError::Send(SendError::InvalidWebhook(_)) => StatusCode::BAD_REQUEST,
            WebError::Send(SendError::AgentNotFound(_)) => StatusCode::NOT_FOUND,
            WebError::Send(SendError::Busy) => StatusCode::CONFLICT,
            WebError::Send(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for web handlers.
pub type Result<T> = std::result::Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::*;
    use database::{DatabaseError, ValidationError};

    #[test]
    fn test_status_mapping() {
        let validation = WebError::from(ChatError::Validation(ValidationError::Empty(
            "description".to_string(),
        )));
        assert_eq!(validation.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let missing = WebError::from(ChatError::Database(DatabaseError::NotFound {
            entity: "Conversation",
            id: "c1".to_string(),
        }));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        assert_eq!(WebError::from(SendError::Busy).status(), StatusCode::CONFLICT);
        assert_eq!(WebError::from(SendError::NoAgent).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            WebError::from(ChatError::Cache("disk full".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_response_carries_message() {
        let response = WebError::from(SendError::NoAgent).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
