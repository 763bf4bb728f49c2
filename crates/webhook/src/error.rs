//! Error types for webhook calls.

use thiserror::Error;

/// Errors that can occur while calling an agent webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The HTTP client could not be built.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The target URL is missing or not an http(s) URL.
    #[error("Agent webhook URL is missing or invalid")]
    InvalidUrl(String),

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-2xx status.
    #[error("Agent responded with status {0}")]
    Status(u16),

    /// The body did not match the expected reply envelope.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}
