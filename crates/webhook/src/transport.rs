//! The AgentTransport trait definition.

use async_trait::async_trait;

use crate::error::WebhookError;
use crate::payload::{ProbeResult, WebhookRequest};

/// A trait for delivering chat messages to an agent endpoint.
///
/// This trait is object-safe and can be used with `Arc<dyn AgentTransport>`.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// Deliver a message and return the agent's reply text.
    ///
    /// A single attempt is made: non-2xx statuses, network failures and
    /// malformed bodies are all returned as errors.
    async fn deliver(&self, url: &str, request: &WebhookRequest) -> Result<String, WebhookError>;

    /// Send the fixed test payload to `url` and report the outcome.
    ///
    /// Never fails; failures are described in the returned [`ProbeResult`].
    async fn probe(&self, url: &str) -> ProbeResult;

    /// Get a human-readable name for this transport.
    fn name(&self) -> &str;
}
