//! Wire payloads for webhook calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WebhookError;

/// Message sent by a webhook test call.
pub const TEST_MESSAGE: &str = "This is a test message from AI Agents Central Command.";

/// User id sent by a webhook test call.
pub const TEST_USER_ID: &str = "test-user";

/// Session id sent by a webhook test call.
pub const TEST_SESSION_ID: &str = "test-session";

/// Number of body characters echoed back by a successful test call.
const PROBE_ECHO_CHARS: usize = 100;

/// JSON body POSTed to an agent webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookRequest {
    /// The user's message text.
    pub message: String,
    /// Caller identity.
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Conversation the message belongs to.
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

impl WebhookRequest {
    /// Create a request for a chat message.
    pub fn new(
        message: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }

    /// The fixed payload used to test a webhook.
    pub fn test() -> Self {
        Self::new(TEST_MESSAGE, TEST_USER_ID, TEST_SESSION_ID)
    }
}

/// Extract the reply text from a webhook response body.
///
/// Agents answer with a JSON array whose first element carries the reply in
/// a string `output` field, e.g. `[{"output": "Hello"}]`. This envelope is a
/// convention of the agent provider, so every deviation is reported as
/// [`WebhookError::MalformedResponse`] instead of being guessed around.
pub fn extract_reply(body: &Value) -> Result<String, WebhookError> {
    let first = body
        .as_array()
        .ok_or_else(|| WebhookError::MalformedResponse("expected a JSON array".to_string()))?
        .first()
        .ok_or_else(|| WebhookError::MalformedResponse("empty response array".to_string()))?;

    let output = first
        .get("output")
        .ok_or_else(|| WebhookError::MalformedResponse("missing `output` field".to_string()))?;

    output
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| WebhookError::MalformedResponse("`output` is not a string".to_string()))
}

/// Outcome of a webhook test call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub success: bool,
    pub message: String,
}

impl ProbeResult {
    /// A 2xx answer, echoing the start of the body.
    pub fn succeeded(body: &str) -> Self {
        let mut echo: String = body.chars().take(PROBE_ECHO_CHARS).collect();
        if body.chars().count() > PROBE_ECHO_CHARS {
            echo.push_str("...");
        }

        Self {
            success: true,
            message: format!("Test successful! Response: {}", echo),
        }
    }

    /// A failed test with the reason.
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            message: format!("Test failed: {}", reason),
        }
    }
}
