//! `reqwest`-backed webhook transport.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::WebhookError;
use crate::payload::{extract_reply, ProbeResult, WebhookRequest};
use crate::transport::AgentTransport;

/// Webhook transport over HTTP.
///
/// No timeout is configured: a call waits for as long as the endpoint takes.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: Client,
}

impl WebhookClient {
    /// Create a new client.
    pub fn new() -> Result<Self, WebhookError> {
        let client = Client::builder().build().map_err(|e| {
            WebhookError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl AgentTransport for WebhookClient {
    async fn deliver(&self, url: &str, request: &WebhookRequest) -> Result<String, WebhookError> {
        info!("Sending request to agent webhook: {}", url);
        debug!("Payload: {:?}", request);

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| WebhookError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Agent webhook {} answered {}", url, status);
            return Err(WebhookError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| WebhookError::MalformedResponse(format!("Failed to parse response: {}", e)))?;

        debug!("Agent response: {}", body);

        extract_reply(&body)
    }

    async fn probe(&self, url: &str) -> ProbeResult {
        info!("Testing agent webhook: {}", url);

        let response = match self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(&WebhookRequest::test())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Webhook test to {} failed: {}", url, e);
                return ProbeResult::failed(e);
            }
        };

        let status = response.status();
        if !status.is_success() {
            return ProbeResult::failed(format!("HTTP error! status: {}", status.as_u16()));
        }

        match response.text().await {
            Ok(body) => ProbeResult::succeeded(&body),
            Err(e) => ProbeResult::failed(e),
        }
    }

    fn name(&self) -> &str {
        "WebhookClient"
    }
}
