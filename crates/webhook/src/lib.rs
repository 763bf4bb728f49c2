//! Outbound webhook transport for chat agents.
//!
//! An agent is an external HTTP endpoint. This crate provides:
//!
//! - [`AgentTransport`] - The trait the chat controller talks to
//! - [`WebhookClient`] - The `reqwest` implementation
//! - [`WebhookRequest`] / [`extract_reply`] - The wire payload and reply envelope
//! - [`WebhookError`] - Error types for webhook calls
//!
//! # Example
//!
//! ```no_run
//! use webhook::{AgentTransport, WebhookClient, WebhookRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), webhook::WebhookError> {
//!     let client = WebhookClient::new()?;
//!     let request = WebhookRequest::new("Hi", "guest", "conversation-id");
//!
//!     let reply = client.deliver("https://example.test/hook", &request).await?;
//!     println!("Agent said: {}", reply);
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod payload;
mod transport;

pub use client::WebhookClient;
pub use error::WebhookError;
pub use payload::{extract_reply, ProbeResult, WebhookRequest, TEST_MESSAGE, TEST_SESSION_ID, TEST_USER_ID};
pub use transport::AgentTransport;

// Re-export async_trait for implementors
pub use async_trait::async_trait;
