//! Agent chat core: registry, conversation store and session controller.
//!
//! This crate provides the [`ChatSession`] type which coordinates a user's
//! chat with configurable webhook agents.
//!
//! # Architecture
//!
//! ```text
//! User input (from a shell)
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CHAT SESSION                          │
//! │                                                             │
//! │  1. Resolve agent (AgentRegistry: selected or first)        │
//! │         ↓                                                   │
//! │  2. Ensure conversation (ConversationStore)                 │
//! │         ↓                                                   │
//! │  3. Show pending user message, persist, confirm             │
//! │         ↓                                                   │
//! │  4. Show "Thinking...", POST to agent webhook               │
//! │         ↓                                                   │
//! │  5. Persist reply (or fallback) and reconcile timeline      │
//! └─────────────────────────────────────────────────────────────┘
//!          ↓
//! render_message → markup for display
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chat::{AgentRegistry, ChatSession, ConversationStore, LocalCache, LoggingNotifier};
//! use database::{Database, NewAgent};
//! use webhook::WebhookClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite:agent-chat.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let transport = Arc::new(WebhookClient::new()?);
//!     let notifier = Arc::new(LoggingNotifier);
//!     let registry = Arc::new(AgentRegistry::new(
//!         Some(db.clone()),
//!         LocalCache::open("agent-cache.json").await,
//!         transport.clone(),
//!         notifier.clone(),
//!     ));
//!     registry.load(true).await;
//!
//!     let store = Arc::new(ConversationStore::new(db, "guest"));
//!     let session = ChatSession::new("guest", store, registry, transport, notifier);
//!
//!     let outcome = session.send("Hi").await?;
//!     println!("Agent: {}", outcome.reply.message().content);
//!     Ok(())
//! }
//! ```

mod cache;
mod defaults;
mod error;
mod notify;
mod registry;
mod render;
mod session;
mod store;
mod timeline;

pub use cache::{LocalCache, AGENTS_KEY};
pub use defaults::{default_agents, DEFAULT_TEST_WEBHOOK_URL, DEFAULT_WEBHOOK_URL};
pub use error::ChatError;
pub use notify::{LoggingNotifier, Notifier, Toast, ToastBuffer, ToastVariant};
pub use registry::AgentRegistry;
pub use render::{
    format_relative_time, render_message, restyle_markup, Rendered, EMPTY_NOTICE,
    SUPPRESSED_NOTICE,
};
pub use session::{AgentReply, ChatSession, FallbackReason, SendError, SendOutcome, SendPhase, FALLBACK_REPLY};
pub use store::{ConversationStore, RECENT_LIMIT};
pub use timeline::{PendingKind, PendingMessage, Timeline, TimelineEntry, THINKING_TEXT};
