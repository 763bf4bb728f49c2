//! Application state shared across handlers.

use std::sync::Arc;

use chat::{AgentRegistry, ChatSession, ConversationStore, ToastBuffer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Chat controller for the configured identity.
    pub session: Arc<ChatSession>,
    /// Toasts waiting to be shown on the next page.
    pub toasts: Arc<ToastBuffer>,
}

impl AppState {
    /// Create new application state.
    pub fn new(session: Arc<ChatSession>, toasts: Arc<ToastBuffer>) -> Self {
        Self { session, toasts }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        self.session.registry()
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        self.session.store()
    }
}
