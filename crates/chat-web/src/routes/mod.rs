//! Route handlers for the chat web shell.

pub mod agents;
pub mod api;
pub mod pages;
pub mod health;

use axum::routing::{get, patch, post};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // HTML pages
        .route("/", get(pages::chat_page))
        .route("/send", post(pages::send_message))
        .route("/agents", get(agents::agents_page).post(agents::create_agent))
        .route("/agents/test", post(agents::test_agent))
        .route("/agents/:id", post(agents::update_agent))
        .route("/agents/:id/delete", post(agents::delete_agent))
        // Health check
        .route("/health", get(health::health))
        // API endpoints
        .route("/api/agents", get(api::list_agents).post(api::create_agent))
        .route("/api/agents/test", post(api::test_agent))
        .route(
            "/api/agents/:id",
            patch(api::update_agent).delete(api::delete_agent),
        )
        .route(
            "/api/conversations",
            get(api::list_conversations).post(api::create_conversation),
        )
        .route(
            "/api/conversations/:id",
            patch(api::rename_conversation).delete(api::delete_conversation),
        )
        .route("/api/conversations/:id/messages", get(api::list_messages))
        .route("/api/chat", post(api::send_chat))
        .route("/api/toasts", get(api::drain_toasts))
}
