//! Web shell for chatting with webhook agents.
//!
//! Server-rendered chat and agent pages plus a JSON API over the same
//! session.

mod config;
mod error;
mod routes;
mod state;
mod views;

use std::sync::Arc;

use chat::{AgentRegistry, ChatSession, ConversationStore, LocalCache, ToastBuffer};
use database::Database;
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::EnvFilter;
use webhook::{AgentTransport, WebhookClient};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, user = %config.user_id, "Starting chat web server");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    let transport: Arc<dyn AgentTransport> = Arc::new(WebhookClient::new()?);
    let toasts = Arc::new(ToastBuffer::default());

    // Agents come from the database, falling back to the local cache
    let registry = Arc::new(AgentRegistry::new(
        Some(db.clone()),
        LocalCache::open(&config.agent_cache_path).await,
        transport.clone(),
        toasts.clone(),
    ));
    registry.load(config.seed_default_agents).await;
    info!(
        agents = registry.list().await.len(),
        remote = registry.is_remote_available(),
        "Agent registry loaded"
    );

    let store = Arc::new(ConversationStore::new(db, config.user_id.clone()));
    store.list_conversations().await;

    let session = Arc::new(ChatSession::new(
        config.user_id.clone(),
        store,
        registry,
        transport,
        toasts.clone(),
    ));

    // Build application state
    let state = AppState::new(session, toasts);

    // Build router
    let app = routes::router()
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state);

    // Start server
    info!(addr = %config.addr, "Chat web server listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
