//! JSON API routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chat::{render_message, AgentReply, ChatError, Rendered, SendError, Toast};
use database::{Agent, AgentPatch, Conversation, Message, NewAgent};
use serde::{Deserialize, Serialize};
use tracing::info;
use webhook::ProbeResult;

use crate::error::Result;
use crate::state::AppState;

/// Request to test a webhook.
#[derive(Deserialize)]
pub struct TestRequest {
    pub webhook_url: String,
}

/// Request to create a conversation.
#[derive(Deserialize)]
pub struct CreateConversationRequest {
    /// Defaults to the selected agent, then the first agent
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Request to rename a conversation.
#[derive(Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

/// A stored message with its display form.
#[derive(Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub rendered: Rendered,
}

/// Request to send a chat message.
#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub agent_id: Option<String>,
    /// Omit to start a new conversation
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Result of a chat send.
#[derive(Serialize)]
pub struct ChatResponse {
    pub conversation_id: String,
    pub user_message: Message,
    pub reply: Message,
    /// Whether `reply` is the stored fallback
    pub fallback: bool,
    pub error: Option<String>,
}

/// List agents, newest first.
pub async fn list_agents(State(state): State<AppState>) -> Json<Vec<Agent>> {
    Json(state.registry().list().await)
}

/// Create an agent.
pub async fn create_agent(
    State(state): State<AppState>,
    Json(req): Json<NewAgent>,
) -> Result<(StatusCode, Json<Agent>)> {
    let agent = state.registry().create(req).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

/// Apply a partial update to an agent.
pub async fn update_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<AgentPatch>,
) -> Result<Json<Agent>> {
    let agent = state.registry().update(&id, patch).await?;
    Ok(Json(agent))
}

/// Delete an agent.
pub async fn delete_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.registry().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Send the test payload to a webhook.
pub async fn test_agent(
    State(state): State<AppState>,
    Json(req): Json<TestRequest>,
) -> Json<ProbeResult> {
    Json(state.registry().test_webhook(&req.webhook_url).await)
}

/// List the most recent conversations.
pub async fn list_conversations(State(state): State<AppState>) -> Json<Vec<Conversation>> {
    Json(state.store().list_conversations().await)
}

/// Create a conversation without sending anything.
pub async fn create_conversation(
    State(state): State<AppState>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<Conversation>)> {
    let agent = match req.agent_id {
        Some(id) => state.registry().get(&id).await.ok_or(ChatError::NotFound {
            entity: "Agent",
            id,
        })?,
        None => {
            let selected = match state.session.selected_agent() {
                Some(id) => state.registry().get(&id).await,
                None => None,
            };
            match selected {
                Some(agent) => agent,
                None => state.registry().first().await.ok_or(SendError::NoAgent)?,
            }
        }
    };

    let conversation = state
        .store()
        .create_conversation(&agent.id, req.title.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(conversation)))
}

/// Rename a conversation.
pub async fn rename_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<Conversation>> {
    state.store().get_conversation(&id).await?;
    state
        .store()
        .update_conversation_title(&id, &req.title)
        .await?;

    Ok(Json(state.store().get_conversation(&id).await?))
}

/// Delete a conversation and its messages.
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.store().get_conversation(&id).await?;
    state.session.delete_conversation(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List a conversation's messages in order, with their rendered form.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MessageView>>> {
    state.store().get_conversation(&id).await?;
    let messages = state.store().fetch_messages(&id).await?;

    Ok(Json(
        messages
            .into_iter()
            .map(|message| MessageView {
                rendered: render_message(&message.content, message.content_type),
                message,
            })
            .collect(),
    ))
}

/// Send a chat message and wait for the agent's reply.
pub async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    if let Some(agent_id) = &req.agent_id {
        state.session.select_agent(agent_id).await?;
    }

    if req.conversation_id != state.session.active_conversation().await {
        state
            .session
            .open_conversation(req.conversation_id.as_deref())
            .await?;
    }

    let outcome = state.session.send(&req.message).await?;
    let fallback = outcome.reply.is_fallback();
    let error = match &outcome.reply {
        AgentReply::Fallback { error, .. } => Some(error.to_string()),
        AgentReply::Delivered(_) => None,
    };

    info!(
        conversation = %outcome.conversation_id,
        fallback,
        "Chat message handled"
    );

    Ok(Json(ChatResponse {
        reply: outcome.reply.message().clone(),
        conversation_id: outcome.conversation_id,
        user_message: outcome.user_message,
        fallback,
        error,
    }))
}

/// Take the toasts queued since the last call.
pub async fn drain_toasts(State(state): State<AppState>) -> Json<Vec<Toast>> {
    Json(state.toasts.drain())
}
