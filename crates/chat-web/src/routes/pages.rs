//! Chat page routes.

use askama::Template;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use chat::{Notifier, Toast};
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::state::AppState;
use crate::views::{
    agent_views, conversation_views, entry_views, toast_views, AgentView, ConversationView,
    EntryView, ToastView,
};

/// Chat page template.
#[derive(Template)]
#[template(path = "chat.html")]
pub struct ChatTemplate {
    pub conversations: Vec<ConversationView>,
    pub agents: Vec<AgentView>,
    pub entries: Vec<EntryView>,
    pub active_conversation: Option<String>,
    pub toasts: Vec<ToastView>,
}

/// Query parameters of the chat page.
#[derive(Deserialize)]
pub struct ChatQuery {
    pub conversation: Option<String>,
    pub new: Option<String>,
}

/// Submitted chat form.
#[derive(Deserialize)]
pub struct SendForm {
    pub message: String,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub conversation: Option<String>,
}

/// Render the chat page for the conversation named in the URL.
///
/// `?new=true` starts a conversation and redirects to it.
pub async fn chat_page(State(state): State<AppState>, Query(query): Query<ChatQuery>) -> Response {
    if query.new.as_deref() == Some("true") {
        return match state.session.start_new_conversation().await {
            Ok(conversation) => redirect_to(Some(&conversation.id)).into_response(),
            Err(e) => {
                debug!("New conversation not started: {}", e);
                redirect_to(None).into_response()
            }
        };
    }

    let conversation = query.conversation.filter(|id| !id.is_empty());
    if let Err(e) = state.session.open_conversation(conversation.as_deref()).await {
        state
            .toasts
            .toast(Toast::error(format!("Conversation unavailable: {}", e)));
        return redirect_to(None).into_response();
    }

    render_chat(&state).await.into_response()
}

/// Send a message from the chat form and return to the conversation.
pub async fn send_message(State(state): State<AppState>, Form(form): Form<SendForm>) -> Redirect {
    if let Some(agent_id) = form.agent_id.as_deref().filter(|id| !id.is_empty()) {
        if let Err(e) = state.session.select_agent(agent_id).await {
            state.toasts.toast(Toast::error(e.to_string()));
        }
    }

    let conversation = form.conversation.filter(|id| !id.is_empty());
    if conversation != state.session.active_conversation().await {
        // An unknown id leaves no active conversation and the send starts one
        if let Err(e) = state.session.open_conversation(conversation.as_deref()).await {
            debug!("Form conversation not opened: {}", e);
        }
    }

    match state.session.send(&form.message).await {
        Ok(outcome) => redirect_to(Some(&outcome.conversation_id)),
        Err(e) => {
            debug!("Send from form failed: {}", e);
            let active = state.session.active_conversation().await;
            redirect_to(active.as_deref())
        }
    }
}

async fn render_chat(state: &AppState) -> ChatTemplate {
    let now = Utc::now();

    let agents = state.registry().list().await;
    let selected_agent = state
        .session
        .selected_agent()
        .or_else(|| agents.first().map(|a| a.id.clone()));

    let active_conversation = state.session.active_conversation().await;
    let conversations = state.store().list_conversations().await;
    let timeline = state.session.timeline();

    ChatTemplate {
        conversations: conversation_views(
            &conversations,
            &agents,
            active_conversation.as_deref(),
            now,
        ),
        agents: agent_views(&agents, selected_agent.as_deref()),
        entries: entry_views(timeline.entries(), now),
        active_conversation,
        toasts: toast_views(state.toasts.drain()),
    }
}

fn redirect_to(conversation_id: Option<&str>) -> Redirect {
    match conversation_id {
        Some(id) => Redirect::to(&format!("/?conversation={}", id)),
        None => Redirect::to("/"),
    }
}
