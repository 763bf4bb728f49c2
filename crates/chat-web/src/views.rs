//! View models handed to templates.

use chat::{format_relative_time, render_message, Toast, TimelineEntry};
use chrono::{DateTime, Utc};
use database::{Agent, ContentType, Conversation};

/// Sidebar label for a conversation whose agent no longer exists.
const UNKNOWN_AGENT: &str = "AI Agent";

/// A conversation in the sidebar.
pub struct ConversationView {
    pub id: String,
    pub title: String,
    pub agent_name: String,
    pub when: String,
    pub active: bool,
}

/// An agent in a selector or the configuration list.
pub struct AgentView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub webhook_url: String,
    pub status: String,
    pub response_format: String,
    pub selected: bool,
}

/// One rendered timeline row.
pub struct EntryView {
    pub from_user: bool,
    pub html: String,
    pub pending: bool,
    pub thinking: bool,
    pub when: String,
}

/// A toast ready for display.
pub struct ToastView {
    pub title: String,
    pub description: String,
    pub destructive: bool,
}

pub fn conversation_views(
    conversations: &[Conversation],
    agents: &[Agent],
    active: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<ConversationView> {
    conversations
        .iter()
        .map(|conversation| ConversationView {
            id: conversation.id.clone(),
            title: conversation.title.clone(),
            agent_name: agents
                .iter()
                .find(|a| a.id == conversation.agent_id)
                .map(|a| a.name.clone())
                .unwrap_or_else(|| UNKNOWN_AGENT.to_string()),
            when: format_relative_time(&conversation.last_message_at, now),
            active: active == Some(conversation.id.as_str()),
        })
        .collect()
}

pub fn agent_views(agents: &[Agent], selected: Option<&str>) -> Vec<AgentView> {
    agents
        .iter()
        .map(|agent| AgentView {
            id: agent.id.clone(),
            name: agent.name.clone(),
            description: agent.description.clone().unwrap_or_default(),
            webhook_url: agent.webhook_url.clone(),
            status: agent.status.to_string(),
            response_format: agent.response_format.to_string(),
            selected: selected == Some(agent.id.as_str()),
        })
        .collect()
}

pub fn entry_views(entries: &[TimelineEntry], now: DateTime<Utc>) -> Vec<EntryView> {
    entries
        .iter()
        .map(|entry| {
            let rendered = match entry {
                TimelineEntry::Confirmed(message) => {
                    render_message(&message.content, message.content_type)
                }
                TimelineEntry::Pending(pending) => {
                    render_message(&pending.content, ContentType::Text)
                }
            };

            EntryView {
                from_user: entry.sender_type() == database::SenderType::User,
                html: rendered.to_html(),
                pending: entry.is_pending(),
                thinking: entry.is_thinking(),
                when: format_relative_time(entry.timestamp(), now),
            }
        })
        .collect()
}

pub fn toast_views(toasts: Vec<Toast>) -> Vec<ToastView> {
    toasts
        .into_iter()
        .map(|toast| ToastView {
            destructive: toast.is_error(),
            title: toast.title,
            description: toast.description,
        })
        .collect()
}
