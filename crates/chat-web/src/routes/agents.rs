//! Agent configuration page routes.

use askama::Template;
use axum::extract::{Path, State};
use axum::response::Redirect;
use axum::Form;
use chat::{Notifier, Toast};
use database::{AgentPatch, AgentStatus, ContentType, NewAgent};
use serde::Deserialize;

use crate::state::AppState;
use crate::views::{agent_views, toast_views, AgentView, ToastView};

/// Agent configuration page template.
#[derive(Template)]
#[template(path = "agents.html")]
pub struct AgentsTemplate {
    pub agents: Vec<AgentView>,
    pub toasts: Vec<ToastView>,
    pub remote_available: bool,
}

/// Submitted agent form.
#[derive(Deserialize)]
pub struct AgentForm {
    pub name: String,
    pub description: String,
    pub webhook_url: String,
    #[serde(default)]
    pub response_format: ContentType,
    #[serde(default)]
    pub status: AgentStatus,
}

/// Submitted webhook test form.
#[derive(Deserialize)]
pub struct TestForm {
    pub webhook_url: String,
}

/// Render the agent configuration page.
pub async fn agents_page(State(state): State<AppState>) -> AgentsTemplate {
    let agents = state.registry().list().await;

    AgentsTemplate {
        agents: agent_views(&agents, state.session.selected_agent().as_deref()),
        toasts: toast_views(state.toasts.drain()),
        remote_available: state.registry().is_remote_available(),
    }
}

/// Create an agent from the form.
pub async fn create_agent(State(state): State<AppState>, Form(form): Form<AgentForm>) -> Redirect {
    let new_agent = NewAgent {
        name: form.name,
        description: Some(form.description),
        webhook_url: form.webhook_url,
        status: form.status,
        response_format: form.response_format,
        configuration: None,
    };

    if let Err(e) = state.registry().create(new_agent).await {
        state.toasts.toast(Toast::error(e.to_string()));
    }

    Redirect::to("/agents")
}

/// Replace an agent's fields from the form.
pub async fn update_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<AgentForm>,
) -> Redirect {
    let patch = AgentPatch {
        name: Some(form.name),
        description: Some(form.description),
        webhook_url: Some(form.webhook_url),
        status: Some(form.status),
        response_format: Some(form.response_format),
        configuration: None,
    };

    if let Err(e) = state.registry().update(&id, patch).await {
        state.toasts.toast(Toast::error(e.to_string()));
    }

    Redirect::to("/agents")
}

/// Delete an agent.
pub async fn delete_agent(State(state): State<AppState>, Path(id): Path<String>) -> Redirect {
    if let Err(e) = state.registry().delete(&id).await {
        state.toasts.toast(Toast::error(e.to_string()));
    }

    Redirect::to("/agents")
}

/// Test a webhook and report the outcome as a toast.
pub async fn test_agent(State(state): State<AppState>, Form(form): Form<TestForm>) -> Redirect {
    let result = state.registry().test_webhook(&form.webhook_url).await;

    let toast = if result.success {
        Toast::success(result.message)
    } else {
        Toast::error(result.message)
    };
    state.toasts.toast(toast);

    Redirect::to("/agents")
}
