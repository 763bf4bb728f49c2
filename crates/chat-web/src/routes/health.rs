//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: String,
    /// Whether agent writes still reach the database
    pub remote_store: bool,
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        remote_store: state.registry().is_remote_available(),
    })
}
