//! Liveness endpoint.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Liveness report.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Processes currently offered by the registry.
    pub processes: usize,
    /// Session tokens seen since start.
    pub sessions: usize,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.registry.clone();
    let processes = tokio::task::spawn_blocking(move || registry.offerings().len())
        .await
        .unwrap_or_default();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        processes,
        sessions: state.sessions.len().await,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
