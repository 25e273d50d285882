//! Status and health endpoints.

use crate::server::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use whois_core::{ServerConfig, ShutdownState, TransportConfig};

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Server description and live session counts.
pub async fn handle_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = match state.coordinator.state() {
        ShutdownState::Running => "running",
        ShutdownState::Draining => "draining",
    };
    let table = state.table();

    Json(json!({
        "name": ServerConfig::DISPLAY_NAME,
        "version": ServerConfig::VERSION,
        "description": ServerConfig::DESCRIPTION,
        "status": status,
        "activeSessions": table.active_count(),
        "maxSessions": table.max_sessions(),
        "endpoints": {
            "sse": TransportConfig::SSE_PATH,
            "message": TransportConfig::MESSAGE_PATH,
        },
    }))
}
