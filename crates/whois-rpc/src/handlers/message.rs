//! Command endpoint for the streaming transport.

use super::authorize;
use crate::error::ApiError;
use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// `POST /message?sessionId=<id>`
///
/// Accepts one JSON-RPC message for an open session. The reply is delivered
/// on that session's stream, so a successful post only returns `202`.
pub async fn handle_message(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessageQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers)?;

    let handle = state.router.resolve(query.session_id.as_deref())?;

    let message: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request("invalid_json", format!("Invalid JSON body: {}", e)))?;

    debug!("Command for session {}", handle.id());
    state.router.forward(&handle, message).await?;

    Ok((StatusCode::ACCEPTED, "Accepted"))
}
