//! Streaming endpoint: one Server-Sent Events channel per client.
//!
//! The first event tells the client where to post commands; every later
//! `message` event carries one JSON-RPC reply. The session lives exactly as
//! long as the stream: dropping the stream (client disconnect) drops the
//! teardown guard, and a closed session ends the stream.

use super::authorize;
use crate::error::ApiError;
use crate::server::AppState;
use axum::{
    extract::State,
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error};
use whois_core::{OpenSession, TransportConfig};

/// `GET /sse`
pub async fn handle_sse(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    authorize(&state, &headers)?;

    let OpenSession {
        handle,
        replies,
        guard,
    } = state.manager.open()?;

    let endpoint = format!(
        "{}?sessionId={}",
        TransportConfig::MESSAGE_PATH,
        handle.id()
    );
    debug!("Session {} announced endpoint {}", handle.id(), endpoint);

    let announce = stream::once(async move {
        Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint))
    });

    // The guard rides along in the stream state. A closed session ends the
    // stream even if replies are still queued.
    let messages = stream::unfold(
        (replies, guard, handle),
        |(mut replies, guard, handle)| async move {
            let reply = tokio::select! {
                biased;
                _ = handle.closed() => return None,
                reply = replies.recv() => reply?,
            };
            let event = match serde_json::to_string(&reply) {
                Ok(json) => Event::default().event("message").data(json),
                Err(e) => {
                    error!("Failed to encode reply: {}", e);
                    Event::default().comment("encode error")
                }
            };
            Some((Ok::<_, Infallible>(event), (replies, guard, handle)))
        },
    );

    Ok(Sse::new(announce.chain(messages))
        .keep_alive(KeepAlive::new().interval(TransportConfig::KEEP_ALIVE_INTERVAL)))
}
