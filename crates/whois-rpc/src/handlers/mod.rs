//! HTTP request handlers, split by endpoint.

mod message;
mod sse;
mod status;

pub use message::handle_message;
pub use sse::handle_sse;
pub use status::{handle_health, handle_status};

use crate::server::AppState;
use axum::http::{header, HeaderMap};
use whois_core::Result;

/// Run the access guard against a request's headers.
///
/// Headers that are not valid visible ASCII count as absent.
pub(crate) fn authorize(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    state.guard.check(authorization, origin)
}
