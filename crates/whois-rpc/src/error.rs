//! HTTP error responses.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};
use whois_core::WhoisError;

/// An error rendered as an HTTP status with a JSON `{error, code}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: message.into(),
                code,
            },
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.body.code
    }
}

impl From<WhoisError> for ApiError {
    fn from(err: WhoisError) -> Self {
        match err {
            WhoisError::Unauthorized { reason } => {
                warn!("Rejected request: {}", reason);
                Self::new(StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized")
            }
            WhoisError::OriginNotAllowed { origin } => {
                warn!("Rejected request from origin {}", origin);
                Self::new(StatusCode::FORBIDDEN, "origin_not_allowed", "Origin not allowed")
            }
            err @ WhoisError::CapacityExceeded { .. } => {
                warn!("{}", err);
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "capacity_exceeded", err.to_string())
            }
            err @ WhoisError::ShuttingDown => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "shutting_down", err.to_string())
            }
            err @ WhoisError::MissingSessionId => {
                Self::bad_request("missing_session_id", err.to_string())
            }
            WhoisError::SessionNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "session_not_found", "Session not found")
            }
            err @ (WhoisError::Json { .. }
            | WhoisError::Validation { .. }
            | WhoisError::InvalidParams { .. }) => {
                Self::bad_request("invalid_request", err.to_string())
            }
            WhoisError::TransportFault { message } => {
                error!("Failed to forward command: {}", message);
                Self::internal("forward_failed", "Failed to deliver message to session")
            }
            err => {
                error!("Request failed: {}", err);
                Self::internal("internal_error", "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], Json(self.body)).into_response()
        } else {
            (status, Json(self.body)).into_response()
        }
    }
}
