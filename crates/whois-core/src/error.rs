//! Error types for the WHOIS MCP core.
//!
//! Errors fall into three groups. Operation errors (validation, timeout,
//! upstream) are turned into tool results flagged as errors and never end a
//! session. Admission and routing errors reject one attempt. Transport faults
//! end exactly one session.

use std::time::Duration;
use thiserror::Error;

/// Main error type for the WHOIS core.
#[derive(Debug, Error)]
pub enum WhoisError {
    // Operation errors
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("WHOIS lookup timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("{message}")]
    Upstream {
        message: String,
        /// HTTP status reported by the provider, if any
        status: Option<u16>,
    },

    // Admission errors
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("Origin not allowed: {origin}")]
    OriginNotAllowed { origin: String },

    #[error("Session capacity exceeded (max {max})")]
    CapacityExceeded { max: usize },

    #[error("Server is shutting down")]
    ShuttingDown,

    // Routing errors
    #[error("Missing sessionId query parameter")]
    MissingSessionId,

    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    // Transport errors
    #[error("Transport fault: {message}")]
    TransportFault { message: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // Protocol errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for WHOIS core operations.
pub type Result<T> = std::result::Result<T, WhoisError>;

impl From<std::io::Error> for WhoisError {
    fn from(err: std::io::Error) -> Self {
        WhoisError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for WhoisError {
    fn from(err: serde_json::Error) -> Self {
        WhoisError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for WhoisError {
    fn from(err: reqwest::Error) -> Self {
        WhoisError::Network {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl WhoisError {
    /// Shorthand for a validation failure on a named input field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        WhoisError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a failure reported by the lookup provider.
    pub fn upstream(message: impl Into<String>) -> Self {
        WhoisError::Upstream {
            message: message.into(),
            status: None,
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// Standard JSON-RPC error codes:
    /// - -32700: Parse error
    /// - -32600: Invalid Request
    /// - -32601: Method not found
    /// - -32602: Invalid params
    /// - -32603: Internal error
    ///
    /// Custom error codes (application-defined, -32000 to -32099):
    /// - -32000: Upstream/network error
    /// - -32001: Lookup timed out
    /// - -32002: Access denied
    /// - -32003: Session unavailable (capacity, routing, shutdown)
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            WhoisError::Upstream { .. } | WhoisError::Network { .. } => -32000,

            WhoisError::Timeout(_) => -32001,

            WhoisError::Unauthorized { .. } | WhoisError::OriginNotAllowed { .. } => -32002,

            WhoisError::CapacityExceeded { .. }
            | WhoisError::ShuttingDown
            | WhoisError::MissingSessionId
            | WhoisError::SessionNotFound { .. } => -32003,

            WhoisError::Json { .. } => -32700,

            WhoisError::MethodNotFound { .. } => -32601,

            WhoisError::Validation { .. } | WhoisError::InvalidParams { .. } => -32602,

            // All other errors are internal errors
            _ => -32603,
        }
    }

    /// Check if this error must end the session it occurred in.
    ///
    /// Only channel I/O failures do; every other error is reported to the
    /// caller and the session carries on.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, WhoisError::TransportFault { .. } | WhoisError::Io { .. })
    }
}
