//! Per-session MCP protocol server.
//!
//! Every session gets its own [`McpServer`]; it is owned by that session's
//! task and never shared, so it needs no synchronization.

use super::jsonrpc::{JsonRpcRequest, JsonRpcResponse, INVALID_REQUEST, PARSE_ERROR};
use crate::config::ServerConfig;
use crate::tools::ToolRegistry;
use crate::WhoisError;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Protocol revisions this server speaks, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

#[derive(Debug, Deserialize)]
struct InitializeParams {
    #[serde(rename = "protocolVersion")]
    protocol_version: Option<String>,
    #[serde(rename = "clientInfo", default)]
    client_info: Option<ClientInfo>,
}

/// Name and version a client reports during `initialize`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// MCP server state for one session.
pub struct McpServer {
    registry: ToolRegistry,
    label: String,
    client: Option<ClientInfo>,
    protocol_version: Option<String>,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            label: "stdio".to_string(),
            client: None,
            protocol_version: None,
        }
    }

    /// Tag log lines with the session this instance serves.
    pub fn for_session(registry: ToolRegistry, session_id: &str) -> Self {
        Self {
            label: session_id.to_string(),
            ..Self::new(registry)
        }
    }

    pub fn client(&self) -> Option<&ClientInfo> {
        self.client.as_ref()
    }

    /// Negotiated protocol revision, once `initialize` has completed.
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Handle one raw message. Returns the reply, if the message warrants one.
    pub async fn handle_message(&mut self, raw: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                warn!("[{}] Invalid JSON-RPC payload: {}", self.label, e);
                Some(JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ))
            }
        }
    }

    /// Handle one already-decoded message.
    pub async fn handle_value(&mut self, value: Value) -> Option<JsonRpcResponse> {
        if value.is_array() {
            return Some(JsonRpcResponse::error(
                None,
                INVALID_REQUEST,
                "Invalid Request: batch messages are not supported".to_string(),
            ));
        }

        // Replies to server-initiated requests; this server never sends any.
        if value.get("method").is_none()
            && (value.get("result").is_some() || value.get("error").is_some())
        {
            debug!("[{}] Ignoring client response message", self.label);
            return None;
        }

        let id = value.get("id").cloned();
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(req) => req,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    id,
                    INVALID_REQUEST,
                    format!("Invalid Request: {}", e),
                ));
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                "Invalid Request: expected jsonrpc 2.0".to_string(),
            ));
        }

        self.handle_request(request).await
    }

    async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("[{}] RPC call: {}", self.label, request.method);

        if request.is_notification() {
            self.handle_notification(&request.method);
            return None;
        }

        let params = request.params.unwrap_or(Value::Object(Default::default()));
        let result = match request.method.as_str() {
            "initialize" => self.initialize(params),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.registry.list()),
            "tools/call" => self.call_tool(params).await,
            other => Err(WhoisError::MethodNotFound {
                method: other.to_string(),
            }),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(e) => {
                warn!("[{}] RPC error for {}: {}", self.label, request.method, e);
                JsonRpcResponse::from_error(request.id, &e)
            }
        })
    }

    fn handle_notification(&mut self, method: &str) {
        match method {
            "notifications/initialized" => {
                debug!("[{}] Client finished initialization", self.label);
            }
            "notifications/cancelled" => {
                // Requests run to completion in arrival order; nothing to cancel.
                debug!("[{}] Ignoring cancellation notice", self.label);
            }
            other => debug!("[{}] Unhandled notification: {}", self.label, other),
        }
    }

    fn initialize(&mut self, params: Value) -> crate::Result<Value> {
        let params: InitializeParams =
            serde_json::from_value(params).map_err(|e| WhoisError::InvalidParams {
                message: e.to_string(),
            })?;

        let requested = params.protocol_version.unwrap_or_default();
        let negotiated = if SUPPORTED_PROTOCOL_VERSIONS.contains(&requested.as_str()) {
            requested
        } else {
            SUPPORTED_PROTOCOL_VERSIONS[0].to_string()
        };

        if let Some(client) = &params.client_info {
            info!(
                "[{}] Client {} {} initialized (protocol {})",
                self.label,
                client.name,
                client.version.as_deref().unwrap_or("?"),
                negotiated
            );
        }
        self.client = params.client_info;
        self.protocol_version = Some(negotiated.clone());

        Ok(json!({
            "protocolVersion": negotiated,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": ServerConfig::SERVER_NAME,
                "version": ServerConfig::VERSION,
            },
            "instructions": ServerConfig::DESCRIPTION,
        }))
    }

    async fn call_tool(&mut self, params: Value) -> crate::Result<Value> {
        let params: ToolCallParams =
            serde_json::from_value(params).map_err(|e| WhoisError::InvalidParams {
                message: e.to_string(),
            })?;
        let outcome = self.registry.call(&params.name, &params.arguments).await?;
        Ok(serde_json::to_value(outcome)?)
    }
}
