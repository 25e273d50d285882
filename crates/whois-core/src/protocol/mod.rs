//! MCP protocol handling over JSON-RPC 2.0.
//!
//! - **jsonrpc**: message types, error codes and line framing for the pipe transport
//! - **server**: the per-session protocol state machine

pub mod jsonrpc;
pub mod server;

pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use server::{ClientInfo, McpServer, SUPPORTED_PROTOCOL_VERSIONS};
