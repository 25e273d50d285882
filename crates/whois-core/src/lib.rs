//! Whois Core - session-managed MCP server core for WHOIS-style lookups.
//!
//! This crate provides the transport-independent pieces of the server: the
//! four lookup tools, the per-session protocol server, the session table and
//! router used by the multi-client transport, the access guard, shutdown
//! coordination and the single-client pipe transport. It has no HTTP server
//! dependency; see the `whois-rpc` crate for the SSE front-end.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use whois_core::{LookupInvoker, RdapProvider, SessionManager, SessionTable, ToolRegistry};
//!
//! #[tokio::main]
//! async fn main() -> whois_core::Result<()> {
//!     let invoker = LookupInvoker::new(Arc::new(RdapProvider::new()?));
//!     let manager = SessionManager::new(Arc::new(SessionTable::new(10)), ToolRegistry::new(invoker));
//!
//!     let mut session = manager.open()?;
//!     session.handle.submit(serde_json::json!({
//!         "jsonrpc": "2.0", "id": 1, "method": "tools/list"
//!     })).await?;
//!     println!("{:?}", session.replies.recv().await);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod lookup;
pub mod protocol;
pub mod session;
pub mod shutdown;
pub mod stdio;
pub mod tools;

pub use config::{LookupConfig, ServerConfig, ServerSettings, TransportConfig};
pub use error::{Result, WhoisError};
pub use guard::AccessGuard;
pub use lookup::{LookupInvoker, LookupKind, LookupRequest, RdapProvider, WhoisProvider};
pub use protocol::{JsonRpcRequest, JsonRpcResponse, McpServer};
pub use session::{CommandRouter, OpenSession, SessionHandle, SessionManager, SessionTable};
pub use shutdown::{ShutdownCoordinator, ShutdownState};
pub use tools::{ToolOutcome, ToolRegistry};
