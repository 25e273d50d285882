//! Whois RPC - HTTP front-end for the WHOIS MCP server.
//!
//! Hosts the multi-client transport: a Server-Sent Events stream per client
//! (`GET /sse`) and a command endpoint (`POST /message?sessionId=...`), plus
//! status and health endpoints. The `whois-rpc` binary wires this to the
//! command line and OS signals.

pub mod error;
pub mod handlers;
pub mod server;
pub mod signals;

pub use error::ApiError;
pub use server::{build_router, start_server, AppState, RunningServer};
