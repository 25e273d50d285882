//! Centralized configuration for the WHOIS MCP server.
//!
//! Constants describe the server identity and defaults; [`ServerSettings`]
//! carries the values resolved at startup from flags and environment.

use std::time::Duration;

/// Server identity advertised to MCP clients and on the status endpoint.
pub struct ServerConfig;

impl ServerConfig {
    pub const SERVER_NAME: &'static str = "whois";
    pub const DISPLAY_NAME: &'static str = "Whois MCP Server";
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
    pub const DESCRIPTION: &'static str =
        "MCP for whois lookup about domain, IP, TLD, ASN, etc.";
    pub const DEFAULT_PORT: u16 = 3000;
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_MAX_SESSIONS: usize = 100;
    pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
}

/// Lookup-related configuration.
pub struct LookupConfig;

impl LookupConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);
    pub const RDAP_BASE_URL: &'static str = "https://rdap.org";
    pub const RDAP_TLD_BASE_URL: &'static str = "https://rdap.iana.org";
    pub const USER_AGENT: &'static str = concat!("whois-mcp/", env!("CARGO_PKG_VERSION"));
}

/// Transport channel sizing and endpoint paths.
pub struct TransportConfig;

impl TransportConfig {
    pub const SSE_PATH: &'static str = "/sse";
    pub const MESSAGE_PATH: &'static str = "/message";
    /// Pending commands per session before submitters wait.
    pub const INBOUND_QUEUE: usize = 32;
    /// Pending replies per session before the session task waits on the client.
    pub const OUTBOUND_QUEUE: usize = 32;
    pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);
    /// Maximum accepted size of one command body or stdio line.
    pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;
}

/// Runtime settings resolved at process start.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_sessions: usize,
    /// Exact origins allowed to connect; empty allows every origin.
    pub allowed_origins: Vec<String>,
    /// Bearer token required on every request; `None` disables the check.
    pub api_key: Option<String>,
    pub lookup_timeout: Duration,
    pub shutdown_grace: Duration,
    pub rdap_base_url: String,
    pub rdap_tld_base_url: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: ServerConfig::DEFAULT_HOST.to_string(),
            port: ServerConfig::DEFAULT_PORT,
            max_sessions: ServerConfig::DEFAULT_MAX_SESSIONS,
            allowed_origins: Vec::new(),
            api_key: None,
            lookup_timeout: LookupConfig::DEFAULT_TIMEOUT,
            shutdown_grace: ServerConfig::SHUTDOWN_GRACE,
            rdap_base_url: LookupConfig::RDAP_BASE_URL.to_string(),
            rdap_tld_base_url: LookupConfig::RDAP_TLD_BASE_URL.to_string(),
        }
    }
}

impl ServerSettings {
    /// Normalize raw values from the environment.
    ///
    /// Blank origins are dropped so `ALLOWED_ORIGINS=""` means allow-all, and
    /// a blank API key disables authentication.
    pub fn normalized(mut self) -> Self {
        self.allowed_origins = self
            .allowed_origins
            .into_iter()
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        self.api_key = self
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self
    }
}
