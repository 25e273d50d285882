//! Whois RPC Server - MCP server for WHOIS lookups.
//!
//! Serves the four lookup tools either to a single client over stdin/stdout
//! (`--stdio`) or to many clients over HTTP Server-Sent Events.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use whois_core::{
    LookupInvoker, RdapProvider, ServerConfig, ServerSettings, SessionTable, ShutdownCoordinator,
    ToolRegistry, WhoisProvider,
};
use whois_rpc::{server, signals};

#[derive(Parser, Debug)]
#[command(name = "whois-rpc", version)]
#[command(about = "MCP server for WHOIS domain, TLD, IP and ASN lookups")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, env = "PORT", default_value_t = ServerConfig::DEFAULT_PORT)]
    port: u16,

    /// Host to bind to
    #[arg(long, env = "HOST", default_value = ServerConfig::DEFAULT_HOST)]
    host: String,

    /// Maximum number of concurrent streaming sessions
    #[arg(long, env = "MAX_SESSIONS", default_value_t = ServerConfig::DEFAULT_MAX_SESSIONS)]
    max_sessions: usize,

    /// Comma-separated list of allowed origins (empty = allow all)
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,

    /// Bearer token required on every request
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Lookup timeout in milliseconds
    #[arg(long, env = "WHOIS_TIMEOUT", default_value = "15000")]
    whois_timeout: u64,

    /// How long to wait for open connections on shutdown, in milliseconds
    #[arg(long, env = "SHUTDOWN_GRACE_MS", default_value = "10000")]
    shutdown_grace: u64,

    /// RDAP service used for domain, IP and ASN lookups
    #[arg(long, env = "RDAP_BASE_URL", default_value = whois_core::LookupConfig::RDAP_BASE_URL)]
    rdap_base_url: String,

    /// RDAP service used for TLD lookups
    #[arg(long, env = "RDAP_TLD_BASE_URL", default_value = whois_core::LookupConfig::RDAP_TLD_BASE_URL)]
    rdap_tld_base_url: String,

    /// Serve a single client over stdin/stdout instead of HTTP
    #[arg(long)]
    stdio: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn settings(&self) -> ServerSettings {
        ServerSettings {
            host: self.host.clone(),
            port: self.port,
            max_sessions: self.max_sessions,
            allowed_origins: self.allowed_origins.clone(),
            api_key: self.api_key.clone(),
            lookup_timeout: Duration::from_millis(self.whois_timeout),
            shutdown_grace: Duration::from_millis(self.shutdown_grace),
            rdap_base_url: self.rdap_base_url.clone(),
            rdap_tld_base_url: self.rdap_tld_base_url.clone(),
        }
        .normalized()
    }
}

fn init_logging(args: &Args) {
    // RUST_LOG wins over --debug.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.debug { "debug" } else { "info" }));

    // stdout belongs to the protocol in stdio mode, so logs always go to stderr.
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    if args.log_json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    info!("Starting {} v{}", ServerConfig::DISPLAY_NAME, ServerConfig::VERSION);

    let settings = args.settings();
    let provider: Arc<dyn WhoisProvider> = Arc::new(RdapProvider::with_base_urls(
        &settings.rdap_base_url,
        &settings.rdap_tld_base_url,
    )?);
    info!(
        "Lookup timeout {}ms, RDAP service {}",
        settings.lookup_timeout.as_millis(),
        settings.rdap_base_url
    );

    if args.stdio {
        run_stdio(settings, provider).await?;
        // The blocking stdin reader would otherwise hold the runtime open.
        std::process::exit(0);
    }

    let grace = settings.shutdown_grace;
    let server = server::start_server(settings, provider).await?;

    // Intentional stdout for launchers that bind port 0
    println!("MCP_PORT={}", server.addr().port());

    info!("MCP server running on {}", server.addr());

    let signals = signals::spawn_signal_listener(server.coordinator())?;
    server.run_until_shutdown(grace).await?;
    signals.abort();

    info!("Server stopped");
    Ok(())
}

async fn run_stdio(settings: ServerSettings, provider: Arc<dyn WhoisProvider>) -> Result<()> {
    let registry = ToolRegistry::new(LookupInvoker::with_timeout(
        provider,
        settings.lookup_timeout,
    ));
    let coordinator = ShutdownCoordinator::new(Arc::new(SessionTable::new(1)));
    let signals = signals::spawn_signal_listener(coordinator.clone())?;

    let result = whois_core::stdio::serve_stdio(registry, coordinator.subscribe()).await;
    signals.abort();
    result?;

    info!("Stdio session ended");
    Ok(())
}
