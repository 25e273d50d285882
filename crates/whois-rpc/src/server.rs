//! HTTP server implementation using Axum.

use crate::handlers::{handle_health, handle_message, handle_sse, handle_status};
use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use whois_core::{
    AccessGuard, CommandRouter, LookupInvoker, ServerSettings, SessionManager, SessionTable,
    ShutdownCoordinator, ToolRegistry, TransportConfig, WhoisProvider,
};

/// Application state shared across handlers.
pub struct AppState {
    /// Resolved runtime settings
    pub settings: ServerSettings,
    /// Opens and tears down streaming sessions
    pub manager: SessionManager,
    /// Routes posted commands to their sessions
    pub router: CommandRouter,
    pub guard: AccessGuard,
    pub coordinator: ShutdownCoordinator,
}

impl AppState {
    pub fn new(settings: ServerSettings, provider: Arc<dyn WhoisProvider>) -> Self {
        let settings = settings.normalized();
        let table = Arc::new(SessionTable::new(settings.max_sessions));
        let invoker = LookupInvoker::with_timeout(provider, settings.lookup_timeout);
        let registry = ToolRegistry::new(invoker);

        Self {
            manager: SessionManager::new(table.clone(), registry),
            router: CommandRouter::new(table.clone()),
            guard: AccessGuard::from_settings(&settings),
            coordinator: ShutdownCoordinator::new(table),
            settings,
        }
    }

    pub fn table(&self) -> &Arc<SessionTable> {
        self.manager.table()
    }
}

/// Build the application router over shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.settings.allowed_origins);

    Router::new()
        .route("/", get(handle_status))
        .route("/health", get(handle_health))
        .route(TransportConfig::SSE_PATH, get(handle_sse))
        .route(TransportConfig::MESSAGE_PATH, post(handle_message))
        .layer(DefaultBodyLimit::max(TransportConfig::MAX_MESSAGE_SIZE))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring unparseable allowed origin {:?}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// A listening server and the handles needed to stop it.
pub struct RunningServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    task: JoinHandle<std::io::Result<()>>,
}

/// Start the HTTP server.
///
/// Binds `settings.host:settings.port` (port 0 picks a free port) and serves
/// in the background until the shutdown coordinator fires.
pub async fn start_server(
    settings: ServerSettings,
    provider: Arc<dyn WhoisProvider>,
) -> anyhow::Result<RunningServer> {
    let state = Arc::new(AppState::new(settings, provider));
    let app = build_router(state.clone());

    let addr: SocketAddr = format!("{}:{}", state.settings.host, state.settings.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                state.settings.host, state.settings.port
            )
        })?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);
    info!(
        "SSE endpoint: http://{}{}",
        actual_addr,
        TransportConfig::SSE_PATH
    );

    let coordinator = state.coordinator.clone();
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { coordinator.wait().await })
            .await
    });

    Ok(RunningServer {
        addr: actual_addr,
        state,
        task,
    })
}

impl RunningServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn coordinator(&self) -> ShutdownCoordinator {
        self.state.coordinator.clone()
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Wait for a shutdown request, then give the listener `grace` to finish.
    ///
    /// Connections still open after the grace period are abandoned.
    pub async fn run_until_shutdown(mut self, grace: Duration) -> anyhow::Result<()> {
        tokio::select! {
            joined = &mut self.task => {
                joined.context("server task panicked")??;
                return Ok(());
            }
            _ = self.state.coordinator.wait() => {}
        }

        match tokio::time::timeout(grace, &mut self.task).await {
            Ok(joined) => {
                joined.context("server task panicked")??;
                info!("HTTP listener closed");
            }
            Err(_) => {
                warn!(
                    "Listener still busy after {}ms grace period, abandoning open connections",
                    grace.as_millis()
                );
                self.task.abort();
            }
        }
        Ok(())
    }

    /// Request shutdown and wait for it to complete.
    pub async fn shutdown(self, grace: Duration) -> anyhow::Result<()> {
        self.state.coordinator.shutdown();
        self.run_until_shutdown(grace).await
    }
}
