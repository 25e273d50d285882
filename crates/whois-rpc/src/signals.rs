//! OS signal handling.
//!
//! Every termination signal requests shutdown; the coordinator ignores all
//! but the first, so a repeated SIGTERM during draining is harmless.

use tokio::task::JoinHandle;
use tracing::info;
use whois_core::ShutdownCoordinator;

/// Install signal handlers and forward each signal to `coordinator`.
///
/// Handlers are registered before this returns, so a signal delivered right
/// after startup is never lost to the default disposition.
#[cfg(unix)]
pub fn spawn_signal_listener(coordinator: ShutdownCoordinator) -> anyhow::Result<JoinHandle<()>> {
    use anyhow::Context;
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let mut interrupt =
        signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                Some(()) = terminate.recv() => "SIGTERM",
                Some(()) = interrupt.recv() => "SIGINT",
                else => break,
            };
            info!("Received {}, shutting down", name);
            coordinator.shutdown();
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_signal_listener(coordinator: ShutdownCoordinator) -> anyhow::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, shutting down");
            coordinator.shutdown();
        }
    }))
}
