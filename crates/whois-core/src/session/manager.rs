//! Streaming session lifecycle.
//!
//! [`SessionManager::open`] admits a session, binds a fresh protocol server
//! to it and spawns the task that feeds it commands. The transport holds the
//! returned [`OpenSession`]: it reads replies from `replies` and keeps
//! `guard` alive for as long as the client is connected.

use super::{SessionHandle, SessionTable};
use crate::config::TransportConfig;
use crate::protocol::{JsonRpcResponse, McpServer};
use crate::tools::ToolRegistry;
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

/// Creates sessions and owns their teardown routine.
#[derive(Clone)]
pub struct SessionManager {
    table: Arc<SessionTable>,
    registry: ToolRegistry,
}

/// A session that has been admitted and bound.
pub struct OpenSession {
    pub handle: SessionHandle,
    /// Protocol replies for the client, in command order.
    pub replies: mpsc::Receiver<JsonRpcResponse>,
    /// Tears the session down when dropped.
    pub guard: TeardownGuard,
}

/// Closes its session on drop.
///
/// The transport keeps this inside the response stream, so a client
/// disconnect drops it.
pub struct TeardownGuard {
    table: Arc<SessionTable>,
    handle: SessionHandle,
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if self.table.close_session(&self.handle) {
            debug!("Session {} torn down by transport", self.handle.id());
        }
    }
}

impl SessionManager {
    pub fn new(table: Arc<SessionTable>, registry: ToolRegistry) -> Self {
        Self { table, registry }
    }

    pub fn table(&self) -> &Arc<SessionTable> {
        &self.table
    }

    /// Admit and start a new session.
    ///
    /// Fails with `CapacityExceeded` or `ShuttingDown` before any protocol
    /// state is created.
    pub fn open(&self) -> Result<OpenSession> {
        let reservation = self.table.try_admit()?;
        let id = reservation.id().to_string();

        let (inbound_tx, inbound_rx) = mpsc::channel(TransportConfig::INBOUND_QUEUE);
        let (outbound_tx, outbound_rx) = mpsc::channel(TransportConfig::OUTBOUND_QUEUE);
        let (handle, close_rx) = SessionHandle::new(id.clone(), inbound_tx);

        self.table.bind(reservation, handle.clone())?;

        let server = McpServer::for_session(self.registry.clone(), &id);
        tokio::spawn(run_session(
            server,
            self.table.clone(),
            handle.clone(),
            inbound_rx,
            outbound_tx,
            close_rx,
        ));

        info!(
            "Session established: {} ({}/{} active)",
            id,
            self.table.active_count(),
            self.table.max_sessions()
        );

        Ok(OpenSession {
            guard: TeardownGuard {
                table: self.table.clone(),
                handle: handle.clone(),
            },
            handle,
            replies: outbound_rx,
        })
    }

    /// Close a session through the shared teardown routine.
    pub fn teardown(&self, handle: &SessionHandle) -> bool {
        self.table.close_session(handle)
    }
}

/// Process one session's commands in arrival order until it closes.
async fn run_session(
    mut server: McpServer,
    table: Arc<SessionTable>,
    handle: SessionHandle,
    mut inbound: mpsc::Receiver<Value>,
    outbound: mpsc::Sender<JsonRpcResponse>,
    mut close_rx: watch::Receiver<bool>,
) {
    loop {
        if *close_rx.borrow_and_update() {
            break;
        }

        let message = tokio::select! {
            _ = close_rx.changed() => break,
            message = inbound.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let reply = tokio::select! {
            _ = close_rx.changed() => break,
            reply = server.handle_value(message) => reply,
        };

        if let Some(reply) = reply {
            tokio::select! {
                _ = close_rx.changed() => break,
                sent = outbound.send(reply) => if sent.is_err() {
                    error!("Transport fault on session {}: stream closed", handle.id());
                    break;
                },
            }
        }
    }

    table.close_session(&handle);
    debug!("Session task for {} finished", handle.id());
}
