//! Shutdown coordination.
//!
//! The first [`ShutdownCoordinator::shutdown`] call stops admissions and
//! closes every live session; later calls see the draining state and return
//! without doing anything. Transports wait on [`ShutdownCoordinator::wait`]
//! to stop their listeners.

use crate::session::SessionTable;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Process lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Draining,
}

/// Drives an orderly shutdown exactly once.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    table: Arc<SessionTable>,
    state: Arc<watch::Sender<ShutdownState>>,
}

impl ShutdownCoordinator {
    pub fn new(table: Arc<SessionTable>) -> Self {
        let (state, _) = watch::channel(ShutdownState::Running);
        Self {
            table,
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> ShutdownState {
        *self.state.borrow()
    }

    pub fn is_draining(&self) -> bool {
        self.state() == ShutdownState::Draining
    }

    /// Begin shutdown. Returns the number of sessions this call closed.
    pub fn shutdown(&self) -> usize {
        let first = self.state.send_if_modified(|state| {
            if *state == ShutdownState::Running {
                *state = ShutdownState::Draining;
                true
            } else {
                false
            }
        });
        if !first {
            debug!("Shutdown already in progress");
            return 0;
        }

        info!("Shutting down: closing {} session(s)", self.table.active_count());
        self.table.close_admissions();

        let closed = self
            .table
            .drain()
            .iter()
            .filter(|handle| self.table.close_session(handle))
            .count();

        info!("Closed {} session(s)", closed);
        closed
    }

    /// Resolve once shutdown has begun.
    pub async fn wait(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so this cannot fail.
        let _ = rx.wait_for(|state| *state == ShutdownState::Draining).await;
    }

    pub fn subscribe(&self) -> watch::Receiver<ShutdownState> {
        self.state.subscribe()
    }
}
