//! Routing handle for one open session.

use crate::{Result, WhoisError};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// A reference to one client's streaming channel.
///
/// The session task owns the channel; the table only holds clones of this
/// handle to route commands and to request closure. Clones share state.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<HandleInner>,
}

#[derive(Debug)]
struct HandleInner {
    id: String,
    created_at: DateTime<Utc>,
    inbound: mpsc::Sender<Value>,
    closed: AtomicBool,
    close_tx: watch::Sender<bool>,
}

impl SessionHandle {
    /// Create a handle feeding `inbound`.
    ///
    /// The returned receiver fires once when the session is closed.
    pub fn new(id: impl Into<String>, inbound: mpsc::Sender<Value>) -> (Self, watch::Receiver<bool>) {
        let (close_tx, close_rx) = watch::channel(false);
        let handle = Self {
            inner: Arc::new(HandleInner {
                id: id.into(),
                created_at: Utc::now(),
                inbound,
                closed: AtomicBool::new(false),
                close_tx,
            }),
        };
        (handle, close_rx)
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Queue a command for the session, waiting while its queue is full.
    ///
    /// Commands are handled in the order they are queued. A wait for queue
    /// space is abandoned as soon as the session closes.
    pub async fn submit(&self, message: Value) -> Result<()> {
        if self.is_closed() {
            return Err(self.closed_fault());
        }
        tokio::select! {
            sent = self.inner.inbound.send(message) => sent.map_err(|_| WhoisError::TransportFault {
                message: format!("session {} stopped accepting commands", self.id()),
            }),
            _ = self.closed() => Err(self.closed_fault()),
        }
    }

    /// Resolve once the session has been closed.
    pub async fn closed(&self) {
        let mut close_rx = self.inner.close_tx.subscribe();
        // The sender lives in `self`, so this only ends on a close.
        let _ = close_rx.wait_for(|closed| *closed).await;
    }

    fn closed_fault(&self) -> WhoisError {
        WhoisError::TransportFault {
            message: format!("session {} is closed", self.id()),
        }
    }

    /// Mark the session closed and wake its task.
    ///
    /// Returns `true` only for the call that performed the close.
    pub fn close(&self) -> bool {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.inner.close_tx.send_replace(true);
        true
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Whether two handles refer to the same session.
    pub fn same_session(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
