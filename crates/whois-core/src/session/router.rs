//! Command routing for the multi-client transport.

use super::{SessionHandle, SessionTable};
use crate::{Result, WhoisError};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves a command's session id and forwards the payload to it.
#[derive(Clone)]
pub struct CommandRouter {
    table: Arc<SessionTable>,
}

impl CommandRouter {
    pub fn new(table: Arc<SessionTable>) -> Self {
        Self { table }
    }

    /// Find the session a command is addressed to.
    pub fn resolve(&self, session_id: Option<&str>) -> Result<SessionHandle> {
        let session_id = session_id
            .filter(|id| !id.is_empty())
            .ok_or(WhoisError::MissingSessionId)?;

        self.table.lookup(session_id).ok_or_else(|| {
            debug!("No session for id {}", session_id);
            WhoisError::SessionNotFound {
                id: session_id.to_string(),
            }
        })
    }

    /// Queue `message` on a resolved session.
    ///
    /// Routing never mutates the table; a session that faults mid-forward is
    /// torn down by its own task.
    pub async fn forward(&self, handle: &SessionHandle, message: Value) -> Result<()> {
        handle.submit(message).await.map_err(|e| {
            warn!("Failed to forward command to session {}: {}", handle.id(), e);
            e
        })
    }

    /// Resolve and forward in one step.
    ///
    /// The reply is delivered later on the target session's stream.
    pub async fn route(&self, session_id: Option<&str>, message: Value) -> Result<()> {
        let handle = self.resolve(session_id)?;
        self.forward(&handle, message).await
    }
}
