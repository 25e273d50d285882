//! Session table: admission control and id → channel routing.
//!
//! One mutex guards all state, so admit, bind, lookup and remove are
//! linearizable. The lock is never held across an `.await`.

use super::SessionHandle;
use crate::{Result, WhoisError};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct TableState {
    /// Admitted ids still waiting for their channel.
    reserved: HashSet<String>,
    sessions: HashMap<String, SessionHandle>,
    closed: bool,
}

impl TableState {
    fn size(&self) -> usize {
        self.reserved.len() + self.sessions.len()
    }
}

/// Bounded map of live sessions.
#[derive(Debug)]
pub struct SessionTable {
    max_sessions: usize,
    state: Mutex<TableState>,
}

/// A reserved slot for a session that has not been bound yet.
///
/// Dropping a reservation without passing it to [`SessionTable::bind`]
/// releases the slot.
#[derive(Debug)]
#[must_use = "an unbound reservation releases its slot when dropped"]
pub struct Reservation<'a> {
    table: &'a SessionTable,
    id: String,
    bound: bool,
}

impl Reservation<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.bound {
            debug!("Releasing unbound reservation {}", self.id);
            self.table.lock().reserved.remove(&self.id);
        }
    }
}

impl SessionTable {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            max_sessions,
            state: Mutex::new(TableState::default()),
        }
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        // Critical sections never panic midway; recover from poisoning.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve a slot and allocate a fresh session id.
    pub fn try_admit(&self) -> Result<Reservation<'_>> {
        let mut state = self.lock();
        if state.closed {
            return Err(WhoisError::ShuttingDown);
        }
        if state.size() >= self.max_sessions {
            warn!(
                "Rejecting session: at max capacity ({})",
                self.max_sessions
            );
            return Err(WhoisError::CapacityExceeded {
                max: self.max_sessions,
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        state.reserved.insert(id.clone());
        Ok(Reservation {
            table: self,
            id,
            bound: false,
        })
    }

    /// Attach the session's channel to its reserved id.
    ///
    /// Fails with [`WhoisError::ShuttingDown`] if the table was drained after
    /// the reservation was made; the handle is not stored in that case.
    pub fn bind(&self, mut reservation: Reservation<'_>, handle: SessionHandle) -> Result<()> {
        if reservation.id != handle.id() {
            return Err(WhoisError::Other(format!(
                "handle {} does not match reservation {}",
                handle.id(),
                reservation.id
            )));
        }

        let mut state = self.lock();
        if !state.reserved.remove(&reservation.id) {
            return Err(WhoisError::ShuttingDown);
        }
        reservation.bound = true;
        state.sessions.insert(reservation.id.clone(), handle);
        Ok(())
    }

    pub fn lookup(&self, id: &str) -> Option<SessionHandle> {
        self.lock().sessions.get(id).cloned()
    }

    /// Remove a session. Unknown ids are ignored.
    pub fn remove(&self, id: &str) -> Option<SessionHandle> {
        let mut state = self.lock();
        state.reserved.remove(id);
        state.sessions.remove(id)
    }

    /// Close a session's channel and remove it, once.
    ///
    /// Every teardown path (channel close, transport fault, shutdown) goes
    /// through here. Returns `true` for the call that actually closed it.
    pub fn close_session(&self, handle: &SessionHandle) -> bool {
        if !handle.close() {
            return false;
        }
        {
            let mut state = self.lock();
            // Only drop the entry if it still refers to this channel.
            if state
                .sessions
                .get(handle.id())
                .is_some_and(|current| current.same_session(handle))
            {
                state.sessions.remove(handle.id());
            }
        }
        info!(
            "Session closed: {} (open for {}s)",
            handle.id(),
            (chrono::Utc::now() - handle.created_at()).num_seconds()
        );
        true
    }

    /// Reserved plus bound sessions; never exceeds `max_sessions`.
    pub fn len(&self) -> usize {
        self.lock().size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sessions with a bound channel.
    pub fn active_count(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_accepting(&self) -> bool {
        !self.lock().closed
    }

    /// Refuse all further admissions.
    pub fn close_admissions(&self) {
        self.lock().closed = true;
    }

    /// Refuse further admissions and hand back every bound session.
    ///
    /// Pending reservations are cancelled; their `bind` will fail.
    pub fn drain(&self) -> Vec<SessionHandle> {
        let mut state = self.lock();
        state.closed = true;
        state.reserved.clear();
        state.sessions.drain().map(|(_, handle)| handle).collect()
    }
}
