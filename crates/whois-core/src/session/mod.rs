//! Session management for the streaming transport.
//!
//! - **table**: bounded id → channel map with admission control
//! - **handle**: the routing reference to one session's channel
//! - **manager**: session creation, the per-session task, teardown
//! - **router**: resolves command submissions to their session

mod handle;
mod manager;
mod router;
mod table;

pub use handle::SessionHandle;
pub use manager::{OpenSession, SessionManager, TeardownGuard};
pub use router::CommandRouter;
pub use table::{Reservation, SessionTable};
