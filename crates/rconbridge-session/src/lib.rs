//! Remote-console session management for rconbridge.
//!
//! One session actor per bridged server owns the transport's connection
//! state:
//!
//! 1. **Lifecycle**: connect on start, disconnect on request
//!    ([`SessionHandle::disconnect`])
//! 2. **Keepalive**: a fixed-period tick that refreshes presence and then
//!    proves the link is alive
//! 3. **Recovery**: a bounded [`RetryLoop`] started once per disconnect
//!    edge, or on demand through [`SessionHandle::reconnect`]
//!
//! # How it fits in the stack
//!
//! ```text
//! Relay Layer (above)    ← consumes SessionEvents, calls SessionHandle
//!     ↕
//! Session Layer (this crate)  ← owns connection state and its timers
//!     ↕
//! Transport Layer (below)     ← RconClient: the actual wire protocol
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod manager;
mod presence;
mod retry;
mod session;

pub use error::SessionError;
pub use manager::{SessionHandle, spawn_session};
pub use presence::{PresenceActivity, PresenceUpdater};
pub use retry::{RetryLoop, RetryStep};
pub use session::{
    ReconnectReply, SessionConfig, SessionEvent, SessionNotice, SessionState,
    SessionStatus,
};
