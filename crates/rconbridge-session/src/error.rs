//! Error types for the session layer.

use rconbridge_transport::TransportError;

/// Errors returned by [`SessionHandle`](crate::SessionHandle).
///
/// Keepalive and reconnect failures are never surfaced here. They feed
/// the retry loop and are narrated as
/// [`SessionNotice`](crate::SessionNotice)s instead.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session actor has stopped (shut down or panicked).
    #[error("session {0} is no longer running")]
    Unavailable(String),

    /// A passthrough operation (players, kick, ...) failed on the wire.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
