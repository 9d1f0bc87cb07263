//! Unified error type for the rconbridge application.

use rconbridge_protocol::ProtocolError;
use rconbridge_relay::{ModerationError, PlatformError, RelayError};
use rconbridge_session::SessionError;
use rconbridge_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A value could not be parsed (ids, listings).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A remote-console error (socket, login, timeout).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A session actor is gone.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A bridge is missing or could not relay.
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// The chat platform refused a request.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// A kick or ban workflow could not talk to the platform or server.
    #[error(transparent)]
    Moderation(#[from] ModerationError),

    /// The bridge config file is malformed or unreadable.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
