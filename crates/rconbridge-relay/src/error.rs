//! Error types for the relay layer.

use rconbridge_protocol::GuildId;
use rconbridge_session::SessionError;

/// A chat-platform request failed.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The platform rejected or failed the request.
    #[error("platform request failed: {0}")]
    Request(String),

    /// The platform answered with something unusable.
    #[error("unexpected platform response: {0}")]
    InvalidResponse(String),
}

/// Errors from a bridge or the registry.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// No bridge is running for the guild, or its actor has stopped.
    #[error("no bridge running for guild {0}")]
    Unavailable(GuildId),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Errors that abort a moderation workflow.
///
/// Timeouts and invalid input are not errors. They are ordinary
/// [`ModerationOutcome`](crate::ModerationOutcome)s.
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}
