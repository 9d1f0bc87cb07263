//! Session types: configuration, state, and what the actor reports.

use std::fmt;
use std::time::Duration;

use rconbridge_tick::TickConfig;

use crate::PresenceActivity;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for one session actor.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name used in logs, usually the guild id.
    pub label: String,

    /// Keepalive cadence. The default 30 s period stays well inside
    /// BattlEye's 45 s idle timeout.
    pub keepalive: TickConfig,

    /// Failed reconnect cycles tolerated before giving up.
    ///
    /// The loop runs at most `max_reconnect_attempts + 1` cycles.
    pub max_reconnect_attempts: u32,

    /// Delay before each reconnect cycle.
    pub reconnect_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            label: "session".into(),
            keepalive: TickConfig::default(),
            max_reconnect_attempts: 30,
            reconnect_interval: Duration::from_secs(60),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Connection state of a session.
///
/// ```text
///   Disconnected ──(connect)──→ Connecting ──(ok)──→ Connected
///        ↑                          │                    │
///        └────────(failure)─────────┘    (keepalive fails / link lost)
///        ↑                                               │
///        └───────────────────────────────────────────────┘
/// ```
///
/// Only the Connected → Disconnected edge produces a
/// [`SessionNotice::Disconnected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// A snapshot of the session actor, for status reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: SessionState,
    /// Failed cycles in the current retry loop. Zero when not retrying.
    pub reconnect_attempts: u32,
    /// Whether a retry loop is in progress.
    pub reconnecting: bool,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A transport state change worth narrating to operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// The initial connect succeeded.
    Connected,
    /// A connected session lost its link.
    Disconnected,
    /// A reconnect cycle has been scheduled.
    Reconnecting { attempt: u32, max_attempts: u32 },
    /// A reconnect cycle succeeded.
    Reconnected,
    /// The retry loop gave up. Only a manual reconnect restarts it.
    ReconnectFailed { attempts: u32 },
}

impl fmt::Display for SessionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "Connected to the game server."),
            Self::Disconnected => write!(f, "Lost connection to the game server."),
            Self::Reconnecting {
                attempt,
                max_attempts,
            } => write!(
                f,
                "Attempting to reconnect to the game server ({attempt}/{}).",
                max_attempts.saturating_add(1)
            ),
            Self::Reconnected => write!(f, "Reconnected to the game server."),
            Self::ReconnectFailed { attempts } => write!(
                f,
                "Could not reconnect after {attempts} attempts. \
                 Use the reconnect command once the server is back."
            ),
        }
    }
}

/// Everything a session actor reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A raw line pushed by the server (chat, notices).
    ServerMessage(String),
    /// A lifecycle change.
    Notice(SessionNotice),
    /// A fresh player count for the bot's status line.
    Presence(PresenceActivity),
}

/// Outcome of a manual reconnect request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectReply {
    /// The session is connected; nothing to do.
    AlreadyConnected,
    /// A retry loop is already running; nothing new was started.
    AlreadyReconnecting,
    /// A fresh retry loop was started. Its first attempt is immediate.
    Started,
}

impl fmt::Display for ReconnectReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyConnected => write!(f, "Already connected to the game server."),
            Self::AlreadyReconnecting => write!(f, "A reconnect is already in progress."),
            Self::Started => write!(f, "Reconnecting to the game server."),
        }
    }
}
