//! Remote-console abstraction layer for rconbridge.
//!
//! Provides the [`RconClient`] trait: everything the bridge needs from a
//! game server's admin console (keepalive, chat, player/ban/admin lists,
//! kick and ban), plus a push subscription for server chat.
//!
//! # Feature Flags
//!
//! - `battleye` (default): BattlEye RCon over UDP ([`BattlEyeClient`])
//! - `memory`: an in-process [`MemoryRcon`] for tests and dry runs

#![allow(async_fn_in_trait)]

#[cfg(feature = "battleye")]
mod battleye;
mod error;
#[cfg(feature = "battleye")]
mod listing;
#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "battleye")]
pub mod packet;

#[cfg(feature = "battleye")]
pub use battleye::{BattlEyeClient, BattlEyeConfig};
pub use error::TransportError;
#[cfg(feature = "battleye")]
pub use listing::{parse_admins, parse_bans, parse_players};
#[cfg(feature = "memory")]
pub use memory::{MemoryRcon, RconCall};

use std::future::Future;
use std::time::Duration;

use rconbridge_protocol::{AdminRecord, BanRecord, PlayerRecord};
use tokio::sync::broadcast;

/// Capacity of the event broadcast channel each client owns.
pub const EVENT_CHANNEL_SIZE: usize = 256;

/// Something the server pushed without being asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RconEvent {
    /// A line of chat or a server notice.
    ServerMessage(String),
    /// The link to the server is gone (socket error, reader stopped).
    Disconnected,
}

/// A client for a game server's remote console.
///
/// Implementations own their socket and are shared behind an `Arc`, so
/// every method takes `&self`. The futures are `Send` because the session
/// actor and moderation tasks call them from spawned Tokio tasks.
///
/// Events are delivered through [`subscribe`](Self::subscribe). The
/// broadcast channel lives as long as the client, across reconnects, so a
/// subscriber only needs to subscribe once.
pub trait RconClient: Send + Sync + 'static {
    /// Opens the link and logs in. Replaces any existing link.
    fn connect(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Sends a no-op request and waits for the server to acknowledge it.
    ///
    /// The server drops idle sessions after roughly 45 seconds, so this
    /// has to be called more often than that.
    fn keepalive(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Closes the link. Does not emit [`RconEvent::Disconnected`].
    fn disconnect(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Lists the players currently connected.
    fn players(
        &self,
    ) -> impl Future<Output = Result<Vec<PlayerRecord>, TransportError>> + Send;

    /// Lists the remote-console admins currently logged in.
    fn admins(
        &self,
    ) -> impl Future<Output = Result<Vec<AdminRecord>, TransportError>> + Send;

    /// Lists the server's bans.
    fn bans(&self) -> impl Future<Output = Result<Vec<BanRecord>, TransportError>> + Send;

    /// Says `text` in global chat.
    fn say_global(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Kicks the player in server slot `player_id`.
    fn kick(
        &self,
        player_id: u32,
        reason: Option<&str>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Bans a stable player id. `None` duration means permanent.
    fn add_ban(
        &self,
        guid: &str,
        duration: Option<Duration>,
        reason: Option<&str>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Subscribes to pushed server events.
    fn subscribe(&self) -> broadcast::Receiver<RconEvent>;
}
