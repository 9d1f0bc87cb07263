//! Shared vocabulary for rconbridge.
//!
//! This crate defines the values that both sides of the bridge agree on:
//!
//! - **Identifiers** ([`GuildId`], [`ChannelId`], [`UserId`], [`MessageId`]):
//!   chat-platform snowflakes wrapped in newtypes.
//! - **Records** ([`PlayerRecord`], [`AdminRecord`], [`BanRecord`]):
//!   snapshots returned by the remote console.
//! - **Chat** ([`ChatMessage`], [`ChatCategory`], [`ChatOrigin`]): how a
//!   raw line of server chat is classified and cleaned before relaying.
//! - **Errors** ([`ProtocolError`]): what can go wrong while parsing them.
//!
//! # Architecture
//!
//! ```text
//! Transport (RCON lines) → Protocol (records, chat) → Session / Relay
//! ```
//!
//! Nothing in here performs I/O.

mod chat;
mod error;
mod types;

pub use chat::{
    ChatCategory, ChatMessage, ChatOrigin, GLOBAL_MARKER, PLATFORM_ECHO_SUFFIX,
    strip_mentions,
};
pub use error::ProtocolError;
pub use types::{
    AdminRecord, BanRecord, ChannelId, GuildId, MessageId, PlayerRecord, UserId,
};
