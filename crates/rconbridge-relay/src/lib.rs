//! The bridge between a game server's chat and a chat platform.
//!
//! # Key types
//!
//! - [`ChatPlatform`]: what the bridge needs from the chat platform
//! - [`RelayRouter`]: pure decisions about where a line of chat goes
//! - [`BridgeHandle`]: a running bridge (session actor + relay actor)
//! - [`BridgeRegistry`]: one bridge per guild
//! - [`Standby`]: correlates replies and reactions with waiting workflows
//! - [`Moderation`]: the interactive kick and ban workflows
//! - [`BridgeConfig`]: the persisted per-guild configuration
//!
//! # Feature flags
//!
//! - `recording`: an in-memory `RecordingPlatform` for tests and dry runs

#![allow(async_fn_in_trait)]

mod bridge;
mod config;
mod error;
mod moderation;
mod platform;
#[cfg(feature = "recording")]
mod recording;
mod registry;
mod router;
mod standby;

pub use bridge::{BridgeHandle, BridgeStatus, RelayOutcome, spawn_bridge};
pub use config::{BridgeConfig, RelaySettings};
pub use error::{ModerationError, PlatformError, RelayError};
pub use moderation::{
    ACCEPT, Moderation, ModerationKind, ModerationOutcome, ModerationTimeouts,
    PendingAction, REJECT, Selection,
};
pub use platform::{ChatPlatform, Embed, EmbedField, IncomingMessage, IncomingReaction};
#[cfg(feature = "recording")]
pub use recording::{PlatformCall, RecordingPlatform};
pub use registry::BridgeRegistry;
pub use router::{Delivery, RelayRouter};
pub use standby::Standby;
