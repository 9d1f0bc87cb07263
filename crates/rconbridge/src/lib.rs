//! # rconbridge
//!
//! Bridges a DayZ server's BattlEye RCon chat to Discord.
//!
//! Each configured guild gets a bridge: a session that keeps the remote
//! console alive and reconnects when it drops, plus a relay that mirrors
//! global chat to a bridge channel, logs every server line to a debug
//! channel, and says Discord messages in game. Kick and ban run as short
//! select-then-confirm workflows in a moderation channel.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rconbridge::prelude::*;
//!
//! let app = Arc::new(App::new(
//!     BattlEyeConnector,
//!     platform,
//!     ConfigStore::new("bridges.json"),
//!     AppSettings::default(),
//! ));
//! app.start().await?;
//! // feed platform events into app.handle_message / app.handle_reaction
//! ```
//!
//! # Feature Flags
//!
//! - `discord` (default): the twilight-based Discord adapter and the
//!   `rconbridge` binary

pub mod app;
pub mod commands;
pub mod config;
#[cfg(feature = "discord")]
pub mod discord;
mod error;

pub use error::BridgeError;

pub mod prelude {
    pub use crate::BridgeError;
    pub use crate::app::{App, AppSettings, BattlEyeConnector, RconConnector};
    pub use crate::commands::{Command, CommandError};
    pub use crate::config::{BridgeConfigs, ConfigStore};
    pub use rconbridge_protocol::{ChannelId, GuildId, MessageId, UserId};
    pub use rconbridge_relay::{
        BridgeConfig, ChatPlatform, IncomingMessage, IncomingReaction, RelaySettings,
    };
}
