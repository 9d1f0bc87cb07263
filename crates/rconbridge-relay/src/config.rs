//! Per-guild bridge configuration and process-wide relay settings.

use std::time::Duration;

use rconbridge_protocol::{ChannelId, GuildId};
use rconbridge_session::SessionConfig;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// BridgeConfig
// ---------------------------------------------------------------------------

/// Everything one bridge needs to know about its guild and game server.
///
/// Persisted as one entry of the config file (keyed by guild id) and never
/// mutated in place. Reconfiguring a guild replaces the whole bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Host name or IP of the game server's remote console.
    pub host: String,

    /// Remote-console UDP port.
    pub rcon_port: u16,

    pub rcon_password: String,

    pub guild_id: GuildId,

    /// Display name of the guild when it was configured.
    #[serde(default)]
    pub guild_alias: Option<String>,

    /// Where in-game global chat is mirrored and read from.
    pub bridge_channel: ChannelId,

    /// Where every server line and every lifecycle notice is logged.
    /// Messages typed here are relayed under the moderator alias.
    pub debug_channel: ChannelId,

    /// The only channel in which kick and ban run.
    pub moderation_channel: ChannelId,

    /// Failed reconnect cycles tolerated before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Seconds between reconnect cycles.
    #[serde(default = "default_reconnect_interval_s")]
    pub reconnect_interval_s: u64,
}

fn default_max_reconnect_attempts() -> u32 {
    30
}

fn default_reconnect_interval_s() -> u64 {
    60
}

impl BridgeConfig {
    /// A config with the default reconnect policy.
    pub fn new(
        guild_id: GuildId,
        host: impl Into<String>,
        rcon_port: u16,
        rcon_password: impl Into<String>,
        bridge_channel: ChannelId,
        debug_channel: ChannelId,
        moderation_channel: ChannelId,
    ) -> Self {
        Self {
            host: host.into(),
            rcon_port,
            rcon_password: rcon_password.into(),
            guild_id,
            guild_alias: None,
            bridge_channel,
            debug_channel,
            moderation_channel,
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_interval_s: default_reconnect_interval_s(),
        }
    }

    /// Takes over the reconnect policy and guild alias of the config this
    /// one replaces. Only the alias already set on `self` is kept.
    pub fn inherit(mut self, previous: &BridgeConfig) -> Self {
        self.max_reconnect_attempts = previous.max_reconnect_attempts;
        self.reconnect_interval_s = previous.reconnect_interval_s;
        if self.guild_alias.is_none() {
            self.guild_alias = previous.guild_alias.clone();
        }
        self
    }

    /// `host:port` of the remote console.
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.rcon_port)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_s)
    }

    /// Session settings derived from this config.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            label: self.guild_id.to_string(),
            max_reconnect_attempts: self.max_reconnect_attempts,
            reconnect_interval: self.reconnect_interval(),
            ..SessionConfig::default()
        }
    }
}

// ---------------------------------------------------------------------------
// RelaySettings
// ---------------------------------------------------------------------------

/// Process-wide settings shared by every bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    /// Messages starting with this are commands and never relayed.
    pub command_prefix: String,
    /// Name used for messages typed in the debug channel.
    pub moderator_alias: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            command_prefix: ")".into(),
            moderator_alias: "Big Brother".into(),
        }
    }
}
