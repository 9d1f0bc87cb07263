//! Relay policy: where a line of chat goes and how it is rewritten.
//!
//! Both directions are pure functions over one bridge's channel ids. The
//! bridge actor executes the decisions; nothing here performs I/O, which
//! keeps the echo-loop rules testable in isolation.

use rconbridge_protocol::{ChannelId, ChatMessage, PLATFORM_ECHO_SUFFIX};

use crate::{BridgeConfig, IncomingMessage, RelaySettings};

/// A line to post in a platform channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub channel: ChannelId,
    pub text: String,
}

/// Relay decisions for one bridge.
#[derive(Debug, Clone)]
pub struct RelayRouter {
    bridge_channel: ChannelId,
    debug_channel: ChannelId,
    command_prefix: String,
    moderator_alias: String,
}

impl RelayRouter {
    pub fn new(config: &BridgeConfig, settings: &RelaySettings) -> Self {
        Self {
            bridge_channel: config.bridge_channel,
            debug_channel: config.debug_channel,
            command_prefix: settings.command_prefix.clone(),
            moderator_alias: settings.moderator_alias.clone(),
        }
    }

    /// Routes a raw line pushed by the server.
    ///
    /// Every line goes to the debug channel with mention triggers removed.
    /// Global chat said in game additionally goes to the bridge channel,
    /// reduced to the text after the last `(Global) ` marker. Platform
    /// echoes, side chat and admin notices never reach the bridge channel.
    pub fn route_server_event(&self, raw: &str) -> Vec<Delivery> {
        let message = ChatMessage::from_server(raw);
        let mut deliveries = Vec::with_capacity(2);

        if message.is_bridgeable() {
            if let Some(payload) = message.global_payload().filter(|p| !p.trim().is_empty()) {
                deliveries.push(Delivery {
                    channel: self.bridge_channel,
                    text: payload.to_string(),
                });
            }
        }

        if !message.text.trim().is_empty() {
            deliveries.push(Delivery {
                channel: self.debug_channel,
                text: message.text,
            });
        }

        deliveries
    }

    /// Decides whether a platform message is said in game, and as what.
    ///
    /// Returns the exact text for global chat, or `None` when the message
    /// is not relayed: wrong channel, a command, a bot author, or empty.
    pub fn route_platform_message(&self, message: &IncomingMessage) -> Option<String> {
        if message.channel_id != self.bridge_channel && message.channel_id != self.debug_channel {
            return None;
        }
        if message.author_is_bot || message.content.starts_with(&self.command_prefix) {
            return None;
        }
        let content = message.content.trim();
        if content.is_empty() {
            return None;
        }

        let identity = if message.channel_id == self.debug_channel {
            self.moderator_alias.clone()
        } else {
            format!("{}{PLATFORM_ECHO_SUFFIX}", message.author_name)
        };
        Some(format!("{identity}: {content}"))
    }
}
