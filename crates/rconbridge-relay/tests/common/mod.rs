//! Shared fixtures for the relay integration tests.

#![allow(dead_code)]

use std::time::Duration;

use rconbridge_protocol::{ChannelId, GuildId, MessageId, PlayerRecord, UserId};
use rconbridge_relay::{
    BridgeConfig, IncomingMessage, IncomingReaction, PlatformCall, RecordingPlatform,
};

pub const GUILD: GuildId = GuildId(42);
pub const BRIDGE: ChannelId = ChannelId(1111);
pub const MODERATION: ChannelId = ChannelId(2222);
pub const DEBUG: ChannelId = ChannelId(3333);

pub const ALICE: UserId = UserId(501);
pub const BOB: UserId = UserId(502);

pub fn config() -> BridgeConfig {
    BridgeConfig::new(GUILD, "203.0.113.5", 2302, "pw", BRIDGE, DEBUG, MODERATION)
}

pub fn player(id: u32, name: &str) -> PlayerRecord {
    PlayerRecord {
        id,
        address: format!("198.51.100.{id}:2304"),
        ping: 35,
        guid: format!("{id:032x}"),
        verified: true,
        name: name.into(),
        lobby: false,
    }
}

pub fn message(channel: ChannelId, author: UserId, content: &str) -> IncomingMessage {
    IncomingMessage {
        id: MessageId(author.0 * 1_000),
        guild_id: Some(GUILD),
        channel_id: channel,
        author_id: author,
        author_name: if author == ALICE { "alice" } else { "bob" }.into(),
        author_is_bot: false,
        content: content.into(),
    }
}

pub fn reaction(message_id: MessageId, user: UserId, emoji: &str) -> IncomingReaction {
    IncomingReaction {
        guild_id: Some(GUILD),
        channel_id: MODERATION,
        message_id,
        user_id: user,
        emoji: emoji.into(),
    }
}

/// Waits (in paused time) until `predicate` holds for the recorded calls.
pub async fn until(platform: &RecordingPlatform, predicate: impl Fn(&[PlatformCall]) -> bool) {
    tokio::time::timeout(Duration::from_secs(3600), platform.wait_until(predicate))
        .await
        .expect("platform condition should be reached");
}

pub fn text_in(calls: &[PlatformCall], channel: ChannelId) -> Vec<&str> {
    calls
        .iter()
        .filter_map(|call| match call {
            PlatformCall::Message {
                channel: c,
                content,
                ..
            } if *c == channel => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

pub fn listings(calls: &[PlatformCall]) -> usize {
    text_in(calls, MODERATION)
        .iter()
        .filter(|t| t.starts_with("Select a player"))
        .count()
}

pub fn reactions(calls: &[PlatformCall]) -> usize {
    calls
        .iter()
        .filter(|c| matches!(c, PlatformCall::Reaction { .. }))
        .count()
}
