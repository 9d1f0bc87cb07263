//! The chat-platform boundary.
//!
//! The bridge never talks to a concrete platform SDK. It sees outbound
//! operations through [`ChatPlatform`] and inbound traffic as
//! [`IncomingMessage`] / [`IncomingReaction`] values pushed by an adapter.

use std::future::Future;

use rconbridge_protocol::{ChannelId, GuildId, MessageId, UserId};
use rconbridge_session::PresenceActivity;

use crate::PlatformError;

/// Outbound operations on the chat platform.
///
/// Shared behind an `Arc` by every bridge and moderation task, so the
/// futures must be `Send`.
pub trait ChatPlatform: Send + Sync + 'static {
    /// Posts plain text and returns the new message's id.
    fn send_message(
        &self,
        channel: ChannelId,
        content: &str,
    ) -> impl Future<Output = Result<MessageId, PlatformError>> + Send;

    /// Posts an embed and returns the new message's id.
    fn send_embed(
        &self,
        channel: ChannelId,
        embed: &Embed,
    ) -> impl Future<Output = Result<MessageId, PlatformError>> + Send;

    /// Reacts to a message with a unicode emoji.
    fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// The guild's display name.
    fn guild_name(
        &self,
        guild: GuildId,
    ) -> impl Future<Output = Result<String, PlatformError>> + Send;

    /// Replaces the bot's visible activity.
    fn set_presence(
        &self,
        activity: &PresenceActivity,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;
}

/// A platform-neutral rich message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<EmbedField>,
    /// RGB colour, e.g. `0x3498DB`.
    pub color: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    /// Looks up a field's value by name.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

/// A message posted on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub id: MessageId,
    /// `None` for direct messages.
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_is_bot: bool,
    pub content: String,
}

/// A reaction added to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingReaction {
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user_id: UserId,
    /// The unicode emoji, or the custom emoji's name.
    pub emoji: String,
}
