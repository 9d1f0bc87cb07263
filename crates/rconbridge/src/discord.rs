//! Discord adapter built on twilight.
//!
//! [`DiscordPlatform`] implements [`ChatPlatform`] over the REST client and
//! the gateway's message sender (for presence). [`run_gateway`] pumps
//! gateway events into the [`App`].

use std::sync::Arc;

use rconbridge_protocol::{ChannelId, GuildId, MessageId, UserId};
use rconbridge_relay::{ChatPlatform, Embed, IncomingMessage, IncomingReaction, PlatformError};
use rconbridge_session::PresenceActivity;
use twilight_gateway::{EventTypeFlags, Intents, MessageSender, Shard, StreamExt};
use twilight_http::Client;
use twilight_http::request::channel::reaction::RequestReactionType;
use twilight_model::channel::message::{EmojiReactionType, Message};
use twilight_model::gateway::GatewayReaction;
use twilight_model::gateway::event::Event;
use twilight_model::gateway::payload::outgoing::UpdatePresence;
use twilight_model::gateway::presence::{ActivityType, MinimalActivity, Status};
use twilight_model::id::Id;
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder};

use crate::app::{App, RconConnector};

/// Gateway intents the bridge needs: guild messages with content, and
/// reactions for confirmations.
pub fn intents() -> Intents {
    Intents::GUILDS
        | Intents::GUILD_MESSAGES
        | Intents::MESSAGE_CONTENT
        | Intents::GUILD_MESSAGE_REACTIONS
}

fn request_error(e: impl std::fmt::Display) -> PlatformError {
    PlatformError::Request(e.to_string())
}

fn id<M>(raw: u64) -> Result<Id<M>, PlatformError> {
    Id::new_checked(raw).ok_or_else(|| PlatformError::Request(format!("invalid id {raw}")))
}

// ---------------------------------------------------------------------------
// DiscordPlatform
// ---------------------------------------------------------------------------

/// [`ChatPlatform`] over Discord.
pub struct DiscordPlatform {
    http: Arc<Client>,
    gateway: MessageSender,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Client>, gateway: MessageSender) -> Self {
        Self { http, gateway }
    }
}

impl ChatPlatform for DiscordPlatform {
    async fn send_message(&self, channel: ChannelId, content: &str) -> Result<MessageId, PlatformError> {
        let message = self
            .http
            .create_message(id(channel.0)?)
            .content(content)
            .await
            .map_err(request_error)?
            .model()
            .await
            .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?;
        Ok(MessageId(message.id.get()))
    }

    async fn send_embed(&self, channel: ChannelId, embed: &Embed) -> Result<MessageId, PlatformError> {
        let mut builder = EmbedBuilder::new().title(&embed.title);
        if let Some(color) = embed.color {
            builder = builder.color(color);
        }
        if let Some(description) = &embed.description {
            builder = builder.description(description);
        }
        for field in &embed.fields {
            let mut field_builder = EmbedFieldBuilder::new(&field.name, &field.value);
            if field.inline {
                field_builder = field_builder.inline();
            }
            builder = builder.field(field_builder.build());
        }

        let message = self
            .http
            .create_message(id(channel.0)?)
            .embeds(&[builder.build()])
            .await
            .map_err(request_error)?
            .model()
            .await
            .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?;
        Ok(MessageId(message.id.get()))
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        self.http
            .create_reaction(
                id(channel.0)?,
                id(message.0)?,
                &RequestReactionType::Unicode { name: emoji },
            )
            .await
            .map_err(request_error)?;
        Ok(())
    }

    async fn guild_name(&self, guild: GuildId) -> Result<String, PlatformError> {
        let guild = self
            .http
            .guild(id(guild.0)?)
            .await
            .map_err(request_error)?
            .model()
            .await
            .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?;
        Ok(guild.name)
    }

    async fn set_presence(&self, activity: &PresenceActivity) -> Result<(), PlatformError> {
        let watching = MinimalActivity {
            kind: ActivityType::Watching,
            name: activity.name(),
            url: None,
        };
        let presence = UpdatePresence::new(vec![watching.into()], false, None, Status::Online)
            .map_err(request_error)?;
        self.gateway.command(&presence).map_err(request_error)
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

fn incoming_message(message: &Message) -> IncomingMessage {
    IncomingMessage {
        id: MessageId(message.id.get()),
        guild_id: message.guild_id.map(|g| GuildId(g.get())),
        channel_id: ChannelId(message.channel_id.get()),
        author_id: UserId(message.author.id.get()),
        author_name: message.author.name.clone(),
        author_is_bot: message.author.bot,
        content: message.content.clone(),
    }
}

/// Custom emoji never match the confirmation reactions; they come through
/// by name only.
fn incoming_reaction(reaction: &GatewayReaction) -> IncomingReaction {
    let emoji = match &reaction.emoji {
        EmojiReactionType::Unicode { name } => name.clone(),
        EmojiReactionType::Custom { name, .. } => name.clone().unwrap_or_default(),
    };
    IncomingReaction {
        guild_id: reaction.guild_id.map(|g| GuildId(g.get())),
        channel_id: ChannelId(reaction.channel_id.get()),
        message_id: MessageId(reaction.message_id.get()),
        user_id: UserId(reaction.user_id.get()),
        emoji,
    }
}

/// Pumps gateway events into `app` until the gateway closes.
pub async fn run_gateway<K: RconConnector>(mut shard: Shard, app: Arc<App<K, DiscordPlatform>>) {
    let wanted = EventTypeFlags::READY | EventTypeFlags::MESSAGE_CREATE | EventTypeFlags::REACTION_ADD;

    while let Some(item) = shard.next_event(wanted).await {
        let event = match item {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(source = ?error, "error receiving gateway event");
                continue;
            }
        };

        match event {
            Event::Ready(ready) => {
                tracing::info!(user = %ready.user.name, guilds = ready.guilds.len(), "gateway ready");
            }
            Event::MessageCreate(message) => {
                let app = Arc::clone(&app);
                let message = incoming_message(&message);
                tokio::spawn(async move { app.handle_message(message).await });
            }
            Event::ReactionAdd(reaction) => {
                app.handle_reaction(incoming_reaction(&reaction));
            }
            _ => {}
        }
    }

    tracing::info!("gateway closed");
}
