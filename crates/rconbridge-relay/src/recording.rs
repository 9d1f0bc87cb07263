//! An in-memory [`ChatPlatform`] that records every call.
//!
//! Used by tests and dry runs in place of a real chat platform. Message
//! ids are handed out sequentially so a test can react to the message the
//! bridge just posted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rconbridge_protocol::{ChannelId, GuildId, MessageId};
use rconbridge_session::PresenceActivity;
use tokio::sync::Notify;

use crate::{ChatPlatform, Embed, PlatformError};

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Message {
        channel: ChannelId,
        id: MessageId,
        content: String,
    },
    Embed {
        channel: ChannelId,
        id: MessageId,
        embed: Embed,
    },
    Reaction {
        channel: ChannelId,
        message: MessageId,
        emoji: String,
    },
    Presence(PresenceActivity),
}

/// Records outbound platform traffic.
pub struct RecordingPlatform {
    calls: Mutex<Vec<PlatformCall>>,
    guild_names: Mutex<HashMap<GuildId, String>>,
    next_id: AtomicU64,
    changed: Notify,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            guild_names: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1_000),
            changed: Notify::new(),
        }
    }

    /// Makes [`ChatPlatform::guild_name`] answer `name` for `guild`.
    /// Unknown guilds fail the lookup.
    pub fn set_guild_name(&self, guild: GuildId, name: impl Into<String>) {
        self.guild_names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(guild, name.into());
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.lock().clone()
    }

    /// Text posted to `channel`, in order.
    pub fn messages_in(&self, channel: ChannelId) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                PlatformCall::Message {
                    channel: c,
                    content,
                    ..
                } if *c == channel => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    /// Embeds posted anywhere, with their message ids.
    pub fn embeds(&self) -> Vec<(MessageId, Embed)> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                PlatformCall::Embed { id, embed, .. } => Some((*id, embed.clone())),
                _ => None,
            })
            .collect()
    }

    /// Reactions added to `message`.
    pub fn reactions_on(&self, message: MessageId) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                PlatformCall::Reaction {
                    message: m, emoji, ..
                } if *m == message => Some(emoji.clone()),
                _ => None,
            })
            .collect()
    }

    /// Resolves once `predicate` holds for the recorded calls.
    ///
    /// Wrap in `tokio::time::timeout` in tests; this waits forever.
    pub async fn wait_until(&self, predicate: impl Fn(&[PlatformCall]) -> bool) {
        loop {
            let changed = self.changed.notified();
            if predicate(&self.lock()) {
                return;
            }
            changed.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PlatformCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: PlatformCall) {
        self.lock().push(call);
        self.changed.notify_waiters();
    }

    fn next_id(&self) -> MessageId {
        MessageId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for RecordingPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatPlatform for RecordingPlatform {
    async fn send_message(&self, channel: ChannelId, content: &str) -> Result<MessageId, PlatformError> {
        let id = self.next_id();
        self.record(PlatformCall::Message {
            channel,
            id,
            content: content.to_string(),
        });
        Ok(id)
    }

    async fn send_embed(&self, channel: ChannelId, embed: &Embed) -> Result<MessageId, PlatformError> {
        let id = self.next_id();
        self.record(PlatformCall::Embed {
            channel,
            id,
            embed: embed.clone(),
        });
        Ok(id)
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Reaction {
            channel,
            message,
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn guild_name(&self, guild: GuildId) -> Result<String, PlatformError> {
        self.guild_names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&guild)
            .cloned()
            .ok_or_else(|| PlatformError::Request(format!("unknown guild {guild}")))
    }

    async fn set_presence(&self, activity: &PresenceActivity) -> Result<(), PlatformError> {
        self.record(PlatformCall::Presence(*activity));
        Ok(())
    }
}
