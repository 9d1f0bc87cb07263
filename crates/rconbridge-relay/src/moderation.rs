//! Interactive kick and ban workflows.
//!
//! Each invocation runs in its own task and walks a short state machine:
//!
//! ```text
//!   list players ──→ AwaitingSelection ──(reply)──→ AwaitingConfirmation
//!                          │                               │
//!                     (120 s: silent)        (✅: act | ❌ / 120 s: cancel)
//!                          ▼                               ▼
//!                       Resolved ◄─────────────────────────┘
//! ```
//!
//! All waiting goes through the shared [`Standby`], scoped by author,
//! channel and confirmation message id, so concurrent invocations never
//! resolve each other.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rconbridge_protocol::{ChannelId, PlayerRecord, UserId};
use rconbridge_session::SessionHandle;
use rconbridge_transport::RconClient;
use tokio::time::{Instant, timeout, timeout_at};

use crate::{ChatPlatform, Embed, IncomingMessage, ModerationError, Standby};

/// Reaction that confirms a pending action.
pub const ACCEPT: &str = "✅";
/// Reaction that cancels a pending action.
pub const REJECT: &str = "❌";

const CONFIRM_COLOR: u32 = 0x3498DB;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationKind {
    Kick,
    Ban,
}

impl ModerationKind {
    fn verb(self) -> &'static str {
        match self {
            Self::Kick => "kick",
            Self::Ban => "ban",
        }
    }

    fn reply_shape(self) -> &'static str {
        match self {
            Self::Kick => "<index> <reason>",
            Self::Ban => "<index> <duration-seconds> <reason>",
        }
    }
}

impl fmt::Display for ModerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// How long each wait may take.
#[derive(Debug, Clone, Copy)]
pub struct ModerationTimeouts {
    pub selection: Duration,
    pub confirmation: Duration,
}

impl Default for ModerationTimeouts {
    fn default() -> Self {
        Self {
            selection: Duration::from_secs(120),
            confirmation: Duration::from_secs(120),
        }
    }
}

/// A parsed selection reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// `<index> <reason>`
    Kick { index: usize, reason: String },
    /// `<index> <duration-seconds> <reason>`. A zero duration is stored as
    /// `None` (permanent).
    Ban {
        index: usize,
        duration: Option<Duration>,
        reason: String,
    },
}

impl Selection {
    /// Parses a reply of the shape `kind` expects. `None` if it does not
    /// have that shape.
    pub fn parse(kind: ModerationKind, content: &str) -> Option<Self> {
        let content = content.trim();
        let (index, rest) = content.split_once(char::is_whitespace)?;
        let index = index.parse::<usize>().ok()?;

        match kind {
            ModerationKind::Kick => {
                let reason = rest.trim();
                (!reason.is_empty()).then(|| Self::Kick {
                    index,
                    reason: reason.to_string(),
                })
            }
            ModerationKind::Ban => {
                let (secs, reason) = rest.trim_start().split_once(char::is_whitespace)?;
                let secs = secs.parse::<u64>().ok()?;
                let reason = reason.trim();
                (!reason.is_empty()).then(|| Self::Ban {
                    index,
                    duration: (secs > 0).then(|| Duration::from_secs(secs)),
                    reason: reason.to_string(),
                })
            }
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Kick { index, .. } | Self::Ban { index, .. } => *index,
        }
    }
}

/// A selected action waiting for confirmation.
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub kind: ModerationKind,
    pub target: PlayerRecord,
    pub reason: String,
    /// Ban length. `None` is permanent; always `None` for kicks.
    pub duration: Option<Duration>,
    /// Author of the selection reply. Only they can confirm.
    pub initiator: UserId,
    pub expires_at: Instant,
}

impl PendingAction {
    fn duration_text(&self) -> String {
        match self.duration {
            Some(d) => format!("{} seconds", d.as_secs()),
            None => "permanent".into(),
        }
    }

    /// The embed asking the initiator to confirm.
    pub fn confirmation_embed(&self) -> Embed {
        let mut embed = Embed::new(format!("Confirm {}: {}", self.kind, self.target.name))
            .description(format!(
                "React with {ACCEPT} to confirm or {REJECT} to cancel."
            ))
            .color(CONFIRM_COLOR)
            .field("Player", self.target.name.clone(), true)
            .field("Slot", self.target.id.to_string(), true)
            .field("GUID", self.target.guid.clone(), false)
            .field("Address", self.target.address.clone(), true)
            .field("Reason", self.reason.clone(), false);
        if self.kind == ModerationKind::Ban {
            embed = embed.field("Duration", self.duration_text(), true);
        }
        embed.field("Requested by", format!("<@{}>", self.initiator), false)
    }
}

/// How a workflow ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationOutcome {
    /// Invoked outside the moderation channel.
    Ignored,
    NoPlayers,
    SelectionTimedOut,
    InvalidSelection,
    Rejected,
    ConfirmationTimedOut,
    Kicked(PlayerRecord),
    Banned {
        player: PlayerRecord,
        duration: Option<Duration>,
    },
    /// The confirmed action failed on the wire.
    ActionFailed(String),
}

// ---------------------------------------------------------------------------
// Moderation
// ---------------------------------------------------------------------------

/// Everything a workflow needs. One per bridge; cheap to clone into a
/// spawned task.
pub struct Moderation<C: RconClient, P: ChatPlatform> {
    session: SessionHandle<C>,
    platform: Arc<P>,
    standby: Arc<Standby>,
    channel: ChannelId,
    timeouts: ModerationTimeouts,
}

impl<C: RconClient, P: ChatPlatform> Clone for Moderation<C, P> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            platform: Arc::clone(&self.platform),
            standby: Arc::clone(&self.standby),
            channel: self.channel,
            timeouts: self.timeouts,
        }
    }
}

impl<C: RconClient, P: ChatPlatform> Moderation<C, P> {
    pub fn new(
        session: SessionHandle<C>,
        platform: Arc<P>,
        standby: Arc<Standby>,
        channel: ChannelId,
    ) -> Self {
        Self {
            session,
            platform,
            standby,
            channel,
            timeouts: ModerationTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: ModerationTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Runs one kick or ban workflow for `invocation` to completion.
    pub async fn run(
        &self,
        kind: ModerationKind,
        invocation: &IncomingMessage,
    ) -> Result<ModerationOutcome, ModerationError> {
        if invocation.channel_id != self.channel {
            tracing::debug!(
                channel = %invocation.channel_id,
                %kind,
                "moderation outside the moderation channel, ignoring"
            );
            return Ok(ModerationOutcome::Ignored);
        }

        let players = self.session.players().await?;
        if players.is_empty() {
            self.say("No players online.").await?;
            return Ok(ModerationOutcome::NoPlayers);
        }

        // -- AwaitingSelection ------------------------------------------------

        let author = invocation.author_id;
        let channel = self.channel;
        let selection_rx = self.standby.wait_for_message(move |m| {
            m.author_id == author
                && m.channel_id == channel
                && Selection::parse(kind, &m.content).is_some()
        });
        self.say(&listing(kind, &players)).await?;

        let reply = match timeout(self.timeouts.selection, selection_rx).await {
            Ok(Ok(reply)) => reply,
            _ => {
                tracing::debug!(%author, %kind, "selection timed out");
                return Ok(ModerationOutcome::SelectionTimedOut);
            }
        };

        let Some(selection) = Selection::parse(kind, &reply.content) else {
            return Ok(ModerationOutcome::InvalidSelection);
        };
        let Some(target) = players.get(selection.index()).cloned() else {
            tracing::debug!(%author, index = selection.index(), "selection out of range");
            self.say(&format!("Invalid selection, {kind} cancelled.")).await?;
            return Ok(ModerationOutcome::InvalidSelection);
        };

        let (reason, duration) = match selection {
            Selection::Kick { reason, .. } => (reason, None),
            Selection::Ban {
                reason, duration, ..
            } => (reason, duration),
        };
        let pending = PendingAction {
            kind,
            target,
            reason,
            duration,
            initiator: reply.author_id,
            expires_at: Instant::now() + self.timeouts.confirmation,
        };

        // -- AwaitingConfirmation ---------------------------------------------

        let confirmation = self
            .platform
            .send_embed(self.channel, &pending.confirmation_embed())
            .await?;
        let initiator = pending.initiator;
        let reaction_rx = self.standby.wait_for_reaction(move |r| {
            r.message_id == confirmation
                && r.user_id == initiator
                && (r.emoji == ACCEPT || r.emoji == REJECT)
        });
        self.platform.add_reaction(self.channel, confirmation, ACCEPT).await?;
        self.platform.add_reaction(self.channel, confirmation, REJECT).await?;

        let accepted = match timeout_at(pending.expires_at, reaction_rx).await {
            Ok(Ok(reaction)) => reaction.emoji == ACCEPT,
            _ => {
                tracing::debug!(%initiator, %kind, "confirmation timed out");
                self.say(&format!("No confirmation received, {kind} cancelled.")).await?;
                return Ok(ModerationOutcome::ConfirmationTimedOut);
            }
        };
        if !accepted {
            self.say(&format!("{} cancelled.", capitalize(kind.verb()))).await?;
            return Ok(ModerationOutcome::Rejected);
        }

        // -- Resolved ---------------------------------------------------------

        self.execute(pending).await
    }

    async fn execute(&self, pending: PendingAction) -> Result<ModerationOutcome, ModerationError> {
        let PendingAction {
            kind,
            target,
            reason,
            duration,
            initiator,
            ..
        } = pending;

        let result = match kind {
            ModerationKind::Kick => self.session.kick(target.id, Some(&reason)).await,
            ModerationKind::Ban => {
                self.session
                    .add_ban(&target.guid, duration, Some(&reason))
                    .await
            }
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    %initiator,
                    %kind,
                    player = %target,
                    reason = %reason,
                    "moderation action applied"
                );
                match kind {
                    ModerationKind::Kick => {
                        self.say(&format!("Kicked {}: {reason}", target.name)).await?;
                        Ok(ModerationOutcome::Kicked(target))
                    }
                    ModerationKind::Ban => {
                        let length = match duration {
                            Some(d) => format!("for {} seconds", d.as_secs()),
                            None => "permanently".into(),
                        };
                        self.say(&format!("Banned {} {length}: {reason}", target.name))
                            .await?;
                        Ok(ModerationOutcome::Banned {
                            player: target,
                            duration,
                        })
                    }
                }
            }
            Err(e) => {
                tracing::warn!(%kind, player = %target, error = %e, "moderation action failed");
                self.say(&format!("Could not {kind} {}: {e}", target.name)).await?;
                Ok(ModerationOutcome::ActionFailed(e.to_string()))
            }
        }
    }

    async fn say(&self, text: &str) -> Result<(), ModerationError> {
        self.platform.send_message(self.channel, text).await?;
        Ok(())
    }
}

/// The indexed player list posted as the selection prompt.
fn listing(kind: ModerationKind, players: &[PlayerRecord]) -> String {
    let mut text = format!(
        "Select a player to {kind} by replying `{}`:\n",
        kind.reply_shape()
    );
    for (index, player) in players.iter().enumerate() {
        text.push_str(&format!("`{index}` {} ({})\n", player.name, player.guid));
    }
    text
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: u32, name: &str) -> PlayerRecord {
        PlayerRecord {
            id,
            address: "198.51.100.4:2304".into(),
            ping: 40,
            guid: format!("{id:032x}"),
            verified: true,
            name: name.into(),
            lobby: false,
        }
    }

    #[test]
    fn test_parse_kick_selection() {
        assert_eq!(
            Selection::parse(ModerationKind::Kick, "0 spawn killing"),
            Some(Selection::Kick {
                index: 0,
                reason: "spawn killing".into()
            })
        );
    }

    #[test]
    fn test_kick_selection_needs_a_reason() {
        assert_eq!(Selection::parse(ModerationKind::Kick, "0"), None);
        assert_eq!(Selection::parse(ModerationKind::Kick, "0   "), None);
        assert_eq!(Selection::parse(ModerationKind::Kick, "zero reason"), None);
    }

    #[test]
    fn test_parse_ban_selection() {
        assert_eq!(
            Selection::parse(ModerationKind::Ban, "2 3600 toxic chat"),
            Some(Selection::Ban {
                index: 2,
                duration: Some(Duration::from_secs(3600)),
                reason: "toxic chat".into()
            })
        );
    }

    #[test]
    fn test_ban_zero_duration_is_permanent() {
        let selection = Selection::parse(ModerationKind::Ban, "1 0 cheating").unwrap();
        assert!(matches!(selection, Selection::Ban { duration: None, .. }));
    }

    #[test]
    fn test_ban_selection_shape() {
        assert_eq!(Selection::parse(ModerationKind::Ban, "1 cheating"), None);
        assert_eq!(Selection::parse(ModerationKind::Ban, "1 60"), None);
        assert_eq!(Selection::parse(ModerationKind::Ban, "1 -5 cheating"), None);
    }

    #[test]
    fn test_listing_is_indexed() {
        let text = listing(
            ModerationKind::Kick,
            &[player(7, "Raider"), player(9, "Medic")],
        );
        assert!(text.starts_with("Select a player to kick by replying `<index> <reason>`"));
        assert!(text.contains("`0` Raider"));
        assert!(text.contains("`1` Medic"));
    }

    #[tokio::test]
    async fn test_ban_embed_shows_duration() {
        let pending = PendingAction {
            kind: ModerationKind::Ban,
            target: player(7, "Raider"),
            reason: "cheating".into(),
            duration: None,
            initiator: UserId(5),
            expires_at: Instant::now(),
        };
        let embed = pending.confirmation_embed();
        assert_eq!(embed.title, "Confirm ban: Raider");
        assert_eq!(embed.field_value("Duration"), Some("permanent"));
        assert_eq!(embed.field_value("Slot"), Some("7"));
        assert_eq!(embed.field_value("Requested by"), Some("<@5>"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("kick"), "Kick");
        assert_eq!(capitalize(""), "");
    }
}
