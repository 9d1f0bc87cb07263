//! Bridge actor: the relay between one session and the chat platform.
//!
//! A bridge owns two tasks: the session actor (see `rconbridge-session`)
//! and the relay actor defined here. The relay actor consumes the
//! session's event stream and executes [`RelayRouter`] decisions:
//!
//! ```text
//!   SessionEvent::ServerMessage ──→ route_server_event ──→ bridge / debug channel
//!   SessionEvent::Notice ─────────────────────────────────→ debug channel
//!   SessionEvent::Presence ───────────────────────────────→ set_presence
//!   BridgeHandle::relay ──→ route_platform_message ──→ say_global
//! ```

use std::fmt;
use std::sync::Arc;

use rconbridge_protocol::GuildId;
use rconbridge_session::{
    ReconnectReply, SessionEvent, SessionHandle, SessionStatus, spawn_session,
};
use rconbridge_transport::RconClient;
use tokio::sync::{mpsc, oneshot};

use crate::{BridgeConfig, ChatPlatform, IncomingMessage, RelayError, RelayRouter, RelaySettings};

/// What happened to a platform message offered to the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Said in game as the contained text.
    Forwarded(String),
    /// Not for the server (other channel, command, bot, empty).
    Ignored,
    /// Meant for the server, but the transport refused it.
    Failed(String),
}

/// A status report for the `status` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeStatus {
    /// The guild's display name, when it was known at configuration time.
    pub guild: Option<String>,
    pub server: String,
    pub session: SessionStatus,
    /// `None` when the list could not be fetched.
    pub players: Option<usize>,
    pub admins: Option<usize>,
    pub bans: Option<usize>,
}

impl fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn count(n: Option<usize>) -> String {
            n.map_or_else(|| "unavailable".to_string(), |n| n.to_string())
        }
        if let Some(guild) = &self.guild {
            writeln!(f, "Guild: {guild}")?;
        }
        writeln!(f, "Server: {}", self.server)?;
        write!(f, "Session: {}", self.session.state)?;
        if self.session.reconnecting {
            write!(
                f,
                " (reconnecting, {} failed attempts)",
                self.session.reconnect_attempts
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Players: {}", count(self.players))?;
        writeln!(f, "Admins: {}", count(self.admins))?;
        write!(f, "Bans: {}", count(self.bans))
    }
}

enum BridgeCommand {
    Relay {
        message: IncomingMessage,
        reply: oneshot::Sender<RelayOutcome>,
    },
    Shutdown {
        done: oneshot::Sender<()>,
    },
}

// ---------------------------------------------------------------------------
// BridgeHandle
// ---------------------------------------------------------------------------

/// Handle to a running bridge. Cheap to clone.
pub struct BridgeHandle<C: RconClient> {
    config: Arc<BridgeConfig>,
    session: SessionHandle<C>,
    commands: mpsc::Sender<BridgeCommand>,
}

impl<C: RconClient> Clone for BridgeHandle<C> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            session: self.session.clone(),
            commands: self.commands.clone(),
        }
    }
}

impl<C: RconClient> BridgeHandle<C> {
    pub fn guild_id(&self) -> GuildId {
        self.config.guild_id
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The bridge's session, for moderation and lifecycle commands.
    pub fn session(&self) -> &SessionHandle<C> {
        &self.session
    }

    fn unavailable(&self) -> RelayError {
        RelayError::Unavailable(self.config.guild_id)
    }

    /// Offers a platform message for relaying and waits for the decision
    /// to be carried out.
    pub async fn relay(&self, message: IncomingMessage) -> Result<RelayOutcome, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(BridgeCommand::Relay {
                message,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Manual reconnect of the bridge's session.
    pub async fn reconnect(&self) -> Result<ReconnectReply, RelayError> {
        Ok(self.session.reconnect().await?)
    }

    /// Session state plus player, admin and ban counts.
    pub async fn status(&self) -> Result<BridgeStatus, RelayError> {
        let session = self.session.status().await?;
        Ok(BridgeStatus {
            guild: self.config.guild_alias.clone(),
            server: self.config.server_address(),
            session,
            players: self.session.players().await.ok().map(|p| p.len()),
            admins: self.session.admins().await.ok().map(|a| a.len()),
            bans: self.session.bans().await.ok().map(|b| b.len()),
        })
    }

    /// Stops the relay actor and its session, and waits until the session
    /// has let go of the transport.
    pub async fn shutdown(&self) -> Result<(), RelayError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.commands
            .send(BridgeCommand::Shutdown { done: done_tx })
            .await
            .map_err(|_| self.unavailable())?;
        done_rx.await.map_err(|_| self.unavailable())
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct BridgeActor<C: RconClient, P: ChatPlatform> {
    config: Arc<BridgeConfig>,
    router: RelayRouter,
    session: SessionHandle<C>,
    platform: Arc<P>,
    events: mpsc::Receiver<SessionEvent>,
    commands: mpsc::Receiver<BridgeCommand>,
}

impl<C: RconClient, P: ChatPlatform> BridgeActor<C, P> {
    async fn run(mut self) {
        let guild_id = self.config.guild_id;
        tracing::info!(
            %guild_id,
            guild = self.config.guild_alias.as_deref().unwrap_or("-"),
            server = %self.config.server_address(),
            "bridge started"
        );

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(BridgeCommand::Relay { message, reply }) => {
                        let outcome = self.relay(&message).await;
                        let _ = reply.send(outcome);
                    }
                    Some(BridgeCommand::Shutdown { done }) => {
                        self.stop_session().await;
                        let _ = done.send(());
                        break;
                    }
                    None => {
                        self.stop_session().await;
                        break;
                    }
                },
                event = self.events.recv() => match event {
                    Some(event) => self.handle_session_event(event).await,
                    None => {
                        tracing::warn!(%guild_id, "session stopped unexpectedly");
                        break;
                    }
                },
            }
        }

        tracing::info!(%guild_id, "bridge stopped");
    }

    async fn relay(&self, message: &IncomingMessage) -> RelayOutcome {
        let Some(text) = self.router.route_platform_message(message) else {
            return RelayOutcome::Ignored;
        };
        match self.session.say_global(&text).await {
            Ok(()) => {
                tracing::debug!(guild_id = %self.config.guild_id, %text, "relayed to server");
                RelayOutcome::Forwarded(text)
            }
            Err(e) => {
                tracing::warn!(guild_id = %self.config.guild_id, error = %e, "relay to server failed");
                RelayOutcome::Failed(e.to_string())
            }
        }
    }

    async fn handle_session_event(&self, event: SessionEvent) {
        let guild_id = self.config.guild_id;
        match event {
            SessionEvent::ServerMessage(raw) => {
                tracing::trace!(%guild_id, %raw, "server message");
                for delivery in self.router.route_server_event(&raw) {
                    if let Err(e) = self.platform.send_message(delivery.channel, &delivery.text).await {
                        tracing::warn!(%guild_id, channel = %delivery.channel, error = %e, "relay to platform failed");
                    }
                }
            }
            SessionEvent::Notice(notice) => {
                tracing::info!(%guild_id, %notice, "session notice");
                let text = notice.to_string();
                if let Err(e) = self.platform.send_message(self.config.debug_channel, &text).await {
                    tracing::warn!(%guild_id, error = %e, "could not post session notice");
                }
            }
            SessionEvent::Presence(activity) => {
                if let Err(e) = self.platform.set_presence(&activity).await {
                    tracing::debug!(%guild_id, error = %e, "presence update failed");
                }
            }
        }
    }

    /// Shuts the session down and drains its stream until the actor is gone.
    async fn stop_session(&mut self) {
        if self.session.shutdown().await.is_err() {
            return;
        }
        while self.events.recv().await.is_some() {}
    }
}

/// Spawns a bridge for `config`: a session actor over `client` plus the
/// relay actor feeding `platform`.
pub fn spawn_bridge<C: RconClient, P: ChatPlatform>(
    config: BridgeConfig,
    client: Arc<C>,
    platform: Arc<P>,
    settings: &RelaySettings,
) -> BridgeHandle<C> {
    let (session, events) = spawn_session(client, config.session_config());
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let config = Arc::new(config);

    let actor = BridgeActor {
        config: Arc::clone(&config),
        router: RelayRouter::new(&config, settings),
        session: session.clone(),
        platform,
        events,
        commands: cmd_rx,
    };
    tokio::spawn(actor.run());

    BridgeHandle {
        config,
        session,
        commands: cmd_tx,
    }
}
