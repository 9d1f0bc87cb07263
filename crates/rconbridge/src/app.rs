//! Application wiring: inbound platform events → standby, relay, commands.
//!
//! The chat-platform adapter calls [`App::handle_message`] and
//! [`App::handle_reaction`] for every event it receives. For a message the
//! order is:
//!
//!   1. offered to the standby (a pending kick/ban may be waiting for it)
//!   2. offered to the guild's bridge for relaying, and awaited
//!   3. parsed as a command and dispatched
//!
//! Kick and ban run as their own tasks so a waiting workflow never blocks
//! the event loop.

use std::sync::Arc;

use rconbridge_protocol::{ChannelId, GuildId, UserId};
use rconbridge_relay::{
    BridgeConfig, BridgeHandle, BridgeRegistry, ChatPlatform, IncomingMessage,
    IncomingReaction, Moderation, ModerationKind, ModerationTimeouts, RelayOutcome,
    RelaySettings, Standby, spawn_bridge,
};
use rconbridge_transport::RconClient;
use tokio::sync::Mutex;

use crate::BridgeError;
use crate::commands::{self, BridgeSetup, Command, CommandError};
use crate::config::ConfigStore;

// ---------------------------------------------------------------------------
// RconConnector
// ---------------------------------------------------------------------------

/// Builds the remote-console client for a guild's config.
pub trait RconConnector: Send + Sync + 'static {
    type Client: RconClient;

    fn client_for(&self, config: &BridgeConfig) -> Arc<Self::Client>;
}

/// Connects every bridge over BattlEye RCon.
#[derive(Debug, Clone, Copy, Default)]
pub struct BattlEyeConnector;

impl RconConnector for BattlEyeConnector {
    type Client = rconbridge_transport::BattlEyeClient;

    fn client_for(&self, config: &BridgeConfig) -> Arc<Self::Client> {
        let battleye = rconbridge_transport::BattlEyeConfig::new(
            config.server_address(),
            config.rcon_password.clone(),
        );
        Arc::new(rconbridge_transport::BattlEyeClient::new(battleye))
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Process-wide settings for the application.
#[derive(Debug, Clone, Default)]
pub struct AppSettings {
    pub relay: RelaySettings,
    /// Users allowed to run `initialize-bridge` and `reconnect`. Empty
    /// means anyone.
    pub operators: Vec<UserId>,
    pub moderation_timeouts: ModerationTimeouts,
}

/// The running application: every bridge plus the shared standby.
pub struct App<K: RconConnector, P: ChatPlatform> {
    connector: K,
    platform: Arc<P>,
    standby: Arc<Standby>,
    bridges: Mutex<BridgeRegistry<K::Client>>,
    store: ConfigStore,
    settings: AppSettings,
}

impl<K: RconConnector, P: ChatPlatform> App<K, P> {
    pub fn new(connector: K, platform: Arc<P>, store: ConfigStore, settings: AppSettings) -> Self {
        Self {
            connector,
            platform,
            standby: Arc::new(Standby::new()),
            bridges: Mutex::new(BridgeRegistry::new()),
            store,
            settings,
        }
    }

    pub fn standby(&self) -> &Standby {
        &self.standby
    }

    /// The guild's running bridge, if it has one.
    pub async fn bridge(&self, guild_id: GuildId) -> Option<BridgeHandle<K::Client>> {
        self.bridges.lock().await.get(guild_id).cloned()
    }

    /// Spawns a bridge for every guild in the config file. Returns how many
    /// were started.
    pub async fn start(&self) -> Result<usize, BridgeError> {
        let configs = self.store.load().await?;
        let mut bridges = self.bridges.lock().await;
        for config in configs.into_values() {
            let guild_id = config.guild_id;
            bridges
                .replace(guild_id, || self.spawn_bridge(config))
                .await;
        }
        tracing::info!(bridges = bridges.len(), "bridges started");
        Ok(bridges.len())
    }

    /// Stops every bridge.
    pub async fn shutdown(&self) {
        self.bridges.lock().await.shutdown_all().await;
        tracing::info!("all bridges stopped");
    }

    fn spawn_bridge(&self, config: BridgeConfig) -> BridgeHandle<K::Client> {
        let client = self.connector.client_for(&config);
        spawn_bridge(
            config,
            client,
            Arc::clone(&self.platform),
            &self.settings.relay,
        )
    }

    // -- Inbound events -----------------------------------------------------

    /// Handles one inbound platform message.
    pub async fn handle_message(&self, message: IncomingMessage) {
        if message.author_is_bot {
            return;
        }

        let matched = self.standby.process_message(&message);
        if matched > 0 {
            tracing::trace!(message = %message.id, matched, "message consumed by standby");
        }

        let Some(guild_id) = message.guild_id else {
            return;
        };

        if let Some(bridge) = self.bridge(guild_id).await {
            match bridge.relay(message.clone()).await {
                Ok(RelayOutcome::Failed(error)) => {
                    tracing::debug!(%guild_id, %error, "message not relayed");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(%guild_id, error = %e, "bridge unavailable"),
            }
        }

        match commands::parse(&self.settings.relay.command_prefix, &message.content) {
            None => {}
            Some(Ok(command)) => self.dispatch(guild_id, command, &message).await,
            Some(Err(CommandError::Unknown(name))) => {
                tracing::debug!(%guild_id, command = %name, "unknown command");
            }
            Some(Err(e)) => {
                let text = match e {
                    CommandError::Usage(usage) => {
                        format!("Usage: `{}{usage}`", self.settings.relay.command_prefix)
                    }
                    other => format!("Could not read that command: {other}."),
                };
                self.reply(message.channel_id, &text).await;
            }
        }
    }

    /// Handles one inbound reaction.
    pub fn handle_reaction(&self, reaction: IncomingReaction) {
        let matched = self.standby.process_reaction(&reaction);
        if matched > 0 {
            tracing::trace!(message = %reaction.message_id, matched, "reaction consumed by standby");
        }
    }

    // -- Commands -----------------------------------------------------------

    async fn dispatch(&self, guild_id: GuildId, command: Command, message: &IncomingMessage) {
        tracing::debug!(%guild_id, author = %message.author_id, command = command.name(), "command");
        match command {
            Command::InitializeBridge(setup) => {
                if self.is_operator(message.author_id) {
                    self.initialize_bridge(guild_id, setup, message).await;
                }
            }
            Command::Reconnect => {
                if self.is_operator(message.author_id) {
                    self.reconnect(guild_id, message.channel_id).await;
                }
            }
            Command::Kick => self.moderate(guild_id, ModerationKind::Kick, message).await,
            Command::Ban => self.moderate(guild_id, ModerationKind::Ban, message).await,
            Command::Status => self.status(guild_id, message.channel_id).await,
        }
    }

    fn is_operator(&self, user: UserId) -> bool {
        let allowed =
            self.settings.operators.is_empty() || self.settings.operators.contains(&user);
        if !allowed {
            tracing::debug!(%user, "operator command from non-operator, ignoring");
        }
        allowed
    }

    async fn initialize_bridge(&self, guild_id: GuildId, setup: BridgeSetup, message: &IncomingMessage) {
        let guild_alias = match self.platform.guild_name(guild_id).await {
            Ok(name) => Some(name),
            Err(e) => {
                tracing::debug!(%guild_id, error = %e, "guild name unavailable");
                None
            }
        };
        let mut config = setup.into_config(guild_id, message.channel_id);
        config.guild_alias = guild_alias;
        let server = config.server_address();

        // Held across the write and the respawn so the saved config and
        // the running bridge always agree.
        let mut bridges = self.bridges.lock().await;
        let saved = self
            .store
            .update(guild_id, |previous| match previous {
                Some(previous) => config.inherit(previous),
                None => config,
            })
            .await;
        let config = match saved {
            Ok(config) => config,
            Err(e) => {
                drop(bridges);
                tracing::error!(%guild_id, error = %e, "could not save bridge config");
                self.reply(message.channel_id, &format!("Could not save the configuration: {e}"))
                    .await;
                return;
            }
        };
        bridges
            .replace(guild_id, || self.spawn_bridge(config))
            .await;
        drop(bridges);

        tracing::info!(%guild_id, %server, "bridge configured");
        self.reply(
            message.channel_id,
            &format!("Bridge configured for {server}. This channel receives the server log."),
        )
        .await;
    }

    async fn reconnect(&self, guild_id: GuildId, channel: ChannelId) {
        let Some(bridge) = self.bridge(guild_id).await else {
            self.reply_unconfigured(channel).await;
            return;
        };
        let text = match bridge.reconnect().await {
            Ok(reply) => reply.to_string(),
            Err(e) => format!("Reconnect failed: {e}"),
        };
        self.reply(channel, &text).await;
    }

    async fn moderate(&self, guild_id: GuildId, kind: ModerationKind, message: &IncomingMessage) {
        let Some(bridge) = self.bridge(guild_id).await else {
            return;
        };
        let moderation = Moderation::new(
            bridge.session().clone(),
            Arc::clone(&self.platform),
            Arc::clone(&self.standby),
            bridge.config().moderation_channel,
        )
        .with_timeouts(self.settings.moderation_timeouts);

        let invocation = message.clone();
        tokio::spawn(async move {
            match moderation.run(kind, &invocation).await {
                Ok(outcome) => {
                    tracing::debug!(%guild_id, %kind, ?outcome, "moderation finished");
                }
                Err(e) => tracing::warn!(%guild_id, %kind, error = %e, "moderation failed"),
            }
        });
    }

    async fn status(&self, guild_id: GuildId, channel: ChannelId) {
        let Some(bridge) = self.bridge(guild_id).await else {
            self.reply_unconfigured(channel).await;
            return;
        };
        let text = match bridge.status().await {
            Ok(status) => format!("```\n{status}\n```"),
            Err(e) => format!("Status unavailable: {e}"),
        };
        self.reply(channel, &text).await;
    }

    async fn reply_unconfigured(&self, channel: ChannelId) {
        let text = format!(
            "No bridge is configured for this server. Use `{}initialize-bridge` first.",
            self.settings.relay.command_prefix
        );
        self.reply(channel, &text).await;
    }

    async fn reply(&self, channel: ChannelId, text: &str) {
        if let Err(e) = self.platform.send_message(channel, text).await {
            tracing::warn!(%channel, error = %e, "reply failed");
        }
    }
}
