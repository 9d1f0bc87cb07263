//! Integration tests for the application: commands, config store and the
//! message pipeline, over `MemoryRcon` and a recording platform.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rconbridge::prelude::*;
use rconbridge_protocol::PlayerRecord;
use rconbridge_relay::{ACCEPT, PlatformCall, RecordingPlatform};
use rconbridge_transport::{MemoryRcon, RconCall};
use tempfile::TempDir;

// =========================================================================
// Fixtures
// =========================================================================

const GUILD: GuildId = GuildId(42);
const BRIDGE: ChannelId = ChannelId(1111);
const MODERATION: ChannelId = ChannelId(2222);
const DEBUG: ChannelId = ChannelId(3333);
const ALICE: UserId = UserId(501);

type Clients = Arc<Mutex<Vec<(GuildId, Arc<MemoryRcon>)>>>;

/// Hands out a fresh `MemoryRcon` per bridge and keeps them for inspection.
struct MemoryConnector {
    players: Vec<PlayerRecord>,
    clients: Clients,
}

impl RconConnector for MemoryConnector {
    type Client = MemoryRcon;

    fn client_for(&self, config: &BridgeConfig) -> Arc<MemoryRcon> {
        let client = Arc::new(MemoryRcon::new().with_players(self.players.clone()));
        self.clients
            .lock()
            .unwrap()
            .push((config.guild_id, Arc::clone(&client)));
        client
    }
}

struct Harness {
    app: Arc<App<MemoryConnector, RecordingPlatform>>,
    platform: Arc<RecordingPlatform>,
    clients: Clients,
    store: ConfigStore,
    path: PathBuf,
    _dir: TempDir,
}

impl Harness {
    fn new(players: Vec<PlayerRecord>, operators: Vec<UserId>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridges.json");
        let clients = Clients::default();
        let platform = Arc::new(RecordingPlatform::new());
        let store = ConfigStore::new(&path);
        let app = Arc::new(App::new(
            MemoryConnector {
                players,
                clients: Arc::clone(&clients),
            },
            Arc::clone(&platform),
            store.clone(),
            AppSettings {
                operators,
                ..AppSettings::default()
            },
        ));
        Self {
            app,
            platform,
            clients,
            store,
            path,
            _dir: dir,
        }
    }

    fn client(&self, index: usize) -> Arc<MemoryRcon> {
        Arc::clone(&self.clients.lock().unwrap()[index].1)
    }

    fn client_count(&self) -> usize {
        self.clients.lock().unwrap().len()
    }

    async fn say(&self, channel: ChannelId, content: &str) {
        self.app.handle_message(message(channel, content)).await;
    }

    async fn until(&self, predicate: impl Fn(&[PlatformCall]) -> bool) {
        tokio::time::timeout(Duration::from_secs(10), self.platform.wait_until(predicate))
            .await
            .expect("platform condition should be reached");
    }

    /// Saves a config for `GUILD` and starts the app from it.
    async fn start_configured(&self) {
        self.store.upsert(config()).await.unwrap();
        assert_eq!(self.app.start().await.unwrap(), 1);
        self.until(|calls| has_text(calls, DEBUG, "Connected to the game server."))
            .await;
    }
}

fn config() -> BridgeConfig {
    BridgeConfig::new(GUILD, "203.0.113.5", 2302, "pw", BRIDGE, DEBUG, MODERATION)
}

fn message(channel: ChannelId, content: &str) -> IncomingMessage {
    IncomingMessage {
        id: MessageId(9_000),
        guild_id: Some(GUILD),
        channel_id: channel,
        author_id: ALICE,
        author_name: "alice".into(),
        author_is_bot: false,
        content: content.into(),
    }
}

fn player(id: u32, name: &str) -> PlayerRecord {
    PlayerRecord {
        id,
        address: "198.51.100.7:2304".into(),
        ping: 40,
        guid: format!("{id:032x}"),
        verified: true,
        name: name.into(),
        lobby: false,
    }
}

fn texts(calls: &[PlatformCall], channel: ChannelId) -> Vec<&str> {
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

fn has_text(calls: &[PlatformCall], channel: ChannelId, text: &str) -> bool {
    texts(calls, channel).contains(&text)
}

// =========================================================================
// initialize-bridge
// =========================================================================

#[tokio::test]
async fn test_initialize_bridge_saves_and_starts() {
    let h = Harness::new(Vec::new(), Vec::new());

    h.say(DEBUG, r#")initialize-bridge 203.0.113.5 9999 "pw" 1111 2222"#)
        .await;

    let saved = h.store.load().await.unwrap();
    let config = &saved[&GUILD];
    assert_eq!(config.server_address(), "203.0.113.5:9999");
    assert_eq!(config.rcon_password, "pw");
    assert_eq!(config.bridge_channel, BRIDGE);
    assert_eq!(config.moderation_channel, MODERATION);
    assert_eq!(config.debug_channel, DEBUG);

    assert!(h.app.bridge(GUILD).await.is_some());
    assert_eq!(h.client_count(), 1);
    assert!(
        h.platform
            .messages_in(DEBUG)
            .iter()
            .any(|m| m.starts_with("Bridge configured for 203.0.113.5:9999."))
    );
    h.until(|calls| has_text(calls, DEBUG, "Connected to the game server."))
        .await;
}

#[tokio::test]
async fn test_initialize_bridge_records_guild_name() {
    let h = Harness::new(Vec::new(), Vec::new());
    h.platform.set_guild_name(GUILD, "Chernarus Survivors");

    h.say(DEBUG, ")isc 203.0.113.5 2302 pw 1111 2222").await;

    let saved = h.store.load().await.unwrap();
    assert_eq!(saved[&GUILD].guild_alias.as_deref(), Some("Chernarus Survivors"));
    let status = h.app.bridge(GUILD).await.unwrap().status().await.unwrap();
    assert!(status.to_string().starts_with("Guild: Chernarus Survivors\n"));
}

#[tokio::test]
async fn test_initialize_bridge_without_guild_name() {
    let h = Harness::new(Vec::new(), Vec::new());

    h.say(DEBUG, ")isc 203.0.113.5 2302 pw 1111 2222").await;

    let saved = h.store.load().await.unwrap();
    assert_eq!(saved[&GUILD].guild_alias, None);
    assert!(h.app.bridge(GUILD).await.is_some());
}

#[tokio::test]
async fn test_reconfigure_keeps_tuned_reconnect_policy() {
    let h = Harness::new(Vec::new(), Vec::new());
    let mut tuned = config();
    tuned.max_reconnect_attempts = 5;
    tuned.reconnect_interval_s = 10;
    tuned.guild_alias = Some("Chernarus Survivors".into());
    h.store.upsert(tuned).await.unwrap();

    h.say(DEBUG, ")isc 203.0.113.6 2402 pw2 1111 2222").await;

    let saved = h.store.load().await.unwrap();
    let config = &saved[&GUILD];
    assert_eq!(config.server_address(), "203.0.113.6:2402");
    assert_eq!(config.rcon_password, "pw2");
    assert_eq!(config.max_reconnect_attempts, 5);
    assert_eq!(config.reconnect_interval_s, 10);
    assert_eq!(config.guild_alias.as_deref(), Some("Chernarus Survivors"));
    let bridge = h.app.bridge(GUILD).await.unwrap();
    assert_eq!(bridge.config().max_reconnect_attempts, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_initialize_keeps_every_guild() {
    let h = Harness::new(Vec::new(), Vec::new());
    let guilds: Vec<GuildId> = (100..108).map(GuildId).collect();

    let tasks: Vec<_> = guilds
        .iter()
        .map(|&guild| {
            let app = Arc::clone(&h.app);
            let mut command = message(DEBUG, ")isc 203.0.113.5 2302 pw 1111 2222");
            command.guild_id = Some(guild);
            tokio::spawn(async move { app.handle_message(command).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let saved = h.store.load().await.unwrap();
    assert_eq!(saved.len(), guilds.len());
    for guild in &guilds {
        assert_eq!(saved[guild].guild_id, *guild);
        assert!(h.app.bridge(*guild).await.is_some());
    }
    assert_eq!(h.client_count(), guilds.len());
    h.app.shutdown().await;
}

#[tokio::test]
async fn test_malformed_initialize_replies_usage_without_writing() {
    let h = Harness::new(Vec::new(), Vec::new());

    h.say(DEBUG, ")isc 203.0.113.5 port pw 1111 2222").await;

    assert_eq!(
        h.platform.messages_in(DEBUG),
        vec![
            "Usage: `)initialize-bridge <host> <port> <password> <bridge-channel> <moderation-channel>`"
        ]
    );
    assert!(!h.path.exists());
    assert!(h.app.bridge(GUILD).await.is_none());
    assert_eq!(h.client_count(), 0);
}

#[tokio::test]
async fn test_non_operator_cannot_initialize() {
    let h = Harness::new(Vec::new(), vec![UserId(1)]);

    h.say(DEBUG, ")isc 203.0.113.5 2302 pw 1111 2222").await;

    assert!(h.platform.calls().is_empty());
    assert!(!h.path.exists());
    assert!(h.app.bridge(GUILD).await.is_none());
}

#[tokio::test]
async fn test_reconfigure_replaces_running_bridge() {
    let h = Harness::new(Vec::new(), vec![ALICE]);
    h.say(DEBUG, ")isc 203.0.113.5 2302 pw 1111 2222").await;
    h.until(|calls| has_text(calls, DEBUG, "Connected to the game server."))
        .await;

    h.say(DEBUG, ")isc 203.0.113.6 2402 pw 1111 2222").await;

    assert_eq!(h.client_count(), 2);
    assert_eq!(h.client(0).calls().last(), Some(&RconCall::Disconnect));
    let bridge = h.app.bridge(GUILD).await.unwrap();
    assert_eq!(bridge.config().server_address(), "203.0.113.6:2402");
    assert_eq!(h.store.load().await.unwrap().len(), 1);
}

// =========================================================================
// Startup
// =========================================================================

#[tokio::test]
async fn test_start_spawns_saved_bridges() {
    let h = Harness::new(Vec::new(), Vec::new());
    let mut other = config();
    other.guild_id = GuildId(43);
    h.store.upsert(config()).await.unwrap();
    h.store.upsert(other).await.unwrap();

    assert_eq!(h.app.start().await.unwrap(), 2);

    assert!(h.app.bridge(GUILD).await.is_some());
    assert!(h.app.bridge(GuildId(43)).await.is_some());
    h.app.shutdown().await;
    assert!(h.app.bridge(GUILD).await.is_none());
}

#[tokio::test]
async fn test_start_without_config_file() {
    let h = Harness::new(Vec::new(), Vec::new());

    assert_eq!(h.app.start().await.unwrap(), 0);
}

#[tokio::test]
async fn test_start_rejects_malformed_config() {
    let h = Harness::new(Vec::new(), Vec::new());
    std::fs::write(&h.path, "[1, 2").unwrap();

    let err = h.app.start().await.unwrap_err();

    assert!(matches!(err, BridgeError::Config(_)));
}

// =========================================================================
// Message pipeline
// =========================================================================

#[tokio::test]
async fn test_chat_is_relayed_before_returning() {
    let h = Harness::new(Vec::new(), Vec::new());
    h.start_configured().await;

    h.say(BRIDGE, "hello").await;

    assert!(
        h.client(0)
            .calls()
            .contains(&RconCall::SayGlobal("alice-discord: hello".into()))
    );
}

#[tokio::test]
async fn test_bot_messages_are_ignored() {
    let h = Harness::new(Vec::new(), Vec::new());
    h.start_configured().await;
    let before = h.platform.calls().len();

    let mut bot = message(DEBUG, ")status");
    bot.author_is_bot = true;
    h.app.handle_message(bot).await;

    assert_eq!(h.platform.calls().len(), before);
    assert_eq!(
        h.client(0)
            .count_calls(|c| matches!(c, RconCall::SayGlobal(_) | RconCall::Admins)),
        0
    );
}

#[tokio::test]
async fn test_kick_through_the_app() {
    let h = Harness::new(vec![player(7, "Raider")], Vec::new());
    h.start_configured().await;

    h.say(MODERATION, ")kick").await;
    h.until(|calls| {
        texts(calls, MODERATION)
            .iter()
            .any(|t| t.starts_with("Select a player to kick"))
    })
    .await;

    h.say(MODERATION, "0 spawn killing").await;
    h.until(|calls| {
        calls
            .iter()
            .filter(|c| matches!(c, PlatformCall::Reaction { .. }))
            .count()
            == 2
    })
    .await;

    let (confirmation, _) = h.platform.embeds()[0].clone();
    h.app.handle_reaction(IncomingReaction {
        guild_id: Some(GUILD),
        channel_id: MODERATION,
        message_id: confirmation,
        user_id: ALICE,
        emoji: ACCEPT.into(),
    });
    h.until(|calls| has_text(calls, MODERATION, "Kicked Raider: spawn killing"))
        .await;

    assert_eq!(
        h.client(0)
            .count_calls(|c| matches!(c, RconCall::Kick { player_id: 7, .. })),
        1
    );
}

#[tokio::test]
async fn test_reconnect_when_connected() {
    let h = Harness::new(Vec::new(), Vec::new());
    h.start_configured().await;

    h.say(DEBUG, ")reconnect").await;

    assert!(
        h.platform
            .messages_in(DEBUG)
            .contains(&"Already connected to the game server.".to_string())
    );
}

#[tokio::test]
async fn test_status_reports_counts() {
    let h = Harness::new(vec![player(1, "A"), player(2, "B")], Vec::new());
    h.start_configured().await;

    h.say(DEBUG, ")status").await;

    let debug = h.platform.messages_in(DEBUG);
    let status = debug.last().unwrap();
    assert!(status.contains("Session: connected"));
    assert!(status.contains("Players: 2"));
}

#[tokio::test]
async fn test_commands_without_bridge() {
    let h = Harness::new(Vec::new(), Vec::new());

    h.say(DEBUG, ")status").await;
    h.say(MODERATION, ")kick").await;

    assert_eq!(
        h.platform.messages_in(DEBUG),
        vec!["No bridge is configured for this server. Use `)initialize-bridge` first."]
    );
    assert!(h.platform.messages_in(MODERATION).is_empty());
}
