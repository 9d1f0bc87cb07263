//! The persisted bridge configuration file.
//!
//! One JSON object keyed by guild id, each value a [`BridgeConfig`]:
//!
//! ```json
//! {
//!   "123456789012345678": {
//!     "host": "203.0.113.5",
//!     "rcon_port": 2302,
//!     "rcon_password": "secret",
//!     "guild_id": 123456789012345678,
//!     "bridge_channel": 1111,
//!     "debug_channel": 3333,
//!     "moderation_channel": 2222
//!   }
//! }
//! ```
//!
//! Read once at startup and rewritten whenever a guild is (re)configured.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rconbridge_protocol::GuildId;
use rconbridge_relay::BridgeConfig;
use tokio::sync::Mutex;

use crate::BridgeError;

/// Every configured guild.
pub type BridgeConfigs = BTreeMap<GuildId, BridgeConfig>;

/// Reads and writes the bridge config file.
///
/// Clones share one write lock, so read-modify-write cycles through any
/// clone never interleave.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    writes: Arc<Mutex<()>>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every guild's config.
    ///
    /// A missing file is a fresh install and yields no guilds. A file that
    /// exists but cannot be read or parsed is an error.
    pub async fn load(&self) -> Result<BridgeConfigs, BridgeError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no config file yet");
                return Ok(BridgeConfigs::new());
            }
            Err(e) => {
                return Err(BridgeError::Config(format!(
                    "{}: {e}",
                    self.path.display()
                )));
            }
        };
        if raw.trim().is_empty() {
            return Ok(BridgeConfigs::new());
        }

        let configs: BridgeConfigs = serde_json::from_str(&raw)
            .map_err(|e| BridgeError::Config(format!("{}: {e}", self.path.display())))?;
        for (guild_id, config) in &configs {
            if *guild_id != config.guild_id {
                return Err(BridgeError::Config(format!(
                    "{}: entry {guild_id} is configured for guild {}",
                    self.path.display(),
                    config.guild_id
                )));
            }
        }
        tracing::debug!(path = %self.path.display(), guilds = configs.len(), "config loaded");
        Ok(configs)
    }

    /// Replaces the whole file.
    ///
    /// Written to a sibling temp file first and renamed into place, so a
    /// crash mid-write never leaves a truncated config behind.
    pub async fn save(&self, configs: &BridgeConfigs) -> Result<(), BridgeError> {
        let _writing = self.writes.lock().await;
        self.write(configs).await
    }

    async fn write(&self, configs: &BridgeConfigs) -> Result<(), BridgeError> {
        let json = serde_json::to_string_pretty(configs)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!(path = %self.path.display(), guilds = configs.len(), "config saved");
        Ok(())
    }

    /// Inserts or replaces one guild's config and saves.
    pub async fn upsert(&self, config: BridgeConfig) -> Result<(), BridgeError> {
        self.update(config.guild_id, |_| config).await.map(|_| ())
    }

    /// Rebuilds one guild's config from its saved predecessor (if any) and
    /// saves the result, all under the write lock. Returns what was saved.
    pub async fn update<F>(&self, guild_id: GuildId, build: F) -> Result<BridgeConfig, BridgeError>
    where
        F: FnOnce(Option<&BridgeConfig>) -> BridgeConfig,
    {
        let _writing = self.writes.lock().await;
        let mut configs = self.load().await?;
        let config = build(configs.get(&guild_id));
        if config.guild_id != guild_id {
            return Err(BridgeError::Config(format!(
                "{}: entry {guild_id} is configured for guild {}",
                self.path.display(),
                config.guild_id
            )));
        }
        configs.insert(guild_id, config.clone());
        self.write(&configs).await?;
        Ok(config)
    }
}
