//! Bridge registry: one running bridge per guild.

use std::collections::HashMap;

use rconbridge_protocol::GuildId;
use rconbridge_transport::RconClient;

use crate::BridgeHandle;

/// Tracks the running bridge of every configured guild.
///
/// Owned by the application. A guild never has two bridges at once:
/// [`replace`](Self::replace) shuts the old one down (and waits for its
/// session to release the transport) before the new one is spawned.
pub struct BridgeRegistry<C: RconClient> {
    bridges: HashMap<GuildId, BridgeHandle<C>>,
}

impl<C: RconClient> BridgeRegistry<C> {
    pub fn new() -> Self {
        Self {
            bridges: HashMap::new(),
        }
    }

    pub fn get(&self, guild_id: GuildId) -> Option<&BridgeHandle<C>> {
        self.bridges.get(&guild_id)
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.bridges.contains_key(&guild_id)
    }

    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }

    pub fn guild_ids(&self) -> impl Iterator<Item = GuildId> + '_ {
        self.bridges.keys().copied()
    }

    /// Shuts down the guild's bridge, if any, then installs the one built
    /// by `spawn`.
    pub async fn replace(
        &mut self,
        guild_id: GuildId,
        spawn: impl FnOnce() -> BridgeHandle<C>,
    ) -> &BridgeHandle<C> {
        self.remove(guild_id).await;
        let handle = spawn();
        tracing::info!(%guild_id, "bridge registered");
        self.bridges.entry(guild_id).or_insert(handle)
    }

    /// Shuts down and forgets the guild's bridge. Returns whether one was
    /// running.
    pub async fn remove(&mut self, guild_id: GuildId) -> bool {
        let Some(old) = self.bridges.remove(&guild_id) else {
            return false;
        };
        if let Err(e) = old.shutdown().await {
            tracing::debug!(%guild_id, error = %e, "bridge already stopped");
        }
        tracing::info!(%guild_id, "bridge removed");
        true
    }

    /// Shuts every bridge down.
    pub async fn shutdown_all(&mut self) {
        let guild_ids: Vec<GuildId> = self.guild_ids().collect();
        for guild_id in guild_ids {
            self.remove(guild_id).await;
        }
    }
}

impl<C: RconClient> Default for BridgeRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
