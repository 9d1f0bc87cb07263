//! An in-process [`RconClient`] with scriptable outcomes.
//!
//! `MemoryRcon` stands in for a game server in tests: it keeps a player
//! list, records every call, and lets a test decide whether the next
//! connect or keepalive succeeds. Server chat and link loss are injected
//! with [`push_server_message`](MemoryRcon::push_server_message) and
//! [`drop_link`](MemoryRcon::drop_link).

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rconbridge_protocol::{AdminRecord, BanRecord, PlayerRecord};
use tokio::sync::broadcast;

use crate::{EVENT_CHANNEL_SIZE, RconClient, RconEvent, TransportError};

/// One recorded call against a [`MemoryRcon`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RconCall {
    Connect,
    Keepalive,
    Disconnect,
    Players,
    Admins,
    Bans,
    SayGlobal(String),
    Kick {
        player_id: u32,
        reason: Option<String>,
    },
    AddBan {
        guid: String,
        duration: Option<Duration>,
        reason: Option<String>,
    },
}

#[derive(Default)]
struct MemoryState {
    /// Whether the simulated server answers at all.
    online: bool,
    connected: bool,
    connect_script: VecDeque<bool>,
    keepalive_script: VecDeque<bool>,
    players: Vec<PlayerRecord>,
    admins: Vec<AdminRecord>,
    bans: Vec<BanRecord>,
    calls: Vec<RconCall>,
}

/// A scriptable in-memory remote console.
pub struct MemoryRcon {
    state: Mutex<MemoryState>,
    events: broadcast::Sender<RconEvent>,
}

impl MemoryRcon {
    /// A server that is online and accepts connections.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            state: Mutex::new(MemoryState {
                online: true,
                ..MemoryState::default()
            }),
            events,
        }
    }

    pub fn with_players(self, players: Vec<PlayerRecord>) -> Self {
        self.lock().players = players;
        self
    }

    pub fn set_players(&self, players: Vec<PlayerRecord>) {
        self.lock().players = players;
    }

    pub fn set_admins(&self, admins: Vec<AdminRecord>) {
        self.lock().admins = admins;
    }

    pub fn set_bans(&self, bans: Vec<BanRecord>) {
        self.lock().bans = bans;
    }

    /// Takes the simulated server up or down. Scripted outcomes still
    /// take precedence while any are queued.
    pub fn set_online(&self, online: bool) {
        self.lock().online = online;
    }

    /// Queues outcomes for the next `connect()` calls.
    pub fn script_connects(&self, outcomes: impl IntoIterator<Item = bool>) {
        self.lock().connect_script.extend(outcomes);
    }

    /// Queues outcomes for the next `keepalive()` calls.
    pub fn script_keepalives(&self, outcomes: impl IntoIterator<Item = bool>) {
        self.lock().keepalive_script.extend(outcomes);
    }

    /// Simulates the server pushing a chat line.
    pub fn push_server_message(&self, text: impl Into<String>) {
        let _ = self.events.send(RconEvent::ServerMessage(text.into()));
    }

    /// Simulates the link dying underneath the client.
    pub fn drop_link(&self) {
        self.lock().connected = false;
        let _ = self.events.send(RconEvent::Disconnected);
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<RconCall> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls matching `pred`.
    pub fn count_calls(&self, pred: impl Fn(&RconCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `call` and fails unless a link is up.
    fn record_connected(&self, call: RconCall) -> Result<MutexGuard<'_, MemoryState>, TransportError> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.connected {
            Ok(state)
        } else {
            Err(TransportError::NotConnected)
        }
    }
}

impl Default for MemoryRcon {
    fn default() -> Self {
        Self::new()
    }
}

impl RconClient for MemoryRcon {
    async fn connect(&self) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.calls.push(RconCall::Connect);
        let ok = state.connect_script.pop_front().unwrap_or(state.online);
        state.connected = ok;
        if ok {
            Ok(())
        } else {
            Err(TransportError::Timeout("login".into()))
        }
    }

    async fn keepalive(&self) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.calls.push(RconCall::Keepalive);
        let ok = state.keepalive_script.pop_front().unwrap_or(state.online);
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if ok {
            Ok(())
        } else {
            state.connected = false;
            Err(TransportError::Timeout("keepalive".into()))
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.calls.push(RconCall::Disconnect);
        state.connected = false;
        Ok(())
    }

    async fn players(&self) -> Result<Vec<PlayerRecord>, TransportError> {
        Ok(self.record_connected(RconCall::Players)?.players.clone())
    }

    async fn admins(&self) -> Result<Vec<AdminRecord>, TransportError> {
        Ok(self.record_connected(RconCall::Admins)?.admins.clone())
    }

    async fn bans(&self) -> Result<Vec<BanRecord>, TransportError> {
        Ok(self.record_connected(RconCall::Bans)?.bans.clone())
    }

    async fn say_global(&self, text: &str) -> Result<(), TransportError> {
        self.record_connected(RconCall::SayGlobal(text.to_string()))
            .map(|_| ())
    }

    async fn kick(
        &self,
        player_id: u32,
        reason: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut state = self.record_connected(RconCall::Kick {
            player_id,
            reason: reason.map(str::to_string),
        })?;
        state.players.retain(|p| p.id != player_id);
        Ok(())
    }

    async fn add_ban(
        &self,
        guid: &str,
        duration: Option<Duration>,
        reason: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut state = self.record_connected(RconCall::AddBan {
            guid: guid.to_string(),
            duration,
            reason: reason.map(str::to_string),
        })?;
        let id = state.bans.len() as u32;
        state.bans.push(BanRecord {
            id,
            target: guid.to_string(),
            minutes_left: duration.map(|d| d.as_secs().div_ceil(60)),
            reason: reason.unwrap_or_default().to_string(),
        });
        state.players.retain(|p| p.guid != guid);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RconEvent> {
        self.events.subscribe()
    }
}
