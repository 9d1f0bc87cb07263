//! BattlEye RCon client over UDP.
//!
//! One [`BattlEyeClient`] talks to one game server. After `connect()` a
//! background reader task owns the receive side of the socket: it
//! acknowledges server messages, republishes them as [`RconEvent`]s, and
//! hands command replies back to whoever is waiting for them (matched by
//! the one-byte sequence number).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use rconbridge_protocol::{AdminRecord, BanRecord, PlayerRecord};
use tokio::net::UdpSocket;
use tokio::sync::{Mutex, broadcast, oneshot};
use tokio::task::JoinHandle;

use crate::packet::{ClientPacket, Part, ServerPacket};
use crate::{
    EVENT_CHANNEL_SIZE, RconClient, RconEvent, TransportError, parse_admins,
    parse_bans, parse_players,
};

/// Largest datagram BattlEye sends.
const MAX_DATAGRAM: usize = 4096;

/// Connection settings for a BattlEye server.
#[derive(Debug, Clone)]
pub struct BattlEyeConfig {
    /// `host:port` of the RCon endpoint.
    pub address: String,
    pub password: String,
    /// How long to wait for a command reply (and for a keepalive ack).
    pub command_timeout: Duration,
    /// How long to wait for the login reply.
    pub login_timeout: Duration,
}

impl BattlEyeConfig {
    pub fn new(address: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            password: password.into(),
            command_timeout: Duration::from_secs(5),
            login_timeout: Duration::from_secs(5),
        }
    }
}

/// A reply that has not (fully) arrived yet.
struct PendingReply {
    reply: oneshot::Sender<Vec<u8>>,
    /// Filled in as multi-part fragments arrive.
    parts: Vec<Option<Vec<u8>>>,
}

type PendingMap = Arc<Mutex<HashMap<u8, PendingReply>>>;

/// Everything tied to one logged-in socket. Dropped on reconnect.
struct Link {
    socket: Arc<UdpSocket>,
    pending: PendingMap,
    next_seq: AtomicU8,
    reader: JoinHandle<()>,
}

impl Link {
    fn next_seq(&self) -> u8 {
        // Wraps at 255, as the protocol expects.
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// A BattlEye RCon client.
pub struct BattlEyeClient {
    config: BattlEyeConfig,
    link: Mutex<Option<Link>>,
    events: broadcast::Sender<RconEvent>,
}

impl BattlEyeClient {
    pub fn new(config: BattlEyeConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            config,
            link: Mutex::new(None),
            events,
        }
    }

    /// Sends a command and waits for its (reassembled) reply.
    async fn command(&self, command: &str) -> Result<String, TransportError> {
        let (socket, pending, seq) = {
            let guard = self.link.lock().await;
            let link = guard.as_ref().ok_or(TransportError::NotConnected)?;
            (Arc::clone(&link.socket), Arc::clone(&link.pending), link.next_seq())
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        pending.lock().await.insert(
            seq,
            PendingReply {
                reply: reply_tx,
                parts: Vec::new(),
            },
        );

        let packet = ClientPacket::Command {
            seq,
            command: command.to_string(),
        };
        if let Err(e) = socket.send(&packet.encode()).await {
            pending.lock().await.remove(&seq);
            return Err(TransportError::SendFailed(e));
        }

        match tokio::time::timeout(self.config.command_timeout, reply_rx).await {
            Ok(Ok(body)) => Ok(String::from_utf8_lossy(&body).into_owned()),
            Ok(Err(_)) => Err(TransportError::ConnectionClosed(
                "reader stopped before reply".into(),
            )),
            Err(_) => {
                pending.lock().await.remove(&seq);
                let what = if command.is_empty() { "keepalive" } else { command };
                Err(TransportError::Timeout(what.to_string()))
            }
        }
    }

    async fn login(&self, socket: &UdpSocket) -> Result<(), TransportError> {
        let packet = ClientPacket::Login {
            password: self.config.password.clone(),
        };
        socket
            .send(&packet.encode())
            .await
            .map_err(TransportError::SendFailed)?;

        let mut buf = vec![0u8; MAX_DATAGRAM];
        let wait_for_login = async {
            loop {
                let len = socket
                    .recv(&mut buf)
                    .await
                    .map_err(TransportError::ReceiveFailed)?;
                match ServerPacket::decode(&buf[..len]) {
                    Ok(ServerPacket::Login { ok: true }) => return Ok(()),
                    Ok(ServerPacket::Login { ok: false }) => {
                        return Err(TransportError::LoginRejected);
                    }
                    // Stale traffic from a previous session.
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::debug!(error = %e, "ignoring datagram during login");
                        continue;
                    }
                }
            }
        };

        tokio::time::timeout(self.config.login_timeout, wait_for_login)
            .await
            .map_err(|_| TransportError::Timeout("login".into()))?
    }
}

impl RconClient for BattlEyeClient {
    async fn connect(&self) -> Result<(), TransportError> {
        // Drop any previous link first so its reader stops.
        self.link.lock().await.take();

        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(TransportError::ConnectFailed)?;
        socket
            .connect(&self.config.address)
            .await
            .map_err(TransportError::ConnectFailed)?;

        self.login(&socket).await?;

        let socket = Arc::new(socket);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(read_loop(
            Arc::clone(&socket),
            Arc::clone(&pending),
            self.events.clone(),
        ));

        *self.link.lock().await = Some(Link {
            socket,
            pending,
            next_seq: AtomicU8::new(0),
            reader,
        });

        tracing::info!(address = %self.config.address, "logged in to BattlEye RCon");
        Ok(())
    }

    async fn keepalive(&self) -> Result<(), TransportError> {
        self.command("").await.map(|_| ())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        if self.link.lock().await.take().is_some() {
            tracing::info!(address = %self.config.address, "closed BattlEye RCon link");
        }
        Ok(())
    }

    async fn players(&self) -> Result<Vec<PlayerRecord>, TransportError> {
        Ok(parse_players(&self.command("players").await?))
    }

    async fn admins(&self) -> Result<Vec<AdminRecord>, TransportError> {
        Ok(parse_admins(&self.command("admins").await?))
    }

    async fn bans(&self) -> Result<Vec<BanRecord>, TransportError> {
        Ok(parse_bans(&self.command("bans").await?))
    }

    async fn say_global(&self, text: &str) -> Result<(), TransportError> {
        // Commands are single-line.
        let text = text.replace(['\r', '\n'], " ");
        self.command(&format!("say -1 {text}")).await.map(|_| ())
    }

    async fn kick(
        &self,
        player_id: u32,
        reason: Option<&str>,
    ) -> Result<(), TransportError> {
        let command = match reason {
            Some(reason) => format!("kick {player_id} {reason}"),
            None => format!("kick {player_id}"),
        };
        self.command(&command).await.map(|_| ())
    }

    async fn add_ban(
        &self,
        guid: &str,
        duration: Option<Duration>,
        reason: Option<&str>,
    ) -> Result<(), TransportError> {
        let minutes = ban_minutes(duration);
        let command = match reason {
            Some(reason) => format!("addBan {guid} {minutes} {reason}"),
            None => format!("addBan {guid} {minutes}"),
        };
        self.command(&command).await.map(|_| ())
    }

    fn subscribe(&self) -> broadcast::Receiver<RconEvent> {
        self.events.subscribe()
    }
}

/// BattlEye bans are in whole minutes and `0` means permanent.
fn ban_minutes(duration: Option<Duration>) -> u64 {
    match duration {
        None => 0,
        Some(d) if d.is_zero() => 0,
        Some(d) => d.as_secs().div_ceil(60).max(1),
    }
}

/// Receives datagrams until the socket fails.
async fn read_loop(
    socket: Arc<UdpSocket>,
    pending: PendingMap,
    events: broadcast::Sender<RconEvent>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    let mut last_message_seq: Option<u8> = None;

    loop {
        let len = match socket.recv(&mut buf).await {
            Ok(len) => len,
            Err(e) => {
                tracing::warn!(error = %e, "BattlEye RCon socket failed");
                break;
            }
        };

        let packet = match ServerPacket::decode(&buf[..len]) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::debug!(error = %e, "dropping undecodable datagram");
                continue;
            }
        };

        match packet {
            ServerPacket::Message { seq, text } => {
                // Always ack; the server resends until it sees one.
                if let Err(e) = socket.send(&ClientPacket::Ack { seq }.encode()).await {
                    tracing::warn!(error = %e, "failed to ack server message");
                    break;
                }
                if last_message_seq == Some(seq) {
                    tracing::trace!(seq, "duplicate server message");
                    continue;
                }
                last_message_seq = Some(seq);
                let _ = events.send(RconEvent::ServerMessage(text));
            }
            ServerPacket::Reply { seq, part, body } => {
                deliver_reply(&pending, seq, part, body).await;
            }
            ServerPacket::Login { .. } => {
                tracing::debug!("unexpected login reply after login");
            }
        }
    }

    let _ = events.send(RconEvent::Disconnected);
}

async fn deliver_reply(pending: &PendingMap, seq: u8, part: Option<Part>, body: Vec<u8>) {
    let mut pending = pending.lock().await;

    let Some(part) = part else {
        if let Some(entry) = pending.remove(&seq) {
            let _ = entry.reply.send(body);
        }
        return;
    };

    let Some(entry) = pending.get_mut(&seq) else {
        return;
    };
    if entry.parts.len() != part.total as usize {
        entry.parts = vec![None; part.total as usize];
    }
    entry.parts[part.index as usize] = Some(body);

    if entry.parts.iter().all(Option::is_some) {
        if let Some(entry) = pending.remove(&seq) {
            let body = entry.parts.into_iter().flatten().flatten().collect();
            let _ = entry.reply.send(body);
        }
    }
}
