//! The session actor and its handle.
//!
//! Each session runs in its own Tokio task and is the only code that
//! changes connection state. Everything else talks to it through a
//! [`SessionHandle`]: lifecycle requests go through the actor's command
//! channel, while plain queries and moderation actions (players, kick,
//! ...) call the shared transport directly because they do not touch
//! connection state.
//!
//! One `tokio::select!` loop multiplexes four sources:
//!
//! ```text
//!   commands ─────┐
//!   transport ────┤
//!   keepalive ────┼──→ actor ──→ SessionEvent channel
//!   retry timer ──┘
//! ```
//!
//! The keepalive ticker is paused for as long as a retry loop is alive, so
//! recovery always finishes before regular keepalives resume.

use std::sync::Arc;
use std::time::Duration;

use rconbridge_protocol::{AdminRecord, BanRecord, PlayerRecord};
use rconbridge_tick::TickScheduler;
use rconbridge_transport::{EVENT_CHANNEL_SIZE, RconClient, RconEvent};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;

use crate::{
    PresenceUpdater, ReconnectReply, RetryLoop, RetryStep, SessionConfig,
    SessionError, SessionEvent, SessionNotice, SessionState, SessionStatus,
};

/// Lifecycle requests handled by the actor.
enum SessionCommand {
    Reconnect {
        reply: oneshot::Sender<ReconnectReply>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Handle to a running session actor.
///
/// Cheap to clone. Dropping every handle stops the actor.
pub struct SessionHandle<C: RconClient> {
    label: Arc<str>,
    client: Arc<C>,
    commands: mpsc::Sender<SessionCommand>,
}

impl<C: RconClient> Clone for SessionHandle<C> {
    fn clone(&self) -> Self {
        Self {
            label: Arc::clone(&self.label),
            client: Arc::clone(&self.client),
            commands: self.commands.clone(),
        }
    }
}

impl<C: RconClient> SessionHandle<C> {
    pub fn label(&self) -> &str {
        &self.label
    }

    fn unavailable(&self) -> SessionError {
        SessionError::Unavailable(self.label.to_string())
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Manual reconnect. Safe to call at any time.
    pub async fn reconnect(&self) -> Result<ReconnectReply, SessionError> {
        self.request(|reply| SessionCommand::Reconnect { reply }).await
    }

    /// Stops any retry loop and closes the link. No disconnect notice is
    /// emitted for an operator-requested disconnect.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Disconnect { reply }).await
    }

    pub async fn status(&self) -> Result<SessionStatus, SessionError> {
        self.request(|reply| SessionCommand::Status { reply }).await
    }

    pub async fn state(&self) -> Result<SessionState, SessionError> {
        Ok(self.status().await?.state)
    }

    /// Tells the actor to close the link and stop.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.commands
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| self.unavailable())
    }

    // -- Passthrough operations ---------------------------------------------

    pub async fn say_global(&self, text: &str) -> Result<(), SessionError> {
        Ok(self.client.say_global(text).await?)
    }

    pub async fn players(&self) -> Result<Vec<PlayerRecord>, SessionError> {
        Ok(self.client.players().await?)
    }

    pub async fn admins(&self) -> Result<Vec<AdminRecord>, SessionError> {
        Ok(self.client.admins().await?)
    }

    pub async fn bans(&self) -> Result<Vec<BanRecord>, SessionError> {
        Ok(self.client.bans().await?)
    }

    pub async fn kick(&self, player_id: u32, reason: Option<&str>) -> Result<(), SessionError> {
        Ok(self.client.kick(player_id, reason).await?)
    }

    pub async fn add_ban(
        &self,
        guid: &str,
        duration: Option<Duration>,
        reason: Option<&str>,
    ) -> Result<(), SessionError> {
        Ok(self.client.add_ban(guid, duration, reason).await?)
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct SessionActor<C: RconClient> {
    label: Arc<str>,
    client: Arc<C>,
    config: SessionConfig,
    state: SessionState,
    retry: Option<RetryLoop>,
    ticker: TickScheduler,
    presence: PresenceUpdater<C>,
    events: mpsc::Sender<SessionEvent>,
    transport: broadcast::Receiver<RconEvent>,
    commands: mpsc::Receiver<SessionCommand>,
}

impl<C: RconClient> SessionActor<C> {
    async fn run(mut self) {
        tracing::info!(session = %self.label, "session actor started");

        self.initial_connect().await;

        loop {
            let retry_at = self.retry.as_ref().map(RetryLoop::next_attempt);

            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd).await,
                },
                event = self.transport.recv() => match event {
                    Ok(event) => self.handle_transport_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(session = %self.label, missed, "server events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::warn!(session = %self.label, "transport event stream closed");
                        break;
                    }
                },
                _ = self.ticker.wait_for_tick() => {
                    self.on_tick().await;
                    self.ticker.record_tick_end();
                }
                _ = sleep_until_due(retry_at) => {
                    self.run_retry_cycle().await;
                }
            }
        }

        if let Err(e) = self.client.disconnect().await {
            tracing::debug!(session = %self.label, error = %e, "disconnect on shutdown failed");
        }
        tracing::info!(session = %self.label, "session actor stopped");
    }

    async fn initial_connect(&mut self) {
        self.state = SessionState::Connecting;
        match self.client.connect().await {
            Ok(()) => {
                self.state = SessionState::Connected;
                tracing::info!(session = %self.label, "connected");
                self.notify(SessionNotice::Connected).await;
            }
            Err(e) => {
                self.state = SessionState::Disconnected;
                tracing::warn!(session = %self.label, error = %e, "initial connect failed");
                self.start_retry(RetryLoop::new(
                    self.config.max_reconnect_attempts,
                    self.config.reconnect_interval,
                ))
                .await;
            }
        }
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Reconnect { reply } => {
                let outcome = if self.state == SessionState::Connected {
                    ReconnectReply::AlreadyConnected
                } else if self.retry.is_some() {
                    ReconnectReply::AlreadyReconnecting
                } else {
                    tracing::info!(session = %self.label, "manual reconnect requested");
                    self.start_retry(RetryLoop::immediate(
                        self.config.max_reconnect_attempts,
                        self.config.reconnect_interval,
                    ))
                    .await;
                    ReconnectReply::Started
                };
                let _ = reply.send(outcome);
            }
            SessionCommand::Disconnect { reply } => {
                self.retry = None;
                self.ticker.pause();
                if let Err(e) = self.client.disconnect().await {
                    tracing::debug!(session = %self.label, error = %e, "disconnect failed");
                }
                self.state = SessionState::Disconnected;
                tracing::info!(session = %self.label, "disconnected on request");
                let _ = reply.send(());
            }
            SessionCommand::Status { reply } => {
                let _ = reply.send(SessionStatus {
                    state: self.state,
                    reconnect_attempts: self.retry.as_ref().map_or(0, RetryLoop::attempts),
                    reconnecting: self.retry.is_some(),
                });
            }
            SessionCommand::Shutdown => {}
        }
    }

    async fn handle_transport_event(&mut self, event: RconEvent) {
        match event {
            RconEvent::ServerMessage(text) => {
                self.emit(SessionEvent::ServerMessage(text)).await;
            }
            RconEvent::Disconnected => self.link_lost("transport closed").await,
        }
    }

    /// One keepalive tick: presence first, then the keepalive itself.
    async fn on_tick(&mut self) {
        self.presence.refresh();
        if let Err(e) = self.client.keepalive().await {
            tracing::warn!(session = %self.label, error = %e, "keepalive failed");
            self.link_lost("keepalive failed").await;
        }
    }

    /// Handles a sign that the link is gone. Only acts on the
    /// Connected → Disconnected edge.
    async fn link_lost(&mut self, cause: &str) {
        if self.state != SessionState::Connected {
            tracing::debug!(session = %self.label, cause, state = %self.state, "link loss ignored");
            return;
        }
        self.state = SessionState::Disconnected;
        tracing::warn!(session = %self.label, cause, "session disconnected");
        self.notify(SessionNotice::Disconnected).await;
        self.start_retry(RetryLoop::new(
            self.config.max_reconnect_attempts,
            self.config.reconnect_interval,
        ))
        .await;
    }

    async fn start_retry(&mut self, retry: RetryLoop) {
        self.ticker.pause();
        let notice = SessionNotice::Reconnecting {
            attempt: retry.cycle(),
            max_attempts: retry.max_attempts(),
        };
        self.retry = Some(retry);
        self.notify(notice).await;
    }

    /// Runs the due retry cycle: connect, then keepalive.
    async fn run_retry_cycle(&mut self) {
        let Some(cycle) = self.retry.as_ref().map(RetryLoop::cycle) else {
            return;
        };
        tracing::info!(session = %self.label, attempt = cycle, "reconnect attempt");

        self.state = SessionState::Connecting;
        let outcome = match self.client.connect().await {
            Ok(()) => self.client.keepalive().await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                self.retry = None;
                self.state = SessionState::Connected;
                self.ticker.resume();
                tracing::info!(session = %self.label, attempt = cycle, "reconnected");
                self.notify(SessionNotice::Reconnected).await;
            }
            Err(e) => {
                self.state = SessionState::Disconnected;
                tracing::warn!(session = %self.label, attempt = cycle, error = %e, "reconnect attempt failed");
                let Some(retry) = self.retry.as_mut() else {
                    return;
                };
                match retry.record_failure() {
                    RetryStep::Retry { attempt } => {
                        let max_attempts = retry.max_attempts();
                        self.notify(SessionNotice::Reconnecting {
                            attempt,
                            max_attempts,
                        })
                        .await;
                    }
                    RetryStep::Exhausted { attempts } => {
                        self.retry = None;
                        tracing::error!(session = %self.label, attempts, "giving up on reconnect");
                        self.notify(SessionNotice::ReconnectFailed { attempts }).await;
                    }
                }
            }
        }
    }

    async fn notify(&self, notice: SessionNotice) {
        self.emit(SessionEvent::Notice(notice)).await;
    }

    async fn emit(&self, event: SessionEvent) {
        if self.events.send(event).await.is_err() {
            tracing::trace!(session = %self.label, "session event dropped, no receiver");
        }
    }
}

/// Sleeps until `deadline`, or forever when there is none.
async fn sleep_until_due(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Spawns a session actor for `client`.
///
/// The actor connects immediately. Returns the handle and the receiving
/// end of the actor's event stream.
pub fn spawn_session<C: RconClient>(
    client: Arc<C>,
    config: SessionConfig,
) -> (SessionHandle<C>, mpsc::Receiver<SessionEvent>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
    let label: Arc<str> = Arc::from(config.label.as_str());

    let actor = SessionActor {
        label: Arc::clone(&label),
        transport: client.subscribe(),
        presence: PresenceUpdater::new(Arc::clone(&client), event_tx.clone()),
        ticker: TickScheduler::new(config.keepalive.clone()),
        client: Arc::clone(&client),
        config,
        state: SessionState::Disconnected,
        retry: None,
        events: event_tx,
        commands: cmd_rx,
    };

    tokio::spawn(actor.run());

    (
        SessionHandle {
            label,
            client,
            commands: cmd_tx,
        },
        event_rx,
    )
}
