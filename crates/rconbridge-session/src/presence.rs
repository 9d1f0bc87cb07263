//! Presence updater: mirrors the server's player count into the bot's
//! status line.

use std::fmt;
use std::sync::Arc;

use rconbridge_transport::RconClient;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::SessionEvent;

/// The bot's status line for a given player count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceActivity {
    pub players: usize,
}

impl PresenceActivity {
    pub fn new(players: usize) -> Self {
        Self { players }
    }

    /// Activity name for platforms that prefix the verb themselves
    /// (Discord renders `Watching` before it).
    pub fn name(&self) -> String {
        format!("over {} survivors...", self.players)
    }
}

impl fmt::Display for PresenceActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watching {}", self.name())
    }
}

/// Runs one presence refresh at a time in the background.
///
/// [`refresh`](Self::refresh) is called from the keepalive tick and never
/// blocks it: the player query runs in a spawned task that reports through
/// the session's event channel. A refresh requested while the previous one
/// is still running is skipped.
pub struct PresenceUpdater<C: RconClient> {
    client: Arc<C>,
    events: mpsc::Sender<SessionEvent>,
    in_flight: Option<JoinHandle<()>>,
}

impl<C: RconClient> PresenceUpdater<C> {
    pub fn new(client: Arc<C>, events: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            client,
            events,
            in_flight: None,
        }
    }

    /// Whether a refresh is still running.
    pub fn is_running(&self) -> bool {
        self.in_flight.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Starts a refresh. Returns `false` if the previous one is still
    /// running and this cycle was skipped.
    pub fn refresh(&mut self) -> bool {
        if self.is_running() {
            tracing::debug!("previous presence refresh still running, skipping");
            return false;
        }

        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        self.in_flight = Some(tokio::spawn(async move {
            match client.players().await {
                Ok(players) => {
                    let activity = PresenceActivity::new(players.len());
                    tracing::debug!(players = activity.players, "presence refreshed");
                    let _ = events.send(SessionEvent::Presence(activity)).await;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "presence refresh skipped");
                }
            }
        }));
        true
    }
}

impl<C: RconClient> Drop for PresenceUpdater<C> {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}
