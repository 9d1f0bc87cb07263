//! Fixed-period tick scheduler for rconbridge.
//!
//! Remote consoles drop sessions that stay quiet for too long (BattlEye
//! after roughly 45 seconds), no matter how much chat is flowing. The
//! scheduler produces a steady tick, by default every 30 seconds, that the
//! session actor turns into a keepalive and a presence refresh.
//!
//! # Disabled mode
//!
//! When `period` is zero the scheduler is disabled and
//! [`TickScheduler::wait_for_tick`] pends forever.
//!
//! # Integration
//!
//! The scheduler sits inside the session actor's `tokio::select!` loop.
//! Because the tick body is awaited inside the loop, two ticks can never
//! run at the same time against the same transport:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* lifecycle commands */ }
//!         _ = scheduler.wait_for_tick() => {
//!             keepalive().await;
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

/// Default keepalive period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick fires late (the runtime was busy, or the
/// previous tick body ran long).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Skip the missed tick(s) and schedule the next one a full period
    /// from now. Safest default: a late tick never causes a burst.
    #[default]
    Skip,
    /// Keep the original cadence. The next tick fires at its originally
    /// scheduled time even if that is very soon.
    Drop,
}

/// Full configuration for the tick scheduler.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks. Zero disables the scheduler.
    pub period: Duration,
    /// Late-tick handling policy.
    pub policy: TickPolicy,
    /// Budget warning threshold (0.0–1.0). Default: 0.80 (80%).
    /// A tracing warning is emitted when a tick body takes longer than
    /// this fraction of the period.
    pub budget_warn_threshold: f64,
    /// Random jitter (0..max) added to the *first* tick so bridges started
    /// together do not all hit their servers at the same instant.
    pub initial_jitter: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
            initial_jitter: Duration::from_secs(2),
        }
    }
}

impl TickConfig {
    /// A config for a specific period with the other defaults.
    pub fn every(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        if !self.period.is_zero() && self.initial_jitter > self.period {
            warn!(
                jitter_ms = self.initial_jitter.as_millis() as u64,
                period_ms = self.period.as_millis() as u64,
                "initial jitter exceeds period, clamping"
            );
            self.initial_jitter = self.period;
        }
        self
    }

    /// Returns `None` when the scheduler is disabled.
    pub fn tick_period(&self) -> Option<Duration> {
        (!self.period.is_zero()).then_some(self.period)
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Information about a tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// `true` if this tick fired noticeably late.
    pub overrun: bool,
    /// How many whole periods were skipped because of the delay.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-period tick scheduler. One per session.
pub struct TickScheduler {
    config: TickConfig,
    period: Option<Duration>,
    tick_count: u64,
    next_tick: Option<TokioInstant>,
    /// Set by `wait_for_tick`, consumed by `record_tick_end`.
    tick_start: Option<Instant>,
    paused: bool,
}

impl TickScheduler {
    /// Creates a scheduler. The first tick is one period (plus jitter)
    /// from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let period = config.tick_period();

        let next_tick = period.map(|p| {
            let jitter = if config.initial_jitter.is_zero() {
                Duration::ZERO
            } else {
                let max = config.initial_jitter.as_millis() as u64;
                Duration::from_millis(rand::rng().random_range(0..max.max(1)))
            };
            TokioInstant::now() + p + jitter
        });

        match period {
            Some(p) => debug!(
                period_ms = p.as_millis() as u64,
                policy = ?config.policy,
                "tick scheduler created"
            ),
            None => debug!("tick scheduler created disabled"),
        }

        Self {
            config,
            period,
            tick_count: 0,
            next_tick,
            tick_start: None,
            paused: false,
        }
    }

    /// A scheduler for a specific period with default settings.
    pub fn every(period: Duration) -> Self {
        Self::new(TickConfig::every(period))
    }

    /// Waits until the next tick is due.
    ///
    /// When disabled or paused this future pends forever; inside
    /// `tokio::select!` the other branches keep running.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let (next, period) = match (self.next_tick, self.period) {
            (Some(next), Some(period)) if !self.paused => (next, period),
            _ => return std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > period / 10;
        let mut ticks_skipped = 0u64;

        self.next_tick = Some(match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped =
                        (late_by.as_nanos() / period.as_nanos()) as u64;
                    if ticks_skipped > 0 {
                        warn!(
                            tick = self.tick_count,
                            skipped = ticks_skipped,
                            late_ms = late_by.as_millis() as u64,
                            "tick late, skipping ahead"
                        );
                    }
                }
                now + period
            }
            TickPolicy::Drop => {
                if overrun {
                    warn!(
                        tick = self.tick_count,
                        late_ms = late_by.as_millis() as u64,
                        "tick late, keeping original cadence"
                    );
                }
                next + period
            }
        });

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Records that the tick body has finished and returns how long it
    /// took.
    ///
    /// Warns when the body ate most of its period: a keepalive that slow
    /// means the server is close to dropping the session. `None` if no tick
    /// is in progress.
    pub fn record_tick_end(&mut self) -> Option<Duration> {
        let start = self.tick_start.take()?;
        let elapsed = start.elapsed();

        if let Some(period) = self.period {
            let utilization = elapsed.as_secs_f64() / period.as_secs_f64();
            if utilization >= 1.0 {
                warn!(
                    tick = self.tick_count,
                    elapsed_ms = elapsed.as_millis() as u64,
                    period_ms = period.as_millis() as u64,
                    "tick body outlasted its period"
                );
            } else if utilization >= self.config.budget_warn_threshold {
                warn!(
                    tick = self.tick_count,
                    elapsed_ms = elapsed.as_millis() as u64,
                    utilization_pct = format!("{:.1}", utilization * 100.0),
                    "tick body approaching its period"
                );
            }
        }

        Some(elapsed)
    }

    /// Pauses ticking. `wait_for_tick` pends until [`resume`](Self::resume).
    ///
    /// Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Resumes ticking. The next tick is a full period from now, so a
    /// resume never produces an immediate tick.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            if let Some(period) = self.period {
                self.next_tick = Some(TokioInstant::now() + period);
            }
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_disabled(&self) -> bool {
        self.period.is_none()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The configured period, or `None` when disabled.
    pub fn period(&self) -> Option<Duration> {
        self.period
    }
}
