//! The bounded reconnect loop as a plain value.
//!
//! The session actor holds an `Option<RetryLoop>`: `Some` while retrying,
//! `None` otherwise. Each failed cycle goes through
//! [`RetryLoop::record_failure`], which either reschedules or reports
//! exhaustion, so the termination condition is visible and testable.

use std::time::Duration;

use tokio::time::Instant;

/// What to do after a failed reconnect cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Another cycle was scheduled. `attempt` is its 1-based number.
    Retry { attempt: u32 },
    /// `attempts` failures exceed the limit; the loop is over.
    Exhausted { attempts: u32 },
}

/// Bounded retry state: a failure counter and the next deadline.
#[derive(Debug, Clone)]
pub struct RetryLoop {
    attempts: u32,
    max_attempts: u32,
    interval: Duration,
    next_attempt: Instant,
}

impl RetryLoop {
    /// A loop whose first cycle runs after one `interval`.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self::starting_in(max_attempts, interval, interval)
    }

    /// A loop whose first cycle runs immediately (manual reconnect).
    pub fn immediate(max_attempts: u32, interval: Duration) -> Self {
        Self::starting_in(max_attempts, interval, Duration::ZERO)
    }

    fn starting_in(max_attempts: u32, interval: Duration, delay: Duration) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            interval,
            next_attempt: Instant::now() + delay,
        }
    }

    /// Failed cycles so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 1-based number of the cycle that runs next.
    pub fn cycle(&self) -> u32 {
        self.attempts.saturating_add(1)
    }

    /// When the next cycle is due.
    pub fn next_attempt(&self) -> Instant {
        self.next_attempt
    }

    /// Counts a failed cycle and schedules the next one, unless the
    /// counter now exceeds `max_attempts`.
    pub fn record_failure(&mut self) -> RetryStep {
        self.attempts = self.attempts.saturating_add(1);
        if self.attempts > self.max_attempts {
            RetryStep::Exhausted {
                attempts: self.attempts,
            }
        } else {
            self.next_attempt = Instant::now() + self.interval;
            RetryStep::Retry {
                attempt: self.cycle(),
            }
        }
    }
}
