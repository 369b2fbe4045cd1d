//! Polling schedules for booking status checks.

use std::time::Duration;

/// Default delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How often, and how many times, to poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollPolicy {
    /// Fixed delay between polls.
    Fixed {
        /// Delay between polls.
        delay: Duration,
        /// Maximum number of polls; `None` polls until a final status.
        max_attempts: Option<u32>,
    },
    /// Exponential backoff.
    Exponential {
        /// Initial delay.
        initial_delay: Duration,
        /// Maximum delay.
        max_delay: Duration,
        /// Multiplier for each attempt.
        multiplier: f64,
        /// Maximum number of polls; `None` polls until a final status.
        max_attempts: Option<u32>,
    },
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::Fixed {
            delay: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

impl PollPolicy {
    /// Create fixed delay policy.
    #[must_use]
    pub const fn fixed(delay: Duration, max_attempts: Option<u32>) -> Self {
        Self::Fixed {
            delay,
            max_attempts,
        }
    }

    /// Create exponential backoff policy, doubling up to one minute.
    #[must_use]
    pub const fn exponential(initial_delay: Duration, max_attempts: Option<u32>) -> Self {
        Self::Exponential {
            initial_delay,
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            max_attempts,
        }
    }

    /// Delay after poll number `attempt` (0-indexed), or `None` when no
    /// further poll is allowed.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::Fixed {
                delay,
                max_attempts,
            } => within(attempt, *max_attempts).then_some(*delay),
            Self::Exponential {
                initial_delay,
                max_delay,
                multiplier,
                max_attempts,
            } => within(attempt, *max_attempts).then(|| {
                let secs = initial_delay.as_secs_f64() * multiplier.powi(attempt as i32);
                if secs.is_finite() && secs < max_delay.as_secs_f64() {
                    Duration::from_secs_f64(secs)
                } else {
                    *max_delay
                }
            }),
        }
    }

    /// Maximum number of polls, if bounded.
    #[must_use]
    pub const fn max_attempts(&self) -> Option<u32> {
        match self {
            Self::Fixed { max_attempts, .. } | Self::Exponential { max_attempts, .. } => {
                *max_attempts
            }
        }
    }
}

/// Another poll may follow poll `attempt` if `attempt + 1` stays within the bound.
fn within(attempt: u32, max_attempts: Option<u32>) -> bool {
    max_attempts.is_none_or(|max| attempt.saturating_add(1) < max)
}

/// Poll state tracker.
#[derive(Debug)]
pub struct PollState {
    /// Polls made so far.
    attempt: u32,
    /// Policy in use.
    policy: PollPolicy,
    /// Total delay accumulated.
    total_delay: Duration,
}

impl PollState {
    /// Create new state.
    #[must_use]
    pub const fn new(policy: PollPolicy) -> Self {
        Self {
            attempt: 0,
            policy,
            total_delay: Duration::ZERO,
        }
    }

    /// Polls made so far.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next poll, or `None` when the policy is exhausted.
    #[must_use]
    pub fn next_delay(&self) -> Option<Duration> {
        self.policy.delay_for_attempt(self.attempt)
    }

    /// Record a completed poll.
    pub fn record_attempt(&mut self) {
        if let Some(delay) = self.next_delay() {
            self.total_delay += delay;
        }
        self.attempt += 1;
    }

    /// Get total delay so far.
    #[must_use]
    pub const fn total_delay(&self) -> Duration {
        self.total_delay
    }
}
