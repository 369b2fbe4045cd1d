//! Timeout utilities.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, Timeout, timeout};

/// Extension trait for adding timeouts to futures.
pub trait TimeoutExt: Sized {
    /// Wrap this future with a timeout.
    fn with_timeout(self, duration: Duration) -> Timeout<Self>;
}

impl<F: Future> TimeoutExt for F {
    fn with_timeout(self, duration: Duration) -> Timeout<Self> {
        timeout(duration, self)
    }
}

/// A deadline for one bounded wait.
///
/// A zero bound means the wait is unbounded: the deadline never expires.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    bound: Duration,
    deadline: Option<Instant>,
}

impl Deadline {
    /// Start a deadline `bound` from now; [`Duration::ZERO`] never expires.
    #[must_use]
    pub fn from_now(bound: Duration) -> Self {
        let deadline = if bound.is_zero() {
            None
        } else {
            Some(Instant::now() + bound)
        };
        Self { bound, deadline }
    }

    /// The bound this deadline was created with.
    #[must_use]
    pub const fn bound(&self) -> Duration {
        self.bound
    }

    /// Whether the deadline has no end.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.deadline.is_none()
    }

    /// Check if the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Remaining time, or `None` when unbounded.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// How long to wait before the next check: `interval`, capped by the
    /// remaining time.
    #[must_use]
    pub fn next_wait(&self, interval: Duration) -> Duration {
        self.remaining().map_or(interval, |r| r.min(interval))
    }
}
