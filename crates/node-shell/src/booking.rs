//! Booking service interface.
//!
//! A node is reserved through a booking service before a session can log in.
//! The service reports the booking's status and issues a one-time login
//! password. This module defines the interface a booking client implements,
//! plus helpers that wait for a booking to become ready and assemble
//! session [`Credentials`].
//!
//! ```ignore
//! use node_shell::booking::{self, PollPolicy};
//!
//! booking::wait_ready(&client, booking_id, &PollPolicy::default()).await?;
//! let credentials = booking::credentials_for(&client, "slicify", booking_id).await?;
//! session.connect(&credentials).await?;
//! ```

pub mod poll;

use std::fmt;
use std::future::Future;

pub use poll::{DEFAULT_POLL_INTERVAL, PollPolicy, PollState};

use crate::backend::Credentials;
use crate::error::{Result, ShellError};

/// Remote booking operations.
///
/// Implementations report service failures as [`ShellError::Booking`].
pub trait BookingService: Send + Sync {
    /// Raw status text of a booking (`"Ready"` once the node is usable).
    fn booking_status(&self, id: i64) -> impl Future<Output = Result<String>> + Send;

    /// One-time SSH login password for a booking.
    fn booking_password(&self, id: i64) -> impl Future<Output = Result<String>> + Send;

    /// Root password of the booked node.
    fn sudo_password(&self, id: i64) -> impl Future<Output = Result<String>> + Send;

    /// Why a booking was closed, if the service can say.
    fn close_reason(&self, id: i64) -> impl Future<Output = Result<Option<String>>> + Send {
        let _ = id;
        async { Ok(None) }
    }
}

/// Parsed booking status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingStatus {
    /// The node is ready for login.
    Ready,
    /// The booking ended or could not be fulfilled.
    Closed,
    /// Any other status, such as provisioning.
    Other(String),
}

impl BookingStatus {
    /// Parse the status text reported by the service.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text.trim() {
            "Ready" => Self::Ready,
            "Closed" => Self::Closed,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether polling can stop.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Ready | Self::Closed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("Ready"),
            Self::Closed => f.write_str("Closed"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

fn check_id(id: i64) -> Result<()> {
    if id < 0 {
        return Err(ShellError::invalid_argument(
            "booking id",
            format!("{id} is negative"),
        ));
    }
    Ok(())
}

/// Poll until booking `id` is ready.
///
/// Fails with [`ShellError::Booking`] when the booking is closed or when
/// `policy` runs out of polls first.
pub async fn wait_ready<S: BookingService>(service: &S, id: i64, policy: &PollPolicy) -> Result<()> {
    check_id(id)?;
    let mut state = PollState::new(policy.clone());

    loop {
        let text = service.booking_status(id).await?;
        match BookingStatus::parse(&text) {
            BookingStatus::Ready => {
                tracing::info!(booking = id, polls = state.attempt() + 1, "Booking ready");
                return Ok(());
            }
            BookingStatus::Closed => {
                let reason = match service.close_reason(id).await {
                    Ok(reason) => reason,
                    Err(e) => {
                        tracing::debug!(booking = id, error = %e, "Close reason unavailable");
                        None
                    }
                };
                tracing::warn!(booking = id, reason = ?reason, "Booking closed");
                return Err(ShellError::booking(match reason {
                    Some(reason) => format!("{} ({reason})", text.trim()),
                    None => text.trim().to_string(),
                }));
            }
            BookingStatus::Other(status) => {
                tracing::debug!(booking = id, status = %status, "Booking not ready");
            }
        }

        let Some(delay) = state.next_delay() else {
            return Err(ShellError::booking(format!(
                "booking {id} not ready after {} polls, last status '{}'",
                state.attempt() + 1,
                text.trim()
            )));
        };
        state.record_attempt();
        tokio::time::sleep(delay).await;
    }
}

/// Fetch the login password for booking `id` and build session credentials.
pub async fn credentials_for<S: BookingService>(
    service: &S,
    username: impl Into<String>,
    id: i64,
) -> Result<Credentials> {
    check_id(id)?;
    let password = service.booking_password(id).await?;
    Ok(Credentials::new(username, password.trim()))
}
