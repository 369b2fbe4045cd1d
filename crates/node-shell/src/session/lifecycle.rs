//! Session lifecycle states.

use std::fmt;

/// Externally visible state of a session.
///
/// ```text
/// Disconnected --connect--> Connecting --shell opened--> Ready
///       |                        |                         |
///       |                        +--failure--+             +--disconnect / loss--+
///       |                                    v                                   v
///       +------------------------------->  Terminal  <---------------------------+
/// ```
///
/// A `Terminal` session is never usable again; create a new one to reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, not yet connected.
    Disconnected,
    /// Handshake, authentication or shell opening in progress.
    Connecting,
    /// Shell channel open; commands may be sent.
    Ready,
    /// Disconnected, failed to connect, or lost the connection.
    Terminal,
}

impl SessionState {
    /// Get the state name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Terminal => "terminal",
        }
    }

    /// Whether the session can never be used again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Internal state; the shell channel exists only while ready.
#[derive(Debug)]
pub(crate) enum Phase<C> {
    Disconnected,
    Connecting,
    Ready(C),
    Terminal,
}

impl<C> Phase<C> {
    pub(crate) const fn state(&self) -> SessionState {
        match self {
            Self::Disconnected => SessionState::Disconnected,
            Self::Connecting => SessionState::Connecting,
            Self::Ready(_) => SessionState::Ready,
            Self::Terminal => SessionState::Terminal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_maps_to_state() {
        assert_eq!(Phase::<()>::Disconnected.state(), SessionState::Disconnected);
        assert_eq!(Phase::Ready(()).state(), SessionState::Ready);
        assert!(Phase::<()>::Terminal.state().is_terminal());
    }

    #[test]
    fn state_display() {
        assert_eq!(SessionState::Connecting.to_string(), "connecting");
        assert_eq!(SessionState::Ready.to_string(), "ready");
    }
}
