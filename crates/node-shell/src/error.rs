//! Error types for node-shell.
//!
//! Errors identify whether the session survived: connect-time failures and
//! connection loss leave the session terminal, while a timeout leaves it
//! ready for the next command. Timeout and connection-loss errors carry the
//! transcript captured so far.

use std::time::Duration;

use thiserror::Error;

use crate::transcript::Transcript;

/// Maximum length of transcript content to display in error messages.
const MAX_TRANSCRIPT_DISPLAY: usize = 500;

/// Lines shown from the tail of a long transcript.
const TAIL_LINES: usize = 6;

/// Format transcript content for display, keeping only the tail when large.
fn format_transcript_snippet(transcript: &Transcript) -> String {
    if transcript.is_empty() {
        return "(empty transcript)".to_string();
    }

    let text = transcript.to_string_lossy();
    let len = transcript.len();

    if len <= MAX_TRANSCRIPT_DISPLAY {
        return format!(
            "┌─ transcript ({} bytes) ──────────────────\n│ {}\n└────────────────────────────────────────",
            len,
            text.lines().collect::<Vec<_>>().join("\n│ ")
        );
    }

    let lines: Vec<&str> = text.lines().collect();
    let tail = &lines[lines.len().saturating_sub(TAIL_LINES)..];
    let hidden = lines.len() - tail.len();

    format!(
        "┌─ transcript ({} bytes, {} lines) ─────────\n│ ... ({} lines hidden)\n│ {}\n└────────────────────────────────────────",
        len,
        lines.len(),
        hidden,
        tail.join("\n│ ")
    )
}

fn format_timeout_error(duration: Duration, literal: &str, transcript: &Transcript) -> String {
    format!(
        "timeout after {duration:?} waiting for '{literal}'\n\n{}",
        format_transcript_snippet(transcript)
    )
}

fn format_connection_lost_error(reason: &str, transcript: &Transcript) -> String {
    format!(
        "connection lost: {reason}\n\n{}",
        format_transcript_snippet(transcript)
    )
}

/// The main error type for node-shell operations.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The transport could not be established.
    #[error("failed to connect to {host}:{port}: {reason}")]
    Connection {
        /// The host that could not be connected to.
        host: String,
        /// The port that was used.
        port: u16,
        /// The reason for the failure.
        reason: String,
    },

    /// The server rejected the supplied credentials.
    #[error("authentication failed for user '{user}': {reason}")]
    Authentication {
        /// The user that failed to authenticate.
        user: String,
        /// The reason for the failure.
        reason: String,
    },

    /// The server presented a host key that does not match the pinned fingerprint.
    #[error("host key mismatch for {host}: expected {expected}, server presented {presented}")]
    HostKeyMismatch {
        /// The host whose identity was rejected.
        host: String,
        /// The pinned fingerprint.
        expected: String,
        /// Fingerprint of the key the server presented.
        presented: String,
    },

    /// A read, write or liveness check failed mid-session.
    #[error("{}", format_connection_lost_error(reason, transcript))]
    ConnectionLost {
        /// What went wrong.
        reason: String,
        /// Bytes read by the interrupted call, if it was buffering.
        transcript: Transcript,
    },

    /// The expected literal was not seen within the time bound.
    #[error("{}", format_timeout_error(*duration, literal, transcript))]
    Timeout {
        /// The bound that elapsed.
        duration: Duration,
        /// The literal that was being waited for.
        literal: String,
        /// Bytes read before the bound elapsed (empty when not buffering).
        transcript: Transcript,
    },

    /// An expectation was issued with an empty literal.
    #[error("expected literal must not be empty")]
    EmptyLiteral,

    /// The operation needs a ready session.
    #[error("session is not connected")]
    NotConnected,

    /// The operation is not valid in the current session state.
    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// The state the session was in.
        state: String,
    },

    /// The booking service reported a failure.
    #[error("booking error: {status}")]
    Booking {
        /// Status text reported by the remote side.
        status: String,
    },

    /// A caller-supplied argument is out of range.
    #[error("invalid {name}: {reason}")]
    InvalidArgument {
        /// The argument name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An I/O error occurred with additional context.
    #[error("{context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for node-shell operations.
pub type Result<T> = std::result::Result<T, ShellError>;

impl ShellError {
    /// Create a connection error.
    pub fn connection(host: impl Into<String>, port: u16, reason: impl Into<String>) -> Self {
        Self::Connection {
            host: host.into(),
            port,
            reason: reason.into(),
        }
    }

    /// Create an authentication error.
    pub fn authentication(user: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Authentication {
            user: user.into(),
            reason: reason.into(),
        }
    }

    /// Create a host key mismatch error.
    pub fn host_key_mismatch(
        host: impl Into<String>,
        expected: impl Into<String>,
        presented: impl Into<String>,
    ) -> Self {
        Self::HostKeyMismatch {
            host: host.into(),
            expected: expected.into(),
            presented: presented.into(),
        }
    }

    /// Create a connection-lost error.
    pub fn connection_lost(reason: impl Into<String>, transcript: Transcript) -> Self {
        Self::ConnectionLost {
            reason: reason.into(),
            transcript,
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration: Duration, literal: impl Into<String>, transcript: Transcript) -> Self {
        Self::Timeout {
            duration,
            literal: literal.into(),
            transcript,
        }
    }

    /// Create a booking error.
    pub fn booking(status: impl Into<String>) -> Self {
        Self::Booking {
            status: status.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// Check if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if the connection was lost mid-session.
    #[must_use]
    pub const fn is_connection_lost(&self) -> bool {
        matches!(self, Self::ConnectionLost { .. })
    }

    /// Check if this error leaves the session unusable.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::Authentication { .. }
                | Self::HostKeyMismatch { .. }
                | Self::ConnectionLost { .. }
        )
    }

    /// Get the transcript captured before the failure, if any.
    #[must_use]
    pub const fn transcript(&self) -> Option<&Transcript> {
        match self {
            Self::Timeout { transcript, .. } | Self::ConnectionLost { transcript, .. } => {
                Some(transcript)
            }
            _ => None,
        }
    }
}
