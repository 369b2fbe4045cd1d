//! Transport backends for node sessions.
//!
//! The session engine talks to the remote side only through the two traits
//! in this module: a [`Transport`] owns the authenticated connection and
//! opens one [`ShellChannel`], which carries the shell's byte stream.
//! The russh-backed implementation lives in [`ssh`]; tests use the scripted
//! transport from `crate::mock`.

pub mod auth;

#[cfg(feature = "ssh")]
pub mod ssh;

use std::future::Future;
use std::io;

pub use auth::{Credentials, FingerprintAlgorithm, HostFingerprint, HostKey};

use crate::error::Result;

/// Where to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Target {
    /// Create a target.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Get the address string.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// An authenticated connection that can open a shell.
///
/// Calls arrive in a fixed order: `connect`, `authenticate`, `open_shell`,
/// then any number of `is_live` probes, and finally `close`.
pub trait Transport: Send {
    /// The shell channel type this transport opens.
    type Channel: ShellChannel;

    /// Establish the secure transport and return the host key the server
    /// presented.
    ///
    /// Implementations must refuse a key that does not match `pin` during the
    /// handshake, before any credentials can be sent.
    fn connect(
        &mut self,
        target: &Target,
        pin: &HostFingerprint,
    ) -> impl Future<Output = Result<HostKey>> + Send;

    /// Authenticate with username and password.
    fn authenticate(
        &mut self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Open the single interactive shell channel.
    fn open_shell(&mut self) -> impl Future<Output = Result<Self::Channel>> + Send;

    /// Whether the underlying connection still considers itself open.
    fn is_live(&self) -> bool;

    /// Close the connection. Closing an already closed connection succeeds.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// The byte stream of an interactive shell.
pub trait ShellChannel: Send {
    /// Number of bytes that can be read without waiting.
    fn available(&self) -> usize;

    /// Read exactly one byte, waiting until one arrives.
    ///
    /// Returns `Ok(None)` at end of stream. Must be cancel safe: dropping the
    /// future before it completes loses no data.
    fn read_byte(&mut self) -> impl Future<Output = io::Result<Option<u8>>> + Send;

    /// Write all bytes to the remote shell.
    fn write_all(&mut self, data: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Flush pending writes.
    fn flush(&mut self) -> impl Future<Output = io::Result<()>> + Send;

    /// Whether the channel is still open.
    fn is_open(&self) -> bool;

    /// Close the channel. Closing an already closed channel succeeds.
    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_address() {
        assert_eq!(Target::new("www.slicify.com", 22).address(), "www.slicify.com:22");
    }
}
