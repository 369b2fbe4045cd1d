//! russh-backed SSH transport.
//!
//! [`SshTransport`] performs the handshake with a pinned host key, password
//! authentication, and opens one PTY shell channel, exposed as [`SshShell`].

pub mod channel;
pub mod session;

pub use channel::SshShell;
pub use session::SshTransport;
