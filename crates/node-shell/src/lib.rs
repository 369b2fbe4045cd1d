//! node-shell: Expect-style shell sessions on provisioned compute nodes
//!
//! This crate drives an interactive shell on a remote node over SSH: it
//! connects with a pinned host key, sends commands, and waits until the shell
//! has printed an expected literal before the caller proceeds.
//!
//! # Features
//!
//! - **Async-first design** with Tokio runtime
//! - **Pinned host identity** (`SHA256:` or legacy MD5 fingerprints)
//! - **Incremental literal matching** that never buffers beyond the current call
//! - **Bounded or unbounded waits** with liveness checks
//! - **SSH backend** via russh (feature: `ssh`)
//! - **Mock backend** for testing (feature: `mock`)
//!
//! # Example
//!
//! ```ignore
//! use node_shell::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = DeploymentConfig::default().with_env_overrides()?;
//!     let mut session = Session::ssh(config);
//!
//!     session.connect(&Credentials::new("slicify", "one-time-password")).await?;
//!     let out = session.send("uname -a").await?;
//!     println!("{out}");
//!     session.disconnect().await
//! }
//! ```

pub mod backend;
pub mod booking;
pub mod config;
pub mod error;
pub mod prelude;
pub mod scanner;
pub mod session;
pub mod transcript;
pub mod util;

/// Mock backend for testing.
#[cfg(feature = "mock")]
pub mod mock;

pub use backend::{
    Credentials, FingerprintAlgorithm, HostFingerprint, HostKey, ShellChannel, Target, Transport,
};
#[cfg(feature = "ssh")]
pub use backend::ssh::{SshShell, SshTransport};
pub use booking::{BookingService, BookingStatus, PollPolicy};
pub use config::{DeploymentConfig, LineEnding, TerminalConfig};
pub use error::{Result, ShellError};
#[cfg(feature = "mock")]
pub use mock::{MockCall, MockTransport, Scenario};
pub use scanner::{LiteralScanner, ScanMode};
pub use session::{ExpectTarget, Expectation, SendOptions, Session, SessionState};
pub use transcript::{EchoSink, Transcript};
