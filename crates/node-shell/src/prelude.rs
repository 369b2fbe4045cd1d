//! Convenient re-exports for common node-shell usage.
//!
//! ```ignore
//! use node_shell::prelude::*;
//! ```

pub use crate::backend::{Credentials, HostFingerprint, ShellChannel, Transport};
pub use crate::booking::{BookingService, PollPolicy};
pub use crate::config::{DeploymentConfig, LineEnding};
pub use crate::error::{Result, ShellError};
pub use crate::scanner::ScanMode;
pub use crate::session::{Expectation, SendOptions, Session, SessionState};
pub use crate::transcript::Transcript;

#[cfg(feature = "ssh")]
pub use crate::backend::ssh::SshTransport;

#[cfg(feature = "mock")]
pub use crate::mock::MockTransport;
