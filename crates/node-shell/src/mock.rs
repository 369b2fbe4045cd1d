//! Scripted transport for testing.
//!
//! This module provides a fake node that sessions can connect to without a
//! network. It includes:
//!
//! - [`MockTransport`]: a [`Transport`](crate::backend::Transport) with a
//!   shared handle, so a test can keep a clone to push output, inject
//!   failures and inspect the [`MockCall`] log
//! - [`MockChannel`]: the shell channel it opens
//! - [`Scenario`]: a banner plus canned replies, with a built-in Slicify node
//!
//! # Example
//!
//! ```rust
//! use node_shell::mock::{MockCall, MockTransport};
//! use node_shell::{Credentials, DeploymentConfig, Session};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mock = MockTransport::new()
//!     .with_banner("Welcome\r\nnode:~$ ")
//!     .respond("pwd", "/home/node\r\nnode:~$ ");
//! let config = DeploymentConfig::default()
//!     .prompt("node:~$ ")
//!     .fingerprint(mock.fingerprint());
//!
//! let mut session = Session::new(mock.clone(), config);
//! session.connect(&Credentials::new("node", "secret")).await.unwrap();
//! let out = session.send("pwd").await.unwrap();
//! assert!(out.contains("/home/node"));
//! assert!(mock.calls().contains(&MockCall::OpenShell));
//! # });
//! ```

pub mod scenario;
pub mod transport;

pub use scenario::{Scenario, ScenarioStep};
pub use transport::{MockCall, MockChannel, MockTransport};

/// Create a mock whose shell greets with `prompt` and nothing else.
#[must_use]
pub fn shell_mock(prompt: &str) -> MockTransport {
    MockTransport::new().with_banner(prompt)
}
