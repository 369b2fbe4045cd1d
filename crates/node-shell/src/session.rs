//! Session module for interactive node shells.
//!
//! # Overview
//!
//! The [`Session`] type is the main entry point. It provides methods for:
//!
//! - Connecting with a pinned host key via [`Session::connect`]
//! - Running commands with [`Session::send`] and [`Session::send_with`]
//! - Waiting for literals with [`Session::expect`]
//! - Tearing down with [`Session::disconnect`]
//!
//! # Examples
//!
//! ```ignore
//! use node_shell::{Credentials, DeploymentConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), node_shell::ShellError> {
//!     let mut session = Session::ssh(DeploymentConfig::default());
//!     let greeting = session
//!         .connect(&Credentials::new("slicify", "one-time-password"))
//!         .await?;
//!     println!("{greeting}");
//!
//!     let listing = session.send("ls -la").await?;
//!     println!("{listing}");
//!
//!     session.disconnect().await
//! }
//! ```
//!
//! ## Custom expectations
//!
//! ```ignore
//! use node_shell::{Expectation, SendOptions};
//! use std::time::Duration;
//!
//! // Wait up to five minutes for a long build, without capturing output.
//! session
//!     .send_with(
//!         "make -j8 && echo BUILD-DONE",
//!         SendOptions::new()
//!             .expect("BUILD-DONE")
//!             .buffered(false)
//!             .timeout(Duration::from_secs(300)),
//!     )
//!     .await?;
//!
//! // Answer an interactive prompt, then wait for the shell again.
//! session.send_with("sudo -k true", SendOptions::new().expect("password")).await?;
//! session.send("hunter2").await?;
//!
//! // Wait forever for a marker.
//! session.expect(Expectation::new("READY").unbounded()).await?;
//! ```

mod handle;
mod lifecycle;
mod options;

pub use handle::Session;
pub use lifecycle::SessionState;
pub use options::{ExpectTarget, Expectation, SendOptions};
