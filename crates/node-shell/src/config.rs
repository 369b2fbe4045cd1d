//! Deployment configuration for node-shell.
//!
//! Everything a session needs to know about the remote service is fixed per
//! deployment and injected at construction: where to connect, which host key
//! to trust, what the shell prompt looks like, and how long to wait.
//! [`DeploymentConfig::default`] describes the public Slicify node service.
//! Values can be loaded from a TOML file ([`file`]) and overridden from the
//! environment ([`env`]).

pub mod env;
pub mod file;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{HostFingerprint, Target};
use crate::scanner::ScanMode;

/// Default node service host.
pub const DEFAULT_HOST: &str = "www.slicify.com";

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// Pinned host key fingerprint of the default node service.
pub const DEFAULT_FINGERPRINT: HostFingerprint = HostFingerprint::Md5([
    0xe9, 0x5d, 0x51, 0x34, 0xec, 0x8d, 0x96, 0x6d, 0x1f, 0x70, 0x94, 0xa3, 0xad, 0xef, 0x0e, 0x09,
]);

/// Shell prompt printed by the default node image.
pub const DEFAULT_PROMPT: &str = "slicify@slicify:~";

/// Default bound for expect operations.
pub const DEFAULT_EXPECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound for the greeting prompt after login.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default bound for the SSH handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// How often a waiting expect re-checks liveness and its deadline.
pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_millis(50);

/// Default TERM requested for the shell PTY.
pub const DEFAULT_TERM: &str = "xterm";

/// Timeout value meaning "wait until matched or disconnected".
pub const UNBOUNDED: Duration = Duration::ZERO;

/// Fixed configuration of one node deployment.
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    /// Host to connect to.
    pub host: String,

    /// SSH port.
    pub port: u16,

    /// The only host key the session will accept.
    pub fingerprint: HostFingerprint,

    /// Literal the shell prints when ready for a command.
    pub prompt: String,

    /// Terminator appended to each command.
    pub line_ending: LineEnding,

    /// Mismatch recovery of the literal scanner.
    pub scan_mode: ScanMode,

    /// Bound for transport connect and authentication.
    pub handshake_timeout: Duration,

    /// Bound for the greeting prompt after the shell opens.
    pub connect_timeout: Duration,

    /// Default bound for expect and send; [`UNBOUNDED`] waits forever.
    pub expect_timeout: Duration,

    /// Interval between liveness checks while waiting for output.
    pub liveness_interval: Duration,

    /// Echo consumed output to stdout.
    pub echo: bool,

    /// Terminal settings for the PTY request.
    pub terminal: TerminalConfig,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            fingerprint: DEFAULT_FINGERPRINT,
            prompt: DEFAULT_PROMPT.to_string(),
            line_ending: LineEnding::default(),
            scan_mode: ScanMode::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            expect_timeout: DEFAULT_EXPECT_TIMEOUT,
            liveness_interval: DEFAULT_LIVENESS_INTERVAL,
            echo: false,
            terminal: TerminalConfig::default(),
        }
    }
}

impl DeploymentConfig {
    /// Create a configuration for a host, keeping the other defaults.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Set the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Pin the host key fingerprint.
    #[must_use]
    pub const fn fingerprint(mut self, fingerprint: HostFingerprint) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    /// Set the prompt literal.
    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set the line ending appended to commands.
    #[must_use]
    pub const fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Set the scanner mode.
    #[must_use]
    pub const fn scan_mode(mut self, mode: ScanMode) -> Self {
        self.scan_mode = mode;
        self
    }

    /// Set the handshake timeout.
    #[must_use]
    pub const fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the greeting prompt timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the default expect timeout.
    #[must_use]
    pub const fn expect_timeout(mut self, timeout: Duration) -> Self {
        self.expect_timeout = timeout;
        self
    }

    /// Set the liveness check interval.
    #[must_use]
    pub const fn liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness_interval = interval;
        self
    }

    /// Set whether consumed output is echoed to stdout.
    #[must_use]
    pub const fn echo(mut self, enabled: bool) -> Self {
        self.echo = enabled;
        self
    }

    /// Set the terminal settings.
    #[must_use]
    pub fn terminal(mut self, terminal: TerminalConfig) -> Self {
        self.terminal = terminal;
        self
    }

    /// The connection target.
    #[must_use]
    pub fn target(&self) -> Target {
        Target::new(self.host.clone(), self.port)
    }

    /// Check the configuration for values the session cannot work with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::ShellError;

        if self.host.trim().is_empty() {
            return Err(ShellError::config("host must not be empty"));
        }
        if self.prompt.is_empty() {
            return Err(ShellError::config("prompt must not be empty"));
        }
        if self.liveness_interval.is_zero() {
            return Err(ShellError::config("liveness interval must be positive"));
        }
        Ok(())
    }
}

/// Terminal settings requested for the remote shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalConfig {
    /// TERM value.
    pub term: String,
    /// Columns.
    pub cols: u16,
    /// Rows.
    pub rows: u16,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            term: DEFAULT_TERM.to_string(),
            cols: 80,
            rows: 24,
        }
    }
}

/// Line ending styles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// Unix-style line ending (LF).
    #[default]
    Lf,

    /// Windows-style line ending (CRLF).
    CrLf,

    /// Carriage return only (CR).
    Cr,
}

impl LineEnding {
    /// Get the line ending as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// Get the line ending as bytes.
    #[must_use]
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Lf => b"\n",
            Self::CrLf => b"\r\n",
            Self::Cr => b"\r",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_describes_slicify_service() {
        let config = DeploymentConfig::default();
        assert_eq!(config.target().address(), "www.slicify.com:22");
        assert_eq!(config.prompt, "slicify@slicify:~");
        assert_eq!(
            config.fingerprint.to_string(),
            "e9:5d:51:34:ec:8d:96:6d:1f:70:94:a3:ad:ef:0e:09"
        );
        assert_eq!(config.scan_mode, ScanMode::Naive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_setters() {
        let config = DeploymentConfig::new("node.example")
            .port(2222)
            .prompt("$ ")
            .line_ending(LineEnding::CrLf)
            .expect_timeout(UNBOUNDED)
            .echo(true);

        assert_eq!(config.target(), Target::new("node.example", 2222));
        assert_eq!(config.prompt, "$ ");
        assert_eq!(config.line_ending.as_bytes(), b"\r\n");
        assert!(config.expect_timeout.is_zero());
        assert!(config.echo);
    }

    #[test]
    fn validate_rejects_empty_prompt() {
        let config = DeploymentConfig::default().prompt("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn line_ending_as_str() {
        assert_eq!(LineEnding::Lf.as_str(), "\n");
        assert_eq!(LineEnding::CrLf.as_str(), "\r\n");
        assert_eq!(LineEnding::Cr.as_str(), "\r");
    }
}
