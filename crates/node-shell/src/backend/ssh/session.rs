//! SSH connection with a pinned host key.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use russh::client;
use russh::keys::PublicKey;

use super::channel::SshShell;
use crate::backend::{Credentials, HostFingerprint, HostKey, Target, Transport};
use crate::config::{DEFAULT_HANDSHAKE_TIMEOUT, DeploymentConfig, TerminalConfig};
use crate::error::{Result, ShellError};

/// Slot the handler fills with the key the server presented.
type PresentedKey = Arc<Mutex<Option<HostKey>>>;

/// Client handler that accepts exactly one host key.
struct PinnedKeyHandler {
    host: String,
    pin: HostFingerprint,
    presented: PresentedKey,
}

impl client::Handler for PinnedKeyHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let Ok(blob) = server_public_key.to_bytes() else {
            tracing::warn!(host = %self.host, "Server host key could not be encoded, rejecting");
            return Ok(false);
        };
        let key = HostKey::from_blob(blob);
        let accepted = self.pin.matches(&key);

        if accepted {
            tracing::debug!(host = %self.host, fingerprint = %self.pin, "Host key matches pin");
        } else {
            tracing::warn!(
                host = %self.host,
                expected = %self.pin,
                presented = %key.fingerprint(self.pin.algorithm()),
                "Rejecting host key that does not match pin"
            );
        }

        *self
            .presented
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(key);
        Ok(accepted)
    }
}

/// Transport over a russh client connection.
pub struct SshTransport {
    terminal: TerminalConfig,
    handshake_timeout: Duration,
    target: Option<Target>,
    username: Option<String>,
    handle: Option<client::Handle<PinnedKeyHandler>>,
}

impl std::fmt::Debug for SshTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshTransport")
            .field("target", &self.target)
            .field("terminal", &self.terminal)
            .field("connected", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for SshTransport {
    fn default() -> Self {
        Self::new(TerminalConfig::default(), DEFAULT_HANDSHAKE_TIMEOUT)
    }
}

impl SshTransport {
    /// Create a transport that requests the given PTY and bounds the handshake.
    #[must_use]
    pub const fn new(terminal: TerminalConfig, handshake_timeout: Duration) -> Self {
        Self {
            terminal,
            handshake_timeout,
            target: None,
            username: None,
            handle: None,
        }
    }

    /// Create a transport from the PTY and handshake settings of a deployment.
    #[must_use]
    pub fn from_config(config: &DeploymentConfig) -> Self {
        Self::new(config.terminal.clone(), config.handshake_timeout)
    }

    fn handle(&self) -> Result<&client::Handle<PinnedKeyHandler>> {
        self.handle.as_ref().ok_or(ShellError::NotConnected)
    }

    /// Handshake bound for tokio; zero means unbounded.
    fn handshake_bound(&self) -> Duration {
        if self.handshake_timeout.is_zero() {
            Duration::MAX
        } else {
            self.handshake_timeout
        }
    }

    fn target_parts(&self) -> (String, u16) {
        self.target
            .as_ref()
            .map_or_else(|| (String::new(), 0), |t| (t.host.clone(), t.port))
    }
}

impl Transport for SshTransport {
    type Channel = SshShell;

    async fn connect(&mut self, target: &Target, pin: &HostFingerprint) -> Result<HostKey> {
        let presented: PresentedKey = Arc::new(Mutex::new(None));
        let handler = PinnedKeyHandler {
            host: target.host.clone(),
            pin: *pin,
            presented: Arc::clone(&presented),
        };
        let ssh_config = Arc::new(client::Config::default());

        tracing::info!(host = %target.host, port = target.port, "Connecting to node");

        let connected = tokio::time::timeout(
            self.handshake_bound(),
            client::connect(ssh_config, (target.host.as_str(), target.port), handler),
        )
        .await
        .map_err(|_| {
            ShellError::connection(
                &target.host,
                target.port,
                format!("handshake timed out after {:?}", self.handshake_timeout),
            )
        })?;

        let presented = presented
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let handle = match connected {
            Ok(handle) => handle,
            Err(e) => {
                return Err(match presented {
                    Some(key) if !pin.matches(&key) => ShellError::host_key_mismatch(
                        &target.host,
                        pin.to_string(),
                        key.fingerprint(pin.algorithm()).to_string(),
                    ),
                    _ => ShellError::connection(&target.host, target.port, e.to_string()),
                });
            }
        };

        let key = presented.ok_or_else(|| {
            ShellError::connection(&target.host, target.port, "server presented no host key")
        })?;

        self.target = Some(target.clone());
        self.handle = Some(handle);
        Ok(key)
    }

    async fn authenticate(&mut self, credentials: &Credentials) -> Result<()> {
        let bound = self.handshake_bound();
        let handle = self
            .handle
            .as_mut()
            .ok_or(ShellError::NotConnected)?;

        tracing::debug!(user = %credentials.username, "Attempting password authentication");

        let result = tokio::time::timeout(
            bound,
            handle.authenticate_password(&credentials.username, &credentials.password),
        )
        .await
        .map_err(|_| ShellError::authentication(&credentials.username, "authentication timed out"))?
        .map_err(|e| ShellError::authentication(&credentials.username, e.to_string()))?;

        if !result.success() {
            return Err(ShellError::authentication(
                &credentials.username,
                "password rejected",
            ));
        }

        tracing::info!(user = %credentials.username, "Password authentication successful");
        self.username = Some(credentials.username.clone());
        Ok(())
    }

    async fn open_shell(&mut self) -> Result<SshShell> {
        let (host, port) = self.target_parts();
        let channel = self
            .handle()?
            .channel_open_session()
            .await
            .map_err(|e| ShellError::connection(&host, port, format!("channel open failed: {e}")))?;

        channel
            .request_pty(
                false,
                &self.terminal.term,
                self.terminal.cols.into(),
                self.terminal.rows.into(),
                0,
                0,
                &[],
            )
            .await
            .map_err(|e| ShellError::connection(&host, port, format!("PTY request failed: {e}")))?;

        channel
            .request_shell(false)
            .await
            .map_err(|e| ShellError::connection(&host, port, format!("shell request failed: {e}")))?;

        tracing::debug!(
            host = %host,
            user = ?self.username,
            term = %self.terminal.term,
            "Interactive shell opened"
        );
        Ok(SshShell::new(channel))
    }

    fn is_live(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_closed())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle
                .disconnect(russh::Disconnect::ByApplication, "", "en")
                .await
            {
                tracing::debug!(error = %e, "Disconnect message not delivered");
            }
            tracing::info!(node = ?self.target, "SSH connection closed");
        }
        Ok(())
    }
}
