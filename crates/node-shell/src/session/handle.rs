//! The interactive session engine.

use std::future::Future;
use std::time::Duration;

use super::lifecycle::{Phase, SessionState};
use super::options::{ExpectTarget, Expectation, SendOptions};
use crate::backend::{Credentials, ShellChannel, Transport};
use crate::config::DeploymentConfig;
use crate::error::{Result, ShellError};
use crate::scanner::LiteralScanner;
use crate::transcript::{EchoSink, Transcript};
use crate::util::{Deadline, EscapedBytes, TimeoutExt};

/// How one expect loop ended.
enum Outcome {
    Matched,
    TimedOut,
    Lost(String),
}

/// A shell session on a remote node.
///
/// The session owns its transport and, once connected, the single shell
/// channel. All operations take `&mut self`, so at most one expect is in
/// flight at any time.
pub struct Session<T: Transport> {
    /// The connection.
    transport: T,
    /// Deployment settings.
    config: DeploymentConfig,
    /// Lifecycle state; holds the channel while ready.
    phase: Phase<T::Channel>,
    /// Observer for consumed output.
    echo: Option<EchoSink>,
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("state", &self.phase.state())
            .field("echo", &self.echo.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Session<T> {
    /// Create a session over `transport` for the given deployment.
    ///
    /// Nothing is sent until [`connect`](Self::connect).
    #[must_use]
    pub fn new(transport: T, config: DeploymentConfig) -> Self {
        let echo = config.echo.then(EchoSink::stdout);
        Self {
            transport,
            config,
            phase: Phase::Disconnected,
            echo,
        }
    }

    /// Get the deployment configuration.
    #[must_use]
    pub const fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    /// Get the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.phase.state()
    }

    /// Whether the session is ready and both the connection and the shell
    /// channel are still live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        match &self.phase {
            Phase::Ready(channel) => channel.is_open() && self.transport.is_live(),
            _ => false,
        }
    }

    /// Mirror consumed output into `sink`.
    pub fn set_echo(&mut self, sink: EchoSink) {
        self.echo = Some(sink);
    }

    /// Mirror consumed output to stdout.
    pub fn echo_to_stdout(&mut self) {
        self.echo = Some(EchoSink::stdout());
    }

    /// Stop mirroring output.
    pub fn disable_echo(&mut self) {
        self.echo = None;
    }

    /// Whether consumed output is being mirrored.
    #[must_use]
    pub const fn is_echo_enabled(&self) -> bool {
        self.echo.is_some()
    }

    /// Connect, authenticate, open the shell and wait for the first prompt.
    ///
    /// Uses the configured greeting timeout. Returns everything the server
    /// printed up to and including the prompt.
    pub async fn connect(&mut self, credentials: &Credentials) -> Result<Transcript> {
        let timeout = self.config.connect_timeout;
        self.connect_with_timeout(credentials, timeout).await
    }

    /// Like [`connect`](Self::connect) with an explicit bound for the first
    /// prompt. [`Duration::ZERO`] waits until the prompt or disconnection.
    ///
    /// A failed handshake, authentication or shell request leaves the session
    /// terminal. A prompt timeout leaves it ready.
    pub async fn connect_with_timeout(
        &mut self,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Transcript> {
        if !matches!(self.phase, Phase::Disconnected) {
            return Err(self.invalid_state("connect"));
        }
        self.phase = Phase::Connecting;

        let channel = match self.establish(credentials).await {
            Ok(channel) => channel,
            Err(e) => {
                tracing::warn!(host = %self.config.host, error = %e, "Connect failed");
                if let Err(close_err) = self.transport.close().await {
                    tracing::debug!(error = %close_err, "Close after failed connect also failed");
                }
                self.phase = Phase::Terminal;
                return Err(e);
            }
        };
        self.phase = Phase::Ready(channel);

        tracing::info!(
            host = %self.config.host,
            user = %credentials.username,
            "Shell open, waiting for prompt"
        );

        let prompt = Expectation::new(self.config.prompt.clone()).timeout(timeout);
        self.expect(prompt).await
    }

    async fn establish(&mut self, credentials: &Credentials) -> Result<T::Channel> {
        let target = self.config.target();
        let pin = self.config.fingerprint;
        let handshake = self.config.handshake_timeout;

        let key = bounded(handshake, self.transport.connect(&target, &pin), || {
            ShellError::connection(&target.host, target.port, "handshake timed out")
        })
        .await?;

        if !pin.matches(&key) {
            let presented = key.fingerprint(pin.algorithm());
            tracing::error!(
                host = %target.host,
                expected = %pin,
                presented = %presented,
                "Host key does not match pinned fingerprint"
            );
            return Err(ShellError::host_key_mismatch(
                &target.host,
                pin.to_string(),
                presented.to_string(),
            ));
        }
        tracing::debug!(host = %target.host, fingerprint = %pin, "Host key verified");

        bounded(handshake, self.transport.authenticate(credentials), || {
            ShellError::authentication(&credentials.username, "authentication timed out")
        })
        .await?;
        tracing::debug!(user = %credentials.username, "Authenticated");

        self.transport.open_shell().await
    }

    /// Send a command, wait for the prompt and return the output.
    ///
    /// The transcript runs from the echoed command through the first full
    /// prompt, inclusive.
    pub async fn send(&mut self, command: &str) -> Result<Transcript> {
        let transcript = self.send_with(command, SendOptions::default()).await?;
        Ok(transcript.unwrap_or_default())
    }

    /// Send a command with explicit options.
    ///
    /// Returns `None` when nothing was awaited, otherwise the transcript of
    /// the wait (empty when not buffered).
    pub async fn send_with(
        &mut self,
        command: &str,
        options: SendOptions,
    ) -> Result<Option<Transcript>> {
        let mut data = command.as_bytes().to_vec();
        if options.line_ending {
            data.extend_from_slice(self.config.line_ending.as_bytes());
        }
        self.write(&data).await?;

        let literal = match options.expect {
            ExpectTarget::Prompt => self.config.prompt.as_bytes().to_vec(),
            ExpectTarget::Literal(literal) => literal,
            ExpectTarget::Nothing => return Ok(None),
        };
        if literal.is_empty() {
            return Ok(None);
        }

        let expectation = Expectation {
            literal,
            buffer: options.buffer,
            timeout: options.timeout,
        };
        self.expect(expectation).await.map(Some)
    }

    /// Write bytes verbatim: no line ending, no wait.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        self.write(data).await
    }

    /// Wait for the configured prompt, buffered, with the default timeout.
    pub async fn expect_prompt(&mut self) -> Result<Transcript> {
        let prompt = Expectation::new(self.config.prompt.clone());
        self.expect(prompt).await
    }

    /// Consume output until `expectation.literal` has been seen.
    ///
    /// On a match the returned transcript holds every byte read by this call
    /// (empty when not buffering). On timeout the error carries the same
    /// partial transcript and the session stays ready. A read failure, end of
    /// stream or dead connection disconnects the session.
    pub async fn expect(&mut self, expectation: Expectation) -> Result<Transcript> {
        let mut scanner = LiteralScanner::with_mode(expectation.literal, self.config.scan_mode)
            .ok_or(ShellError::EmptyLiteral)?;
        let Phase::Ready(channel) = &mut self.phase else {
            return Err(ShellError::NotConnected);
        };

        let bound = expectation.timeout.unwrap_or(self.config.expect_timeout);
        let interval = self.config.liveness_interval;
        let deadline = Deadline::from_now(bound);
        let mut transcript = Transcript::new();

        tracing::debug!(
            literal = %EscapedBytes(scanner.target()),
            timeout = ?bound,
            buffered = expectation.buffer,
            "Expecting"
        );

        let outcome = loop {
            if deadline.is_expired() {
                break Outcome::TimedOut;
            }
            if !(channel.is_open() && self.transport.is_live()) {
                break Outcome::Lost("connection is no longer live".to_string());
            }

            let read = if channel.available() > 0 {
                channel.read_byte().await
            } else {
                match channel.read_byte().with_timeout(deadline.next_wait(interval)).await {
                    Ok(read) => read,
                    // Timer fired: loop to re-check deadline and liveness.
                    Err(_) => continue,
                }
            };

            match read {
                Ok(Some(byte)) => {
                    tracing::trace!(byte = %EscapedBytes(&[byte]), "read");
                    if expectation.buffer {
                        transcript.push(byte);
                    }
                    if let Some(echo) = self.echo.as_mut() {
                        echo.echo(byte);
                    }
                    if scanner.consume(byte) {
                        break Outcome::Matched;
                    }
                }
                Ok(None) => break Outcome::Lost("end of stream".to_string()),
                Err(e) => break Outcome::Lost(format!("read failed: {e}")),
            }
        };

        if let Some(echo) = self.echo.as_mut() {
            echo.flush();
        }

        match outcome {
            Outcome::Matched => {
                tracing::debug!(bytes = transcript.len(), "Expectation matched");
                Ok(transcript)
            }
            Outcome::TimedOut => {
                let literal = String::from_utf8_lossy(scanner.target()).into_owned();
                tracing::debug!(timeout = ?bound, literal = %literal, "Expectation timed out");
                Err(ShellError::timeout(bound, literal, transcript))
            }
            Outcome::Lost(reason) => {
                self.lose_connection(&reason).await;
                Err(ShellError::connection_lost(reason, transcript))
            }
        }
    }

    /// Close the shell channel and the connection.
    ///
    /// Safe to call in any state and any number of times. The session is
    /// terminal afterwards even if closing reported an error.
    pub async fn disconnect(&mut self) -> Result<()> {
        let phase = std::mem::replace(&mut self.phase, Phase::Terminal);
        let channel = match phase {
            Phase::Disconnected => {
                self.phase = Phase::Disconnected;
                return Ok(());
            }
            Phase::Terminal => return Ok(()),
            Phase::Connecting => None,
            Phase::Ready(channel) => Some(channel),
        };

        let mut first_error = None;
        if let Some(mut channel) = channel {
            if let Err(e) = channel.close().await {
                first_error = Some(ShellError::io_context("closing shell channel", e));
            }
        }
        if let Err(e) = self.transport.close().await {
            if first_error.is_none() {
                first_error = Some(e);
            }
        }

        tracing::info!(host = %self.config.host, "Disconnected");
        first_error.map_or(Ok(()), Err)
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let Phase::Ready(channel) = &mut self.phase else {
            return Err(ShellError::NotConnected);
        };

        tracing::debug!(data = %EscapedBytes(data), "Sending");

        let result = match channel.write_all(data).await {
            Ok(()) => channel.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            let reason = format!("write failed: {e}");
            self.lose_connection(&reason).await;
            return Err(ShellError::connection_lost(reason, Transcript::new()));
        }
        Ok(())
    }

    /// Best-effort teardown after the connection failed mid-session.
    async fn lose_connection(&mut self, reason: &str) {
        tracing::warn!(host = %self.config.host, reason, "Connection lost");
        if let Phase::Ready(mut channel) = std::mem::replace(&mut self.phase, Phase::Terminal) {
            if let Err(e) = channel.close().await {
                tracing::debug!(error = %e, "Channel close failed");
            }
        }
        if let Err(e) = self.transport.close().await {
            tracing::debug!(error = %e, "Transport close failed");
        }
    }

    fn invalid_state(&self, operation: &'static str) -> ShellError {
        ShellError::InvalidState {
            operation,
            state: self.state().to_string(),
        }
    }
}

#[cfg(feature = "ssh")]
impl Session<crate::backend::ssh::SshTransport> {
    /// Create a session over the russh transport.
    #[must_use]
    pub fn ssh(config: DeploymentConfig) -> Self {
        let transport = crate::backend::ssh::SshTransport::from_config(&config);
        Self::new(transport, config)
    }
}

/// Await `future`, failing with `on_elapsed()` after `bound`. A zero bound waits forever.
async fn bounded<R>(
    bound: Duration,
    future: impl Future<Output = Result<R>>,
    on_elapsed: impl FnOnce() -> ShellError,
) -> Result<R> {
    if bound.is_zero() {
        return future.await;
    }
    future
        .with_timeout(bound)
        .await
        .unwrap_or_else(|_| Err(on_elapsed()))
}
