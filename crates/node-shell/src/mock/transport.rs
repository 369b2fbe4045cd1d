//! Mock transport implementation for testing.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::backend::{
    Credentials, FingerprintAlgorithm, HostFingerprint, HostKey, ShellChannel, Target, Transport,
};
use crate::error::{Result, ShellError};

/// One call made against the mock, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `Transport::connect`.
    Connect {
        /// Where the session tried to connect.
        target: Target,
        /// The pin it asked for.
        pin: HostFingerprint,
    },
    /// `Transport::authenticate`.
    Authenticate {
        /// Username presented.
        username: String,
    },
    /// `Transport::open_shell`.
    OpenShell,
    /// `ShellChannel::write_all`.
    Write(Vec<u8>),
    /// `ShellChannel::flush`.
    Flush,
    /// `ShellChannel::close`.
    CloseChannel,
    /// `Transport::close`.
    Close,
}

/// A canned reply: when written input contains `trigger`, queue `reply`.
#[derive(Debug, Clone)]
struct Reply {
    trigger: Vec<u8>,
    reply: Vec<u8>,
}

/// Shared state for the mock transport.
#[derive(Debug)]
struct MockState {
    /// Key presented on connect.
    host_key: HostKey,
    /// Refuse mismatching keys during connect, as a real handshake does.
    enforce_pin: bool,
    /// Output queued when the shell opens.
    banner: Vec<u8>,
    /// Echo written input back, like a PTY.
    echo_input: bool,
    /// Canned replies.
    replies: Vec<Reply>,
    /// Output buffer (data to be read by the session).
    output: VecDeque<u8>,
    /// Everything the session wrote.
    written: Vec<u8>,
    /// Call log.
    calls: Vec<MockCall>,
    /// Error for the next connect.
    connect_error: Option<String>,
    /// Error for the next authenticate.
    auth_error: Option<String>,
    /// Error to return on next read.
    read_error: Option<String>,
    /// Error for every write while set.
    write_error: Option<String>,
    /// Connection considered live.
    live: bool,
    /// Shell channel open.
    channel_open: bool,
    /// End of stream signaled.
    eof: bool,
}

impl MockState {
    fn new() -> Self {
        Self {
            host_key: HostKey::from_blob(b"mock-node-host-key".to_vec()),
            enforce_pin: true,
            banner: Vec::new(),
            echo_input: false,
            replies: Vec::new(),
            output: VecDeque::new(),
            written: Vec::new(),
            calls: Vec::new(),
            connect_error: None,
            auth_error: None,
            read_error: None,
            write_error: None,
            live: false,
            channel_open: false,
            eof: false,
        }
    }
}

/// A scripted node.
///
/// Clones share state: keep one clone in the test and hand the other to the
/// session.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    notify: Arc<Notify>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a mock that accepts any credentials and opens a silent shell.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::new())),
            notify: Arc::new(Notify::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Present `key` on connect.
    #[must_use]
    pub fn with_host_key(self, key: HostKey) -> Self {
        self.lock().host_key = key;
        self
    }

    /// Queue `banner` as the first shell output.
    #[must_use]
    pub fn with_banner(self, banner: impl AsRef<[u8]>) -> Self {
        self.lock().banner = banner.as_ref().to_vec();
        self
    }

    /// Echo written input back into the output, as a PTY does.
    #[must_use]
    pub fn with_echo(self, enabled: bool) -> Self {
        self.lock().echo_input = enabled;
        self
    }

    /// Accept any host key during connect, leaving verification to the caller.
    #[must_use]
    pub fn without_pin_check(self) -> Self {
        self.lock().enforce_pin = false;
        self
    }

    /// Queue `reply` whenever a write contains `trigger`.
    #[must_use]
    pub fn respond(self, trigger: impl AsRef<[u8]>, reply: impl AsRef<[u8]>) -> Self {
        self.lock().replies.push(Reply {
            trigger: trigger.as_ref().to_vec(),
            reply: reply.as_ref().to_vec(),
        });
        self
    }

    /// Fail the next connect.
    #[must_use]
    pub fn fail_connect(self, reason: impl Into<String>) -> Self {
        self.lock().connect_error = Some(reason.into());
        self
    }

    /// Reject the next authentication.
    #[must_use]
    pub fn fail_auth(self, reason: impl Into<String>) -> Self {
        self.lock().auth_error = Some(reason.into());
        self
    }

    /// The SHA-256 pin matching this mock's host key.
    #[must_use]
    pub fn fingerprint(&self) -> HostFingerprint {
        self.lock().host_key.fingerprint(FingerprintAlgorithm::Sha256)
    }

    /// Queue output to be read.
    pub fn push_output(&self, data: impl AsRef<[u8]>) {
        self.lock().output.extend(data.as_ref());
        self.notify.notify_waiters();
    }

    /// Signal end of stream on the shell channel.
    pub fn close_stream(&self) {
        self.lock().eof = true;
        self.notify.notify_waiters();
    }

    /// Make the connection report itself dead.
    pub fn drop_connection(&self) {
        self.lock().live = false;
        self.notify.notify_waiters();
    }

    /// Fail the next read with `reason`.
    pub fn fail_next_read(&self, reason: impl Into<String>) {
        self.lock().read_error = Some(reason.into());
        self.notify.notify_waiters();
    }

    /// Fail every write until cleared with `None`.
    pub fn set_write_error(&self, reason: Option<String>) {
        self.lock().write_error = reason;
    }

    /// The call log so far.
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Everything the session has written.
    #[must_use]
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Written data as a string.
    #[must_use]
    pub fn written_str(&self) -> String {
        String::from_utf8_lossy(&self.written()).into_owned()
    }

    /// Bytes queued but not yet read.
    #[must_use]
    pub fn pending_output(&self) -> usize {
        self.lock().output.len()
    }
}

impl Transport for MockTransport {
    type Channel = MockChannel;

    async fn connect(&mut self, target: &Target, pin: &HostFingerprint) -> Result<HostKey> {
        let mut state = self.lock();
        state.calls.push(MockCall::Connect {
            target: target.clone(),
            pin: *pin,
        });
        if let Some(reason) = state.connect_error.take() {
            return Err(ShellError::connection(&target.host, target.port, reason));
        }
        if state.enforce_pin && !pin.matches(&state.host_key) {
            return Err(ShellError::host_key_mismatch(
                &target.host,
                pin.to_string(),
                state.host_key.fingerprint(pin.algorithm()).to_string(),
            ));
        }
        state.live = true;
        Ok(state.host_key.clone())
    }

    async fn authenticate(&mut self, credentials: &Credentials) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(MockCall::Authenticate {
            username: credentials.username.clone(),
        });
        if !state.live {
            return Err(ShellError::NotConnected);
        }
        match state.auth_error.take() {
            Some(reason) => Err(ShellError::authentication(&credentials.username, reason)),
            None => Ok(()),
        }
    }

    async fn open_shell(&mut self) -> Result<MockChannel> {
        {
            let mut state = self.lock();
            state.calls.push(MockCall::OpenShell);
            if !state.live {
                return Err(ShellError::NotConnected);
            }
            state.channel_open = true;
            let banner = state.banner.clone();
            state.output.extend(banner);
        }
        Ok(MockChannel {
            state: Arc::clone(&self.state),
            notify: Arc::clone(&self.notify),
        })
    }

    fn is_live(&self) -> bool {
        self.lock().live
    }

    async fn close(&mut self) -> Result<()> {
        {
            let mut state = self.lock();
            state.calls.push(MockCall::Close);
            state.live = false;
            state.channel_open = false;
        }
        self.notify.notify_waiters();
        Ok(())
    }
}

/// The shell channel of a [`MockTransport`].
#[derive(Debug)]
pub struct MockChannel {
    state: Arc<Mutex<MockState>>,
    notify: Arc<Notify>,
}

impl MockChannel {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ShellChannel for MockChannel {
    fn available(&self) -> usize {
        self.lock().output.len()
    }

    async fn read_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a push between check and await is not missed.
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(reason) = state.read_error.take() {
                    return Err(io::Error::new(io::ErrorKind::ConnectionReset, reason));
                }
                if let Some(byte) = state.output.pop_front() {
                    return Ok(Some(byte));
                }
                if state.eof || !state.channel_open {
                    return Ok(None);
                }
            }

            notified.await;
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        {
            let mut state = self.lock();
            state.calls.push(MockCall::Write(data.to_vec()));
            if let Some(reason) = &state.write_error {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, reason.clone()));
            }
            if !state.channel_open {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "channel closed"));
            }
            state.written.extend_from_slice(data);
            if state.echo_input {
                state.output.extend(data);
            }
            let replies: Vec<Vec<u8>> = state
                .replies
                .iter()
                .filter(|r| contains(data, &r.trigger))
                .map(|r| r.reply.clone())
                .collect();
            for reply in replies {
                state.output.extend(reply);
            }
        }
        self.notify.notify_waiters();
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.lock().calls.push(MockCall::Flush);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.lock().channel_open
    }

    async fn close(&mut self) -> io::Result<()> {
        {
            let mut state = self.lock();
            state.calls.push(MockCall::CloseChannel);
            state.channel_open = false;
        }
        self.notify.notify_waiters();
        Ok(())
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}
