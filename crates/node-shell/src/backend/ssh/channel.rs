//! The interactive shell channel.

use std::collections::VecDeque;
use std::io;

use russh::ChannelMsg;
use russh::client::Msg;

use crate::backend::ShellChannel;

/// SSH channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Open and ready.
    Open,
    /// End of file received.
    Eof,
    /// Closed.
    Closed,
}

/// A PTY shell running on a russh session channel.
pub struct SshShell {
    /// The underlying russh channel.
    channel: russh::Channel<Msg>,
    /// Current state.
    state: ChannelState,
    /// Bytes received but not yet consumed.
    read_buffer: VecDeque<u8>,
    /// Exit status when received.
    exit_status: Option<u32>,
}

impl std::fmt::Debug for SshShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshShell")
            .field("state", &self.state)
            .field("buffered", &self.read_buffer.len())
            .field("exit_status", &self.exit_status)
            .finish_non_exhaustive()
    }
}

impl SshShell {
    pub(crate) fn new(channel: russh::Channel<Msg>) -> Self {
        Self {
            channel,
            state: ChannelState::Open,
            read_buffer: VecDeque::new(),
            exit_status: None,
        }
    }

    /// Get current state.
    #[must_use]
    pub const fn state(&self) -> ChannelState {
        self.state
    }

    /// Exit status reported by the remote shell, if any.
    #[must_use]
    pub const fn exit_status(&self) -> Option<u32> {
        self.exit_status
    }

    /// Apply one channel message. Returns `false` once no more data can arrive.
    fn absorb(&mut self, msg: Option<ChannelMsg>) -> bool {
        match msg {
            Some(ChannelMsg::Data { data }) => {
                self.read_buffer.extend(data.iter());
            }
            // ext 1 is stderr; a PTY shell interleaves it with stdout.
            Some(ChannelMsg::ExtendedData { data, ext: 1 }) => {
                self.read_buffer.extend(data.iter());
            }
            Some(ChannelMsg::ExitStatus { exit_status }) => {
                tracing::debug!(exit_status, "Remote shell exited");
                self.exit_status = Some(exit_status);
            }
            Some(ChannelMsg::Eof) => {
                self.state = ChannelState::Eof;
            }
            Some(ChannelMsg::Close) | None => {
                self.state = ChannelState::Closed;
                return false;
            }
            Some(_) => {}
        }
        self.state == ChannelState::Open || !self.read_buffer.is_empty()
    }
}

impl ShellChannel for SshShell {
    fn available(&self) -> usize {
        self.read_buffer.len()
    }

    async fn read_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            if let Some(byte) = self.read_buffer.pop_front() {
                return Ok(Some(byte));
            }
            if self.state != ChannelState::Open {
                return Ok(None);
            }
            // The receive is cancel safe; buffer state only changes after it completes.
            let msg = self.channel.wait().await;
            if !self.absorb(msg) && self.read_buffer.is_empty() {
                return Ok(None);
            }
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        if self.state == ChannelState::Closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "channel closed"));
        }
        self.channel
            .data(data)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e.to_string()))
    }

    async fn flush(&mut self) -> io::Result<()> {
        // russh hands each data call to the session immediately.
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state != ChannelState::Closed
    }

    async fn close(&mut self) -> io::Result<()> {
        if self.state == ChannelState::Closed {
            return Ok(());
        }
        self.state = ChannelState::Closed;
        if let Err(e) = self.channel.eof().await {
            tracing::debug!(error = %e, "EOF not delivered before close");
        }
        self.channel
            .close()
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e.to_string()))
    }
}
