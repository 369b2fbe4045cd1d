//! Per-call options for expect and send.

use std::time::Duration;

/// One wait for a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    /// Bytes to wait for; must not be empty.
    pub literal: Vec<u8>,
    /// Capture the bytes read into the returned transcript.
    pub buffer: bool,
    /// Bound for this wait. `None` uses the configured default;
    /// `Some(Duration::ZERO)` waits until matched or disconnected.
    pub timeout: Option<Duration>,
}

impl Expectation {
    /// Wait for `literal`, buffering, with the default timeout.
    #[must_use]
    pub fn new(literal: impl Into<Vec<u8>>) -> Self {
        Self {
            literal: literal.into(),
            buffer: true,
            timeout: None,
        }
    }

    /// Set whether output is captured.
    #[must_use]
    pub const fn buffered(mut self, buffer: bool) -> Self {
        self.buffer = buffer;
        self
    }

    /// Bound this wait.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wait until matched or disconnected.
    #[must_use]
    pub const fn unbounded(self) -> Self {
        self.timeout(Duration::ZERO)
    }
}

/// What to wait for after sending a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExpectTarget {
    /// The configured shell prompt.
    #[default]
    Prompt,
    /// A specific literal. An empty literal means no expectation.
    Literal(Vec<u8>),
    /// Return as soon as the command is written.
    Nothing,
}

/// Options for [`Session::send_with`](crate::Session::send_with).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    /// What to wait for after writing.
    pub expect: ExpectTarget,
    /// Append the configured line ending.
    pub line_ending: bool,
    /// Capture the output into the returned transcript.
    pub buffer: bool,
    /// Bound for the wait; `None` uses the configured default.
    pub timeout: Option<Duration>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            expect: ExpectTarget::Prompt,
            line_ending: true,
            buffer: true,
            timeout: None,
        }
    }
}

impl SendOptions {
    /// Default options: wait for the prompt, buffered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for a literal instead of the prompt.
    #[must_use]
    pub fn expect(mut self, literal: impl Into<Vec<u8>>) -> Self {
        self.expect = ExpectTarget::Literal(literal.into());
        self
    }

    /// Do not wait after writing.
    #[must_use]
    pub fn no_expect(mut self) -> Self {
        self.expect = ExpectTarget::Nothing;
        self
    }

    /// Do not append the line ending.
    #[must_use]
    pub const fn no_line_ending(mut self) -> Self {
        self.line_ending = false;
        self
    }

    /// Set whether output is captured.
    #[must_use]
    pub const fn buffered(mut self, buffer: bool) -> Self {
        self.buffer = buffer;
        self
    }

    /// Bound the wait.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
