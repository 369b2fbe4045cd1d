//! Transcripts and echo observers.
//!
//! A [`Transcript`] holds the bytes read by a single expect call when the
//! caller asked for buffering. An [`EchoSink`] mirrors every consumed byte
//! to an observer, independently of buffering.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};

/// The ordered bytes read during one expect call.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    bytes: Vec<u8>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Append one consumed byte.
    pub fn push(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    /// Raw transcript bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the transcript, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of bytes captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// View the transcript as text, replacing invalid UTF-8.
    #[must_use]
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Check whether the transcript contains `needle` as text.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.to_string_lossy().contains(needle)
    }

    /// Check whether the transcript ends with the given bytes.
    #[must_use]
    pub fn ends_with(&self, suffix: &[u8]) -> bool {
        self.bytes.ends_with(suffix)
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transcript")
            .field(&self.to_string_lossy())
            .finish()
    }
}

impl From<Vec<u8>> for Transcript {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl From<&[u8]> for Transcript {
    fn from(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }
}

impl From<&str> for Transcript {
    fn from(s: &str) -> Self {
        Self::from(s.as_bytes())
    }
}

impl From<String> for Transcript {
    fn from(s: String) -> Self {
        Self::from(s.into_bytes())
    }
}

/// Observer that receives a copy of every byte the session consumes.
pub struct EchoSink {
    out: Box<dyn Write + Send>,
    failed: bool,
}

impl EchoSink {
    /// Echo into an arbitrary writer.
    #[must_use]
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Box::new(out),
            failed: false,
        }
    }

    /// Echo to the process standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Mirror one byte. Lines are flushed as they complete.
    ///
    /// A failing observer never interrupts the session; the first failure is
    /// logged and later bytes are dropped.
    pub fn echo(&mut self, byte: u8) {
        if self.failed {
            return;
        }
        let result = self.out.write_all(&[byte]).and_then(|()| {
            if byte == b'\n' {
                self.out.flush()
            } else {
                Ok(())
            }
        });
        if let Err(e) = result {
            tracing::warn!(error = %e, "Echo observer failed, disabling echo");
            self.failed = true;
        }
    }

    /// Flush any partially echoed line.
    pub fn flush(&mut self) {
        if !self.failed {
            let _ = self.out.flush();
        }
    }
}

impl fmt::Debug for EchoSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EchoSink")
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}
