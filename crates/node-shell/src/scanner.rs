//! Incremental literal scanning.
//!
//! The scanner consumes one byte at a time and reports when the target
//! literal has just been completed. It never buffers the stream.
//!
//! The default [`ScanMode::Naive`] resets its cursor to zero on any mismatch
//! and does not re-test the mismatching byte. On self-overlapping literals it
//! therefore misses some occurrences: scanning `"ababab"` for `"abab"` reports
//! a single match at index 3. Callers rely on this, so it stays the default.
//! [`ScanMode::Overlapping`] is the opt-in failure-function variant that
//! finds every occurrence, including overlapping ones.

use serde::{Deserialize, Serialize};

/// How the scanner recovers from a mismatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Reset to the start of the literal on every mismatch.
    #[default]
    Naive,
    /// Fall back along the literal's own borders (KMP).
    Overlapping,
}

/// Byte-at-a-time suffix matcher for one literal.
#[derive(Debug, Clone)]
pub struct LiteralScanner {
    target: Vec<u8>,
    /// Count of currently matched prefix bytes.
    cursor: usize,
    /// Failure table; present only in overlapping mode.
    borders: Option<Vec<usize>>,
}

impl LiteralScanner {
    /// Create a naive scanner. Returns `None` for an empty literal.
    #[must_use]
    pub fn new(target: impl Into<Vec<u8>>) -> Option<Self> {
        Self::with_mode(target, ScanMode::Naive)
    }

    /// Create a scanner with an explicit mode. Returns `None` for an empty literal.
    #[must_use]
    pub fn with_mode(target: impl Into<Vec<u8>>, mode: ScanMode) -> Option<Self> {
        let target = target.into();
        if target.is_empty() {
            return None;
        }
        let borders = match mode {
            ScanMode::Naive => None,
            ScanMode::Overlapping => Some(border_table(&target)),
        };
        Some(Self {
            target,
            cursor: 0,
            borders,
        })
    }

    /// The literal being scanned for.
    #[must_use]
    pub fn target(&self) -> &[u8] {
        &self.target
    }

    /// Number of literal bytes currently matched.
    #[must_use]
    pub const fn progress(&self) -> usize {
        self.cursor
    }

    /// The recovery mode of this scanner.
    #[must_use]
    pub const fn mode(&self) -> ScanMode {
        if self.borders.is_some() {
            ScanMode::Overlapping
        } else {
            ScanMode::Naive
        }
    }

    /// Forget any partial match.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Feed one byte; returns `true` when the literal has just been completed.
    pub fn consume(&mut self, byte: u8) -> bool {
        match &self.borders {
            None => {
                if byte == self.target[self.cursor] {
                    self.cursor += 1;
                    if self.cursor == self.target.len() {
                        self.cursor = 0;
                        return true;
                    }
                } else {
                    self.cursor = 0;
                }
                false
            }
            Some(borders) => {
                while self.cursor > 0 && byte != self.target[self.cursor] {
                    self.cursor = borders[self.cursor - 1];
                }
                if byte == self.target[self.cursor] {
                    self.cursor += 1;
                }
                if self.cursor == self.target.len() {
                    self.cursor = borders[self.cursor - 1];
                    return true;
                }
                false
            }
        }
    }
}

/// `table[i]` is the length of the longest proper border of `target[..=i]`.
fn border_table(target: &[u8]) -> Vec<usize> {
    let mut table = vec![0; target.len()];
    let mut k = 0;
    for i in 1..target.len() {
        while k > 0 && target[i] != target[k] {
            k = table[k - 1];
        }
        if target[i] == target[k] {
            k += 1;
        }
        table[i] = k;
    }
    table
}
