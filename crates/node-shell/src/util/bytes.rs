//! Byte formatting helpers.

use std::fmt;

/// Escape control bytes so shell I/O can be logged on one line.
#[must_use]
pub fn escape_bytes(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len());

    for &byte in data {
        match byte {
            b'\n' => result.push_str("\\n"),
            b'\r' => result.push_str("\\r"),
            b'\t' => result.push_str("\\t"),
            b'\0' => result.push_str("\\0"),
            b'\\' => result.push_str("\\\\"),
            0x1b => result.push_str("\\e"),
            0x07 => result.push_str("\\a"),
            0x08 => result.push_str("\\b"),
            b if b.is_ascii_graphic() || b == b' ' => result.push(char::from(b)),
            b => {
                use fmt::Write;
                let _ = write!(result, "\\x{b:02x}");
            }
        }
    }

    result
}

/// Bytes that display escaped, for use as a tracing field.
pub struct EscapedBytes<'a>(pub &'a [u8]);

impl fmt::Display for EscapedBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&escape_bytes(self.0))
    }
}

impl fmt::Debug for EscapedBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", escape_bytes(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_command_line() {
        assert_eq!(escape_bytes(b"pwd\n"), "pwd\\n");
        assert_eq!(escape_bytes(b"\x1b[0m\xff"), "\\e[0m\\xff");
    }

    #[test]
    fn escaped_display() {
        assert_eq!(format!("{}", EscapedBytes(b"a\rb")), "a\\rb");
        assert_eq!(format!("{:?}", EscapedBytes(b"x")), "\"x\"");
    }
}
