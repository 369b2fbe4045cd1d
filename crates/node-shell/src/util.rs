//! Utilities for the session engine.
//!
//! Deadline tracking for bounded expects and byte formatting for logs.

pub mod bytes;
pub mod timeout;

pub use bytes::{EscapedBytes, escape_bytes};
pub use timeout::{Deadline, TimeoutExt};
