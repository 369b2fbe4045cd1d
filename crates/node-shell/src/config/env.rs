//! Environment-based configuration.
//!
//! Variables named `NODE_SHELL_<KEY>` override individual deployment settings,
//! using the same keys as the configuration file (for example
//! `NODE_SHELL_EXPECT_TIMEOUT_MS=0` or `NODE_SHELL_FINGERPRINT=SHA256:...`).

use std::collections::HashMap;
use std::time::Duration;

use super::{DeploymentConfig, LineEnding};
use crate::backend::HostFingerprint;
use crate::error::{Result, ShellError};
use crate::scanner::ScanMode;

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "NODE_SHELL";

/// Recognized variable keys.
pub mod vars {
    /// Host name.
    pub const HOST: &str = "HOST";
    /// SSH port.
    pub const PORT: &str = "PORT";
    /// Pinned host key fingerprint.
    pub const FINGERPRINT: &str = "FINGERPRINT";
    /// Prompt literal.
    pub const PROMPT: &str = "PROMPT";
    /// Line ending (`lf`, `crlf`, `cr`).
    pub const LINE_ENDING: &str = "LINE_ENDING";
    /// Scanner mode (`naive`, `overlapping`).
    pub const SCAN_MODE: &str = "SCAN_MODE";
    /// Handshake timeout in milliseconds.
    pub const HANDSHAKE_TIMEOUT_MS: &str = "HANDSHAKE_TIMEOUT_MS";
    /// Greeting prompt timeout in milliseconds.
    pub const CONNECT_TIMEOUT_MS: &str = "CONNECT_TIMEOUT_MS";
    /// Default expect timeout in milliseconds.
    pub const EXPECT_TIMEOUT_MS: &str = "EXPECT_TIMEOUT_MS";
    /// Liveness interval in milliseconds.
    pub const LIVENESS_INTERVAL_MS: &str = "LIVENESS_INTERVAL_MS";
    /// Echo to stdout.
    pub const ECHO: &str = "ECHO";
    /// PTY TERM value.
    pub const TERM: &str = "TERM";
}

/// Environment variable reader.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Prefix for environment variables.
    prefix: String,
    /// Explicit values; when present, the process environment is not consulted.
    source: Option<HashMap<String, String>>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Create a reader over the process environment.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            source: None,
        }
    }

    /// Create a reader over an explicit set of variables.
    #[must_use]
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            source: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    /// Build the full environment variable name.
    fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a string value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let var_name = self.var_name(name);
        match &self.source {
            Some(map) => map.get(&var_name).cloned(),
            None => std::env::var(&var_name).ok(),
        }
    }

    /// Get a parsed value, reporting which variable was malformed.
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.get(name)
            .map(|v| {
                v.trim().parse().map_err(|_| {
                    ShellError::config(format!("invalid value '{v}' for {}", self.var_name(name)))
                })
            })
            .transpose()
    }

    /// Get a boolean value.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).map(|v| {
            matches!(
                v.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on" | "enabled"
            )
        })
    }

    /// Get a duration in milliseconds.
    pub fn duration_millis(&self, name: &str) -> Result<Option<Duration>> {
        Ok(self.parse::<u64>(name)?.map(Duration::from_millis))
    }

    /// Overlay the variables that are set onto `config`.
    pub fn apply(&self, mut config: DeploymentConfig) -> Result<DeploymentConfig> {
        if let Some(host) = self.get(vars::HOST) {
            config.host = host;
        }
        if let Some(port) = self.parse(vars::PORT)? {
            config.port = port;
        }
        if let Some(fingerprint) = self.get(vars::FINGERPRINT) {
            config.fingerprint = fingerprint.parse::<HostFingerprint>()?;
        }
        if let Some(prompt) = self.get(vars::PROMPT) {
            config.prompt = prompt;
        }
        if let Some(line_ending) = self.get(vars::LINE_ENDING) {
            config.line_ending = parse_line_ending(&line_ending)?;
        }
        if let Some(mode) = self.get(vars::SCAN_MODE) {
            config.scan_mode = parse_scan_mode(&mode)?;
        }
        if let Some(d) = self.duration_millis(vars::HANDSHAKE_TIMEOUT_MS)? {
            config.handshake_timeout = d;
        }
        if let Some(d) = self.duration_millis(vars::CONNECT_TIMEOUT_MS)? {
            config.connect_timeout = d;
        }
        if let Some(d) = self.duration_millis(vars::EXPECT_TIMEOUT_MS)? {
            config.expect_timeout = d;
        }
        if let Some(d) = self.duration_millis(vars::LIVENESS_INTERVAL_MS)? {
            config.liveness_interval = d;
        }
        if let Some(echo) = self.bool(vars::ECHO) {
            config.echo = echo;
        }
        if let Some(term) = self.get(vars::TERM) {
            config.terminal.term = term;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_line_ending(value: &str) -> Result<LineEnding> {
    match value.to_lowercase().as_str() {
        "lf" => Ok(LineEnding::Lf),
        "crlf" => Ok(LineEnding::CrLf),
        "cr" => Ok(LineEnding::Cr),
        other => Err(ShellError::config(format!("unknown line ending '{other}'"))),
    }
}

fn parse_scan_mode(value: &str) -> Result<ScanMode> {
    match value.to_lowercase().as_str() {
        "naive" => Ok(ScanMode::Naive),
        "overlapping" => Ok(ScanMode::Overlapping),
        other => Err(ShellError::config(format!("unknown scan mode '{other}'"))),
    }
}

impl DeploymentConfig {
    /// Apply `NODE_SHELL_*` environment overrides over `self`.
    pub fn with_env_overrides(self) -> Result<Self> {
        EnvConfig::default().apply(self)
    }
}
