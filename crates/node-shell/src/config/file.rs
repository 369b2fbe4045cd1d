//! File-based configuration loading.
//!
//! Deployment files are TOML. Every key is optional; missing keys keep the
//! value of the configuration the file is applied to. Durations are given in
//! milliseconds.
//!
//! ```toml
//! host = "node.example"
//! port = 2222
//! fingerprint = "SHA256:..."
//! prompt = "ubuntu@node:~"
//! line_ending = "crlf"
//! scan_mode = "overlapping"
//! expect_timeout_ms = 0
//!
//! [terminal]
//! term = "vt100"
//! cols = 132
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::{DeploymentConfig, LineEnding, TerminalConfig};
use crate::backend::HostFingerprint;
use crate::error::{Result, ShellError};
use crate::scanner::ScanMode;

/// Default configuration file name searched for by [`ConfigLoader`].
pub const DEFAULT_FILE_NAME: &str = "node-shell.toml";

/// Deployment settings as written in a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Host to connect to.
    pub host: Option<String>,
    /// SSH port.
    pub port: Option<u16>,
    /// Pinned host key fingerprint.
    pub fingerprint: Option<String>,
    /// Shell prompt literal.
    pub prompt: Option<String>,
    /// Command terminator.
    pub line_ending: Option<LineEnding>,
    /// Scanner mismatch recovery.
    pub scan_mode: Option<ScanMode>,
    /// Handshake bound in milliseconds.
    pub handshake_timeout_ms: Option<u64>,
    /// Greeting prompt bound in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Default expect bound in milliseconds; zero waits forever.
    pub expect_timeout_ms: Option<u64>,
    /// Liveness check interval in milliseconds.
    pub liveness_interval_ms: Option<u64>,
    /// Echo consumed output to stdout.
    pub echo: Option<bool>,
    /// PTY settings.
    pub terminal: Option<TerminalFile>,
}

/// The `[terminal]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerminalFile {
    /// TERM value.
    pub term: Option<String>,
    /// Columns.
    pub cols: Option<u16>,
    /// Rows.
    pub rows: Option<u16>,
}

impl ConfigFile {
    /// Parse TOML content.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ShellError::config(format!("invalid config: {e}")))
    }

    /// Read and parse a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ShellError::io_context(format!("reading {}", path.display()), e))?;
        Self::parse(&content)
    }

    /// Overlay the values present in this file onto `config`.
    pub fn apply(self, mut config: DeploymentConfig) -> Result<DeploymentConfig> {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(fingerprint) = self.fingerprint {
            config.fingerprint = fingerprint.parse::<HostFingerprint>()?;
        }
        if let Some(prompt) = self.prompt {
            config.prompt = prompt;
        }
        if let Some(line_ending) = self.line_ending {
            config.line_ending = line_ending;
        }
        if let Some(scan_mode) = self.scan_mode {
            config.scan_mode = scan_mode;
        }
        if let Some(ms) = self.handshake_timeout_ms {
            config.handshake_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.expect_timeout_ms {
            config.expect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.liveness_interval_ms {
            config.liveness_interval = Duration::from_millis(ms);
        }
        if let Some(echo) = self.echo {
            config.echo = echo;
        }
        if let Some(terminal) = self.terminal {
            config.terminal = terminal.apply(config.terminal);
        }
        config.validate()?;
        Ok(config)
    }
}

impl TerminalFile {
    fn apply(self, mut terminal: TerminalConfig) -> TerminalConfig {
        if let Some(term) = self.term {
            terminal.term = term;
        }
        if let Some(cols) = self.cols {
            terminal.cols = cols;
        }
        if let Some(rows) = self.rows {
            terminal.rows = rows;
        }
        terminal
    }
}

/// Configuration file loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Search paths.
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a new loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a search path.
    #[must_use]
    pub fn add_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Find a config file, trying the name as given and with a `.toml` extension.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        for search_path in &self.search_paths {
            let path = search_path.join(name);
            if path.is_file() {
                return Some(path);
            }

            let path = search_path.join(format!("{name}.toml"));
            if path.is_file() {
                return Some(path);
            }
        }
        None
    }

    /// Load by name (searches paths) and apply over the defaults.
    pub fn load_by_name(&self, name: &str) -> Result<DeploymentConfig> {
        let path = self
            .find(name)
            .ok_or_else(|| ShellError::config(format!("config file not found: {name}")))?;
        tracing::debug!(path = %path.display(), "Loading deployment config");
        ConfigFile::load(&path)?.apply(DeploymentConfig::default())
    }
}

impl DeploymentConfig {
    /// Load a TOML file and apply it over the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        ConfigFile::load(path.as_ref())?.apply(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_keeps_defaults() {
        let config = ConfigFile::parse("")
            .unwrap()
            .apply(DeploymentConfig::default())
            .unwrap();
        assert_eq!(config.host, "www.slicify.com");
        assert_eq!(config.prompt, "slicify@slicify:~");
    }

    #[test]
    fn full_file_overrides() {
        let content = r#"
            host = "node.example"
            port = 2222
            fingerprint = "90:01:50:98:3c:d2:4f:b0:d6:96:3f:7d:28:e1:7f:72"
            prompt = "ubuntu@node:~"
            line_ending = "crlf"
            scan_mode = "overlapping"
            expect_timeout_ms = 0
            liveness_interval_ms = 10
            echo = true

            [terminal]
            term = "vt100"
            cols = 132
        "#;

        let config = ConfigFile::parse(content)
            .unwrap()
            .apply(DeploymentConfig::default())
            .unwrap();

        assert_eq!(config.host, "node.example");
        assert_eq!(config.port, 2222);
        assert_eq!(
            config.fingerprint.to_string(),
            "90:01:50:98:3c:d2:4f:b0:d6:96:3f:7d:28:e1:7f:72"
        );
        assert_eq!(config.prompt, "ubuntu@node:~");
        assert_eq!(config.line_ending, LineEnding::CrLf);
        assert_eq!(config.scan_mode, ScanMode::Overlapping);
        assert!(config.expect_timeout.is_zero());
        assert_eq!(config.liveness_interval, Duration::from_millis(10));
        assert!(config.echo);
        assert_eq!(config.terminal.term, "vt100");
        assert_eq!(config.terminal.cols, 132);
        assert_eq!(config.terminal.rows, 24);
    }

    #[test]
    fn unknown_key_rejected() {
        assert!(ConfigFile::parse("hostname = \"x\"").is_err());
    }

    #[test]
    fn bad_fingerprint_rejected() {
        let file = ConfigFile::parse("fingerprint = \"nope\"").unwrap();
        assert!(file.apply(DeploymentConfig::default()).is_err());
    }

    #[test]
    fn zero_liveness_interval_rejected() {
        let file = ConfigFile::parse("liveness_interval_ms = 0").unwrap();
        assert!(file.apply(DeploymentConfig::default()).is_err());
    }

    #[test]
    fn loader_misses_absent_file() {
        let loader = ConfigLoader::new().add_path("/nonexistent/node-shell");
        assert!(loader.find(DEFAULT_FILE_NAME).is_none());
        assert!(loader.load_by_name("node-shell").is_err());
    }
}
