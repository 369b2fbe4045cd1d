//! Session credentials and pinned host identity.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use md5::Md5;
use sha2::{Digest, Sha256};

use crate::error::{Result, ShellError};

/// Username and one-time password for a node session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Booking password issued for this session.
    pub password: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A public host key as presented by a server, in SSH wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostKey {
    blob: Vec<u8>,
}

impl HostKey {
    /// Wrap a wire-encoded public key blob.
    #[must_use]
    pub fn from_blob(blob: impl Into<Vec<u8>>) -> Self {
        Self { blob: blob.into() }
    }

    /// The wire-encoded key.
    #[must_use]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Fingerprint this key with the given algorithm.
    #[must_use]
    pub fn fingerprint(&self, algorithm: FingerprintAlgorithm) -> HostFingerprint {
        match algorithm {
            FingerprintAlgorithm::Sha256 => HostFingerprint::Sha256(Sha256::digest(&self.blob).into()),
            FingerprintAlgorithm::Md5 => HostFingerprint::Md5(Md5::digest(&self.blob).into()),
        }
    }
}

/// Hash used to fingerprint a host key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintAlgorithm {
    /// OpenSSH default, rendered as `SHA256:<base64>`.
    Sha256,
    /// Legacy colon-separated hex.
    Md5,
}

/// A pinned host key fingerprint.
///
/// Parses the two forms OpenSSH prints: `SHA256:<unpadded base64>` and the
/// legacy `aa:bb:...` MD5 hex (optionally prefixed with `MD5:`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostFingerprint {
    /// SHA-256 digest of the key blob.
    Sha256([u8; 32]),
    /// MD5 digest of the key blob.
    Md5([u8; 16]),
}

impl HostFingerprint {
    /// The digest algorithm of this fingerprint.
    #[must_use]
    pub const fn algorithm(&self) -> FingerprintAlgorithm {
        match self {
            Self::Sha256(_) => FingerprintAlgorithm::Sha256,
            Self::Md5(_) => FingerprintAlgorithm::Md5,
        }
    }

    /// Check a presented key against this pin.
    #[must_use]
    pub fn matches(&self, key: &HostKey) -> bool {
        key.fingerprint(self.algorithm()) == *self
    }
}

impl FromStr for HostFingerprint {
    type Err = ShellError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(encoded) = s.strip_prefix("SHA256:") {
            let digest = STANDARD_NO_PAD
                .decode(encoded.trim_end_matches('='))
                .map_err(|e| ShellError::config(format!("invalid SHA256 fingerprint: {e}")))?;
            let digest: [u8; 32] = digest.try_into().map_err(|v: Vec<u8>| {
                ShellError::config(format!(
                    "SHA256 fingerprint must be 32 bytes, got {}",
                    v.len()
                ))
            })?;
            return Ok(Self::Sha256(digest));
        }

        let hex = s.strip_prefix("MD5:").unwrap_or(s);
        let parts: Vec<&str> = hex.split(':').collect();
        if parts.len() != 16 {
            return Err(ShellError::config(format!(
                "unrecognized fingerprint '{s}': expected SHA256:<base64> or 16 colon-separated hex bytes"
            )));
        }
        let mut digest = [0u8; 16];
        for (slot, part) in digest.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(ShellError::config(format!("invalid fingerprint byte '{part}'")));
            }
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| ShellError::config(format!("invalid fingerprint byte '{part}'")))?;
        }
        Ok(Self::Md5(digest))
    }
}

impl fmt::Display for HostFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256(digest) => write!(f, "SHA256:{}", STANDARD_NO_PAD.encode(digest)),
            Self::Md5(digest) => {
                let hex: Vec<String> = digest.iter().map(|b| format!("{b:02x}")).collect();
                f.write_str(&hex.join(":"))
            }
        }
    }
}

impl fmt::Debug for HostFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostFingerprint({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLICIFY_PIN: &str = "e9:5d:51:34:ec:8d:96:6d:1f:70:94:a3:ad:ef:0e:09";

    #[test]
    fn parse_md5_pin() {
        let pin: HostFingerprint = SLICIFY_PIN.parse().unwrap();
        assert_eq!(pin.algorithm(), FingerprintAlgorithm::Md5);
        assert_eq!(pin.to_string(), SLICIFY_PIN);

        let prefixed: HostFingerprint = format!("MD5:{SLICIFY_PIN}").parse().unwrap();
        assert_eq!(prefixed, pin);
    }

    #[test]
    fn sha256_round_trips_through_display() {
        let key = HostKey::from_blob(b"ssh-ed25519 test key".to_vec());
        let fp = key.fingerprint(FingerprintAlgorithm::Sha256);
        let text = fp.to_string();
        assert!(text.starts_with("SHA256:"));
        assert!(!text.ends_with('='));
        assert_eq!(text.parse::<HostFingerprint>().unwrap(), fp);
    }

    #[test]
    fn matches_only_the_pinned_key() {
        let good = HostKey::from_blob(b"good key".to_vec());
        let bad = HostKey::from_blob(b"bad key".to_vec());

        let sha_pin = good.fingerprint(FingerprintAlgorithm::Sha256);
        assert!(sha_pin.matches(&good));
        assert!(!sha_pin.matches(&bad));

        let md5_pin = good.fingerprint(FingerprintAlgorithm::Md5);
        assert!(md5_pin.matches(&good));
        assert!(!md5_pin.matches(&bad));
    }

    #[test]
    fn md5_of_known_input() {
        // RFC 1321 test vector: MD5("abc").
        let fp = HostKey::from_blob(b"abc".to_vec()).fingerprint(FingerprintAlgorithm::Md5);
        assert_eq!(fp.to_string(), "90:01:50:98:3c:d2:4f:b0:d6:96:3f:7d:28:e1:7f:72");
    }

    #[test]
    fn rejects_garbage() {
        assert!("not a fingerprint".parse::<HostFingerprint>().is_err());
        assert!("SHA256:AAAA".parse::<HostFingerprint>().is_err());
        assert!("zz:5d:51:34:ec:8d:96:6d:1f:70:94:a3:ad:ef:0e:09"
            .parse::<HostFingerprint>()
            .is_err());
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = Credentials::new("slicify-user", "one-time-secret");
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("slicify-user"));
        assert!(!dbg.contains("one-time-secret"));
    }
}
