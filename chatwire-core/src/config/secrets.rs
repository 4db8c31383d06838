//! Redacting wrapper for API tokens

use serde::{Deserialize, Serialize};
use std::fmt;

const REDACTED: &str = "[REDACTED]";

/// Characters a token needs before its tail may be shown
const MIN_FINGERPRINT_LEN: usize = 12;

/// An API token that never prints itself.
///
/// Serializes as the plain string so configuration files stay readable;
/// `Debug` and `Display` always print `[REDACTED]`.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token, for building request headers
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Redacted form that keeps the last four characters of long tokens,
    /// so log lines can tell two tokens apart
    pub fn fingerprint(&self) -> String {
        let len = self.0.chars().count();
        if len == 0 {
            return "[EMPTY]".to_string();
        }
        if len < MIN_FINGERPRINT_LEN {
            return REDACTED.to_string();
        }

        let tail: String = self.0.chars().skip(len - 4).collect();
        format!("{}...{}", REDACTED, tail)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
