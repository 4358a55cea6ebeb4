//! Identity keys: the phone number a session belongs to.

use std::fmt;

use serde::{Deserialize, Serialize};

use pb_domain::error::{Error, Result};

/// Longest accepted key.  E.164 numbers top out at 15 digits; the slack
/// covers operator-chosen aliases.
const MAX_KEY_LEN: usize = 64;

/// Unique key of a session, normally a phone number with country code.
///
/// Keys are trimmed and a single leading `+` is dropped, so `"+1 555"`-style
/// input is rejected but `"+15551234567"` and `"15551234567"` name the same
/// session.  Only ASCII alphanumerics, `-` and `_` are allowed because the
/// key becomes part of the client's auth profile ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let key = trimmed.strip_prefix('+').unwrap_or(trimmed);

        if key.is_empty() {
            return Err(Error::InvalidKey("phone number must not be empty".into()));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(Error::InvalidKey(format!(
                "phone number longer than {MAX_KEY_LEN} characters"
            )));
        }
        if let Some(bad) = key
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(Error::InvalidKey(format!(
                "unexpected character {bad:?} in phone number"
            )));
        }

        Ok(Self(key.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deterministic auth profile ID for this key, so re-pairing the same
    /// number lets the client find its stored credentials.
    pub fn auth_profile_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.0)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for IdentityKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<IdentityKey> for String {
    fn from(key: IdentityKey) -> Self {
        key.0
    }
}
