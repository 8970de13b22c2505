//! Redacting wrapper for invitation tokens.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A plain invitation token that must not end up in logs.
///
/// `Debug` and `Display` print `[REDACTED]`. The value is only reachable
/// through [`SecretString::expose_secret`] or by serializing it, which is how
/// the token is handed back once to whoever created the invitation.
///
/// # Example
///
/// ```rust
/// use teamward::SecretString;
///
/// let token = SecretString::new("q7Xv0c4m2LrT9aPz81kWbN3sYhJd6EuF");
/// assert_eq!(format!("{token:?}"), "SecretString([REDACTED])");
/// assert_eq!(token.expose_secret().len(), 32);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the plain value. Use only to hash or deliver the token.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// SHA-256 hex digest of the value, as stored in the invitations table.
    #[must_use]
    pub fn digest(&self) -> String {
        crate::crypto::hash_token(&self.0)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString)
    }
}
