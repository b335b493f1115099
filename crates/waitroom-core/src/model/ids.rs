// ── Admission identity types ──
//
// Opaque values handed out by the backend. Construction rejects empty
// input, so a mutation carrying one of these can never fail.

use std::fmt;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

fn non_empty(field: &str, value: String) -> Result<String, CoreError> {
    if value.trim().is_empty() {
        Err(CoreError::ValidationFailed {
            message: format!("{field} must not be empty"),
        })
    } else {
        Ok(value)
    }
}

// ── RequestId ───────────────────────────────────────────────────────

/// Identifier the backend issues when it accepts a queue request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        non_empty("request id", id.into()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RequestId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RequestId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

// ── Token ───────────────────────────────────────────────────────────

/// Admission credential. The secret never appears in `Debug` output.
#[derive(Clone)]
pub struct Token {
    secret: SecretString,
    expires_in: Option<u64>,
}

impl Token {
    pub fn new(credential: impl Into<String>) -> Result<Self, CoreError> {
        let credential = non_empty("token", credential.into())?;
        Ok(Self {
            secret: SecretString::from(credential),
            expires_in: None,
        })
    }

    /// Attach the validity period (seconds) the backend reported at issue time.
    pub fn with_expires_in(mut self, secs: u64) -> Self {
        self.expires_in = Some(secs);
        self
    }

    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.secret.expose_secret() == other.secret.expose_secret()
            && self.expires_in == other.expires_in
    }
}

impl Eq for Token {}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("secret", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl TryFrom<waitroom_api::TokenSet> for Token {
    type Error = CoreError;

    fn try_from(set: waitroom_api::TokenSet) -> Result<Self, Self::Error> {
        Ok(Self::new(set.access_token)?.with_expires_in(set.expires_in))
    }
}

// ── Receipt ─────────────────────────────────────────────────────────

/// Proof of a completed checkout, kept exactly as the commerce API sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Receipt(serde_json::Value);

impl Receipt {
    pub fn new(body: serde_json::Value) -> Self {
        Self(body)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<&str> for Receipt {
    fn from(s: &str) -> Self {
        Self(serde_json::Value::String(s.to_owned()))
    }
}

impl From<serde_json::Value> for Receipt {
    fn from(v: serde_json::Value) -> Self {
        Self(v)
    }
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            serde_json::Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}
