use thiserror::Error;

/// Top-level error type for the `waitroom-api` crate.
///
/// Covers every failure mode across the three API surfaces (public queue,
/// private counters, commerce). `waitroom-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credential rejected (missing/invalid API key or admission token).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Waiting room ────────────────────────────────────────────────
    /// The backend refused the request (HTTP 400 with `{"error": ...}`),
    /// typically an unknown event or malformed request id.
    #[error("Request rejected (HTTP {status}): {message}")]
    Rejected { message: String, status: u16 },

    /// The queue position or the token issued for it has lapsed (HTTP 410).
    #[error("Expired: {message}")]
    Expired { message: String },

    /// Any status the endpoint does not document.
    #[error("Unexpected HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the backend reported an expired position or token.
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired { .. })
    }

    /// The HTTP status behind this error, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Rejected { status, .. } | Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Expired { .. } => Some(410),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = Error::UnexpectedStatus {
            status: 503,
            body: String::new(),
        };
        assert!(err.is_transient());
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn rejections_are_not_transient() {
        let err = Error::Rejected {
            message: "Invalid event ID".into(),
            status: 400,
        };
        assert!(!err.is_transient());
        assert!(!err.is_expired());
    }

    #[test]
    fn expired_reports_gone() {
        let err = Error::Expired {
            message: "Queue position has expired".into(),
        };
        assert!(err.is_expired());
        assert_eq!(err.status(), Some(410));
    }
}
