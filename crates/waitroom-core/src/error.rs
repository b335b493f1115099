// ── Core error types ──
//
// User-facing errors from waitroom-core. These are NOT API-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<waitroom_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.
//
// "Data not reported yet" is never an error: derived getters return
// `Derived::Unknown` and predicates return `false` instead.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach waiting room API at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Admission errors ─────────────────────────────────────────────
    #[error("Request rejected by waiting room: {message}")]
    Rejected { message: String },

    #[error("Admission expired: {message}")]
    Expired { message: String },

    #[error("Not admitted: {operation} requires an admission token")]
    NotAdmitted { operation: String },

    #[error("Not queued: {operation} requires a request id")]
    NotQueued { operation: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Mutation queue closed")]
    QueueClosed,

    #[error("Cancelled before completion")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` if retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => true,
            Self::Api { status, .. } => status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<waitroom_api::Error> for CoreError {
    fn from(err: waitroom_api::Error) -> Self {
        match err {
            waitroom_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            waitroom_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            waitroom_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            waitroom_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            waitroom_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            waitroom_api::Error::Rejected { message, .. } => CoreError::Rejected { message },
            waitroom_api::Error::Expired { message } => CoreError::Expired { message },
            waitroom_api::Error::UnexpectedStatus { status, body } => CoreError::Api {
                message: format!("unexpected HTTP {status}: {body}"),
                status: Some(status),
            },
            waitroom_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_maps_to_expired() {
        let err = CoreError::from(waitroom_api::Error::Expired {
            message: "Token corresponding to request id has expired".into(),
        });
        assert!(matches!(err, CoreError::Expired { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn server_error_stays_transient() {
        let err = CoreError::from(waitroom_api::Error::UnexpectedStatus {
            status: 502,
            body: "Bad Gateway".into(),
        });
        assert!(err.is_transient());
    }

    #[test]
    fn rejection_keeps_backend_message() {
        let err = CoreError::from(waitroom_api::Error::Rejected {
            message: "Invalid event ID".into(),
            status: 400,
        });
        assert_eq!(
            err.to_string(),
            "Request rejected by waiting room: Invalid event ID"
        );
    }
}
