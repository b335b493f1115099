//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use waitroom_config::ConfigError;
use waitroom_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const EXPIRED: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the waiting room at {url}")]
    #[diagnostic(
        code(waitroom::connection_failed),
        help(
            "Check the API base URL (including the stage prefix, e.g. /api).\n\
             URL: {url}\n\
             Self-signed test stack? Try --insecure (-k)."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(waitroom::timeout),
        help("Increase the timeout with --timeout or check the API's responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(waitroom::auth_failed),
        help(
            "For capacity: verify the private API key.\n\
             Run: waitroom config set-key --profile {profile}\n\
             For checkout: the admission token was refused by the commerce API."
        )
    )]
    AuthFailed { message: String, profile: String },

    // ── Admission ────────────────────────────────────────────────────
    #[error("Rejected by the waiting room: {message}")]
    #[diagnostic(
        code(waitroom::rejected),
        help("Check the event id with --event-id or in your profile.")
    )]
    Rejected { message: String },

    #[error("Admission expired: {message}")]
    #[diagnostic(
        code(waitroom::expired),
        help("Your place in line or your token lapsed. Run `waitroom join` again to re-queue.")
    )]
    Expired { message: String },

    #[error("{message}")]
    #[diagnostic(code(waitroom::invalid_state))]
    InvalidState { message: String },

    #[error("Interrupted")]
    #[diagnostic(code(waitroom::cancelled))]
    Cancelled,

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(waitroom::api_error))]
    ApiError { code: String, message: String },

    #[error("Internal error: {message}")]
    #[diagnostic(code(waitroom::internal))]
    Internal { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(waitroom::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(waitroom::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: waitroom config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(waitroom::no_config),
        help(
            "Create one with: waitroom config init\n\
             Or pass --public-api and --event-id.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("No API key configured for profile '{profile}'")]
    #[diagnostic(
        code(waitroom::no_credentials),
        help(
            "Store one with: waitroom config set-key --profile {profile}\n\
             Or set WAITROOM_API_KEY."
        )
    )]
    NoCredentials { profile: String },

    #[error(transparent)]
    #[diagnostic(code(waitroom::config))]
    Config(Box<figment::Error>),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Expired { .. } => exit_code::EXPIRED,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Serialization(e) => CliError::Internal {
                message: format!("failed to serialize config: {e}"),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                message,
                profile: "current".into(),
            },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Rejected { message } => CliError::Rejected { message },

            CoreError::Expired { message } => CliError::Expired { message },

            err @ (CoreError::NotAdmitted { .. } | CoreError::NotQueued { .. }) => {
                CliError::InvalidState {
                    message: err.to_string(),
                }
            }

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Api { message, status } => CliError::ApiError {
                code: status.map_or_else(|| "unknown".into(), |s| format!("HTTP {s}")),
                message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Cancelled => CliError::Cancelled,

            CoreError::QueueClosed => CliError::Internal {
                message: "mutation queue closed".into(),
            },

            CoreError::Internal(message) => CliError::Internal { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_has_its_own_exit_code() {
        let err = CliError::from(CoreError::Expired {
            message: "Token corresponding to request id has expired".into(),
        });
        assert_eq!(err.exit_code(), exit_code::EXPIRED);
    }

    #[test]
    fn core_errors_map_to_stable_codes() {
        let cases = [
            (
                CoreError::ConnectionFailed {
                    url: "https://q.example.com".into(),
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                CoreError::AuthenticationFailed {
                    message: "Forbidden".into(),
                },
                exit_code::AUTH,
            ),
            (CoreError::Timeout { timeout_secs: 20 }, exit_code::TIMEOUT),
            (
                CoreError::NotAdmitted {
                    operation: "checkout".into(),
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }

    #[test]
    fn missing_profile_values_are_usage_errors() {
        let err = CliError::from(ConfigError::Validation {
            field: "event_id".into(),
            reason: "must not be empty".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
