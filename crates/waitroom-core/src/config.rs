// ── Runtime configuration ──
//
// These types describe *where* the waiting room lives and how hard to poll
// it. They carry credential data but never touch disk: the CLI builds
// them from its profile file and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use waitroom_api::{TlsMode, TransportConfig};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 5;
/// Floor for [`PollSettings::period`]; a zero-length tick is not a schedule.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed local stacks).
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Polling cadence shared by both pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Transient failures tolerated in a row before a poller gives up.
    pub max_consecutive_failures: u32,
}

impl PollSettings {
    /// The tick period the pollers actually use: `interval`, floored at
    /// [`MIN_POLL_INTERVAL`].
    pub fn period(&self) -> Duration {
        self.interval.max(MIN_POLL_INTERVAL)
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

/// Everything an [`AdmissionSession`](crate::AdmissionSession) needs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Public queue API base URL (including any stage prefix).
    pub public_api: Url,
    /// Commerce API base URL. Checkout is unavailable without it.
    pub commerce_api: Option<Url>,
    pub event_id: String,
    /// Query string the user arrived with, kept for the protected site.
    pub launch_query_parameters: String,
    pub tls: TlsVerification,
    pub timeout: Duration,
    pub poll: PollSettings,
}

impl SessionConfig {
    pub fn new(public_api: Url, event_id: impl Into<String>) -> Self {
        Self {
            public_api,
            commerce_api: None,
            event_id: event_id.into(),
            launch_query_parameters: String::new(),
            tls: TlsVerification::default(),
            timeout: DEFAULT_TIMEOUT,
            poll: PollSettings::default(),
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        build_transport(&self.tls, self.timeout)
    }
}

/// Everything a [`CapacityMonitor`](crate::CapacityMonitor) needs.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub public_api: Url,
    pub private_api: Url,
    /// Sent as `x-api-key` on private API calls.
    pub api_key: Option<SecretString>,
    pub event_id: String,
    pub tls: TlsVerification,
    pub timeout: Duration,
    pub poll: PollSettings,
}

impl MonitorConfig {
    pub fn new(public_api: Url, private_api: Url, event_id: impl Into<String>) -> Self {
        Self {
            public_api,
            private_api,
            api_key: None,
            event_id: event_id.into(),
            tls: TlsVerification::default(),
            timeout: DEFAULT_TIMEOUT,
            poll: PollSettings::default(),
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        build_transport(&self.tls, self.timeout)
    }
}

fn build_transport(tls: &TlsVerification, timeout: Duration) -> TransportConfig {
    TransportConfig {
        tls: tls.into(),
        timeout,
    }
}
