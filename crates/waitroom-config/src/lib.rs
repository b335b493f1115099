//! Shared configuration for waiting room tools.
//!
//! TOML profiles, private API key resolution (env + keyring + plaintext),
//! and translation to the runtime configs in `waitroom_core`. The CLI adds
//! flag-aware overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use waitroom_core::{MonitorConfig, PollSettings, SessionConfig, TlsVerification};

/// Keyring service name; entries are keyed `<profile>/api-key`.
pub const KEYRING_SERVICE: &str = "waitroom";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API key configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named waiting room deployments.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use when none is given explicitly.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    20
}
fn default_poll_interval() -> u64 {
    2
}

/// One waiting room deployment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Public queue API base URL, including the stage prefix.
    pub public_api: String,

    /// Private (operator) API base URL.
    pub private_api: Option<String>,

    /// Commerce API base URL of the protected site.
    pub commerce_api: Option<String>,

    /// Event the waiting room is configured for.
    pub event_id: String,

    /// Private API key (plaintext; prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the private API key.
    pub api_key_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Override poll interval (seconds).
    pub poll_interval: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "waitroom", "waitroom").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("waitroom");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + `WAITROOM_` environment variables.
///
/// Nested keys use a double underscore, e.g.
/// `WAITROOM_DEFAULTS__POLL_INTERVAL=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("WAITROOM_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key"))
}

/// Resolve the private API key from the credential chain (no CLI flag step).
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store the private API key in the system keyring.
pub fn store_api_key(profile_name: &str, key: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)
        .and_then(|entry| entry.set_password(key))
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

// ── Translation to runtime config ───────────────────────────────────

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

fn require_event_id(profile: &Profile) -> Result<String, ConfigError> {
    if profile.event_id.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "event_id".into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(profile.event_id.clone())
}

/// TLS strategy: `insecure` wins over `ca_cert`; public cloud endpoints
/// otherwise get strict verification.
pub fn resolve_tls(profile: &Profile, defaults: &Defaults) -> TlsVerification {
    if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    }
}

fn poll_settings(profile: &Profile, defaults: &Defaults) -> Result<PollSettings, ConfigError> {
    let secs = profile.poll_interval.unwrap_or(defaults.poll_interval);
    if secs == 0 {
        return Err(ConfigError::Validation {
            field: "poll_interval".into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(PollSettings {
        interval: Duration::from_secs(secs),
        ..PollSettings::default()
    })
}

/// Build a `SessionConfig` from a profile, without CLI flag overrides.
pub fn profile_to_session_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let public_api = parse_url("public_api", &profile.public_api)?;
    let commerce_api = profile
        .commerce_api
        .as_deref()
        .map(|raw| parse_url("commerce_api", raw))
        .transpose()?;

    let mut cfg = SessionConfig::new(public_api, require_event_id(profile)?);
    cfg.commerce_api = commerce_api;
    cfg.tls = resolve_tls(profile, defaults);
    cfg.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    cfg.poll = poll_settings(profile, defaults)?;
    Ok(cfg)
}

/// Build a `MonitorConfig` from a profile, without CLI flag overrides.
///
/// A missing API key is not an error: the private API may be open.
pub fn profile_to_monitor_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<MonitorConfig, ConfigError> {
    let public_api = parse_url("public_api", &profile.public_api)?;
    let private_api = profile
        .private_api
        .as_deref()
        .ok_or_else(|| ConfigError::Validation {
            field: "private_api".into(),
            reason: format!("not set in profile '{profile_name}'"),
        })
        .and_then(|raw| parse_url("private_api", raw))?;

    let mut cfg = MonitorConfig::new(public_api, private_api, require_event_id(profile)?);
    cfg.api_key = resolve_api_key(profile, profile_name).ok();
    cfg.tls = resolve_tls(profile, defaults);
    cfg.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    cfg.poll = poll_settings(profile, defaults)?;
    Ok(cfg)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    const SAMPLE: &str = r#"
default_profile = "staging"

[defaults]
output = "json"
poll_interval = 5

[profiles.staging]
public_api = "https://abc.execute-api.us-east-1.amazonaws.com/api"
private_api = "https://def.execute-api.us-east-1.amazonaws.com/api"
commerce_api = "https://ghi.execute-api.us-east-1.amazonaws.com/api"
event_id = "Sample"
api_key = "plain-key"
timeout = 7
"#;

    fn staging() -> Profile {
        Profile {
            public_api: "https://q.example.com/api".into(),
            event_id: "Sample".into(),
            ..Profile::default()
        }
    }

    #[test]
    fn loads_profiles_and_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.default_profile_name(), "staging");
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.defaults.poll_interval, 5);
        assert_eq!(cfg.defaults.timeout, 20);
        assert_eq!(cfg.profiles["staging"].event_id, "Sample");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile_name(), "default");
        assert!(cfg.profiles.is_empty());
        assert_eq!(cfg.defaults.poll_interval, 2);
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert("default".into(), staging());
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles["default"].public_api, "https://q.example.com/api");
    }

    #[test]
    fn session_config_applies_profile_overrides() {
        let mut profile = staging();
        profile.commerce_api = Some("https://shop.example.com/api".into());
        profile.timeout = Some(7);
        let defaults = Defaults {
            poll_interval: 3,
            ..Defaults::default()
        };

        let cfg = profile_to_session_config(&profile, &defaults).unwrap();
        assert_eq!(cfg.event_id, "Sample");
        assert_eq!(cfg.timeout, Duration::from_secs(7));
        assert_eq!(cfg.poll.interval, Duration::from_secs(3));
        assert_eq!(cfg.tls, TlsVerification::SystemDefaults);
        assert_eq!(
            cfg.commerce_api.unwrap().as_str(),
            "https://shop.example.com/api"
        );
    }

    #[test]
    fn bad_url_is_a_validation_error() {
        let mut profile = staging();
        profile.public_api = "not a url".into();
        let err = profile_to_session_config(&profile, &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "public_api"));
    }

    #[test]
    fn empty_event_id_is_rejected() {
        let mut profile = staging();
        profile.event_id = "  ".into();
        assert!(profile_to_session_config(&profile, &Defaults::default()).is_err());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut profile = staging();
        profile.poll_interval = Some(0);
        let err = profile_to_session_config(&profile, &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "poll_interval"));

        profile.poll_interval = None;
        profile.private_api = Some("https://ops.example.com/api".into());
        let defaults = Defaults {
            poll_interval: 0,
            ..Defaults::default()
        };
        let err = profile_to_monitor_config(&profile, "staging", &defaults).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "poll_interval"));
    }

    #[test]
    fn monitor_requires_private_api() {
        let err = profile_to_monitor_config(&staging(), "staging", &Defaults::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "private_api"));
    }

    #[test]
    fn plaintext_key_is_the_last_resort() {
        let mut profile = staging();
        profile.private_api = Some("https://ops.example.com/api".into());
        profile.api_key = Some("plain-key".into());
        profile.api_key_env = Some("WAITROOM_TEST_KEY_THAT_IS_NEVER_SET".into());

        let cfg =
            profile_to_monitor_config(&profile, "waitroom-config-unit-test", &Defaults::default())
                .unwrap();
        assert_eq!(cfg.api_key.unwrap().expose_secret(), "plain-key");
    }

    #[test]
    fn insecure_wins_over_ca_cert() {
        let mut profile = staging();
        profile.ca_cert = Some("/etc/ssl/ca.pem".into());
        assert_eq!(
            resolve_tls(&profile, &Defaults::default()),
            TlsVerification::CustomCa("/etc/ssl/ca.pem".into())
        );
        profile.insecure = Some(true);
        assert_eq!(
            resolve_tls(&profile, &Defaults::default()),
            TlsVerification::DangerAcceptInvalid
        );
    }
}
