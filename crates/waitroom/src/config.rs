//! CLI configuration: a thin wrapper around the `waitroom_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--public-api, --api-key, etc.).

use std::time::Duration;

use secrecy::SecretString;

use waitroom_core::{MonitorConfig, SessionConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use waitroom_config::{Config, Profile, config_path, load_config_or_default, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

/// The active profile with flag values laid over it.
///
/// Without a stored profile the flags alone must name the public API.
fn effective_profile(global: &GlobalOpts, config: &Config) -> Result<(String, Profile), CliError> {
    let name = active_profile_name(global, config);
    let mut profile = match config.profiles.get(&name) {
        Some(p) => p.clone(),
        None if global.public_api.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            let mut available: Vec<_> = config.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ref url) = global.public_api {
        profile.public_api.clone_from(url);
    }
    if let Some(ref url) = global.private_api {
        profile.private_api = Some(url.clone());
    }
    if let Some(ref url) = global.commerce_api {
        profile.commerce_api = Some(url.clone());
    }
    if let Some(ref id) = global.event_id {
        profile.event_id.clone_from(id);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    Ok((name, profile))
}

fn poll_override(global: &GlobalOpts) -> Result<Option<Duration>, CliError> {
    match global.poll_interval.as_deref().copied() {
        Some(interval) if interval.is_zero() => Err(CliError::Validation {
            field: "poll_interval".into(),
            reason: "must be greater than zero".into(),
        }),
        other => Ok(other),
    }
}

/// Build a `SessionConfig` from config file, profile, and CLI overrides.
pub fn resolve_session_config(global: &GlobalOpts) -> Result<SessionConfig, CliError> {
    let cfg = load_config_or_default();
    let (_, profile) = effective_profile(global, &cfg)?;

    let mut session = waitroom_config::profile_to_session_config(&profile, &cfg.defaults)?;
    if let Some(interval) = poll_override(global)? {
        session.poll.interval = interval;
    }
    Ok(session)
}

/// Build a `MonitorConfig` from config file, profile, and CLI overrides.
pub fn resolve_monitor_config(global: &GlobalOpts) -> Result<MonitorConfig, CliError> {
    let cfg = load_config_or_default();
    let (name, profile) = effective_profile(global, &cfg)?;

    let mut monitor = waitroom_config::profile_to_monitor_config(&profile, &name, &cfg.defaults)?;
    // CLI flag takes priority over the profile's credential chain
    if let Some(ref key) = global.api_key {
        monitor.api_key = Some(SecretString::from(key.clone()));
    }
    if let Some(interval) = poll_override(global)? {
        monitor.poll.interval = interval;
    }
    Ok(monitor)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["waitroom"];
        argv.extend_from_slice(args);
        argv.push("join");
        Cli::try_parse_from(argv).unwrap().global
    }

    #[test]
    fn poll_flag_overrides_when_positive() {
        let opts = global(&["--poll-interval", "500ms"]);
        assert_eq!(poll_override(&opts).unwrap(), Some(Duration::from_millis(500)));
        assert_eq!(poll_override(&global(&[])).unwrap(), None);
    }

    #[test]
    fn zero_poll_flag_is_rejected() {
        let err = poll_override(&global(&["--poll-interval", "0s"])).unwrap_err();
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "poll_interval"));
        assert_eq!(err.exit_code(), crate::error::exit_code::USAGE);
    }
}
