//! Config subcommand handlers.

use dialoguer::{Input, Password, Select};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Prompt for a URL that may be left blank.
fn optional_url(prompt: &str) -> Result<Option<String>, CliError> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_owned()))
}

fn prompt_api_key() -> Result<String, CliError> {
    let key = Password::new()
        .with_prompt("Private API key")
        .interact()
        .map_err(prompt_err)?;
    if key.is_empty() {
        return Err(CliError::Validation {
            field: "api_key".into(),
            reason: "API key cannot be empty".into(),
        });
    }
    Ok(key)
}

fn profile_not_found(name: String, cfg: &Config) -> CliError {
    let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
    available.sort();
    CliError::ProfileNotFound {
        name,
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}

/// Mask plaintext keys so `config show` is safe to paste.
fn redact(mut cfg: Config) -> Config {
    for profile in cfg.profiles.values_mut() {
        if profile.api_key.is_some() {
            profile.api_key = Some(REDACTED.into());
        }
    }
    cfg
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("waitroom configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let public_api: String = Input::new()
                .with_prompt("Public API URL (including stage, e.g. https://abc.execute-api.us-east-1.amazonaws.com/api)")
                .interact_text()
                .map_err(prompt_err)?;

            let event_id: String = Input::new()
                .with_prompt("Event ID")
                .default("Sample".into())
                .interact_text()
                .map_err(prompt_err)?;

            let commerce_api = optional_url("Commerce API URL (blank to skip checkout)")?;
            let private_api = optional_url("Private API URL (blank to skip capacity)")?;

            let mut api_key = None;
            if private_api.is_some() {
                let choices = &[
                    "Store in system keyring (recommended)",
                    "Save to config file (plaintext)",
                    "Skip (the private API is open or key comes from WAITROOM_API_KEY)",
                ];
                let selection = Select::new()
                    .with_prompt("Private API key")
                    .items(choices)
                    .default(0)
                    .interact()
                    .map_err(prompt_err)?;

                match selection {
                    0 => {
                        let key = prompt_api_key()?;
                        waitroom_config::store_api_key(&profile_name, &key)?;
                        eprintln!("   API key stored in system keyring");
                    }
                    1 => api_key = Some(prompt_api_key()?),
                    _ => {}
                }
            }

            let profile = Profile {
                public_api,
                private_api,
                commerce_api,
                event_id,
                api_key,
                ..Profile::default()
            };

            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());
            config::save_config(&cfg)?;

            eprintln!("\nConfiguration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Try it: waitroom capacity   or   waitroom join");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redact(config::load_config_or_default());
            let out = match global.output {
                crate::cli::OutputFormat::Table | crate::cli::OutputFormat::Plain => {
                    toml::to_string_pretty(&cfg).map_err(|e| CliError::Internal {
                        message: format!("failed to render config: {e}"),
                    })?
                }
                _ => output::render_single(&global.output, &cfg, |_, _| Vec::new(), false),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── SetKey ──────────────────────────────────────────────────
        ConfigCommand::SetKey { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(profile_not_found(profile_name, &cfg));
            }

            let key = prompt_api_key()?;
            waitroom_config::store_api_key(&profile_name, &key)?;
            eprintln!("API key stored in system keyring for profile '{profile_name}'");
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_masks_plaintext_keys_only() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "prod".into(),
            Profile {
                api_key: Some("s3cret".into()),
                ..Profile::default()
            },
        );
        cfg.profiles.insert("dev".into(), Profile::default());

        let cfg = redact(cfg);
        assert_eq!(cfg.profiles["prod"].api_key.as_deref(), Some(REDACTED));
        assert_eq!(cfg.profiles["dev"].api_key, None);
    }

    #[test]
    fn missing_profile_lists_alternatives() {
        let mut cfg = Config::default();
        cfg.profiles.insert("b".into(), Profile::default());
        cfg.profiles.insert("a".into(), Profile::default());
        let err = profile_not_found("c".into(), &cfg);
        assert!(matches!(
            err,
            CliError::ProfileNotFound { ref available, .. } if available == "a, b"
        ));
    }
}
