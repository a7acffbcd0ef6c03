//! Config subcommand handlers. None of these touch the backend.

use autouni_core::config::DEFAULT_API_URL;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const MASK: &str = "****";

/// The config as a TOML value with plaintext passwords masked.
fn redacted(cfg: &Config) -> Result<toml::Value, CliError> {
    let mut value = toml::Value::try_from(cfg).map_err(|e| CliError::Internal(e.to_string()))?;
    if let Some(profiles) = value.get_mut("profiles").and_then(toml::Value::as_table_mut) {
        for (_, profile) in profiles.iter_mut() {
            if let Some(password) = profile.get_mut("password") {
                *password = toml::Value::String(MASK.into());
            }
        }
    }
    Ok(value)
}

fn validate_url(raw: &str) -> Result<(), CliError> {
    url::Url::parse(raw)
        .map(|_| ())
        .map_err(|e| CliError::Validation {
            field: "api-url".into(),
            reason: format!("invalid URL '{raw}': {e}"),
        })
}

/// Create or update a profile in place. Returns whether it already existed.
fn upsert_profile(
    cfg: &mut Config,
    name: &str,
    api_url: Option<String>,
    email: Option<String>,
    set_default: bool,
) -> Result<bool, CliError> {
    if let Some(ref url) = api_url {
        validate_url(url)?;
    }
    let existed = cfg.profiles.contains_key(name);
    let profile = cfg.profiles.entry(name.to_owned()).or_insert_with(|| Profile {
        api_url: DEFAULT_API_URL.into(),
        ..Profile::default()
    });
    if let Some(url) = api_url {
        profile.api_url = url;
    }
    if email.is_some() {
        profile.email = email;
    }
    if set_default || cfg.profiles.len() == 1 {
        cfg.default_profile = Some(name.to_owned());
    }
    Ok(existed)
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init {
            name,
            api_url,
            email,
            set_default,
        } => {
            let name = name
                .or_else(|| global.profile.clone())
                .unwrap_or_else(|| "default".into());
            let mut cfg = config::load_config_or_default();
            let existed = upsert_profile(&mut cfg, &name, api_url, email, set_default)?;
            let path = config::save_config(&cfg)?;

            if !global.quiet {
                let verb = if existed { "Updated" } else { "Created" };
                eprintln!("{verb} profile '{name}' in {}", path.display());
                eprintln!("Log in with: autouni login --profile {name}");
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let value = redacted(&cfg)?;
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => {
                    toml::to_string_pretty(&value).map_err(|e| CliError::Internal(e.to_string()))?
                }
                OutputFormat::Json => output::render_json(&value, false),
                OutputFormat::JsonCompact => output::render_json(&value, true),
                OutputFormat::Yaml => output::render_yaml(&value),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}
