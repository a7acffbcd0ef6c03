//! CLI configuration: a thin layer over `autouni_config`.
//!
//! Resolves the active profile and applies `GlobalOpts` overrides
//! (--api-url, --ws-url, --insecure, --timeout) on top of it.

use std::sync::Arc;
use std::time::Duration;

use autouni_api::{SessionStore, TlsMode};
use autouni_core::ClientConfig;
use autouni_core::config::parse_url;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use autouni_config::{
    Config, FileSessionStore, Profile, config_path, load_config_or_default, save_config,
    session_path,
};

/// Everything a backend-bound command needs.
pub struct Resolved {
    pub profile_name: String,
    pub profile: Profile,
    pub client: ClientConfig,
    pub session_store: Arc<dyn SessionStore>,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Load config from disk and resolve it against the global flags.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    resolve_with(global, &load_config_or_default())
}

/// Resolve a `ClientConfig` for the active profile.
///
/// Precedence: CLI flag / env var > profile > `[defaults]`. A missing
/// profile is tolerated only when `--api-url` supplies the backend.
pub fn resolve_with(global: &GlobalOpts, cfg: &Config) -> Result<Resolved, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let profile = match (cfg.profiles.get(&profile_name), global.api_url.as_deref()) {
        (Some(profile), _) => profile.clone(),
        (None, Some(api_url)) => Profile {
            api_url: api_url.to_owned(),
            ..Profile::default()
        },
        (None, None) if global.profile.is_some() => {
            let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
            names.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    let mut client = autouni_config::profile_to_client_config(&profile)?;

    if let Some(ref api_url) = global.api_url {
        let ws_before = client.ws_url.clone();
        let derived = ClientConfig::for_api(api_url).map_err(|_| CliError::Validation {
            field: "api-url".into(),
            reason: format!("invalid URL: {api_url}"),
        })?;
        client.api_url = derived.api_url;
        // An explicit ws_url in the profile survives an --api-url override.
        client.ws_url = if profile.ws_url.is_some() {
            ws_before
        } else {
            derived.ws_url
        };
    }

    if let Some(ref ws_url) = global.ws_url {
        client.ws_url = parse_url(ws_url).map_err(|_| CliError::Validation {
            field: "ws-url".into(),
            reason: format!("invalid URL: {ws_url}"),
        })?;
    }

    if global.insecure {
        client.tls = TlsMode::DangerAcceptInvalid;
    }

    let timeout = global
        .timeout
        .or(profile.timeout)
        .unwrap_or(cfg.defaults.timeout);
    client.timeout = Duration::from_secs(timeout);

    let session_store: Arc<dyn SessionStore> =
        Arc::new(FileSessionStore::open(session_path(&profile_name)));

    Ok(Resolved {
        profile_name,
        profile,
        client,
        session_store,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["autouni"];
        argv.extend_from_slice(args);
        argv.push("whoami");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with(name: &str, profile: Profile) -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(name.into(), profile);
        cfg
    }

    #[test]
    fn missing_profile_without_url_is_no_config() {
        let err = resolve_with(&global(&[]), &Config::default())
            .err()
            .unwrap();
        assert!(matches!(err, CliError::NoConfig { .. }));
    }

    #[test]
    fn unknown_named_profile_lists_available() {
        let cfg = config_with(
            "lab",
            Profile {
                api_url: "http://lab:3000".into(),
                ..Profile::default()
            },
        );
        let err = resolve_with(&global(&["--profile", "nope"]), &cfg)
            .err()
            .unwrap();
        match err {
            CliError::ProfileNotFound { name, available } => {
                assert_eq!(name, "nope");
                assert_eq!(available, "lab");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn api_url_flag_works_without_profile() {
        let resolved =
            resolve_with(&global(&["--api-url", "http://campus:8080"]), &Config::default())
                .unwrap();
        assert_eq!(resolved.client.api_url.as_str(), "http://campus:8080/");
        assert_eq!(resolved.client.ws_url.as_str(), "ws://campus:8081/");
        assert_eq!(resolved.client.timeout, Duration::from_secs(30));
    }

    #[test]
    fn flags_override_profile() {
        let cfg = config_with(
            "default",
            Profile {
                api_url: "http://lab:3000".into(),
                ws_url: Some("ws://push.lab:9000".into()),
                timeout: Some(10),
                ..Profile::default()
            },
        );
        let resolved = resolve_with(
            &global(&["--api-url", "http://other:3000", "--timeout", "5", "-k"]),
            &cfg,
        )
        .unwrap();
        assert_eq!(resolved.client.api_url.as_str(), "http://other:3000/");
        assert_eq!(resolved.client.ws_url.as_str(), "ws://push.lab:9000/");
        assert_eq!(resolved.client.timeout, Duration::from_secs(5));
        assert!(matches!(resolved.client.tls, TlsMode::DangerAcceptInvalid));

        let from_profile = resolve_with(&global(&[]), &cfg).unwrap();
        assert_eq!(from_profile.client.timeout, Duration::from_secs(10));
    }
}
