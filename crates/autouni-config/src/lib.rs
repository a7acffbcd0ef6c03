//! Shared configuration for the AutoUni CLI.
//!
//! TOML profiles, password resolution (env + keyring + plaintext), the
//! on-disk session store, and translation to `autouni_core::ClientConfig`.

mod session_file;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use autouni_api::{ReconnectConfig, TlsMode};
use autouni_core::ClientConfig;
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use session_file::FileSessionStore;

const KEYRING_SERVICE: &str = "autouni";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{0}' not found")]
    UnknownProfile(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

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

    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
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
    /// Resolve a profile by explicit name or the configured default.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| (k.as_str(), p))
            .ok_or_else(|| ConfigError::UnknownProfile(name.into()))
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
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
    30
}

/// A named backend profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// REST base URL (e.g. "http://localhost:3000").
    pub api_url: String,

    /// Push channel URL. Derived from `api_url` when absent.
    pub ws_url: Option<String>,

    /// Login email.
    pub email: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid TLS certificates.
    pub insecure: Option<bool>,

    /// Request timeout override (seconds).
    pub timeout: Option<u64>,

    /// Seconds without contact before a device reads as offline.
    pub offline_threshold_secs: Option<u64>,

    /// Full re-fetch interval for long-running commands. 0 disables.
    pub refresh_interval_secs: Option<u64>,

    /// Reconnect attempts before the push channel gives up. 0 = unbounded.
    pub max_reconnect_attempts: Option<u32>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("edu", "autouni", "autouni")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("autouni");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where a profile's persisted session lives.
pub fn session_path(profile_name: &str) -> PathBuf {
    let base = project_dirs().map_or_else(
        || dirs_fallback().join("sessions"),
        |dirs| dirs.data_dir().join("sessions"),
    );
    base.join(format!("{profile_name}.json"))
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults ← TOML file ← `AUTOUNI_*` environment (`__` separates levels,
/// e.g. `AUTOUNI_DEFAULTS__TIMEOUT=10`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("AUTOUNI_").split("__"));

    Ok(figment.extract()?)
}

/// Load config, falling back to defaults on any error.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML at the canonical path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Password resolution ─────────────────────────────────────────────

/// Resolve the login password: profile `password_env` → `AUTOUNI_PASSWORD`
/// → system keyring → plaintext in config.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_password_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        keyring_password,
    )
}

fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Env vars
    let from_env = profile
        .password_env
        .as_deref()
        .and_then(&env)
        .or_else(|| env("AUTOUNI_PASSWORD"));
    if let Some(pw) = from_env {
        return Ok(SecretString::from(pw));
    }

    // 2. Keyring
    if let Some(pw) = keyring(profile_name) {
        return Ok(SecretString::from(pw));
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring_entry(profile_name).ok()?.get_password().ok()
}

/// Store a password in the system keyring for later logins.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password.expose_secret())?;
    Ok(())
}

// ── Profile → ClientConfig ──────────────────────────────────────────

/// Build a `ClientConfig` from a profile, without CLI flag overrides.
pub fn profile_to_client_config(profile: &Profile) -> Result<ClientConfig, ConfigError> {
    let mut cfg = ClientConfig::for_api(&profile.api_url).map_err(|_| ConfigError::Validation {
        field: "api_url".into(),
        reason: format!("invalid URL: {}", profile.api_url),
    })?;

    if let Some(ref ws) = profile.ws_url {
        cfg.ws_url = ws.parse().map_err(|_| ConfigError::Validation {
            field: "ws_url".into(),
            reason: format!("invalid URL: {ws}"),
        })?;
    }

    cfg.tls = if profile.insecure.unwrap_or(false) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    if let Some(secs) = profile.timeout {
        cfg.timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = profile.offline_threshold_secs {
        cfg.offline_threshold = Duration::from_secs(secs);
    }
    if let Some(secs) = profile.refresh_interval_secs {
        cfg.refresh_interval = Duration::from_secs(secs);
    }
    if let Some(attempts) = profile.max_reconnect_attempts {
        cfg.reconnect = ReconnectConfig {
            max_retries: (attempts > 0).then_some(attempts),
            ..ReconnectConfig::default()
        };
    }

    Ok(cfg)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn profile() -> Profile {
        Profile {
            api_url: "http://localhost:3000".into(),
            password: Some("from-file".into()),
            password_env: Some("LAB_PW".into()),
            ..Profile::default()
        }
    }

    fn reveal(secret: &SecretString) -> &str {
        secret.expose_secret()
    }

    #[test]
    fn password_prefers_profile_env_var() {
        let pw = resolve_password_with(
            &profile(),
            "lab",
            |name| (name == "LAB_PW").then(|| "from-env".to_owned()),
            |_| Some("from-keyring".into()),
        )
        .unwrap();
        assert_eq!(reveal(&pw), "from-env");
    }

    #[test]
    fn password_falls_back_to_keyring_then_plaintext() {
        let pw = resolve_password_with(&profile(), "lab", |_| None, |_| Some("from-keyring".into()))
            .unwrap();
        assert_eq!(reveal(&pw), "from-keyring");

        let pw = resolve_password_with(&profile(), "lab", |_| None, |_| None).unwrap();
        assert_eq!(reveal(&pw), "from-file");
    }

    #[test]
    fn missing_password_is_reported_with_profile() {
        let bare = Profile {
            api_url: "http://localhost:3000".into(),
            ..Profile::default()
        };
        let err = resolve_password_with(&bare, "lab", |_| None, |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { profile } if profile == "lab"));
    }

    #[test]
    fn profile_overrides_client_defaults() {
        let p = Profile {
            api_url: "https://building.example.com".into(),
            timeout: Some(5),
            offline_threshold_secs: Some(120),
            refresh_interval_secs: Some(0),
            max_reconnect_attempts: Some(0),
            ..Profile::default()
        };
        let cfg = profile_to_client_config(&p).unwrap();
        assert_eq!(cfg.ws_url.as_str(), "wss://building.example.com/");
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert_eq!(cfg.offline_threshold, Duration::from_secs(120));
        assert!(cfg.refresh_interval.is_zero());
        assert_eq!(cfg.reconnect.max_retries, None);
    }

    #[test]
    fn invalid_api_url_is_validation_error() {
        let p = Profile {
            api_url: "::nope".into(),
            ..Profile::default()
        };
        assert!(matches!(
            profile_to_client_config(&p),
            Err(ConfigError::Validation { field, .. }) if field == "api_url"
        ));
    }

    #[test]
    fn config_round_trips_through_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert(
            "campus".into(),
            Profile {
                api_url: "http://10.0.0.2:3000".into(),
                email: Some("ops@campus.edu".into()),
                ..Profile::default()
            },
        );
        cfg.default_profile = Some("campus".into());
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let (name, profile) = loaded.profile(None).unwrap();
        assert_eq!(name, "campus");
        assert_eq!(profile.email.as_deref(), Some("ops@campus.edu"));
        assert!(matches!(
            loaded.profile(Some("missing")),
            Err(ConfigError::UnknownProfile(_))
        ));
    }
}
