//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use autouni_config::ConfigError;
use autouni_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PARTIAL: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the backend")]
    #[diagnostic(
        code(autouni::connection_failed),
        help(
            "Check that the backend is running and the API URL is right.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Push channel is not connected")]
    #[diagnostic(
        code(autouni::push_unavailable),
        help("Live updates need a reachable push endpoint. Check --ws-url.")
    )]
    PushUnavailable,

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(autouni::auth_failed),
        help("Log in again with: autouni login --profile {profile}")
    )]
    AuthFailed { profile: String, message: String },

    #[error("Session expired")]
    #[diagnostic(
        code(autouni::session_expired),
        help("Log in again with: autouni login --profile {profile}")
    )]
    SessionExpired { profile: String },

    #[error("No password available for profile '{profile}'")]
    #[diagnostic(
        code(autouni::no_credentials),
        help(
            "Set AUTOUNI_PASSWORD, configure password_env in the profile,\n\
             or log in interactively and pass --save to use the keyring."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(autouni::not_found),
        help("Run: autouni {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Backend ──────────────────────────────────────────────────────

    #[error("Backend rejected the request ({status}): {message}")]
    #[diagnostic(code(autouni::rejected))]
    Rejected { status: u16, message: String },

    #[error("Unexpected response from backend: {message}")]
    #[diagnostic(code(autouni::invalid_response))]
    InvalidResponse { message: String },

    #[error("Bulk command {status}: {summary}")]
    #[diagnostic(
        code(autouni::bulk_incomplete),
        help("Devices not confirmed as changed: {failed}")
    )]
    BulkIncomplete {
        status: String,
        summary: String,
        failed: String,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(autouni::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(autouni::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: autouni config init --name {name} --api-url <URL>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No backend configured")]
    #[diagnostic(
        code(autouni::no_config),
        help(
            "Create a profile with: autouni config init --api-url <URL>\n\
             Or pass --api-url / set AUTOUNI_API_URL.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(autouni::config))]
    Config(ConfigError),

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(autouni::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(autouni::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::PushUnavailable => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::SessionExpired { .. } | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::BulkIncomplete { .. } => exit_code::PARTIAL,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the active profile name to auth errors raised below the CLI.
    pub fn with_profile(self, name: &str) -> Self {
        match self {
            Self::AuthFailed { message, .. } => Self::AuthFailed {
                profile: name.into(),
                message,
            },
            Self::SessionExpired { .. } => Self::SessionExpired {
                profile: name.into(),
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },

            CoreError::ControllerDisconnected => CliError::ConnectionFailed {
                reason: "client is not connected".into(),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "default".into(),
                message,
            },

            CoreError::SessionExpired => CliError::SessionExpired {
                profile: "default".into(),
            },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::DeviceNotFound { id } => CliError::NotFound {
                resource_type: "device".into(),
                identifier: id.into_inner(),
                list_command: "devices list".into(),
            },

            CoreError::NotFound { message } => CliError::NotFound {
                resource_type: "resource".into(),
                identifier: message,
                list_command: "--help".into(),
            },

            CoreError::Rejected { status, message } => CliError::Rejected { status, message },

            CoreError::InvalidResponse { message } => CliError::InvalidResponse { message },

            CoreError::PushUnavailable => CliError::PushUnavailable,

            CoreError::Config { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

impl From<autouni_api::Error> for CliError {
    fn from(err: autouni_api::Error) -> Self {
        CoreError::from(err).into()
    }
}
