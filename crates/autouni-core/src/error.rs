// ── Core error types ──
//
// User-facing errors from autouni-core. Consumers never match on HTTP
// plumbing directly; the `From<autouni_api::Error>` impl translates
// transport-layer failures into domain variants.

use thiserror::Error;

use crate::model::DeviceId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Refresh failed; the persisted session has been cleared.
    #[error("Session expired -- log in again")]
    SessionExpired,

    #[error("Not connected")]
    ControllerDisconnected,

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {id}")]
    DeviceNotFound { id: DeviceId },

    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The backend answered successfully but with content we refuse to
    /// store (e.g. an unknown device status in a command acknowledgement).
    #[error("Invalid response from backend: {message}")]
    InvalidResponse { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Command rejected by backend (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Push channel unavailable")]
    PushUnavailable,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the user must log in again to continue.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired | Self::AuthenticationFailed { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<autouni_api::Error> for CoreError {
    fn from(err: autouni_api::Error) -> Self {
        use autouni_api::Error as Api;

        match err {
            Api::Authentication { message } => Self::AuthenticationFailed { message },
            Api::SessionExpired => Self::SessionExpired,
            Api::NotLoggedIn => Self::AuthenticationFailed {
                message: "not logged in".into(),
            },
            Api::Transport(ref e) if e.is_timeout() => Self::Timeout { timeout_secs: 0 },
            Api::Transport(e) => Self::ConnectionFailed {
                reason: e.to_string(),
            },
            Api::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            Api::Tls(msg) => Self::ConnectionFailed {
                reason: format!("TLS error: {msg}"),
            },
            Api::Api { status: 404, message } => Self::NotFound { message },
            Api::Api { status, message } => Self::Rejected { status, message },
            Api::Deserialization { message, body: _ } => Self::InvalidResponse { message },
            Api::Session(msg) => Self::Internal(format!("session store: {msg}")),
            Api::PushConnect(reason) => Self::ConnectionFailed {
                reason: format!("push channel: {reason}"),
            },
            Api::PushNotConnected => Self::PushUnavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_404_becomes_not_found() {
        let err: CoreError = autouni_api::Error::Api {
            status: 404,
            message: "Device not found".into(),
        }
        .into();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn session_expiry_requires_login() {
        let err: CoreError = autouni_api::Error::SessionExpired.into();
        assert!(err.requires_login());
        let err: CoreError = autouni_api::Error::Timeout { timeout_secs: 30 }.into();
        assert!(!err.requires_login());
    }
}
