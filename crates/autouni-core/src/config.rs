// ── Client configuration ──
//
// Everything the controller needs to reach the backend. Built directly by
// library consumers or from a profile by `autouni-config`.

use std::time::Duration;

use autouni_api::{ReconnectConfig, TlsMode, TransportConfig};
use url::Url;

use crate::error::CoreError;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_WS_URL: &str = "ws://localhost:3001";

/// Connection and timing parameters for a [`Controller`](crate::Controller).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST base URL.
    pub api_url: Url,
    /// Push channel URL (`ws://` or `wss://`).
    pub ws_url: Url,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// A device not heard from for longer than this reads as offline.
    pub offline_threshold: Duration,
    /// Push channel backoff policy.
    pub reconnect: ReconnectConfig,
    /// Full re-fetch interval. Zero disables polling.
    pub refresh_interval: Duration,
    /// Whether `connect()` opens the push channel.
    pub push_enabled: bool,
    /// TLS mode for REST calls. The push channel always verifies `wss://`
    /// certificates against the bundled web roots and ignores this setting.
    pub tls: TlsMode,
}

impl Default for ClientConfig {
    #[allow(clippy::unwrap_used)] // constant literals
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.parse().unwrap(),
            ws_url: DEFAULT_WS_URL.parse().unwrap(),
            timeout: Duration::from_secs(30),
            offline_threshold: Duration::from_secs(5 * 60),
            reconnect: ReconnectConfig::default(),
            refresh_interval: Duration::from_secs(60),
            push_enabled: true,
            tls: TlsMode::System,
        }
    }
}

impl ClientConfig {
    /// Config pointing at `api_url`, with the push URL derived from it
    /// (`http` → `ws`, `https` → `wss`, same host, port + 1 when explicit).
    pub fn for_api(api_url: &str) -> Result<Self, CoreError> {
        let api_url = parse_url(api_url)?;
        let ws_url = derive_ws_url(&api_url)?;
        Ok(Self {
            api_url,
            ws_url,
            ..Self::default()
        })
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
        }
    }

    /// Whether `tls` asks for something the push channel will not honour:
    /// a non-default mode combined with a `wss://` push URL.
    pub fn push_ignores_tls_mode(&self) -> bool {
        self.push_enabled
            && self.ws_url.scheme() == "wss"
            && !matches!(self.tls, TlsMode::System)
    }

    /// Offline threshold as a signed chrono duration for timestamp math.
    pub fn offline_threshold_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.offline_threshold).unwrap_or(chrono::Duration::MAX)
    }
}

pub fn parse_url(raw: &str) -> Result<Url, CoreError> {
    Url::parse(raw).map_err(|e| CoreError::Config {
        message: format!("invalid URL '{raw}': {e}"),
    })
}

fn derive_ws_url(api: &Url) -> Result<Url, CoreError> {
    let scheme = if api.scheme() == "https" { "wss" } else { "ws" };
    let host = api.host_str().ok_or_else(|| CoreError::Config {
        message: format!("URL has no host: {api}"),
    })?;
    let raw = match api.port() {
        Some(port) => format!("{scheme}://{host}:{}", port.saturating_add(1)),
        None => format!("{scheme}://{host}"),
    };
    parse_url(&raw)
}
