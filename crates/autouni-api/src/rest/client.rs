// AutoUni REST client
//
// Wraps `reqwest::Client` with bearer-token injection from the session
// store, the single refresh-and-retry on 401, and JSON response decoding.
// Endpoint groups (devices, energy, etc.) are inherent methods in sibling
// files so this module stays focused on transport mechanics.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Error;
use crate::rest::models::{RefreshRequest, RefreshResponse};
use crate::session::{self, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SessionEvent, SessionStore};
use crate::transport::TransportConfig;

// ── Error response shape ────────────────────────────────────────────

/// Backend error body. `message` is either a string or a list of
/// validation messages.
#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorResponse {
    fn into_message(self) -> Option<String> {
        match self.message {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_owned))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            _ => self.error,
        }
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// Async client for the AutoUni REST backend.
///
/// Every request carries `Authorization: Bearer <accessToken>` when the
/// session store holds one. A 401 triggers exactly one token refresh and
/// one retry of the original request; if the refresh fails the persisted
/// session is cleared and [`SessionEvent::Expired`] is published.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
    store: Arc<dyn SessionStore>,
    /// Serialises refreshes so concurrent 401s trigger a single refresh.
    refresh_lock: Mutex<()>,
    session_tx: watch::Sender<SessionEvent>,
}

impl ApiClient {
    // ── Constructors ────────────────────────────────────────────────

    pub fn new(
        base_url: &str,
        transport: &TransportConfig,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(base_url, http, transport.timeout_secs(), store)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(
        base_url: &str,
        http: reqwest::Client,
        timeout_secs: u64,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        let initial = if store.get(ACCESS_TOKEN_KEY).is_some() {
            SessionEvent::Authenticated
        } else {
            SessionEvent::Anonymous
        };
        let (session_tx, _) = watch::channel(initial);
        Ok(Self {
            http,
            base_url,
            timeout_secs,
            store,
            refresh_lock: Mutex::new(()),
            session_tx,
        })
    }

    /// Ensure the base path ends with `/` so relative joins append.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session_store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Subscribe to session lifecycle changes.
    pub fn session_events(&self) -> watch::Receiver<SessionEvent> {
        self.session_tx.subscribe()
    }

    /// The current access token, for authenticating the push channel.
    pub fn access_token(&self) -> Option<SecretString> {
        self.store.get(ACCESS_TOKEN_KEY).map(SecretString::from)
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.get(ACCESS_TOKEN_KEY).is_some()
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        self.session_tx.send_replace(event);
    }

    // ── Token refresh ───────────────────────────────────────────────

    /// Exchange the stored refresh token for a new access token.
    ///
    /// `POST /auth/refresh` with `{refreshToken}`. Stores the new tokens
    /// and returns the access token. Does not touch the session on failure.
    pub async fn refresh_access_token(&self) -> Result<String, Error> {
        let refresh_token = self.store.get(REFRESH_TOKEN_KEY).ok_or(Error::NotLoggedIn)?;
        let url = self.url("auth/refresh")?;
        debug!("POST {url}");

        let body = RefreshRequest {
            refresh_token: &refresh_token,
        };
        let resp = self.send_once(&Method::POST, &url, &[], Some(&body), None).await?;
        let tokens: RefreshResponse = self.handle_response(resp).await?;

        self.store.set(ACCESS_TOKEN_KEY, &tokens.access_token)?;
        if let Some(ref rotated) = tokens.refresh_token {
            self.store.set(REFRESH_TOKEN_KEY, rotated)?;
        }
        info!("access token refreshed");
        Ok(tokens.access_token)
    }

    /// Obtain a usable token after `rejected` got a 401.
    ///
    /// If another request already refreshed while this one waited on the
    /// lock, its token is reused. A failed refresh ends the session.
    async fn recover_from_rejection(&self, rejected: Option<&str>) -> Result<String, Error> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.store.get(ACCESS_TOKEN_KEY) {
            if rejected != Some(current.as_str()) {
                debug!("token already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        match self.refresh_access_token().await {
            Ok(token) => Ok(token),
            Err(e) => {
                warn!(error = %e, "token refresh failed, clearing session");
                self.expire_session();
                Err(Error::SessionExpired)
            }
        }
    }

    fn expire_session(&self) {
        session::clear(self.store.as_ref());
        self.publish(SessionEvent::Expired);
    }

    // ── Request pipeline ────────────────────────────────────────────

    async fn send_once<B: Serialize + Sync>(
        &self,
        method: &Method,
        url: &Url,
        params: &[(&str, String)],
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<reqwest::Response, Error> {
        let mut builder = self.http.request(method.clone(), url.clone());
        if !params.is_empty() {
            builder = builder.query(params);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder.send().await.map_err(|e| self.map_transport(e))
    }

    fn map_transport(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(e)
        }
    }

    /// Send with the stored bearer token, refreshing once on 401.
    ///
    /// A second 401 after a successful refresh is returned as an
    /// authentication error without another refresh.
    async fn execute<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<reqwest::Response, Error> {
        let url = self.url(path)?;
        if params.is_empty() {
            debug!("{method} {url}");
        } else {
            debug!("{method} {url} params={params:?}");
        }

        let token = self.store.get(ACCESS_TOKEN_KEY);
        let resp = self
            .send_once(&method, &url, params, body, token.as_deref())
            .await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        debug!(%url, "access token rejected, refreshing");
        let fresh = self.recover_from_rejection(token.as_deref()).await?;
        let retry = self
            .send_once(&method, &url, params, body, Some(&fresh))
            .await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "request rejected after token refresh".into(),
            });
        }
        Ok(retry)
    }

    // ── HTTP verbs ──────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let resp = self.execute(Method::GET, path, &[], None::<&()>).await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let resp = self.execute(Method::GET, path, params, None::<&()>).await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let resp = self.execute(Method::POST, path, &[], Some(body)).await?;
        self.handle_response(resp).await
    }

    /// POST without a body, decoding the response.
    pub(crate) async fn post_action<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let resp = self.execute(Method::POST, path, &[], None::<&()>).await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn post_no_response<B: Serialize + Sync>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), Error> {
        let resp = self.execute(Method::POST, path, &[], body).await?;
        self.handle_empty(resp).await
    }

    pub(crate) async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let resp = self.execute(Method::PATCH, path, &[], Some(body)).await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), Error> {
        let resp = self.execute(Method::DELETE, path, &[], None::<&()>).await?;
        self.handle_empty(resp).await
    }

    /// Unauthenticated POST that never enters the refresh path (login).
    pub(crate) async fn post_anonymous<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");
        let resp = self
            .send_once(&Method::POST, &url, &[], Some(body), None)
            .await?;
        self.handle_response(resp).await
    }

    // ── Response handling ───────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await.map_err(|e| self.map_transport(e))?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn parse_error(status: StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(ErrorResponse::into_message)
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                }
            });

        if status == StatusCode::UNAUTHORIZED {
            Error::Authentication { message }
        } else {
            Error::Api {
                status: status.as_u16(),
                message,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_joined() {
        let parsed: ErrorResponse =
            serde_json::from_str(r#"{"message":["command must be a string","value is required"]}"#)
                .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(
            parsed.into_message().as_deref(),
            Some("command must be a string; value is required")
        );
    }

    #[test]
    fn error_field_is_the_fallback_message() {
        let parsed: ErrorResponse = serde_json::from_str(r#"{"error":"Not Found"}"#)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(parsed.into_message().as_deref(), Some("Not Found"));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = ApiClient::normalize_base_url("http://localhost:3000/api/v1")
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(url.as_str(), "http://localhost:3000/api/v1/");
        assert_eq!(
            url.join("devices/d1/control")
                .unwrap_or_else(|e| panic!("{e}"))
                .as_str(),
            "http://localhost:3000/api/v1/devices/d1/control"
        );
    }
}
