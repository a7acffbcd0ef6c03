//! Push channel with auto-reconnect.
//!
//! Holds one WebSocket connection to the backend's event gateway and
//! streams parsed [`PushEvent`]s through a [`tokio::sync::broadcast`]
//! channel. Connection state is published on a [`tokio::sync::watch`]
//! channel; reconnects follow a capped exponential backoff.
//!
//! # Example
//!
//! ```rust,ignore
//! use autouni_api::push::{PushHandle, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let ws_url = url::Url::parse("ws://localhost:3001/events")?;
//! let handle = PushHandle::connect(ws_url, ReconnectConfig::default(), token_provider, CancellationToken::new());
//! let mut rx = handle.subscribe();
//!
//! while let Ok(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

// ── Channel capacities ──────────────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

/// Event kinds requested in the `subscribe` frame sent on open.
pub const SUBSCRIBED_EVENTS: [&str; 5] = [
    "device:update",
    "device:status",
    "device:online",
    "energy:alert",
    "notification",
];

/// Supplies the bearer token for each connection attempt, so a token
/// refreshed over REST is picked up on the next reconnect.
pub type TokenProvider = Arc<dyn Fn() -> Option<SecretString> + Send + Sync>;

// ── Events ──────────────────────────────────────────────────────────

/// Partial device state carried by `device:update` and `device:status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUpdateMessage {
    pub device_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub online: Option<bool>,
    #[serde(default)]
    pub intensity: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceOnlineMessage {
    device_id: String,
    online: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
}

/// A typed event received from the push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// `device:update`: any subset of status, online, intensity, temperature.
    DeviceUpdate(DeviceUpdateMessage),
    /// `device:status`: a status change. Frames without a status are dropped.
    DeviceStatus { device_id: String, status: String },
    /// `device:online`
    DeviceOnline { device_id: String, online: bool },
    /// `energy:alert`
    EnergyAlert { message: Option<String> },
    /// `notification`, with the server's timestamp when it sent one.
    Notification {
        message: Option<String>,
        timestamp: Option<DateTime<Utc>>,
    },
}

impl PushEvent {
    /// Wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DeviceUpdate(_) => "device:update",
            Self::DeviceStatus { .. } => "device:status",
            Self::DeviceOnline { .. } => "device:online",
            Self::EnergyAlert { .. } => "energy:alert",
            Self::Notification { .. } => "notification",
        }
    }
}

/// Frame envelope in both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

// ── Connection state ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

// ── ReconnectConfig ─────────────────────────────────────────────────

/// Exponential backoff configuration for push reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 5s.
    pub max_delay: Duration,

    /// Reconnection attempts before giving up until [`PushHandle::restart`].
    /// `None` means retry forever. Default: 5.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            max_retries: Some(5),
        }
    }
}

// ── PushHandle ──────────────────────────────────────────────────────

/// Handle to a running push channel.
///
/// Drop all handles and call [`shutdown`](Self::shutdown) to tear down the
/// background task.
pub struct PushHandle {
    event_tx: broadcast::Sender<Arc<PushEvent>>,
    state_rx: watch::Receiver<ConnectionState>,
    outbound_tx: mpsc::Sender<String>,
    restart: Arc<Notify>,
    cancel: CancellationToken,
}

impl PushHandle {
    /// Spawn the connection loop and return immediately.
    ///
    /// The first connection attempt happens asynchronously; watch
    /// [`state`](Self::state) to see it land.
    pub fn connect(
        ws_url: Url,
        reconnect: ReconnectConfig,
        token: TokenProvider,
        cancel: CancellationToken,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        let restart = Arc::new(Notify::new());

        let ctx = LoopContext {
            ws_url,
            reconnect,
            token,
            event_tx: event_tx.clone(),
            state_tx,
            restart: Arc::clone(&restart),
            cancel: cancel.clone(),
        };
        tokio::spawn(ws_loop(ctx, outbound_rx));

        Self {
            event_tx,
            state_rx,
            outbound_tx,
            restart,
            cancel,
        }
    }

    /// New receiver for the event stream. Slow consumers see
    /// [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PushEvent>> {
        self.event_tx.subscribe()
    }

    /// Watch receiver for the connection state.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn is_connected(&self) -> bool {
        *self.state_rx.borrow() == ConnectionState::Connected
    }

    /// Send a frame to the server.
    ///
    /// Fails with [`Error::PushNotConnected`] when the channel is not
    /// connected; nothing is queued for later.
    pub fn emit(&self, event: &str, data: serde_json::Value) -> Result<(), Error> {
        if !self.is_connected() {
            tracing::warn!(event, "push channel not connected, cannot emit");
            return Err(Error::PushNotConnected);
        }
        let frame = PushEnvelope {
            event: event.to_owned(),
            data,
            timestamp: Some(Utc::now()),
        };
        let text = serde_json::to_string(&frame).map_err(|e| Error::PushConnect(e.to_string()))?;
        self.outbound_tx.try_send(text).map_err(|e| {
            tracing::warn!(event, error = %e, "outbound push queue rejected frame");
            Error::PushNotConnected
        })
    }

    /// Skip the current backoff wait, or revive a channel that exhausted
    /// its reconnect budget. No effect while connected.
    ///
    /// A restart issued while the loop is between states is kept until the
    /// loop next waits.
    pub fn restart(&self) {
        if self.is_connected() {
            return;
        }
        self.restart.notify_one();
    }

    /// Signal the background task to shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ────────────────────────────────────

struct LoopContext {
    ws_url: Url,
    reconnect: ReconnectConfig,
    token: TokenProvider,
    event_tx: broadcast::Sender<Arc<PushEvent>>,
    state_tx: watch::Sender<ConnectionState>,
    restart: Arc<Notify>,
    cancel: CancellationToken,
}

/// Connect → read → on close or error, back off → reconnect.
async fn ws_loop(ctx: LoopContext, mut outbound_rx: mpsc::Receiver<String>) {
    let mut attempt: u32 = 0;

    while !ctx.cancel.is_cancelled() {
        ctx.state_tx.send_replace(ConnectionState::Connecting);

        let opened = tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => break,
            result = open(&ctx.ws_url, (ctx.token)()) => result,
        };

        match opened {
            Ok(stream) => {
                attempt = 0;
                discard_outbound(&mut outbound_rx);
                ctx.state_tx.send_replace(ConnectionState::Connected);
                tracing::info!(url = %ctx.ws_url, "push channel connected");

                match read_until_closed(stream, &ctx.event_tx, &mut outbound_rx, &ctx.cancel).await {
                    Ok(()) => tracing::info!("push channel closed"),
                    Err(e) => tracing::warn!(error = %e, "push channel dropped"),
                }
            }
            Err(e) => tracing::warn!(error = %e, attempt, "push channel connection failed"),
        }

        ctx.state_tx.send_replace(ConnectionState::Disconnected);
        discard_outbound(&mut outbound_rx);
        if ctx.cancel.is_cancelled() {
            break;
        }

        if let Some(max) = ctx.reconnect.max_retries {
            if attempt >= max {
                tracing::error!(max_retries = max, "push reconnection limit reached, waiting for restart");
                tokio::select! {
                    biased;
                    () = ctx.cancel.cancelled() => break,
                    () = ctx.restart.notified() => {
                        tracing::info!("push channel restart requested");
                        attempt = 0;
                        continue;
                    }
                }
            }
        }

        let delay = calculate_backoff(attempt, &ctx.reconnect);
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => break,
            () = ctx.restart.notified() => attempt = 0,
            () = tokio::time::sleep(delay) => attempt += 1,
        }
    }

    ctx.state_tx.send_replace(ConnectionState::Disconnected);
    tracing::debug!("push loop exiting");
}

/// Drop frames accepted for a connection that is gone.
fn discard_outbound(outbound_rx: &mut mpsc::Receiver<String>) {
    let mut dropped = 0usize;
    while outbound_rx.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        tracing::debug!(dropped, "discarded outbound frames from closed connection");
    }
}

// ── Single connection lifecycle ─────────────────────────────────────

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Perform the upgrade, with the bearer token as an `Authorization` header.
async fn open(url: &Url, token: Option<SecretString>) -> Result<WsStream, Error> {
    tracing::debug!(url = %url, "connecting push channel");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::PushConnect(e.to_string()))?;

    let mut request = ClientRequestBuilder::new(uri);
    if let Some(token) = token {
        request = request.with_header("Authorization", format!("Bearer {}", token.expose_secret()));
    }

    let (stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| Error::PushConnect(e.to_string()))?;
    Ok(stream)
}

/// Subscribe, then pump frames both ways until the connection ends.
async fn read_until_closed(
    stream: WsStream,
    event_tx: &broadcast::Sender<Arc<PushEvent>>,
    outbound_rx: &mut mpsc::Receiver<String>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    let (mut write, mut read) = stream.split();

    let subscribe = subscribe_frame();
    write
        .send(tungstenite::Message::text(subscribe))
        .await
        .map_err(|e| Error::PushConnect(e.to_string()))?;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = write.send(tungstenite::Message::Close(None)).await;
                return Ok(());
            }
            Some(text) = outbound_rx.recv() => {
                write
                    .send(tungstenite::Message::text(text))
                    .await
                    .map_err(|e| Error::PushConnect(e.to_string()))?;
            }
            frame = read.next() => match frame {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    parse_and_broadcast(&text, event_tx);
                }
                Some(Ok(tungstenite::Message::Close(frame))) => {
                    if let Some(ref cf) = frame {
                        tracing::info!(code = %cf.code, reason = %cf.reason, "push close frame received");
                    }
                    return Ok(());
                }
                Some(Ok(_)) => {
                    // ping/pong handled by tungstenite; binary ignored
                }
                Some(Err(e)) => return Err(Error::PushConnect(e.to_string())),
                None => return Ok(()),
            },
        }
    }
}

fn subscribe_frame() -> String {
    let frame = PushEnvelope {
        event: "subscribe".into(),
        data: serde_json::json!({ "events": SUBSCRIBED_EVENTS }),
        timestamp: Some(Utc::now()),
    };
    serde_json::to_string(&frame).unwrap_or_default()
}

// ── Frame parsing ───────────────────────────────────────────────────

/// Parse a text frame and broadcast the event inside, if any.
fn parse_and_broadcast(text: &str, event_tx: &broadcast::Sender<Arc<PushEvent>>) {
    if let Some(event) = parse_frame(text) {
        // No subscribers right now is fine.
        let _ = event_tx.send(Arc::new(event));
    }
}

/// Decode one frame. Malformed JSON, unknown kinds and payloads missing
/// required fields yield `None`.
pub fn parse_frame(text: &str) -> Option<PushEvent> {
    let envelope: PushEnvelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(error = %e, "dropping malformed push frame");
            return None;
        }
    };

    let kind = envelope.event.as_str();
    let decoded: Result<Option<PushEvent>, serde_json::Error> = match kind {
        "device:update" => {
            serde_json::from_value(envelope.data).map(|msg| Some(PushEvent::DeviceUpdate(msg)))
        }
        "device:status" => serde_json::from_value::<DeviceUpdateMessage>(envelope.data).map(|msg| {
            msg.status.map(|status| PushEvent::DeviceStatus {
                device_id: msg.device_id,
                status,
            })
        }),
        "device:online" => serde_json::from_value::<DeviceOnlineMessage>(envelope.data).map(|msg| {
            Some(PushEvent::DeviceOnline {
                device_id: msg.device_id,
                online: msg.online,
            })
        }),
        "energy:alert" => Ok(Some(PushEvent::EnergyAlert {
            message: message_of(envelope.data),
        })),
        "notification" => Ok(Some(PushEvent::Notification {
            message: message_of(envelope.data),
            timestamp: envelope.timestamp,
        })),
        other => {
            tracing::debug!(event = other, "ignoring unknown push event kind");
            return None;
        }
    };

    match decoded {
        Ok(Some(event)) => Some(event),
        Ok(None) => {
            tracing::debug!(event = kind, "dropping push frame without a status");
            None
        }
        Err(e) => {
            tracing::warn!(event = kind, error = %e, "dropping push frame with invalid payload");
            None
        }
    }
}

fn message_of(data: serde_json::Value) -> Option<String> {
    serde_json::from_value::<MessageBody>(data)
        .unwrap_or_default()
        .message
}

// ── Backoff calculation ─────────────────────────────────────────────

/// `delay = min(initial * 2^attempt, max)`
pub fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    2u32.checked_pow(attempt)
        .and_then(|factor| config.initial_delay.checked_mul(factor))
        .map_or(config.max_delay, |delay| delay.min(config.max_delay))
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(5));
        assert_eq!(config.max_retries, Some(5));
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let config = ReconnectConfig::default();
        let delays: Vec<u64> = (0..6)
            .map(|n| calculate_backoff(n, &config).as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 5, 5, 5]);
    }

    #[test]
    fn frames_from_a_closed_connection_are_discarded() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.try_send("late-1".to_owned()).unwrap();
        tx.try_send("late-2".to_owned()).unwrap();

        discard_outbound(&mut rx);

        assert!(rx.try_recv().is_err());
        tx.try_send("fresh".to_owned()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "fresh");
    }

    #[test]
    fn backoff_survives_huge_attempt_counts() {
        let config = ReconnectConfig::default();
        assert_eq!(calculate_backoff(64, &config), config.max_delay);
    }

    #[test]
    fn parses_device_update() {
        let frame = r#"{"event":"device:update","data":{"deviceId":"d1","status":"ON","intensity":80},"timestamp":"2026-03-01T10:00:00Z"}"#;
        let event = parse_frame(frame).unwrap();
        assert_eq!(
            event,
            PushEvent::DeviceUpdate(DeviceUpdateMessage {
                device_id: "d1".into(),
                status: Some("ON".into()),
                online: None,
                intensity: Some(80.0),
                temperature: None,
            })
        );
    }

    #[test]
    fn device_status_without_status_is_dropped() {
        let frame = r#"{"event":"device:status","data":{"deviceId":"d1"}}"#;
        assert!(parse_frame(frame).is_none());
    }

    #[test]
    fn notification_keeps_server_timestamp() {
        let frame = r#"{"event":"notification","data":{"message":"Maintenance at 18h"},"timestamp":"2026-03-01T10:00:00Z"}"#;
        let Some(PushEvent::Notification { message, timestamp }) = parse_frame(frame) else {
            panic!("expected a notification");
        };
        assert_eq!(message.as_deref(), Some("Maintenance at 18h"));
        assert_eq!(timestamp.unwrap().to_rfc3339(), "2026-03-01T10:00:00+00:00");
    }

    #[test]
    fn energy_alert_without_message() {
        let frame = r#"{"event":"energy:alert","data":{}}"#;
        assert_eq!(
            parse_frame(frame),
            Some(PushEvent::EnergyAlert { message: None })
        );
    }

    #[test]
    fn unknown_and_malformed_frames_are_dropped() {
        assert!(parse_frame("not json at all").is_none());
        assert!(parse_frame(r#"{"event":"room:occupancy","data":{}}"#).is_none());
        assert!(parse_frame(r#"{"event":"device:online","data":{"deviceId":"d1"}}"#).is_none());
    }

    #[test]
    fn parse_and_broadcast_delivers_to_subscribers() {
        let (tx, mut rx) = broadcast::channel(16);
        parse_and_broadcast(
            r#"{"event":"device:online","data":{"deviceId":"d7","online":false}}"#,
            &tx,
        );
        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind(), "device:online");
    }
}
