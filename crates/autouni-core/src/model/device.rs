// ── Device domain types ──

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString, IntoStaticStr};

use super::entity_id::{DeviceId, RoomId};

/// Canonical device kind, normalized from the backend's `type` field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[strum(ascii_case_insensitive, serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceKind {
    Light,
    #[strum(serialize = "AC")]
    #[serde(rename = "AC")]
    ClimateControl,
    Projector,
    Speaker,
    Lock,
    Sensor,
    Other,
}

impl DeviceKind {
    /// Parse a wire kind; anything unrecognized is `Other`.
    pub fn from_wire(raw: &str) -> Self {
        raw.parse().unwrap_or(Self::Other)
    }

    pub fn as_wire(self) -> &'static str {
        self.into()
    }
}

/// Operating status reported by the backend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceStatus {
    On,
    Off,
    Standby,
    Error,
}

impl DeviceStatus {
    /// Strict parse: `None` for values outside the enumeration.
    pub fn from_wire(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }

    pub fn as_wire(self) -> &'static str {
        self.into()
    }

    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

// ── Metadata ─────────────────────────────────────────────────────────

/// Open key/value bag carried through from the backend untouched.
///
/// Well-known keys: `brand`, `model`, `power` (rated watts). Everything
/// else is preserved as-is and reachable through [`get`](Self::get).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceMetadata(Map<String, Value>);

impl DeviceMetadata {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Build from an arbitrary JSON value. Non-objects yield an empty bag.
    pub fn from_value(value: Option<Value>) -> Self {
        match value {
            Some(Value::Object(map)) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn brand(&self) -> Option<&str> {
        self.0.get("brand").and_then(Value::as_str)
    }

    pub fn model(&self) -> Option<&str> {
        self.0.get("model").and_then(Value::as_str)
    }

    /// Rated power in watts. Accepts numbers or numeric strings.
    pub fn power_watts(&self) -> Option<f64> {
        match self.0.get("power")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

// ── Device ───────────────────────────────────────────────────────────

/// A device as held in the registry.
///
/// Online state is deliberately absent: it is derived on read from
/// `reported_online` and `last_seen` (see [`Device::is_online_at`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub room_id: Option<RoomId>,
    pub name: String,
    pub kind: DeviceKind,
    pub status: DeviceStatus,
    pub metadata: DeviceMetadata,
    pub reported_online: Option<bool>,
    pub intensity: Option<f64>,
    pub temperature: Option<f64>,
    pub mqtt_topic: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Device {
    /// Derived online state at `now`. The threshold boundary counts as online.
    pub fn is_online_at(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        if self.reported_online == Some(false) {
            return false;
        }
        self.last_seen
            .is_some_and(|seen| now.signed_duration_since(seen) <= threshold)
    }

    /// Status on AND derived-online.
    pub fn is_active_at(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.status.is_on() && self.is_online_at(now, threshold)
    }

    /// Merge the present fields of `patch`. Does not touch `last_seen`.
    pub fn apply(&mut self, patch: &DevicePatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(online) = patch.online {
            self.reported_online = Some(online);
        }
        if let Some(intensity) = patch.intensity {
            self.intensity = Some(intensity);
        }
        if let Some(temperature) = patch.temperature {
            self.temperature = Some(temperature);
        }
    }
}

/// Partial update: only `Some` fields are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DevicePatch {
    pub status: Option<DeviceStatus>,
    pub online: Option<bool>,
    pub intensity: Option<f64>,
    pub temperature: Option<f64>,
}

impl DevicePatch {
    pub fn status(status: DeviceStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn online(online: bool) -> Self {
        Self {
            online: Some(online),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
