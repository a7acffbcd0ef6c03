// ── API-to-domain type conversions ──
//
// Bridges raw `autouni_api` wire types into canonical `autouni_core::model`
// domain types. Status strings are parsed strictly here so that nothing
// outside the enumeration ever reaches the registry.

use autouni_api::PushEvent;
use autouni_api::rest::models::DeviceRecord;
use tracing::warn;

use crate::model::{Device, DeviceId, DeviceKind, DeviceMetadata, DevicePatch, DeviceStatus, RoomId};
use crate::reducer::DeviceEvent;

// ── Devices ──────────────────────────────────────────────────────────

impl From<DeviceRecord> for Device {
    /// Bulk-fetch conversion. An unknown status becomes `Error`.
    fn from(r: DeviceRecord) -> Self {
        let status = DeviceStatus::from_wire(&r.status).unwrap_or_else(|| {
            warn!(device_id = %r.id, status = %r.status, "unknown device status, storing as ERROR");
            DeviceStatus::Error
        });

        Device {
            id: DeviceId::from(r.id),
            room_id: r.room_id.map(RoomId::from),
            name: r.name,
            kind: DeviceKind::from_wire(&r.device_type),
            status,
            metadata: DeviceMetadata::from_value(r.metadata),
            reported_online: None,
            intensity: None,
            temperature: None,
            mqtt_topic: r.mqtt_topic,
            last_seen: r.last_seen,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

// ── Push events ──────────────────────────────────────────────────────

impl DeviceEvent {
    /// Translate a push frame into a reducer event.
    ///
    /// `None` when the frame carries nothing applicable (a `device:status`
    /// with a status outside the enumeration). For `device:update` an unknown
    /// status drops only that field.
    pub fn from_push(event: &PushEvent) -> Option<Self> {
        match event {
            PushEvent::DeviceUpdate(msg) => {
                let status = msg
                    .status
                    .as_deref()
                    .and_then(|raw| strict_status(&msg.device_id, raw));
                Some(Self::DeviceUpdated {
                    id: DeviceId::from(msg.device_id.as_str()),
                    patch: DevicePatch {
                        status,
                        online: msg.online,
                        intensity: msg.intensity,
                        temperature: msg.temperature,
                    },
                })
            }
            PushEvent::DeviceStatus { device_id, status } => {
                strict_status(device_id, status).map(|status| Self::DeviceStatusChanged {
                    id: DeviceId::from(device_id.as_str()),
                    status,
                })
            }
            PushEvent::DeviceOnline { device_id, online } => Some(Self::DeviceOnlineChanged {
                id: DeviceId::from(device_id.as_str()),
                online: *online,
            }),
            PushEvent::EnergyAlert { message } => Some(Self::EnergyAlert {
                message: message.clone(),
            }),
            PushEvent::Notification { message, timestamp } => Some(Self::SystemNotification {
                message: message.clone(),
                timestamp: *timestamp,
            }),
        }
    }
}

fn strict_status(device_id: &str, raw: &str) -> Option<DeviceStatus> {
    let parsed = DeviceStatus::from_wire(raw);
    if parsed.is_none() {
        warn!(device_id, status = raw, "dropping unknown status from push event");
    }
    parsed
}
