// ── Event reducer ──
//
// Applies typed device events to the registry, strictly in the order they
// are fed. No history is kept: if two updates for the same device arrive
// out of causal order, the later-applied one wins.

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::model::{DeviceId, DevicePatch, DeviceStatus, Notice, NoticeLevel};
use crate::store::DeviceRegistry;

pub const ENERGY_ALERT_TITLE: &str = "Energy consumption alert";
pub const ENERGY_ALERT_DEFAULT: &str = "High consumption detected";
pub const SYSTEM_NOTICE_TITLE: &str = "System notification";
pub const SYSTEM_NOTICE_DEFAULT: &str = "New notification";
pub const OFFLINE_TITLE: &str = "Device offline";

/// A typed real-time event.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// Any subset of status, online, intensity, temperature.
    DeviceUpdated { id: DeviceId, patch: DevicePatch },
    DeviceStatusChanged { id: DeviceId, status: DeviceStatus },
    /// Authoritative online override from the backend.
    DeviceOnlineChanged { id: DeviceId, online: bool },
    EnergyAlert { message: Option<String> },
    SystemNotification {
        message: Option<String>,
        timestamp: Option<DateTime<Utc>>,
    },
}

/// What applying one event did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reduction {
    /// Whether the registry was written.
    pub applied: bool,
    /// Notices for the notification layer, in emission order.
    pub notices: Vec<Notice>,
}

/// Apply one event at the registry clock's current time.
pub fn apply(registry: &DeviceRegistry, event: &DeviceEvent) -> Reduction {
    apply_at(registry, event, registry.now())
}

pub fn apply_at(registry: &DeviceRegistry, event: &DeviceEvent, now: DateTime<Utc>) -> Reduction {
    trace!(?event, "reducing");
    match event {
        DeviceEvent::DeviceUpdated { id, patch } => Reduction {
            applied: registry.upsert_partial_at(id, patch, now),
            notices: Vec::new(),
        },
        DeviceEvent::DeviceStatusChanged { id, status } => Reduction {
            applied: registry.upsert_partial_at(id, &DevicePatch::status(*status), now),
            notices: Vec::new(),
        },
        DeviceEvent::DeviceOnlineChanged { id, online } => {
            let applied = registry.upsert_partial_at(id, &DevicePatch::online(*online), now);
            let mut notices = Vec::new();
            if applied && !online {
                let label = registry
                    .get(id)
                    .map_or_else(|| id.to_string(), |d| d.name.clone());
                debug!(device_id = %id, "device reported offline");
                notices.push(
                    Notice::new(
                        NoticeLevel::Warning,
                        OFFLINE_TITLE,
                        format!("Device {label} is offline"),
                        now,
                    )
                    .for_device(id.clone()),
                );
            }
            Reduction { applied, notices }
        }
        DeviceEvent::EnergyAlert { message } => Reduction {
            applied: false,
            notices: vec![Notice::new(
                NoticeLevel::Warning,
                ENERGY_ALERT_TITLE,
                message.as_deref().unwrap_or(ENERGY_ALERT_DEFAULT),
                now,
            )],
        },
        DeviceEvent::SystemNotification { message, timestamp } => Reduction {
            applied: false,
            notices: vec![Notice::new(
                NoticeLevel::Info,
                SYSTEM_NOTICE_TITLE,
                message.as_deref().unwrap_or(SYSTEM_NOTICE_DEFAULT),
                timestamp.unwrap_or(now),
            )],
        },
    }
}
