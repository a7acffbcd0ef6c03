// ── Client-side notices ──
//
// Notices are what the reducer hands to the notification layer. They are
// local to this client and never written back to the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use super::entity_id::DeviceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    /// Device the notice is about, when there is one.
    pub device_id: Option<DeviceId>,
}

impl Notice {
    pub fn new(
        level: NoticeLevel,
        title: impl Into<String>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            title: title.into(),
            message: message.into(),
            timestamp,
            read: false,
            device_id: None,
        }
    }

    pub fn for_device(mut self, id: DeviceId) -> Self {
        self.device_id = Some(id);
        self
    }
}
