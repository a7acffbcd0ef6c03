// ── Device registry ──
//
// The single authoritative map of device id to device state. Only the
// reducer, the dispatcher and full refreshes write to it; everything else
// reads snapshots or subscribes.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::collection::EntityCollection;
use crate::clock::{Clock, SystemClock};
use crate::model::{Device, DeviceId, DevicePatch, RoomId};
use crate::stream::EntityStream;

/// In-memory device registry.
///
/// All operations are total: they never panic and never return errors.
/// Online state is derived at read time from the injected [`Clock`].
pub struct DeviceRegistry {
    devices: EntityCollection<DeviceId, Device>,
    clock: Arc<dyn Clock>,
    offline_threshold: Duration,
}

impl DeviceRegistry {
    pub fn new(offline_threshold: Duration) -> Self {
        Self::with_clock(offline_threshold, Arc::new(SystemClock))
    }

    pub fn with_clock(offline_threshold: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            devices: EntityCollection::new(),
            clock,
            offline_threshold,
        }
    }

    pub fn offline_threshold(&self) -> Duration {
        self.offline_threshold
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Hard reset from a fetch result. Calling twice with the same input
    /// leaves the same contents.
    pub fn replace_all(&self, devices: impl IntoIterator<Item = Device>) {
        self.devices
            .replace_all(devices.into_iter().map(|d| (d.id.clone(), d)));
        debug!(count = self.devices.len(), "registry replaced");
    }

    /// Insert one fetched device, overwriting any previous entry.
    pub fn add(&self, device: Device) {
        self.devices.upsert(device.id.clone(), device);
    }

    /// Merge the present fields of `patch` and stamp `last_seen = now`.
    ///
    /// Never creates a device: returns `false` for an unknown id.
    pub fn upsert_partial(&self, id: &DeviceId, patch: &DevicePatch) -> bool {
        self.upsert_partial_at(id, patch, self.clock.now())
    }

    pub fn upsert_partial_at(&self, id: &DeviceId, patch: &DevicePatch, now: DateTime<Utc>) -> bool {
        let applied = self.devices.update(id, |device| {
            device.apply(patch);
            device.last_seen = Some(now);
        });
        if !applied {
            debug!(device_id = %id, "partial update for unknown device dropped");
        }
        applied
    }

    /// Idempotent.
    pub fn remove(&self, id: &DeviceId) {
        self.devices.remove(id);
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, id: &DeviceId) -> Option<Arc<Device>> {
        self.devices.get(id)
    }

    pub fn list_all(&self) -> Vec<Arc<Device>> {
        self.devices.snapshot().as_ref().clone()
    }

    pub fn list_by_room(&self, room: &RoomId) -> Vec<Arc<Device>> {
        self.filtered(|d| d.room_id.as_ref() == Some(room))
    }

    pub fn list_online(&self) -> Vec<Arc<Device>> {
        self.list_online_at(self.clock.now())
    }

    pub fn list_online_at(&self, now: DateTime<Utc>) -> Vec<Arc<Device>> {
        let threshold = self.offline_threshold;
        self.filtered(|d| d.is_online_at(now, threshold))
    }

    /// Devices that are switched on and derived-online.
    pub fn list_active(&self) -> Vec<Arc<Device>> {
        self.list_active_at(self.clock.now())
    }

    pub fn list_active_at(&self, now: DateTime<Utc>) -> Vec<Arc<Device>> {
        let threshold = self.offline_threshold;
        self.filtered(|d| d.is_active_at(now, threshold))
    }

    /// Derived online state of one device at the current time.
    pub fn is_online(&self, id: &DeviceId) -> Option<bool> {
        let now = self.clock.now();
        self.get(id)
            .map(|d| d.is_online_at(now, self.offline_threshold))
    }

    pub fn subscribe(&self) -> EntityStream<Device> {
        EntityStream::new(self.devices.subscribe())
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn filtered(&self, pred: impl Fn(&Device) -> bool) -> Vec<Arc<Device>> {
        self.devices
            .snapshot()
            .iter()
            .filter(|d| pred(d))
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.devices.len())
            .field("offline_threshold", &self.offline_threshold)
            .finish_non_exhaustive()
    }
}
