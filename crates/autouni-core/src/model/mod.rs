// ── Domain model ──

pub mod device;
pub mod entity_id;
pub mod notification;

pub use device::{Device, DeviceKind, DeviceMetadata, DevicePatch, DeviceStatus};
pub use entity_id::{DeviceId, RoomId};
pub use notification::{Notice, NoticeLevel};
