// ── Client-side stores ──

mod collection;
mod notifications;
mod registry;

pub use collection::Snapshot;
pub use notifications::{MAX_NOTICES, NotificationFeed};
pub use registry::DeviceRegistry;
