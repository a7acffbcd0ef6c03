//! Real-time device state layer between `autouni-api` and UI consumers.
//!
//! - **[`Controller`]**: lifecycle facade. [`connect()`](Controller::connect)
//!   restores the session, loads the registry, then spawns the push bridge,
//!   the periodic refresh and the command processor.
//!   [`Controller::oneshot()`] runs a single CLI-style request cycle.
//!
//! - **[`DeviceRegistry`]**: the authoritative `DeviceId → Device` map.
//!   Online state is derived on read from `last_seen` and the configured
//!   offline threshold, never stored.
//!
//! - **[`reducer`]**: applies typed [`DeviceEvent`]s in arrival order and
//!   yields [`Notice`]s for the [`NotificationFeed`].
//!
//! - **[`CommandDispatcher`]**: confirm-after-success device control, with
//!   per-device bulk outcomes.
//!
//! - **[`EntityStream<T>`]**: watch-channel subscriptions with
//!   `current()` / `latest()` / `changed()`.

pub mod clock;
pub mod command;
pub mod config;
pub mod controller;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod reducer;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use autouni_api::{ConnectionState, SessionEvent};
pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{Command, CommandResult};
pub use config::ClientConfig;
pub use controller::Controller;
pub use dispatch::{BulkOutcome, BulkStatus, CommandDispatcher, ControlAck, DeviceCommand};
pub use error::CoreError;
pub use reducer::{DeviceEvent, Reduction};
pub use store::{DeviceRegistry, NotificationFeed};
pub use stream::EntityStream;

pub use model::{
    Device, DeviceId, DeviceKind, DeviceMetadata, DevicePatch, DeviceStatus, Notice, NoticeLevel,
    RoomId,
};
