// ── Command API ──
//
// Write operations flow through a single `Command` enum, processed in
// order by the controller's command task.

use crate::dispatch::{BulkOutcome, ControlAck, DeviceCommand};
use crate::error::CoreError;
use crate::model::{Device, DeviceId};

/// A command envelope sent through the command channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All write operations a connected controller accepts.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Device control ───────────────────────────────────────────────
    ControlDevice {
        id: DeviceId,
        command: DeviceCommand,
    },
    BulkControl {
        ids: Vec<DeviceId>,
        command: DeviceCommand,
    },

    // ── Registry maintenance ─────────────────────────────────────────
    /// Re-fetch one device and insert it into the registry.
    RefreshDevice { id: DeviceId },
    /// Drop a device from the local registry. Backend untouched.
    ForgetDevice { id: DeviceId },
}

/// Result of a [`Command`].
#[derive(Debug, Clone)]
pub enum CommandResult {
    Ok,
    Control(ControlAck),
    Bulk(BulkOutcome),
    Device(Box<Device>),
}
