// ── Command dispatcher ──
//
// Confirm-after-success control. A command is sent, and only the status the
// backend acknowledges is written to the registry. Failures leave the
// registry untouched and are returned to the caller; nothing is retried.

use std::collections::HashSet;
use std::sync::Arc;

use autouni_api::ApiClient;
use autouni_api::rest::models::BulkControlResponse;
use serde::Serialize;
use serde_json::Value;
use strum::Display;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{DeviceId, DevicePatch, DeviceStatus};
use crate::store::DeviceRegistry;

// ── Commands ─────────────────────────────────────────────────────────

/// A device command as understood by `POST /devices/{id}/control`.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    On,
    Off,
    /// Flip between on and off. The target status is sent as the value
    /// when the device is known locally.
    Toggle,
    Standby,
    SetIntensity(f64),
    SetTemperature(f64),
    /// Passthrough for backend commands without a dedicated variant.
    Custom { command: String, value: Option<Value> },
}

impl DeviceCommand {
    pub fn wire_name(&self) -> &str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Toggle => "toggle",
            Self::Standby => "standby",
            Self::SetIntensity(_) => "set_intensity",
            Self::SetTemperature(_) => "set_temperature",
            Self::Custom { command, .. } => command,
        }
    }

    /// Status a successful execution leaves the device in, when that is
    /// knowable without the backend's answer.
    pub fn implied_status(&self) -> Option<DeviceStatus> {
        match self {
            Self::On => Some(DeviceStatus::On),
            Self::Off => Some(DeviceStatus::Off),
            Self::Standby => Some(DeviceStatus::Standby),
            Self::Toggle | Self::SetIntensity(_) | Self::SetTemperature(_) | Self::Custom { .. } => {
                None
            }
        }
    }

    /// Parse `on`, `off`, `toggle`, `standby`, `set_intensity`,
    /// `set_temperature`; anything else becomes `Custom`.
    pub fn parse(command: &str, value: Option<Value>) -> Result<Self, CoreError> {
        let numeric = |value: Option<Value>| {
            value.as_ref().and_then(Value::as_f64).ok_or_else(|| CoreError::Config {
                message: format!("command '{command}' needs a numeric value"),
            })
        };
        Ok(match command.to_ascii_lowercase().as_str() {
            "on" => Self::On,
            "off" => Self::Off,
            "toggle" => Self::Toggle,
            "standby" => Self::Standby,
            "set_intensity" => Self::SetIntensity(numeric(value)?),
            "set_temperature" => Self::SetTemperature(numeric(value)?),
            _ => Self::Custom {
                command: command.to_owned(),
                value,
            },
        })
    }

    fn value(&self, current: Option<DeviceStatus>) -> Option<Value> {
        match self {
            Self::SetIntensity(v) | Self::SetTemperature(v) => Some(Value::from(*v)),
            Self::Toggle => current.map(|status| {
                let target = if status.is_on() {
                    DeviceStatus::Off
                } else {
                    DeviceStatus::On
                };
                Value::from(target.as_wire())
            }),
            Self::Custom { value, .. } => value.clone(),
            Self::On | Self::Off | Self::Standby => None,
        }
    }
}

// ── Results ──────────────────────────────────────────────────────────

/// Backend acknowledgement of a single command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlAck {
    pub device_id: DeviceId,
    pub status: DeviceStatus,
    pub message: Option<String>,
    /// Whether the registry held the device and was updated.
    pub applied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BulkStatus {
    Complete,
    Partial,
    Failed,
}

/// Per-device result of a bulk command.
///
/// `unconfirmed` holds ids the backend neither confirmed nor reported as
/// failed, e.g. when `affectedDevices` disagrees with `failedDevices`.
/// They are left untouched in the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkOutcome {
    pub requested: Vec<DeviceId>,
    pub succeeded: Vec<DeviceId>,
    pub failed: Vec<DeviceId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unconfirmed: Vec<DeviceId>,
}

impl BulkOutcome {
    pub fn status(&self) -> BulkStatus {
        if self.failed.is_empty() && self.unconfirmed.is_empty() {
            BulkStatus::Complete
        } else if self.succeeded.is_empty() && self.unconfirmed.is_empty() {
            BulkStatus::Failed
        } else {
            BulkStatus::Partial
        }
    }

    /// "N of M succeeded", plus the unconfirmed count when there is one.
    pub fn summary(&self) -> String {
        let mut text = format!("{} of {} succeeded", self.succeeded.len(), self.requested.len());
        if !self.unconfirmed.is_empty() {
            text.push_str(&format!(", {} unconfirmed", self.unconfirmed.len()));
        }
        text
    }
}

// ── Dispatcher ───────────────────────────────────────────────────────

/// Sends commands and applies confirmed results to the registry.
#[derive(Clone)]
pub struct CommandDispatcher {
    api: Arc<ApiClient>,
    registry: Arc<DeviceRegistry>,
}

impl CommandDispatcher {
    pub fn new(api: Arc<ApiClient>, registry: Arc<DeviceRegistry>) -> Self {
        Self { api, registry }
    }

    /// `POST /devices/{id}/control`, then apply the acknowledged status.
    pub async fn send_command(
        &self,
        id: &DeviceId,
        command: &DeviceCommand,
    ) -> Result<ControlAck, CoreError> {
        let current = self.registry.get(id).map(|d| d.status);
        let value = command.value(current);

        let resp = self
            .api
            .control_device(id.as_str(), command.wire_name(), value.as_ref())
            .await?;

        let status = DeviceStatus::from_wire(&resp.status).ok_or_else(|| {
            CoreError::InvalidResponse {
                message: format!("unknown status '{}' in control response", resp.status),
            }
        })?;

        let applied = self.registry.upsert_partial(id, &DevicePatch::status(status));
        info!(device_id = %id, command = command.wire_name(), %status, applied, "command acknowledged");

        Ok(ControlAck {
            device_id: id.clone(),
            status,
            message: resp.message,
            applied,
        })
    }

    /// `POST /devices/bulk-control`, then apply confirmed statuses to the
    /// devices the backend reports as succeeded.
    pub async fn bulk_command(
        &self,
        ids: &[DeviceId],
        command: &DeviceCommand,
    ) -> Result<BulkOutcome, CoreError> {
        let requested = dedup(ids);
        if requested.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let wire_ids: Vec<String> = requested.iter().map(|id| id.as_str().to_owned()).collect();
        let resp = self.api.bulk_control(&wire_ids, command.wire_name()).await?;

        let BulkResolution {
            confirmed,
            failed,
            unconfirmed,
        } = resolve_bulk(&requested, &resp, command.implied_status());

        let mut succeeded = Vec::with_capacity(confirmed.len());
        for (id, status) in confirmed {
            if let Some(status) = status {
                self.registry.upsert_partial(&id, &DevicePatch::status(status));
            }
            succeeded.push(id);
        }

        let outcome = BulkOutcome {
            requested,
            succeeded,
            failed,
            unconfirmed,
        };
        match outcome.status() {
            BulkStatus::Complete => info!(summary = %outcome.summary(), "bulk command complete"),
            BulkStatus::Partial | BulkStatus::Failed => {
                warn!(
                    summary = %outcome.summary(),
                    failed = ?outcome.failed,
                    unconfirmed = ?outcome.unconfirmed,
                    "bulk command not fully applied"
                );
            }
        }
        Ok(outcome)
    }
}

fn dedup(ids: &[DeviceId]) -> Vec<DeviceId> {
    let mut seen = HashSet::new();
    ids.iter().filter(|id| seen.insert(*id)).cloned().collect()
}

#[derive(Debug, Default, PartialEq)]
struct BulkResolution {
    /// Ids to report as succeeded, with the status to apply if known.
    confirmed: Vec<(DeviceId, Option<DeviceStatus>)>,
    failed: Vec<DeviceId>,
    unconfirmed: Vec<DeviceId>,
}

/// Split requested ids into confirmed, failed, and unconfirmed.
///
/// With per-device `results`, only ids listed there with a known status
/// are confirmed; ids missing from both `results` and `failedDevices`
/// count as failed. Without `results`, the ids outside `failedDevices` are
/// confirmed with the command's implied status only when their count
/// matches `affectedDevices`. A zero count fails them all; any other
/// mismatch leaves them unconfirmed.
fn resolve_bulk(
    requested: &[DeviceId],
    resp: &BulkControlResponse,
    implied: Option<DeviceStatus>,
) -> BulkResolution {
    let reported_failed: HashSet<&str> = resp.failed_devices.iter().map(String::as_str).collect();
    let mut out = BulkResolution::default();

    let mut candidates = Vec::new();
    for id in requested {
        if reported_failed.contains(id.as_str()) {
            out.failed.push(id.clone());
        } else {
            candidates.push(id.clone());
        }
    }

    if let Some(results) = &resp.results {
        for id in candidates {
            let status = results
                .iter()
                .find(|r| r.device_id == id.as_str())
                .map(|r| DeviceStatus::from_wire(&r.status));
            match status {
                Some(Some(status)) => out.confirmed.push((id, Some(status))),
                Some(None) => {
                    warn!(device_id = %id, "bulk result with unknown status counted as failed");
                    out.failed.push(id);
                }
                None => {
                    debug!(device_id = %id, "device missing from bulk results");
                    out.failed.push(id);
                }
            }
        }
        return out;
    }

    let affected = usize::try_from(resp.affected_devices).unwrap_or(usize::MAX);
    if affected == candidates.len() {
        out.confirmed = candidates.into_iter().map(|id| (id, implied)).collect();
    } else if affected == 0 {
        debug!(success = resp.success, "bulk response reports no affected devices");
        out.failed.extend(candidates);
    } else {
        warn!(
            affected,
            unattributed = candidates.len(),
            "affectedDevices does not match failedDevices; leaving devices unconfirmed"
        );
        out.unconfirmed = candidates;
    }
    out
}
