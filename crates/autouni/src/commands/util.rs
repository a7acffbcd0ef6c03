//! Shared helpers for command handlers.

use std::sync::Arc;

use serde_json::Value;

use autouni_api::rest::models::{EnergyLevel, EnergyPeriod, EnergyQuery};
use autouni_core::{Controller, CoreError, Device, DeviceId, DeviceKind, DeviceStatus, RoomId};

use crate::cli::{DeviceFilterArgs, EnergyScopeArgs, LevelArg, PeriodArg};
use crate::config::Resolved;
use crate::error::CliError;

/// Build an unconnected controller for the resolved profile.
pub fn controller(resolved: &Resolved) -> Result<Controller, CliError> {
    Ok(Controller::new(
        resolved.client.clone(),
        Arc::clone(&resolved.session_store),
    )?)
}

/// Fail early when no session is stored for this profile.
///
/// Direct REST reads skip `connect()`, so nothing else would catch it
/// before the backend answers 401.
pub fn ensure_session(controller: &Controller) -> Result<(), CliError> {
    let api = controller.api();
    if api.is_authenticated() || api.restore_session().is_some() {
        Ok(())
    } else {
        Err(CoreError::AuthenticationFailed {
            message: "not logged in".into(),
        }
        .into())
    }
}

/// Parse a command value: JSON when it parses, a bare string otherwise.
pub fn parse_value(raw: Option<String>) -> Option<Value> {
    raw.map(|s| serde_json::from_str(&s).unwrap_or(Value::String(s)))
}

// ── Device filters ───────────────────────────────────────────────────

/// Apply `devices list` filters to a registry listing.
pub fn filter_devices(
    devices: Vec<Arc<Device>>,
    filter: &DeviceFilterArgs,
) -> Result<Vec<Arc<Device>>, CliError> {
    let status = filter
        .status
        .as_deref()
        .map(|raw| {
            DeviceStatus::from_wire(&raw.to_ascii_uppercase()).ok_or_else(|| {
                CliError::Validation {
                    field: "status".into(),
                    reason: format!("expected ON, OFF, STANDBY or ERROR, got '{raw}'"),
                }
            })
        })
        .transpose()?;
    let kind = filter.kind.as_deref().map(DeviceKind::from_wire);
    let room = filter.room.as_deref().map(RoomId::from);

    Ok(devices
        .into_iter()
        .filter(|d| status.is_none_or(|s| d.status == s))
        .filter(|d| kind.is_none_or(|k| d.kind == k))
        .filter(|d| room.as_ref().is_none_or(|r| d.room_id.as_ref() == Some(r)))
        .collect())
}

/// Split and dedupe a list of device IDs, keeping first-seen order.
pub fn device_ids(raw: &[String]) -> Vec<DeviceId> {
    let mut ids: Vec<DeviceId> = Vec::with_capacity(raw.len());
    for id in raw.iter().flat_map(|s| s.split(',')).map(str::trim) {
        if id.is_empty() {
            continue;
        }
        let id = DeviceId::from(id);
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

// ── Energy queries ───────────────────────────────────────────────────

pub fn energy_query(args: &EnergyScopeArgs) -> Result<EnergyQuery, CliError> {
    let level = match args.level {
        LevelArg::General => EnergyLevel::General,
        LevelArg::Building => EnergyLevel::Building,
        LevelArg::Floor => EnergyLevel::Floor,
        LevelArg::Room => EnergyLevel::Room,
    };
    if level != EnergyLevel::General && args.id.is_none() {
        return Err(CliError::Validation {
            field: "id".into(),
            reason: format!("--level {} needs --id", level.as_str()),
        });
    }
    let period = match args.period {
        PeriodArg::Today => EnergyPeriod::Today,
        PeriodArg::Week => EnergyPeriod::Week,
        PeriodArg::Month => EnergyPeriod::Month,
        PeriodArg::Custom => EnergyPeriod::Custom,
    };
    Ok(EnergyQuery {
        period,
        level,
        id: args.id.clone(),
        start_date: args.from.clone(),
        end_date: args.to.clone(),
    })
}
