//! Device command handlers.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tabled::Tabled;

use autouni_api::rest::models::DeviceStats;
use autouni_core::{
    BulkOutcome, BulkStatus, Command as CoreCommand, CommandResult, ControlAck, Controller,
    CoreError, Device, DeviceCommand, DeviceId,
};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output::{self, or_dash};

use super::util;

// ── Views ────────────────────────────────────────────────────────────

/// A device plus its derived online state, as printed.
#[derive(Serialize)]
struct DeviceView {
    #[serde(flatten)]
    device: Arc<Device>,
    online: bool,
}

impl DeviceView {
    fn new(device: Arc<Device>, now: DateTime<Utc>, threshold: Duration) -> Self {
        let online = device.is_online_at(now, threshold);
        Self { device, online }
    }
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Room")]
    room: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

impl DeviceRow {
    fn from_view(view: &DeviceView, color: bool) -> Self {
        let d = &view.device;
        Self {
            id: d.id.to_string(),
            name: d.name.clone(),
            kind: d.kind.as_wire().into(),
            room: or_dash(d.room_id.as_ref()),
            status: output::paint_status(d.status, color),
            online: if view.online { "yes" } else { "no" }.into(),
            last_seen: or_dash(d.last_seen.map(|t| t.format("%Y-%m-%d %H:%M:%S"))),
        }
    }
}

fn detail(view: &DeviceView) -> String {
    let d = &view.device;
    let mut lines = vec![
        format!("ID:          {}", d.id),
        format!("Name:        {}", d.name),
        format!("Type:        {}", d.kind.as_wire()),
        format!("Room:        {}", or_dash(d.room_id.as_ref())),
        format!("Status:      {}", d.status.as_wire()),
        format!("Online:      {}", if view.online { "yes" } else { "no" }),
        format!("Intensity:   {}", or_dash(d.intensity)),
        format!("Temperature: {}", or_dash(d.temperature)),
        format!("MQTT Topic:  {}", or_dash(d.mqtt_topic.as_deref())),
        format!("Last Seen:   {}", or_dash(d.last_seen.map(|t| t.to_rfc3339()))),
    ];
    if !d.metadata.is_empty() {
        lines.push("Metadata:".into());
        for (key, value) in d.metadata.iter() {
            lines.push(format!("  {key}: {value}"));
        }
    }
    lines.join("\n")
}

fn stats_detail(s: &DeviceStats) -> String {
    let mut lines = vec![
        format!("Total:  {}", s.total_devices),
        format!("Active: {}", s.active_devices),
    ];
    for (label, counts) in [("By type", &s.by_type), ("By status", &s.by_status)] {
        if let Some(counts) = counts {
            let mut counts: Vec<_> = counts.iter().collect();
            counts.sort();
            lines.push(format!("{label}:"));
            for (key, n) in counts {
                lines.push(format!("  {key}: {n}"));
            }
        }
    }
    lines.join("\n")
}

fn ack_detail(ack: &ControlAck) -> String {
    let mut out = format!("{}: {}", ack.device_id, ack.status.as_wire());
    if let Some(ref message) = ack.message {
        out.push_str(&format!(" ({message})"));
    }
    out
}

fn bulk_detail(outcome: &BulkOutcome) -> String {
    let join = |ids: &[DeviceId]| {
        ids.iter()
            .map(DeviceId::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut lines = vec![format!("{} ({})", outcome.summary(), outcome.status())];
    if !outcome.succeeded.is_empty() {
        lines.push(format!("Succeeded: {}", join(&outcome.succeeded)));
    }
    if !outcome.failed.is_empty() {
        lines.push(format!("Failed:    {}", join(&outcome.failed)));
    }
    if !outcome.unconfirmed.is_empty() {
        lines.push(format!("Unconfirmed: {}", join(&outcome.unconfirmed)));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    args: DevicesArgs,
    resolved: Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        DevicesCommand::List(filter) => {
            let (online_only, active_only) = (filter.online, filter.active);
            let (listed, now, threshold) = Controller::oneshot(
                resolved.client,
                resolved.session_store,
                |c| async move {
                    let registry = c.registry();
                    let now = registry.now();
                    let listed = if active_only {
                        registry.list_active_at(now)
                    } else if online_only {
                        registry.list_online_at(now)
                    } else {
                        registry.list_all()
                    };
                    Ok((listed, now, registry.offline_threshold()))
                },
            )
            .await?;

            let mut devices = util::filter_devices(listed, &filter)?;
            devices.sort_by(|a, b| (&a.room_id, &a.name).cmp(&(&b.room_id, &b.name)));
            let views: Vec<DeviceView> = devices
                .into_iter()
                .map(|d| DeviceView::new(d, now, threshold))
                .collect();

            let out = output::render_list(
                &global.output,
                &views,
                |v| DeviceRow::from_view(v, color),
                |v| v.device.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Get { device } => {
            let id = DeviceId::from(device);
            let (found, now, threshold) = Controller::oneshot(
                resolved.client,
                resolved.session_store,
                |c| async move {
                    let result = c.execute(CoreCommand::RefreshDevice { id }).await?;
                    let registry = c.registry();
                    match result {
                        CommandResult::Device(d) => {
                            Ok((Arc::new(*d), registry.now(), registry.offline_threshold()))
                        }
                        other => Err(CoreError::Internal(format!(
                            "unexpected result for device refresh: {other:?}"
                        ))),
                    }
                },
            )
            .await?;

            let view = DeviceView::new(found, now, threshold);
            let out = output::render_single(&global.output, &view, detail, |v| {
                v.device.id.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Stats => {
            let controller = util::controller(&resolved)?;
            util::ensure_session(&controller)?;
            let stats = controller.api().device_stats().await?;
            let out = output::render_single(&global.output, &stats, stats_detail, |s| {
                s.total_devices.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Control {
            device,
            command,
            value,
        } => {
            let command = DeviceCommand::parse(&command, util::parse_value(value))?;
            let id = DeviceId::from(device);
            let ack = Controller::oneshot(
                resolved.client,
                resolved.session_store,
                |c| async move {
                    match c.execute(CoreCommand::ControlDevice { id, command }).await? {
                        CommandResult::Control(ack) => Ok(ack),
                        other => Err(CoreError::Internal(format!(
                            "unexpected result for device control: {other:?}"
                        ))),
                    }
                },
            )
            .await?;

            let out = output::render_single(&global.output, &ack, ack_detail, |a| {
                a.status.as_wire().to_owned()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Bulk { command, devices } => {
            let command = DeviceCommand::parse(&command, None)?;
            let ids = util::device_ids(&devices);
            let outcome = Controller::oneshot(
                resolved.client,
                resolved.session_store,
                |c| async move {
                    match c.execute(CoreCommand::BulkControl { ids, command }).await? {
                        CommandResult::Bulk(outcome) => Ok(outcome),
                        other => Err(CoreError::Internal(format!(
                            "unexpected result for bulk control: {other:?}"
                        ))),
                    }
                },
            )
            .await?;

            let out = output::render_single(&global.output, &outcome, bulk_detail, |o| {
                o.succeeded
                    .iter()
                    .map(DeviceId::as_str)
                    .collect::<Vec<_>>()
                    .join("\n")
            });
            output::print_output(&out, global.quiet);

            match outcome.status() {
                BulkStatus::Complete => Ok(()),
                status => Err(CliError::BulkIncomplete {
                    status: status.to_string(),
                    summary: outcome.summary(),
                    failed: outcome
                        .failed
                        .iter()
                        .chain(&outcome.unconfirmed)
                        .map(DeviceId::as_str)
                        .collect::<Vec<_>>()
                        .join(", "),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autouni_core::{DeviceKind, DeviceMetadata, DeviceStatus};

    fn view(online: bool) -> DeviceView {
        DeviceView {
            device: Arc::new(Device {
                id: DeviceId::from("d1"),
                room_id: None,
                name: "Projector".into(),
                kind: DeviceKind::Projector,
                status: DeviceStatus::Standby,
                metadata: DeviceMetadata::default(),
                reported_online: None,
                intensity: None,
                temperature: Some(21.5),
                mqtt_topic: None,
                last_seen: None,
                created_at: None,
                updated_at: None,
            }),
            online,
        }
    }

    #[test]
    fn row_shows_dashes_for_missing_fields() {
        let row = DeviceRow::from_view(&view(false), false);
        assert_eq!(row.room, "-");
        assert_eq!(row.status, "STANDBY");
        assert_eq!(row.online, "no");
        assert_eq!(row.kind, "PROJECTOR");
    }

    #[test]
    fn json_view_flattens_device_and_adds_online() {
        let json = serde_json::to_value(view(true)).unwrap_or_default();
        assert_eq!(json["id"], "d1");
        assert_eq!(json["status"], "STANDBY");
        assert_eq!(json["online"], true);
    }

    #[test]
    fn bulk_detail_lists_both_sides() {
        let outcome = BulkOutcome {
            requested: vec!["a".into(), "b".into()],
            succeeded: vec!["a".into()],
            failed: vec!["b".into()],
            unconfirmed: Vec::new(),
        };
        let text = bulk_detail(&outcome);
        assert!(text.starts_with("1 of 2 succeeded (partial)"));
        assert!(text.contains("Failed:    b"));
    }

    #[test]
    fn bulk_detail_lists_unconfirmed_devices() {
        let outcome = BulkOutcome {
            requested: vec!["a".into(), "b".into()],
            succeeded: Vec::new(),
            failed: Vec::new(),
            unconfirmed: vec!["a".into(), "b".into()],
        };
        let text = bulk_detail(&outcome);
        assert!(text.starts_with("0 of 2 succeeded, 2 unconfirmed (partial)"));
        assert!(text.contains("Unconfirmed: a, b"));
    }
}
