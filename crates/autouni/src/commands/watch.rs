//! Live event stream.
//!
//! Connects with the push channel enabled and prints connection changes,
//! device status/online transitions, and client notices as they happen.
//! Table and plain output print one human-readable line per event; the
//! structured formats print one compact JSON object per line.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use autouni_core::store::Snapshot;
use autouni_core::{ConnectionState, Device, DeviceId, DeviceStatus, Notice, SessionEvent};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Events ───────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WatchEvent {
    Connection {
        #[serde(serialize_with = "serialize_state")]
        state: ConnectionState,
    },
    Status {
        device_id: DeviceId,
        name: String,
        from: Option<DeviceStatus>,
        to: DeviceStatus,
    },
    Online {
        device_id: DeviceId,
        name: String,
        online: bool,
    },
    Removed {
        device_id: DeviceId,
    },
    Notice(Notice),
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_state<S: Serializer>(state: &ConnectionState, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(match state {
        ConnectionState::Disconnected => "disconnected",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Connected => "connected",
    })
}

// ── Snapshot diffing ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
struct Seen {
    status: DeviceStatus,
    online: bool,
}

type SeenMap = HashMap<DeviceId, (String, Seen)>;

fn index(
    devices: &Snapshot<Device>,
    now: DateTime<Utc>,
    threshold: chrono::Duration,
    only: &HashSet<DeviceId>,
) -> SeenMap {
    devices
        .iter()
        .filter(|d| only.is_empty() || only.contains(&d.id))
        .map(|d| {
            let seen = Seen {
                status: d.status,
                online: d.is_online_at(now, threshold),
            };
            (d.id.clone(), (d.name.clone(), seen))
        })
        .collect()
}

/// Events that turn `before` into `after`, in a stable order.
fn diff(before: &SeenMap, after: &SeenMap) -> Vec<WatchEvent> {
    let mut events = Vec::new();

    let mut ids: Vec<_> = after.keys().collect();
    ids.sort();
    for id in ids {
        let (name, now) = &after[id];
        let prev = before.get(id).map(|(_, seen)| *seen);
        if prev.map(|p| p.status) != Some(now.status) {
            events.push(WatchEvent::Status {
                device_id: id.clone(),
                name: name.clone(),
                from: prev.map(|p| p.status),
                to: now.status,
            });
        }
        if prev.is_some_and(|p| p.online != now.online) {
            events.push(WatchEvent::Online {
                device_id: id.clone(),
                name: name.clone(),
                online: now.online,
            });
        }
    }

    let mut gone: Vec<_> = before.keys().filter(|id| !after.contains_key(*id)).collect();
    gone.sort();
    events.extend(gone.into_iter().map(|id| WatchEvent::Removed {
        device_id: id.clone(),
    }));
    events
}

// ── Rendering ────────────────────────────────────────────────────────

fn human_line(event: &WatchEvent, color: bool) -> String {
    let body = match event {
        WatchEvent::Connection { state } => {
            format!("push channel {}", output::paint_connection(*state, color))
        }
        WatchEvent::Status {
            device_id,
            name,
            from: Some(from),
            to,
        } => format!(
            "{name} ({device_id}): {} -> {}",
            from.as_wire(),
            output::paint_status(*to, color)
        ),
        WatchEvent::Status {
            device_id,
            name,
            from: None,
            to,
        } => format!("{name} ({device_id}): {}", output::paint_status(*to, color)),
        WatchEvent::Online {
            device_id,
            name,
            online,
        } => format!(
            "{name} ({device_id}) is {}",
            if *online { "online" } else { "offline" }
        ),
        WatchEvent::Removed { device_id } => format!("{device_id} removed"),
        WatchEvent::Notice(n) => format!(
            "[{}] {}: {}",
            output::paint_level(n.level, color),
            n.title,
            n.message
        ),
    };
    format!("{} {body}", chrono::Local::now().format("%H:%M:%S"))
}

fn emit(event: &WatchEvent, global: &GlobalOpts, color: bool) {
    let line = match global.output {
        OutputFormat::Table | OutputFormat::Plain => human_line(event, color),
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            output::render_json(event, true)
        }
    };
    output::print_output(&line, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: WatchArgs, resolved: Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let only: HashSet<DeviceId> = util::device_ids(&args.device).into_iter().collect();

    let mut client = resolved.client;
    client.push_enabled = true;
    let controller = autouni_core::Controller::new(client, resolved.session_store)?;

    let mut push_state = controller.push_state();
    let mut session = controller.session_events();
    controller.connect().await?;

    let registry = controller.registry();
    let threshold = registry.offline_threshold();
    let mut devices = registry.subscribe();
    let mut notices = controller.notifications().subscribe();

    let mut last = index(devices.current(), registry.now(), threshold, &only);
    let mut shown: HashSet<_> = notices.current().iter().map(|n| n.id).collect();

    if !global.quiet && matches!(global.output, OutputFormat::Table | OutputFormat::Plain) {
        eprintln!("Watching {} device(s). Press Ctrl-C to stop.", last.len());
    }

    let deadline = async {
        match args.duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            () = &mut deadline => break Ok(()),

            Ok(()) = push_state.changed() => {
                let state = *push_state.borrow_and_update();
                emit(&WatchEvent::Connection { state }, global, color);
            }

            Ok(()) = session.changed() => {
                if *session.borrow_and_update() == SessionEvent::Expired {
                    break Err(CliError::SessionExpired { profile: resolved.profile_name.clone() });
                }
            }

            Some(snapshot) = devices.changed() => {
                let next = index(&snapshot, registry.now(), threshold, &only);
                for event in diff(&last, &next) {
                    emit(&event, global, color);
                }
                last = next;
            }

            Some(snapshot) = notices.changed() => {
                // The feed is newest first; print in arrival order.
                for notice in snapshot.iter().rev() {
                    if shown.insert(notice.id) {
                        let relevant = only.is_empty()
                            || notice.device_id.as_ref().is_none_or(|id| only.contains(id));
                        if relevant {
                            emit(&WatchEvent::Notice((**notice).clone()), global, color);
                        }
                    }
                }
            }
        }
    };

    controller.disconnect().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seen(status: DeviceStatus, online: bool) -> (String, Seen) {
        ("Lamp".into(), Seen { status, online })
    }

    #[test]
    fn diff_reports_status_online_and_removal() {
        let before: SeenMap = HashMap::from([
            (DeviceId::from("a"), seen(DeviceStatus::On, true)),
            (DeviceId::from("b"), seen(DeviceStatus::Off, true)),
        ]);
        let after: SeenMap = HashMap::from([
            (DeviceId::from("a"), seen(DeviceStatus::Standby, false)),
            (DeviceId::from("c"), seen(DeviceStatus::On, true)),
        ]);

        let events = diff(&before, &after);
        assert_eq!(
            events,
            vec![
                WatchEvent::Status {
                    device_id: "a".into(),
                    name: "Lamp".into(),
                    from: Some(DeviceStatus::On),
                    to: DeviceStatus::Standby,
                },
                WatchEvent::Online {
                    device_id: "a".into(),
                    name: "Lamp".into(),
                    online: false,
                },
                WatchEvent::Status {
                    device_id: "c".into(),
                    name: "Lamp".into(),
                    from: None,
                    to: DeviceStatus::On,
                },
                WatchEvent::Removed {
                    device_id: "b".into()
                },
            ]
        );
    }

    #[test]
    fn unchanged_snapshot_yields_nothing() {
        let map: SeenMap = HashMap::from([(DeviceId::from("a"), seen(DeviceStatus::On, true))]);
        assert!(diff(&map, &map).is_empty());
    }

    #[test]
    fn human_line_shows_transition() {
        let line = human_line(
            &WatchEvent::Status {
                device_id: "a".into(),
                name: "Lamp".into(),
                from: Some(DeviceStatus::On),
                to: DeviceStatus::Off,
            },
            false,
        );
        assert!(line.ends_with("Lamp (a): ON -> OFF"));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(WatchEvent::Removed {
            device_id: "x".into(),
        })
        .unwrap_or_default();
        assert_eq!(json["type"], "removed");
        assert_eq!(json["device_id"], "x");

        let json = serde_json::to_value(WatchEvent::Connection {
            state: ConnectionState::Connecting,
        })
        .unwrap_or_default();
        assert_eq!(json["state"], "connecting");
    }
}
