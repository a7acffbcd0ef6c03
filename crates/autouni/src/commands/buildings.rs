//! Building topology handlers.

use tabled::Tabled;

use autouni_api::rest::models::{Building, Room};
use autouni_core::CoreError;

use crate::cli::{BuildingsArgs, BuildingsCommand, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output::{self, or_dash};

use super::util;

#[derive(Tabled)]
struct BuildingRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Floors")]
    floors: usize,
    #[tabled(rename = "Active Devices")]
    active_devices: String,
    #[tabled(rename = "Energy (kWh)")]
    energy: String,
}

impl From<&Building> for BuildingRow {
    fn from(b: &Building) -> Self {
        Self {
            id: b.id.clone(),
            name: b.name.clone(),
            location: b.location.clone(),
            floors: b.floors.len(),
            active_devices: or_dash(b.active_devices),
            energy: or_dash(b.total_energy.map(|e| format!("{e:.2}"))),
        }
    }
}

fn room_line(room: &Room) -> String {
    let mut line = format!(
        "    {} {} [{}] {} device(s)",
        room.number,
        room.name,
        room.id,
        room.devices.len()
    );
    if let Some(capacity) = room.capacity {
        line.push_str(&format!(", capacity {capacity}"));
    }
    if room.occupied == Some(true) {
        line.push_str(", occupied");
    }
    line
}

fn detail(b: &Building) -> String {
    let mut lines = vec![
        format!("ID:       {}", b.id),
        format!("Name:     {}", b.name),
        format!("Location: {}", b.location),
        format!("Energy:   {} kWh", or_dash(b.total_energy.map(|e| format!("{e:.2}")))),
    ];
    if let Some(ref description) = b.description {
        lines.push(format!("About:    {description}"));
    }
    let mut floors: Vec<_> = b.floors.iter().collect();
    floors.sort_by_key(|f| f.number);
    for floor in floors {
        lines.push(format!("  Floor {} ({}) [{}]", floor.number, floor.name, floor.id));
        lines.extend(floor.rooms.iter().map(room_line));
    }
    lines.join("\n")
}

pub async fn handle(
    args: BuildingsArgs,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = util::controller(resolved)?;
    util::ensure_session(&controller)?;
    let api = controller.api();

    match args.command {
        BuildingsCommand::List => {
            let buildings = api.list_buildings().await?;
            let out = output::render_list(&global.output, &buildings, |b| BuildingRow::from(b), |b| {
                b.id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BuildingsCommand::Get { building } => {
            let found = api
                .building_details(&building)
                .await
                .map_err(|e| match CoreError::from(e) {
                    CoreError::NotFound { .. } => CliError::NotFound {
                        resource_type: "building".into(),
                        identifier: building.clone(),
                        list_command: "buildings list".into(),
                    },
                    other => other.into(),
                })?;
            let out = output::render_single(&global.output, &found, detail, |b| b.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
