//! Energy statistics handlers.

use tabled::Tabled;

use autouni_api::rest::models::{EnergyReading, EnergyStats};

use crate::cli::{EnergyArgs, EnergyCommand, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output::{self, or_dash};

use super::util;

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Device")]
    device_id: String,
    #[tabled(rename = "Wh")]
    value_wh: String,
    #[tabled(rename = "V")]
    voltage: String,
    #[tabled(rename = "A")]
    current: String,
}

impl From<&EnergyReading> for ReadingRow {
    fn from(r: &EnergyReading) -> Self {
        Self {
            timestamp: r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            device_id: r.device_id.clone(),
            value_wh: format!("{:.1}", r.value_wh),
            voltage: or_dash(r.voltage.map(|v| format!("{v:.1}"))),
            current: or_dash(r.current.map(|a| format!("{a:.2}"))),
        }
    }
}

fn stats_detail(s: &EnergyStats) -> String {
    let mut lines = vec![format!("Total:   {:.2} kWh", s.total_energy)];
    if let Some(cost) = s.total_cost {
        lines.push(format!("Cost:    {cost:.2}"));
    }
    if let Some(peak) = s.peak_demand {
        lines.push(format!("Peak:    {peak:.0} W"));
    }
    if let Some(avg) = s.average_power {
        lines.push(format!("Average: {avg:.0} W"));
    }
    if let Some(trend) = s.trend {
        lines.push(format!("Trend:   {trend:+.1}%"));
    }
    if let Some(ref period) = s.period {
        lines.push(format!("Period:  {} .. {}", period.start, period.end));
    }
    for (label, breakdown) in [("By type", &s.by_device_type), ("By room", &s.by_room)] {
        if let Some(breakdown) = breakdown {
            let mut entries: Vec<_> = breakdown.iter().collect();
            entries.sort_by(|a, b| b.1.total_cmp(a.1));
            lines.push(format!("{label}:"));
            for (key, kwh) in entries {
                lines.push(format!("  {key}: {kwh:.2} kWh"));
            }
        }
    }
    lines.join("\n")
}

pub async fn handle(
    args: EnergyArgs,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = util::controller(resolved)?;
    util::ensure_session(&controller)?;
    let api = controller.api();

    match args.command {
        EnergyCommand::Stats(scope) => {
            let query = util::energy_query(&scope)?;
            let stats = api.energy_stats(&query).await?;
            let out = output::render_single(&global.output, &stats, stats_detail, |s| {
                format!("{:.3}", s.total_energy)
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        EnergyCommand::History(scope) => {
            let query = util::energy_query(&scope)?;
            let mut readings = api.energy_history(&query).await?;
            readings.sort_by_key(|r| r.timestamp);
            let out = output::render_list(&global.output, &readings, |r| ReadingRow::from(r), |r| {
                r.id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn stats_detail_sorts_breakdown_descending() {
        let stats = EnergyStats {
            total_energy: 42.0,
            by_device_type: Some(HashMap::from([
                ("LIGHT".to_owned(), 2.0),
                ("AC".to_owned(), 30.0),
            ])),
            ..EnergyStats::default()
        };
        let text = stats_detail(&stats);
        assert!(text.starts_with("Total:   42.00 kWh"));
        let ac = text.find("AC: 30.00").unwrap_or(usize::MAX);
        let light = text.find("LIGHT: 2.00").unwrap_or(0);
        assert!(ac < light);
    }
}
