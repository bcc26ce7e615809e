//! Hardware comparison: the same route logged by several devices, matched
//! cell by cell to see which antenna hears the network better.

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::analyzers::utility::{grid_key, mean};
use crate::parser::parse_number;

/// A device log reduced to positioned RSRP readings.
#[derive(Debug, Clone)]
pub struct DeviceLog {
    pub label: String,
    pub points: Vec<(f64, f64, f64)>,
}

/// One grid cell every device visited, with each device's mean RSRP.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedCell {
    pub grid_lat: f64,
    pub grid_lon: f64,
    pub rsrp: Vec<f64>,
}

/// Loads a device log from any CSV carrying latitude, longitude and RSRP.
///
/// Header case is ignored. With `operator_filter`, only rows whose operator
/// contains the filter (case-insensitive) are kept.
pub fn load_device(path: &Path, label: &str, operator_filter: Option<&str>) -> Result<DeviceLog> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_lowercase()).collect();
    let column = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));
    let (Some(lat_idx), Some(lon_idx), Some(rsrp_idx)) = (
        column(&["latitude", "lat"]),
        column(&["longitude", "lon"]),
        column(&["rsrp"]),
    ) else {
        bail!("{} lacks latitude/longitude/rsrp columns", path.display());
    };
    let op_idx = column(&["operator"]);
    let filter = operator_filter.map(str::to_uppercase);

    let mut points = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(filter) = &filter {
            let operator = op_idx.and_then(|i| record.get(i)).unwrap_or_default();
            if !operator.to_uppercase().contains(filter.as_str()) {
                continue;
            }
        }
        if let (Some(lat), Some(lon), Some(rsrp)) = (
            parse_number(record.get(lat_idx)),
            parse_number(record.get(lon_idx)),
            parse_number(record.get(rsrp_idx)),
        ) {
            points.push((lat, lon, rsrp));
        }
    }

    info!(label, points = points.len(), "Device log loaded");
    Ok(DeviceLog {
        label: label.to_string(),
        points,
    })
}

/// Loads every `LABEL=PATH` (or bare `PATH`, labelled by file stem) device log.
///
/// Logs that cannot be read or hold no usable points are logged and skipped;
/// the caller decides whether enough devices remain.
pub fn load_devices(args: &[String], operator_filter: Option<&str>) -> Vec<DeviceLog> {
    let mut devices = Vec::new();
    for arg in args {
        let (label, path) = match arg.split_once('=') {
            Some((label, path)) => (label.to_string(), PathBuf::from(path)),
            None => {
                let path = PathBuf::from(arg);
                let label = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(arg)
                    .to_string();
                (label, path)
            }
        };

        match load_device(&path, &label, operator_filter) {
            Ok(device) if device.points.is_empty() => {
                warn!(label = %device.label, "Device log has no usable points");
            }
            Ok(device) => devices.push(device),
            Err(e) => {
                warn!(label = %label, path = %path.display(), error = %e, "Skipping device log");
            }
        }
    }
    devices
}

/// Cells visited by every device, ordered by position.
pub fn match_locations(devices: &[DeviceLog], precision: u32) -> Vec<MatchedCell> {
    let per_device: Vec<BTreeMap<(i64, i64), Vec<f64>>> = devices
        .iter()
        .map(|d| {
            let mut cells: BTreeMap<(i64, i64), Vec<f64>> = BTreeMap::new();
            for (lat, lon, rsrp) in &d.points {
                cells
                    .entry((grid_key(*lat, precision), grid_key(*lon, precision)))
                    .or_default()
                    .push(*rsrp);
            }
            cells
        })
        .collect();

    let Some((first, rest)) = per_device.split_first() else {
        return Vec::new();
    };
    let scale = 10f64.powi(precision as i32);

    first
        .iter()
        .filter_map(|(key, values)| {
            let mut rsrp = vec![mean(values)];
            for other in rest {
                rsrp.push(mean(other.get(key)?));
            }
            Some(MatchedCell {
                grid_lat: key.0 as f64 / scale,
                grid_lon: key.1 as f64 / scale,
                rsrp,
            })
        })
        .collect()
}

/// Head-to-head summary of two devices over their shared cells.
pub fn battle_report(matched: &[MatchedCell], labels: [&str; 2]) -> Vec<String> {
    let mut out = vec![
        "=".repeat(60),
        format!("HARDWARE BATTLE: {} vs {}", labels[0], labels[1]),
        "=".repeat(60),
    ];
    if matched.is_empty() {
        out.push("No matching GPS locations found.".to_string());
        return out;
    }

    let total = matched.len();
    let first_wins = matched.iter().filter(|c| c.rsrp[0] > c.rsrp[1]).count();
    let second_wins = matched.iter().filter(|c| c.rsrp[1] > c.rsrp[0]).count();
    let draws = total - first_wins - second_wins;
    let share = |n: usize| n as f64 / total as f64 * 100.0;

    out.push(format!("Shared Data Points: {total}"));
    out.push(format!("  {} Better:   {first_wins} spots ({:.1}%)", labels[0], share(first_wins)));
    out.push(format!("  {} Better:   {second_wins} spots ({:.1}%)", labels[1], share(second_wins)));
    out.push(format!("  Exact Ties:   {draws} spots"));

    let avg: Vec<f64> = (0..2)
        .map(|i| mean(&matched.iter().map(|c| c.rsrp[i]).collect::<Vec<_>>()))
        .collect();
    out.push("AVERAGE SIGNAL (RSRP):".to_string());
    out.push(format!("  {}: {:.2} dBm", labels[0], avg[0]));
    out.push(format!("  {}: {:.2} dBm", labels[1], avg[1]));

    let diff = avg[0] - avg[1];
    let stronger = if diff > 0.0 { labels[0] } else { labels[1] };
    out.push(format!("  {stronger} is stronger by {:.2} dB on average.", diff.abs()));
    out
}

/// Writes the matched table as `grid_lat,grid_lon,rsrp_0,rsrp_1,...`.
pub fn write_matched(path: &Path, matched: &[MatchedCell], devices: usize) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    let mut header = vec!["grid_lat".to_string(), "grid_lon".to_string()];
    header.extend((0..devices).map(|i| format!("rsrp_{i}")));
    writer.write_record(&header)?;

    for cell in matched {
        let mut row = vec![cell.grid_lat.to_string(), cell.grid_lon.to_string()];
        row.extend(cell.rsrp.iter().map(|v| v.to_string()));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
