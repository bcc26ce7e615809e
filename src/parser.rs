//! CSV ingestion of signal logs into canonical [`Sample`]s.
//!
//! Header names are matched loosely (`network_type`, `Network Type` and
//! `NetworkType` are the same column). A file without a network-type column
//! is not a signal log and is rejected as [`IngestError::Incompatible`].
//! Rows that cannot be placed in time or space, or whose operator is missing
//! or blocked, are dropped and counted in the [`IngestSummary`]. Short rows
//! (a log cut off mid-line) read their missing trailing cells as empty.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::sample::{Sample, Tech, canonical_operator};

const REQUIRED_COLUMNS: &[&str] = &["Timestamp", "Latitude", "Longitude", "RSRP", "Operator"];

/// Date-time layouts tried in order after RFC 3339.
static DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no NetworkType column, not a signal log")]
    Incompatible,
    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("failed to open file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Row accounting for one or more ingested files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub files: usize,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub dropped_timestamp: usize,
    pub dropped_operator: usize,
    pub dropped_position: usize,
}

impl AddAssign for IngestSummary {
    fn add_assign(&mut self, other: Self) {
        self.files += other.files;
        self.rows_read += other.rows_read;
        self.rows_kept += other.rows_kept;
        self.dropped_timestamp += other.dropped_timestamp;
        self.dropped_operator += other.dropped_operator;
        self.dropped_position += other.dropped_position;
    }
}

/// Result of ingesting a batch of files.
#[derive(Debug, Default)]
pub struct Ingested {
    pub samples: Vec<Sample>,
    pub summary: IngestSummary,
    pub skipped: Vec<(PathBuf, String)>,
}

/// A CSV row after header canonicalisation; every cell is still raw text and
/// cells past the end of a short row are `None`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRecord {
    #[serde(rename = "Timestamp")]
    timestamp: Option<String>,
    #[serde(rename = "Latitude")]
    latitude: Option<String>,
    #[serde(rename = "Longitude")]
    longitude: Option<String>,
    #[serde(rename = "RSRP")]
    rsrp: Option<String>,
    #[serde(rename = "Operator")]
    operator: Option<String>,
    #[serde(rename = "NetworkType")]
    network_type: Option<String>,
    #[serde(rename = "SNR")]
    snr: Option<String>,
    #[serde(rename = "RSRQ")]
    rsrq: Option<String>,
    #[serde(rename = "Speed")]
    speed: Option<String>,
    #[serde(rename = "PCI")]
    pci: Option<String>,
}

/// Maps a header cell onto the canonical column name it stands for.
fn canonical_header(header: &str) -> String {
    let key: String = header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect::<String>()
        .to_lowercase();

    let canonical = match key.as_str() {
        "timestamp" | "time" | "datetime" => "Timestamp",
        "latitude" | "lat" => "Latitude",
        "longitude" | "lon" | "lng" => "Longitude",
        "rsrp" => "RSRP",
        "snr" | "sinr" | "rssnr" => "SNR",
        "rsrq" => "RSRQ",
        "speed" => "Speed",
        "pci" => "PCI",
        "operator" | "carrier" => "Operator",
        "networktype" | "nettype" | "technology" | "rat" => "NetworkType",
        _ => return header.trim().to_string(),
    };
    canonical.to_string()
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Parses a finite number; anything else is unknown.
pub fn parse_number(raw: Option<&str>) -> Option<f64> {
    non_empty(raw)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn on_globe(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Parses a cell identifier, accepting float renderings such as `"312.0"`.
pub fn parse_pci(raw: Option<&str>) -> Option<i64> {
    let raw = non_empty(raw)?;
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

/// Parses a timestamp in any of the accepted layouts.
///
/// Offsets are normalised to UTC. Bare times (`HH:MM:SS`) are anchored on
/// `reference_date`; bare dates resolve to midnight.
pub fn parse_timestamp(raw: &str, reference_date: NaiveDate) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .ok()
        .map(|time| reference_date.and_time(time))
}

/// Ingests one CSV stream. `source` becomes the provenance tag of every sample.
pub fn parse_reader<R: Read>(
    reader: R,
    source: &str,
    config: &AnalysisConfig,
) -> Result<(Vec<Sample>, IngestSummary), IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: StringRecord = rdr.headers()?.iter().map(canonical_header).collect();
    if !headers.iter().any(|h| h == "NetworkType") {
        return Err(IngestError::Incompatible);
    }
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .copied()
        .find(|col| !headers.iter().any(|h| h == *col))
    {
        return Err(IngestError::MissingColumn(missing));
    }
    rdr.set_headers(headers);

    let reference_date = config.reference_date();
    let mut summary = IngestSummary {
        files: 1,
        ..Default::default()
    };
    let mut samples = Vec::new();

    for result in rdr.deserialize() {
        let record: RawRecord = result?;
        summary.rows_read += 1;

        let Some(operator) = canonical_operator(record.operator.as_deref()) else {
            summary.dropped_operator += 1;
            continue;
        };

        let Some(timestamp) = non_empty(record.timestamp.as_deref())
            .and_then(|raw| parse_timestamp(raw, reference_date))
        else {
            summary.dropped_timestamp += 1;
            continue;
        };

        let (Some(lat), Some(lon), Some(rsrp)) = (
            parse_number(record.latitude.as_deref()),
            parse_number(record.longitude.as_deref()),
            parse_number(record.rsrp.as_deref()),
        ) else {
            summary.dropped_position += 1;
            continue;
        };
        if !on_globe(lat, lon) {
            summary.dropped_position += 1;
            continue;
        }

        samples.push(Sample {
            timestamp,
            lat,
            lon,
            rsrp,
            snr: parse_number(record.snr.as_deref()),
            rsrq: parse_number(record.rsrq.as_deref()),
            speed: parse_number(record.speed.as_deref()).unwrap_or(0.0),
            operator,
            tech: Tech::classify(record.network_type.as_deref()),
            pci: parse_pci(record.pci.as_deref()),
            source: source.to_string(),
        });
    }

    summary.rows_kept = samples.len();
    Ok((samples, summary))
}

/// Ingests one CSV file, tagging samples with the file stem.
pub fn parse_file(
    path: &Path,
    config: &AnalysisConfig,
) -> Result<(Vec<Sample>, IngestSummary), IngestError> {
    let source = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    let file = std::fs::File::open(path)?;
    parse_reader(file, source, config)
}

/// Expands directories into their CSV files, skipping earlier map exports and
/// mock data. Plain file paths pass through untouched.
pub fn discover_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, IngestError> {
    let mut files = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }

        let mut found = Vec::new();
        for entry in std::fs::read_dir(input)? {
            let path = entry?.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let is_csv = path.extension().and_then(|e| e.to_str()) == Some("csv");
            if is_csv && !name.contains("signal_map") && !name.contains("mock") {
                found.push(path);
            }
        }
        found.sort();
        files.extend(found);
    }

    Ok(files)
}

/// Ingests every path and concatenates the samples in path order.
///
/// Files that are incompatible or fail to parse are skipped and listed in
/// [`Ingested::skipped`]; they never abort the batch.
#[tracing::instrument(skip_all, fields(files = paths.len()))]
pub fn load_sources(paths: &[PathBuf], config: &AnalysisConfig) -> Ingested {
    let mut ingested = Ingested::default();

    for path in paths {
        match parse_file(path, config) {
            Ok((samples, summary)) => {
                debug!(
                    path = %path.display(),
                    rows = summary.rows_read,
                    kept = summary.rows_kept,
                    "File ingested"
                );
                ingested.samples.extend(samples);
                ingested.summary += summary;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping file");
                ingested.skipped.push((path.clone(), e.to_string()));
            }
        }
    }

    info!(
        files = ingested.summary.files,
        skipped = ingested.skipped.len(),
        rows = ingested.summary.rows_read,
        kept = ingested.summary.rows_kept,
        "Ingestion complete"
    );
    ingested
}
