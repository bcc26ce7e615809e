//! Canonical measurement record and the label normalisation rules applied at ingestion.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operator labels that mean "no usable registration" and never reach analysis.
pub const BLOCKED_OPERATORS: &[&str] = &[
    "NO SERVICE",
    "EMERGENCY ONLY",
    "EMERGENCY CALLS ONLY",
    "UNKNOWN",
    "SEARCHING",
    "NO CONNECTION",
    "NOT LOGGED",
    "NAN",
];

/// Substring aliases checked in order; the first hit wins.
static OPERATOR_ALIASES: &[(&str, &str)] = &[
    ("YETTEL", "YETTEL"),
    ("A1", "A1"),
    ("VIVA", "VIVACOM"),
    ("TURK", "TURK TELEKOM"),
    ("VODA", "VODAFONE"),
    // legacy brand
    ("AVEA", "TURK TELEKOM"),
];

/// Radio access technology of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tech {
    #[serde(rename = "2G")]
    G2,
    #[serde(rename = "3G")]
    G3,
    #[serde(rename = "4G")]
    G4,
    #[serde(rename = "5G")]
    G5,
    Other,
    Unknown,
}

impl Tech {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tech::G2 => "2G",
            Tech::G3 => "3G",
            Tech::G4 => "4G",
            Tech::G5 => "5G",
            Tech::Other => "Other",
            Tech::Unknown => "Unknown",
        }
    }

    /// Classifies a raw network-type string such as `LTE`, `NR_NSA` or `HSPA+`.
    ///
    /// | Contains (case-insensitive)    | Tech    |
    /// |--------------------------------|---------|
    /// | `NR`                           | 5G      |
    /// | `LTE`                          | 4G      |
    /// | `WCDMA`, `HSPA`, `UMTS`, `3G`  | 3G      |
    /// | `GSM`, `EDGE`, `GPRS`, `2G`    | 2G      |
    /// | anything else                  | Other   |
    /// | missing                        | Unknown |
    pub fn classify(raw: Option<&str>) -> Tech {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Tech::Unknown;
        };
        let upper = raw.to_uppercase();
        let has_any = |needles: &[&str]| needles.iter().any(|n| upper.contains(n));

        if upper.contains("NR") {
            Tech::G5
        } else if upper.contains("LTE") {
            Tech::G4
        } else if has_any(&["WCDMA", "HSPA", "UMTS", "3G"]) {
            Tech::G3
        } else if has_any(&["GSM", "EDGE", "GPRS", "2G"]) {
            Tech::G2
        } else {
            Tech::Other
        }
    }
}

impl fmt::Display for Tech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a raw carrier label onto its canonical operator name.
///
/// Returns `None` for missing labels and for labels on the block list.
pub fn canonical_operator(raw: Option<&str>) -> Option<String> {
    let op = raw?.trim().to_uppercase();
    if op.is_empty() {
        return None;
    }

    let canonical = match OPERATOR_ALIASES.iter().find(|(needle, _)| op.contains(needle)) {
        Some((_, alias)) => alias.to_string(),
        None => match op.split_once('|') {
            Some((head, _)) => head.trim().to_string(),
            None => op,
        },
    };

    if canonical.is_empty() || BLOCKED_OPERATORS.contains(&canonical.as_str()) {
        None
    } else {
        Some(canonical)
    }
}

/// One geotagged measurement after ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub lat: f64,
    pub lon: f64,
    pub rsrp: f64,
    pub snr: Option<f64>,
    pub rsrq: Option<f64>,
    pub speed: f64,
    pub operator: String,
    pub tech: Tech,
    pub pci: Option<i64>,
    pub source: String,
}
