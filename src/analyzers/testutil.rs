//! Sample builders shared by the analyzer unit tests.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::sample::{Sample, Tech};

pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 14)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

/// A 4G sample `secs` seconds after 10:00:00.
pub fn sample(operator: &str, secs: i64, lat: f64, lon: f64, rsrp: f64) -> Sample {
    Sample {
        timestamp: base_time() + TimeDelta::seconds(secs),
        lat,
        lon,
        rsrp,
        snr: None,
        rsrq: None,
        speed: 0.0,
        operator: operator.to_string(),
        tech: Tech::G4,
        pci: None,
        source: "test".to_string(),
    }
}

pub fn sample_tech(operator: &str, tech: Tech, secs: i64, rsrp: f64) -> Sample {
    Sample {
        tech,
        ..sample(operator, secs, 42.0, 23.0, rsrp)
    }
}
