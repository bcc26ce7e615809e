//! Analysis thresholds and tunables.
//!
//! Every stage reads its constants from an [`AnalysisConfig`] handed to the
//! pipeline entry point. Defaults match the field-tested values; a JSON file
//! may override any subset of them:
//! ```json
//! {
//!   "min_samples_for_report": 100,
//!   "dead_zone_rsrp": -135.0,
//!   "significance_policy": { "relative_to_dominant": { "ratio": 0.05, "floor": 5000 } }
//! }
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How ghost technologies are recognised by the significance filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificancePolicy {
    /// A group survives when it has enough samples and its mean RSRP is above
    /// the dead-zone threshold.
    #[default]
    Absolute,
    /// Same as [`SignificancePolicy::Absolute`], and additionally the group
    /// must hold more than `ratio` of the operator's dominant technology count
    /// unless it already has more than `floor` samples.
    RelativeToDominant { ratio: f64, floor: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // quality buckets (dBm)
    pub rsrp_excellent: f64,
    pub rsrp_good: f64,
    pub rsrp_poor: f64,

    // spatial binning (decimal places)
    pub geo_precision: u32,
    pub stationary_precision: u32,

    // sanitizer windows
    pub snr_min: f64,
    pub snr_max: f64,
    pub rsrq_min: f64,
    pub rsrq_max: f64,

    // significance filter
    pub min_samples_for_report: usize,
    pub dead_zone_rsrp: f64,
    pub significance_policy: SignificancePolicy,

    // statistics
    pub session_timeout_secs: i64,
    pub mobility_threshold: f64,
    pub pollution_snr_threshold: f64,
    pub pollution_rsrq_threshold: f64,
    pub snr_unsupported_ratio: f64,
    pub gps_jump_km: f64,
    pub km_per_cell: f64,

    /// Date attached to time-only timestamps (`HH:MM:SS`). `None` means the
    /// current local date at ingestion time.
    pub reference_date: Option<NaiveDate>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rsrp_excellent: -80.0,
            rsrp_good: -100.0,
            rsrp_poor: -115.0,
            geo_precision: 4,
            stationary_precision: 5,
            snr_min: -50.0,
            snr_max: 50.0,
            rsrq_min: -30.0,
            rsrq_max: 0.0,
            min_samples_for_report: 50,
            dead_zone_rsrp: -130.0,
            significance_policy: SignificancePolicy::Absolute,
            session_timeout_secs: 300,
            mobility_threshold: 2.5,
            pollution_snr_threshold: 5.0,
            pollution_rsrq_threshold: -15.0,
            snr_unsupported_ratio: 0.5,
            gps_jump_km: 1.0,
            km_per_cell: 0.011,
            reference_date: None,
        }
    }
}

impl AnalysisConfig {
    /// Loads overrides from a JSON file at `path`; missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let config: AnalysisConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid config '{}'", path.display()))?;
        Ok(config)
    }

    /// Date used for time-only timestamps.
    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}
