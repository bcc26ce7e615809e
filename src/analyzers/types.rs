//! Data types produced by the aggregation stages and handed to the export sink.

use serde::Serialize;

use crate::sample::Tech;

/// One grid cell of a per-technology coverage map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    pub grid_lat: f64,
    pub grid_lon: f64,
    pub operator: String,
    pub tech: Tech,
    pub rsrp: f64,
    pub snr: Option<f64>,
    pub rsrq: Option<f64>,
    pub lat: f64,
    pub lon: f64,
    pub pci: Option<i64>,
}

/// One grid cell of an operator's combined (all technologies) coverage map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageCell {
    pub grid_lat: f64,
    pub grid_lon: f64,
    pub operator: String,
    pub rsrp: f64,
    pub snr: Option<f64>,
    pub rsrq: Option<f64>,
    pub lat: f64,
    pub lon: f64,
    pub pci: Option<i64>,
}

/// Sample support of one technology on one operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorTechGroup {
    pub operator: String,
    pub tech: Tech,
    pub count: usize,
    pub mean_rsrp: f64,
}

/// Why a group was treated as a ghost technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GhostReason {
    TooFewSamples,
    DeadZone,
    MinorTechnology,
}

impl GhostReason {
    pub fn describe(&self) -> &'static str {
        match self {
            GhostReason::TooFewSamples => "too few samples",
            GhostReason::DeadZone => "mean RSRP below dead-zone threshold",
            GhostReason::MinorTechnology => "negligible next to dominant technology",
        }
    }
}

/// Significance decision for one operator/technology group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupVerdict {
    pub group: OperatorTechGroup,
    pub ghost: Option<GhostReason>,
}

impl GroupVerdict {
    pub fn is_significant(&self) -> bool {
        self.ghost.is_none()
    }
}

/// Chart input row: one bar per operator/technology label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRow {
    pub label: String,
    pub operator: String,
    pub tech: Tech,
    pub samples: usize,
    pub mean_rsrp: f64,
    pub color: &'static str,
    pub excellent_pct: f64,
    pub good_pct: f64,
    pub fair_pct: f64,
    pub dead_zone_pct: f64,
}
