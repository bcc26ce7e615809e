//! Comparative statistics over the cleaned, significance-filtered samples.
//!
//! Every section is computed per operator (the signal distribution per
//! operator and technology). Divisions are guarded: a group without the
//! samples a section needs yields an explicit "insufficient" variant rather
//! than a NaN or an error.

use anyhow::{Context, Result, ensure};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::analyzers::grade::{SignalQuality, grade};
use crate::analyzers::types::ChartRow;
use crate::analyzers::utility::{grid_key, haversine_km, mean, mean_known, pct, sample_stddev};
use crate::config::AnalysisConfig;
use crate::sample::{Sample, Tech};

/// Share of each quality bucket within one (operator, technology) group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityDistribution {
    pub operator: String,
    pub tech: Tech,
    pub samples: usize,
    pub mean_rsrp: f64,
    /// Percentages in [`SignalQuality::ALL`] order.
    pub shares: [f64; 4],
}

impl QualityDistribution {
    pub fn label(&self) -> String {
        format!("{} ({})", self.operator, self.tech)
    }

    pub fn share(&self, quality: SignalQuality) -> f64 {
        self.shares[quality.index()]
    }

    /// Chart input bar, coloured by the bucket the mean falls into.
    pub fn chart_row(&self, config: &AnalysisConfig) -> ChartRow {
        ChartRow {
            label: self.label(),
            operator: self.operator.clone(),
            tech: self.tech,
            samples: self.samples,
            mean_rsrp: self.mean_rsrp,
            color: grade(self.mean_rsrp, config).color(),
            excellent_pct: self.shares[0],
            good_pct: self.shares[1],
            fair_pct: self.shares[2],
            dead_zone_pct: self.shares[3],
        }
    }
}

/// Interference despite strong signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Pollution {
    /// Most SNR readings are missing or zero; the device does not report it.
    SnrUnsupported { snr_missing_pct: f64 },
    /// No sample is above the "good" RSRP threshold.
    NoGoodSignal,
    Measured {
        good_samples: usize,
        combined_pct: f64,
        low_snr_pct: f64,
        poor_rsrq_pct: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutionStats {
    pub operator: String,
    pub result: Pollution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandoverStats {
    pub operator: String,
    pub switches: usize,
    pub true_duration_min: f64,
    /// Switches per minute; `None` when the true duration is a minute or less.
    pub rate_per_min: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyStats {
    pub operator: String,
    pub samples: usize,
    pub mean_rsrp: f64,
    pub rsrp_stddev: Option<f64>,
    pub mean_snr: Option<f64>,
    pub mean_rsrq: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MobilityStats {
    pub operator: String,
    pub samples: usize,
    pub walking_pct: f64,
    pub vehicle_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceStats {
    pub operator: String,
    pub travelled_km: f64,
    pub grid_cells: usize,
    pub unique_coverage_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfrastructureStats {
    pub operator: String,
    pub unique_pcis: usize,
}

/// Cell-by-cell comparison of two operators over the cells both cover.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadToHead {
    pub first: String,
    pub second: String,
    pub shared_cells: usize,
    pub first_wins: usize,
    pub second_wins: usize,
}

impl HeadToHead {
    pub fn first_pct(&self) -> f64 {
        pct(self.first_wins, self.shared_cells)
    }

    pub fn second_pct(&self) -> f64 {
        pct(self.second_wins, self.shared_cells)
    }
}

/// All report sections for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparativeStats {
    pub operators: Vec<String>,
    pub distribution: Vec<QualityDistribution>,
    pub pollution: Vec<PollutionStats>,
    pub handover: Vec<HandoverStats>,
    pub consistency: Vec<ConsistencyStats>,
    pub mobility: Vec<MobilityStats>,
    pub distance: Vec<DistanceStats>,
    pub infrastructure: Vec<InfrastructureStats>,
    pub head_to_head: Vec<HeadToHead>,
}

impl ComparativeStats {
    pub fn compute(samples: &[Sample], config: &AnalysisConfig) -> Result<Self> {
        let mut by_operator: BTreeMap<&str, Vec<&Sample>> = BTreeMap::new();
        for s in samples {
            by_operator.entry(s.operator.as_str()).or_default().push(s);
        }
        for group in by_operator.values_mut() {
            group.sort_by_key(|s| s.timestamp);
        }

        let mut stats = ComparativeStats {
            operators: by_operator.keys().map(|op| op.to_string()).collect(),
            distribution: quality_distribution(samples, config),
            head_to_head: head_to_head(samples, config),
            ..Default::default()
        };

        for (operator, group) in &by_operator {
            stats.pollution.push(PollutionStats {
                operator: operator.to_string(),
                result: pollution(group, config),
            });
            stats.handover.push(handover(operator, group, config));
            stats.consistency.push(consistency(operator, group));
            stats.mobility.push(mobility(operator, group, config));
            stats.distance.push(
                distance(operator, group, config)
                    .with_context(|| format!("distance analysis failed for {operator}"))?,
            );
            stats.infrastructure.push(InfrastructureStats {
                operator: operator.to_string(),
                unique_pcis: group.iter().filter_map(|s| s.pci).collect::<HashSet<_>>().len(),
            });
        }

        Ok(stats)
    }

    pub fn chart_rows(&self, config: &AnalysisConfig) -> Vec<ChartRow> {
        self.distribution.iter().map(|d| d.chart_row(config)).collect()
    }

    pub fn total_travelled_km(&self) -> f64 {
        self.distance.iter().map(|d| d.travelled_km).sum()
    }

    pub fn total_unique_coverage_km(&self) -> f64 {
        self.distance.iter().map(|d| d.unique_coverage_km).sum()
    }
}

/// Bucket shares per (operator, technology).
pub fn quality_distribution(samples: &[Sample], config: &AnalysisConfig) -> Vec<QualityDistribution> {
    let mut groups: BTreeMap<(&str, Tech), ([usize; 4], f64)> = BTreeMap::new();
    for s in samples {
        let (counts, rsrp_sum) = groups.entry((s.operator.as_str(), s.tech)).or_default();
        counts[grade(s.rsrp, config).index()] += 1;
        *rsrp_sum += s.rsrp;
    }

    groups
        .into_iter()
        .map(|((operator, tech), (counts, rsrp_sum))| {
            let total: usize = counts.iter().sum();
            QualityDistribution {
                operator: operator.to_string(),
                tech,
                samples: total,
                mean_rsrp: rsrp_sum / total as f64,
                shares: counts.map(|c| pct(c, total)),
            }
        })
        .collect()
}

/// Pollution index of one operator's samples.
pub fn pollution(group: &[&Sample], config: &AnalysisConfig) -> Pollution {
    let snr_missing = group
        .iter()
        .filter(|s| s.snr.is_none_or(|v| v == 0.0))
        .count();
    if snr_missing as f64 > config.snr_unsupported_ratio * group.len() as f64 {
        return Pollution::SnrUnsupported {
            snr_missing_pct: pct(snr_missing, group.len()),
        };
    }

    let good: Vec<&Sample> = group
        .iter()
        .copied()
        .filter(|s| s.rsrp > config.rsrp_good)
        .collect();
    if good.is_empty() {
        return Pollution::NoGoodSignal;
    }

    let low_snr = |s: &Sample| s.snr.is_some_and(|v| v < config.pollution_snr_threshold);
    let poor_rsrq = |s: &Sample| s.rsrq.is_some_and(|v| v < config.pollution_rsrq_threshold);

    let low_snr_count = good.iter().filter(|s| low_snr(s)).count();
    let poor_rsrq_count = good.iter().filter(|s| poor_rsrq(s)).count();
    let combined_count = good.iter().filter(|s| low_snr(s) || poor_rsrq(s)).count();

    Pollution::Measured {
        good_samples: good.len(),
        combined_pct: pct(combined_count, good.len()),
        low_snr_pct: pct(low_snr_count, good.len()),
        poor_rsrq_pct: pct(poor_rsrq_count, good.len()),
    }
}

/// Cell switches per minute of active logging. `group` must be time-ordered.
///
/// Gaps of `session_timeout_secs` or more add nothing to the duration, but
/// a PCI change across a gap still counts as a switch.
pub fn handover(operator: &str, group: &[&Sample], config: &AnalysisConfig) -> HandoverStats {
    let mut switches = 0;
    let mut active_secs = 0.0;

    for pair in group.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        if cur.pci != prev.pci {
            switches += 1;
        }
        let delta = (cur.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
        if delta < config.session_timeout_secs as f64 {
            active_secs += delta;
        }
    }

    let true_duration_min = active_secs / 60.0;
    HandoverStats {
        operator: operator.to_string(),
        switches,
        true_duration_min,
        rate_per_min: (true_duration_min > 1.0).then(|| switches as f64 / true_duration_min),
    }
}

pub fn consistency(operator: &str, group: &[&Sample]) -> ConsistencyStats {
    let rsrp: Vec<f64> = group.iter().map(|s| s.rsrp).collect();
    let mean_rsrp = mean(&rsrp);

    ConsistencyStats {
        operator: operator.to_string(),
        samples: group.len(),
        mean_rsrp,
        rsrp_stddev: sample_stddev(&rsrp, mean_rsrp),
        mean_snr: mean_known(group.iter().map(|s| s.snr)),
        mean_rsrq: mean_known(group.iter().map(|s| s.rsrq)),
    }
}

pub fn mobility(operator: &str, group: &[&Sample], config: &AnalysisConfig) -> MobilityStats {
    let vehicle = group
        .iter()
        .filter(|s| s.speed >= config.mobility_threshold)
        .count();

    MobilityStats {
        operator: operator.to_string(),
        samples: group.len(),
        walking_pct: pct(group.len() - vehicle, group.len()),
        vehicle_pct: pct(vehicle, group.len()),
    }
}

/// Distance travelled and grid footprint of one operator. `group` must be
/// time-ordered.
pub fn distance(operator: &str, group: &[&Sample], config: &AnalysisConfig) -> Result<DistanceStats> {
    for s in group {
        ensure!(
            (-90.0..=90.0).contains(&s.lat) && (-180.0..=180.0).contains(&s.lon),
            "coordinate ({}, {}) at {} is outside the globe",
            s.lat,
            s.lon,
            s.timestamp
        );
    }

    let travelled_km: f64 = group
        .windows(2)
        .map(|pair| haversine_km(pair[0].lat, pair[0].lon, pair[1].lat, pair[1].lon))
        .filter(|d| *d < config.gps_jump_km)
        .sum();

    let places = config.geo_precision;
    let grid_cells = group
        .iter()
        .map(|s| (grid_key(s.lat, places), grid_key(s.lon, places)))
        .collect::<HashSet<_>>()
        .len();

    Ok(DistanceStats {
        operator: operator.to_string(),
        travelled_km,
        grid_cells,
        unique_coverage_km: grid_cells as f64 * config.km_per_cell,
    })
}

/// Pairwise cell wins between operators, over the cells both cover.
pub fn head_to_head(samples: &[Sample], config: &AnalysisConfig) -> Vec<HeadToHead> {
    let places = config.geo_precision;
    let mut cells: BTreeMap<(i64, i64), BTreeMap<&str, (f64, usize)>> = BTreeMap::new();
    for s in samples {
        let entry = cells
            .entry((grid_key(s.lat, places), grid_key(s.lon, places)))
            .or_default()
            .entry(s.operator.as_str())
            .or_default();
        entry.0 += s.rsrp;
        entry.1 += 1;
    }

    let operators: Vec<&str> = samples
        .iter()
        .map(|s| s.operator.as_str())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut duels = Vec::new();
    for (i, first) in operators.iter().enumerate() {
        for second in &operators[i + 1..] {
            let mut duel = HeadToHead {
                first: first.to_string(),
                second: second.to_string(),
                shared_cells: 0,
                first_wins: 0,
                second_wins: 0,
            };
            for per_op in cells.values() {
                let (Some(a), Some(b)) = (per_op.get(first), per_op.get(second)) else {
                    continue;
                };
                let (a, b) = (a.0 / a.1 as f64, b.0 / b.1 as f64);
                duel.shared_cells += 1;
                if a > b {
                    duel.first_wins += 1;
                } else if b > a {
                    duel.second_wins += 1;
                }
            }
            if duel.shared_cells > 0 {
                duels.push(duel);
            }
        }
    }
    duels
}
