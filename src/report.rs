//! Plain-text rendering of the comparison report.
//!
//! Sections always appear in the same order and each one is written even
//! when it has nothing to say, so reports from different runs line up.

use serde::Serialize;

use crate::analyzers::grade::SignalQuality;
use crate::analyzers::types::GroupVerdict;
use crate::config::AnalysisConfig;
use crate::stats::{ComparativeStats, Pollution};

const RULE_WIDTH: usize = 50;

/// Section headers in report order.
pub const SECTIONS: [&str; 8] = [
    "[1] SIGNAL STRENGTH DISTRIBUTION (RSRP)",
    "[2] QUALITY ISSUES (Good Signal, Bad Quality)",
    "[3] HANDOVER STABILITY (Ping-Pong Effect)",
    "[4] QUALITY & CONSISTENCY SCORES",
    "[5] MOBILITY PROFILE",
    "[6] DISTANCE & COVERAGE ANALYSIS",
    "[7] UNIQUE TOWER INFRASTRUCTURE",
    "[8] HEAD-TO-HEAD (Mean RSRP per shared grid cell)",
];

const INSUFFICIENT: &str = "  insufficient samples";

/// Data volume totals closing every report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub samples_after_cleaning: usize,
    pub exported_map_points: usize,
    pub total_travelled_km: f64,
    pub total_unique_coverage_km: f64,
}

#[derive(Default)]
struct Lines(Vec<String>);

impl Lines {
    fn push(&mut self, line: impl Into<String>) {
        self.0.push(line.into());
    }

    fn blank(&mut self) {
        self.0.push(String::new());
    }

    fn rule(&mut self) {
        self.0.push("=".repeat(RULE_WIDTH));
    }

    fn section(&mut self, idx: usize) {
        self.blank();
        self.push(SECTIONS[idx]);
    }
}

fn opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}"))
}

fn header(out: &mut Lines, operators: &[String], verdicts: &[GroupVerdict]) {
    out.rule();
    out.push("NETWORK COMPARISON REPORT");
    out.push(format!("Operators Included: {}", operators.join(", ")));
    for v in verdicts.iter().filter(|v| !v.is_significant()) {
        out.push(format!(
            "Excluded: {} ({}) - {} [{} samples, mean {:.1} dBm]",
            v.group.operator,
            v.group.tech,
            v.ghost.map(|r| r.describe()).unwrap_or_default(),
            v.group.count,
            v.group.mean_rsrp
        ));
    }
    out.rule();
}

fn footer(out: &mut Lines, summary: &RunSummary) {
    out.blank();
    out.rule();
    out.push("DATA VOLUME & DISTANCE SUMMARY");
    out.rule();
    out.push(format!("Samples After Cleaning:      {}", summary.samples_after_cleaning));
    out.push(format!("Exported Map Points:         {}", summary.exported_map_points));
    out.push(format!("Total Distance Travelled:    {:.2} km", summary.total_travelled_km));
    out.push(format!("Total Unique Coverage Est:   ~{:.2} km", summary.total_unique_coverage_km));
}

/// Renders the full report.
pub fn render(
    stats: &ComparativeStats,
    verdicts: &[GroupVerdict],
    summary: &RunSummary,
    config: &AnalysisConfig,
) -> Vec<String> {
    let mut out = Lines::default();
    header(&mut out, &stats.operators, verdicts);

    out.section(0);
    if stats.distribution.is_empty() {
        out.push(INSUFFICIENT);
    } else {
        let buckets: Vec<String> = SignalQuality::ALL
            .iter()
            .map(|q| format!("{:>10}", q.label()))
            .collect();
        out.push(format!("  {:<24}{:>8}{}", "Group", "Samples", buckets.concat()));
        for d in &stats.distribution {
            let shares: Vec<String> = d.shares.iter().map(|s| format!("{s:>9.1}%")).collect();
            out.push(format!("  {:<24}{:>8}{}", d.label(), d.samples, shares.concat()));
        }
    }

    out.section(1);
    out.push(format!(
        "    (Criteria: RSRP > {} dBm AND [SNR < {} dB OR RSRQ < {} dB])",
        config.rsrp_good, config.pollution_snr_threshold, config.pollution_rsrq_threshold
    ));
    if stats.pollution.is_empty() {
        out.push(INSUFFICIENT);
    }
    for p in &stats.pollution {
        match &p.result {
            Pollution::Measured {
                good_samples,
                combined_pct,
                low_snr_pct,
                poor_rsrq_pct,
            } => {
                out.push(format!("  - {} ({good_samples} good samples):", p.operator));
                out.push(format!("      Combined 'Polluted' Samples: {combined_pct:.1}%"));
                out.push(format!(
                    "      (Breakdown: Low SNR: {low_snr_pct:.1}% | Poor RSRQ: {poor_rsrq_pct:.1}%)"
                ));
            }
            Pollution::SnrUnsupported { snr_missing_pct } => out.push(format!(
                "  - {}: SNR unsupported ({snr_missing_pct:.0}% of readings missing or zero)",
                p.operator
            )),
            Pollution::NoGoodSignal => out.push(format!(
                "  - {}: No 'Good' coverage samples to analyze for pollution.",
                p.operator
            )),
        }
    }

    out.section(2);
    if stats.handover.is_empty() {
        out.push(INSUFFICIENT);
    }
    for h in &stats.handover {
        match h.rate_per_min {
            Some(rate) => out.push(format!(
                "  - {}: {rate:.2} switches/min ({} in {:.1} mins)",
                h.operator, h.switches, h.true_duration_min
            )),
            None => out.push(format!(
                "  - {}: insufficient samples ({:.1} active mins)",
                h.operator, h.true_duration_min
            )),
        }
    }

    out.section(3);
    if stats.consistency.is_empty() {
        out.push(INSUFFICIENT);
    } else {
        out.push(format!(
            "  {:<16}{:>10}{:>20}{:>10}{:>10}",
            "Operator", "Avg RSRP", "Stability (StdDev)", "Avg SNR", "Avg RSRQ"
        ));
        for c in &stats.consistency {
            out.push(format!(
                "  {:<16}{:>10.1}{:>20}{:>10}{:>10}",
                c.operator,
                c.mean_rsrp,
                opt(c.rsrp_stddev),
                opt(c.mean_snr),
                opt(c.mean_rsrq)
            ));
        }
    }

    out.section(4);
    if stats.mobility.is_empty() {
        out.push(INSUFFICIENT);
    }
    for m in &stats.mobility {
        out.push(format!(
            "  - {}: Walking {:.0}% | Vehicle {:.0}%",
            m.operator, m.walking_pct, m.vehicle_pct
        ));
    }

    out.section(5);
    if stats.distance.is_empty() {
        out.push(INSUFFICIENT);
    }
    for d in &stats.distance {
        out.push(format!("  - {}:", d.operator));
        out.push(format!("    Total Travelled:   {:.2} km", d.travelled_km));
        out.push(format!(
            "    Unique Coverage:   ~{:.2} km ({} grid cells)",
            d.unique_coverage_km, d.grid_cells
        ));
    }

    out.section(6);
    if stats.infrastructure.is_empty() {
        out.push(INSUFFICIENT);
    }
    for i in &stats.infrastructure {
        out.push(format!("  - {}: {} Unique Towers/Sectors", i.operator, i.unique_pcis));
    }

    out.section(7);
    if stats.head_to_head.is_empty() {
        out.push("  no shared locations between operators");
    }
    for duel in &stats.head_to_head {
        out.push(format!(
            "  {} vs {} (Based on {} shared locations):",
            duel.first, duel.second, duel.shared_cells
        ));
        out.push(format!(
            "     {}: Wins {} spots ({:.1}%)",
            duel.first,
            duel.first_wins,
            duel.first_pct()
        ));
        out.push(format!(
            "     {}: Wins {} spots ({:.1}%)",
            duel.second,
            duel.second_wins,
            duel.second_pct()
        ));
    }

    footer(&mut out, summary);
    out.0
}

/// Report written when the statistics stage failed; every section says so.
pub fn render_failure(
    operators: &[String],
    verdicts: &[GroupVerdict],
    summary: &RunSummary,
    error: &str,
) -> Vec<String> {
    let mut out = Lines::default();
    header(&mut out, operators, verdicts);
    for idx in 0..SECTIONS.len() {
        out.section(idx);
        out.push("  statistics unavailable");
    }
    out.blank();
    out.push(format!("Statistics failed: {error}"));
    footer(&mut out, summary);
    out.0
}
