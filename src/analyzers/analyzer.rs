use crate::analyzers::aggregate::{aggregate_combined, aggregate_split, combined_maps, split_maps};
use crate::analyzers::sanitize::sanitize;
use crate::analyzers::significance::filter_significant;
use crate::analyzers::stationary::remove_stationary;
use crate::analyzers::types::{ChartRow, CoverageCell, GridCell, GroupVerdict};
use crate::config::AnalysisConfig;
use crate::report::{self, RunSummary};
use crate::sample::{Sample, Tech};
use crate::stats::ComparativeStats;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{error, info, warn};

/// Why a run produced nothing to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// No sample survived ingestion.
    NoSamples,
    /// Every operator/technology group was judged a ghost.
    NoSignificantGroups,
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyReason::NoSamples => f.write_str("no usable samples in the input"),
            EmptyReason::NoSignificantGroups => {
                f.write_str("no operator/technology group passed the significance filter")
            }
        }
    }
}

/// Everything one run hands to the export sink.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub report: Vec<String>,
    /// `None` when the statistics stage failed.
    pub stats: Option<ComparativeStats>,
    pub verdicts: Vec<GroupVerdict>,
    pub tech_maps: BTreeMap<(String, Tech), Vec<GridCell>>,
    pub combined_maps: BTreeMap<String, Vec<CoverageCell>>,
    pub charts: Vec<ChartRow>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Completed(Box<AnalysisRun>),
    Empty(EmptyReason),
}

/// Runs sanitize, stationary filter, grid aggregation, significance filter
/// and statistics over one batch of ingested samples.
///
/// Ghost technologies are excluded from the report, the charts and the
/// per-technology maps; the combined per-operator maps keep them. A failing
/// statistics stage is logged and replaced by a failure report with zero
/// distance totals, and the maps are still returned.
#[tracing::instrument(skip_all, fields(samples = samples.len()))]
pub fn analyze(samples: Vec<Sample>, config: &AnalysisConfig) -> PipelineOutcome {
    if samples.is_empty() {
        return PipelineOutcome::Empty(EmptyReason::NoSamples);
    }

    let raw_count = samples.len();
    let clean = remove_stationary(sanitize(samples, config), config);
    info!(before = raw_count, after = clean.len(), "Stationary filter applied");

    let combined = aggregate_combined(&clean, config);

    let (significant, verdicts) = filter_significant(&clean, config);
    if significant.is_empty() {
        warn!("Every operator/technology group was excluded");
        return PipelineOutcome::Empty(EmptyReason::NoSignificantGroups);
    }

    let split = aggregate_split(&significant, config);

    let mut summary = RunSummary {
        samples_after_cleaning: clean.len(),
        exported_map_points: combined.len(),
        ..Default::default()
    };

    let (report, stats, charts) = match ComparativeStats::compute(&significant, config) {
        Ok(stats) => {
            summary.total_travelled_km = stats.total_travelled_km();
            summary.total_unique_coverage_km = stats.total_unique_coverage_km();
            let report = report::render(&stats, &verdicts, &summary, config);
            let charts = stats.chart_rows(config);
            (report, Some(stats), charts)
        }
        Err(e) => {
            error!(error = ?e, "Statistics failed, exporting maps only");
            let operators: Vec<String> = significant
                .iter()
                .map(|s| s.operator.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let report = report::render_failure(&operators, &verdicts, &summary, &format!("{e:#}"));
            (report, None, Vec::new())
        }
    };

    info!(
        samples = summary.samples_after_cleaning,
        map_points = summary.exported_map_points,
        travelled_km = summary.total_travelled_km,
        coverage_km = summary.total_unique_coverage_km,
        "Analysis complete"
    );

    PipelineOutcome::Completed(Box::new(AnalysisRun {
        report,
        stats,
        verdicts,
        tech_maps: split_maps(split),
        combined_maps: combined_maps(combined),
        charts,
        summary,
    }))
}
