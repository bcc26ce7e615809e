//! Export of a finished run: report text, coverage maps and chart inputs.
//!
//! [`ExportSink`] is the boundary to whatever persists the results;
//! [`DirectorySink`] writes plain files into one output directory.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::analyzer::AnalysisRun;
use crate::analyzers::types::{ChartRow, CoverageCell, GridCell};
use crate::report::RunSummary;
use crate::sample::Tech;

pub const REPORT_FILE: &str = "network_comparison_report.txt";
pub const CHART_FILE: &str = "chart_data.csv";

/// Destination for the artefacts of one run.
pub trait ExportSink {
    fn write_report(&mut self, lines: &[String]) -> Result<()>;
    fn write_tech_map(&mut self, operator: &str, tech: Tech, cells: &[GridCell]) -> Result<()>;
    fn write_combined_map(&mut self, operator: &str, cells: &[CoverageCell]) -> Result<()>;
    fn write_chart_data(&mut self, rows: &[ChartRow]) -> Result<()>;
}

/// File-name-safe form of a label: keeps alphanumerics, spaces, `_` and `-`,
/// trims, then turns spaces into underscores.
pub fn safe_name(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .trim()
        .replace(' ', "_")
}

pub fn tech_map_file(operator: &str, tech: Tech) -> String {
    format!("signal_map_{}_{}.csv", safe_name(operator), safe_name(tech.as_str()))
}

pub fn combined_map_file(operator: &str) -> String {
    format!("signal_map_{}_combined.csv", safe_name(operator))
}

/// Writes every artefact into a single directory, creating it on first use.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_csv<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<()> {
        let path = self.dir.join(name);
        debug!(path = %path.display(), rows = rows.len(), "Writing CSV");

        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl ExportSink for DirectorySink {
    fn write_report(&mut self, lines: &[String]) -> Result<()> {
        let path = self.dir.join(REPORT_FILE);
        fs::write(&path, lines.join("\n"))
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "Report saved");
        Ok(())
    }

    fn write_tech_map(&mut self, operator: &str, tech: Tech, cells: &[GridCell]) -> Result<()> {
        self.write_csv(&tech_map_file(operator, tech), cells)
    }

    fn write_combined_map(&mut self, operator: &str, cells: &[CoverageCell]) -> Result<()> {
        self.write_csv(&combined_map_file(operator), cells)
    }

    fn write_chart_data(&mut self, rows: &[ChartRow]) -> Result<()> {
        self.write_csv(CHART_FILE, rows)
    }
}

/// Hands a run to `sink`: maps first, then the report and chart inputs.
#[tracing::instrument(skip_all)]
pub fn export<S: ExportSink>(run: &AnalysisRun, sink: &mut S) -> Result<()> {
    for ((operator, tech), cells) in &run.tech_maps {
        sink.write_tech_map(operator, *tech, cells)?;
    }
    for (operator, cells) in &run.combined_maps {
        sink.write_combined_map(operator, cells)?;
        info!(operator = %operator, cells = cells.len(), "Coverage map exported");
    }
    sink.write_report(&run.report)?;
    if !run.charts.is_empty() {
        sink.write_chart_data(&run.charts)?;
    }
    Ok(())
}

/// Logs the run summary using Rust's debug pretty-print format.
pub fn print_pretty(summary: &RunSummary) {
    debug!("{:#?}", summary);
}

/// Prints the run summary as pretty JSON on stdout.
pub fn print_json(summary: &RunSummary) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::analyzer::{PipelineOutcome, analyze};
    use crate::analyzers::testutil::sample;
    use crate::config::AnalysisConfig;

    #[derive(Default)]
    struct MemorySink {
        report: Vec<String>,
        tech_maps: Vec<(String, Tech, usize)>,
        combined: Vec<(String, usize)>,
        charts: usize,
    }

    impl ExportSink for MemorySink {
        fn write_report(&mut self, lines: &[String]) -> Result<()> {
            self.report = lines.to_vec();
            Ok(())
        }

        fn write_tech_map(&mut self, operator: &str, tech: Tech, cells: &[GridCell]) -> Result<()> {
            self.tech_maps.push((operator.to_string(), tech, cells.len()));
            Ok(())
        }

        fn write_combined_map(&mut self, operator: &str, cells: &[CoverageCell]) -> Result<()> {
            self.combined.push((operator.to_string(), cells.len()));
            Ok(())
        }

        fn write_chart_data(&mut self, rows: &[ChartRow]) -> Result<()> {
            self.charts = rows.len();
            Ok(())
        }
    }

    fn run() -> AnalysisRun {
        let samples: Vec<_> = (0..6)
            .map(|i| {
                let op = if i % 2 == 0 { "A1" } else { "TURK TELEKOM" };
                sample(op, i * 5, 42.0 + i as f64 * 0.0001, 23.0, -90.0 - i as f64)
            })
            .collect();
        let config = AnalysisConfig {
            min_samples_for_report: 2,
            ..Default::default()
        };
        match analyze(samples, &config) {
            PipelineOutcome::Completed(run) => *run,
            PipelineOutcome::Empty(reason) => panic!("empty run: {reason}"),
        }
    }

    #[test]
    fn test_safe_name() {
        assert_eq!(safe_name("TURK TELEKOM"), "TURK_TELEKOM");
        assert_eq!(safe_name(" A1/BG (Sofia) "), "A1BG_Sofia");
        assert_eq!(safe_name("Mtel-BG_x"), "Mtel-BG_x");
        assert_eq!(tech_map_file("TURK TELEKOM", Tech::G4), "signal_map_TURK_TELEKOM_4G.csv");
        assert_eq!(combined_map_file("A1"), "signal_map_A1_combined.csv");
    }

    #[test]
    fn test_export_to_memory_sink() {
        let mut sink = MemorySink::default();
        export(&run(), &mut sink).unwrap();

        assert!(!sink.report.is_empty());
        assert_eq!(
            sink.tech_maps,
            vec![("A1".to_string(), Tech::G4, 3), ("TURK TELEKOM".to_string(), Tech::G4, 3)]
        );
        assert_eq!(sink.combined.len(), 2);
        assert_eq!(sink.charts, 2);
    }

    #[test]
    fn test_directory_sink_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("exported_results");
        let mut sink = DirectorySink::new(&out).unwrap();
        export(&run(), &mut sink).unwrap();

        let report = fs::read_to_string(out.join(REPORT_FILE)).unwrap();
        assert!(report.contains("[6] DISTANCE & COVERAGE ANALYSIS"));

        let map = fs::read_to_string(out.join("signal_map_TURK_TELEKOM_4G.csv")).unwrap();
        let mut lines = map.lines();
        assert_eq!(
            lines.next(),
            Some("grid_lat,grid_lon,operator,tech,rsrp,snr,rsrq,lat,lon,pci")
        );
        assert_eq!(lines.count(), 3);

        let combined = fs::read_to_string(out.join("signal_map_A1_combined.csv")).unwrap();
        assert_eq!(
            combined.lines().next(),
            Some("grid_lat,grid_lon,operator,rsrp,snr,rsrq,lat,lon,pci")
        );

        let charts = fs::read_to_string(out.join(CHART_FILE)).unwrap();
        assert!(charts.lines().next().unwrap().starts_with("label,operator,tech,samples"));
        assert!(charts.contains("A1 (4G)"));
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&RunSummary::default());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&RunSummary::default()).unwrap();
    }
}
