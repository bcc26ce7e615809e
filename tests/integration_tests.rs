use chrono::NaiveDate;
use signal_rater::analyzers::analyzer::{AnalysisRun, EmptyReason, PipelineOutcome, analyze};
use signal_rater::analyzers::types::GhostReason;
use signal_rater::compare::{battle_report, load_device, match_locations};
use signal_rater::config::{AnalysisConfig, SignificancePolicy};
use signal_rater::output::{CHART_FILE, DirectorySink, REPORT_FILE, export};
use signal_rater::parser::{IngestError, load_sources, parse_file, parse_reader};
use signal_rater::sample::Tech;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn config() -> AnalysisConfig {
    AnalysisConfig {
        min_samples_for_report: 5,
        reference_date: NaiveDate::from_ymd_opt(2025, 3, 14),
        ..Default::default()
    }
}

fn completed(outcome: PipelineOutcome) -> AnalysisRun {
    match outcome {
        PipelineOutcome::Completed(run) => *run,
        PipelineOutcome::Empty(reason) => panic!("empty run: {reason}"),
    }
}

#[test]
fn test_ingest_app_log() {
    let (samples, summary) = parse_file(&fixture("drive_sofia.csv"), &config()).unwrap();

    assert_eq!(summary.rows_read, 14);
    assert_eq!(summary.rows_kept, 12);
    assert_eq!(summary.dropped_operator, 1);
    assert_eq!(summary.dropped_position, 1);
    assert!(samples.iter().all(|s| s.source == "drive_sofia"));
    assert!(samples.iter().all(|s| s.operator == "A1" || s.operator == "YETTEL"));
    assert_eq!(
        samples[0].timestamp,
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    );
    assert_eq!(samples.iter().filter(|s| s.tech == Tech::G3).count(), 1);
}

#[test]
fn test_incompatible_file_is_rejected() {
    let err = parse_file(&fixture("ocr_results.csv"), &config()).unwrap_err();
    assert!(matches!(err, IngestError::Incompatible));

    let ingested = load_sources(
        &[fixture("drive_sofia.csv"), fixture("ocr_results.csv")],
        &config(),
    );
    assert_eq!(ingested.samples.len(), 12);
    assert_eq!(ingested.skipped.len(), 1);
}

#[test]
fn test_full_pipeline() {
    let ingested = load_sources(&[fixture("drive_sofia.csv")], &config());
    let run = completed(analyze(ingested.samples, &config()));

    // one stationary repeat removed
    assert_eq!(run.summary.samples_after_cleaning, 11);
    assert_eq!(run.summary.exported_map_points, 11);
    assert!(run.summary.total_travelled_km > 0.8 && run.summary.total_travelled_km < 1.0);

    let keys: Vec<_> = run.tech_maps.keys().cloned().collect();
    assert_eq!(
        keys,
        vec![("A1".to_string(), Tech::G4), ("YETTEL".to_string(), Tech::G4)]
    );
    assert_eq!(run.combined_maps["A1"].len(), 6);
    assert_eq!(run.combined_maps["YETTEL"].len(), 5);

    let ghost = run.verdicts.iter().find(|v| !v.is_significant()).unwrap();
    assert_eq!(ghost.group.operator, "A1");
    assert_eq!(ghost.group.tech, Tech::G3);
    assert_eq!(ghost.ghost, Some(GhostReason::TooFewSamples));

    let stats = run.stats.as_ref().unwrap();
    assert_eq!(stats.operators, vec!["A1", "YETTEL"]);
    assert_eq!(stats.head_to_head.len(), 1);
    assert_eq!(stats.head_to_head[0].shared_cells, 5);
    assert_eq!(stats.head_to_head[0].first_wins, 5);

    assert!(run.report.iter().any(|l| l == "  - A1: 2 Unique Towers/Sectors"));
    assert!(run.report.iter().any(|l| l.starts_with("Excluded: A1 (3G)")));
    assert!(!run.report.iter().any(|l| l.contains("A1 (3G)") && !l.starts_with("Excluded")));
}

#[test]
fn test_export_to_directory() {
    let ingested = load_sources(&[fixture("drive_sofia.csv")], &config());
    let run = completed(analyze(ingested.samples, &config()));

    let dir = tempfile::tempdir().unwrap();
    let mut sink = DirectorySink::new(dir.path().join("exported_results")).unwrap();
    export(&run, &mut sink).unwrap();

    let out = sink.dir();
    let report = std::fs::read_to_string(out.join(REPORT_FILE)).unwrap();
    assert!(report.contains("NETWORK COMPARISON REPORT"));
    assert!(report.contains("Exported Map Points:         11"));

    for name in [
        "signal_map_A1_4G.csv",
        "signal_map_YETTEL_4G.csv",
        "signal_map_A1_combined.csv",
        "signal_map_YETTEL_combined.csv",
    ] {
        assert!(out.join(name).exists(), "{name} not written");
    }
    assert!(!out.join("signal_map_A1_3G.csv").exists());

    let charts = std::fs::read_to_string(out.join(CHART_FILE)).unwrap();
    assert_eq!(charts.lines().count(), 3);
}

#[test]
fn test_default_thresholds_leave_nothing_to_report() {
    let default = AnalysisConfig {
        reference_date: NaiveDate::from_ymd_opt(2025, 3, 14),
        ..Default::default()
    };
    let ingested = load_sources(&[fixture("drive_sofia.csv")], &default);

    let outcome = analyze(ingested.samples, &default);
    assert!(matches!(
        outcome,
        PipelineOutcome::Empty(EmptyReason::NoSignificantGroups)
    ));
}

#[test]
fn test_relative_policy_drops_minor_technology() {
    let relative = AnalysisConfig {
        min_samples_for_report: 1,
        significance_policy: SignificancePolicy::RelativeToDominant {
            ratio: 0.5,
            floor: 5000,
        },
        ..config()
    };
    let ingested = load_sources(&[fixture("drive_sofia.csv")], &relative);
    let run = completed(analyze(ingested.samples, &relative));

    let ghost = run.verdicts.iter().find(|v| !v.is_significant()).unwrap();
    assert_eq!(ghost.group.tech, Tech::G3);
    assert_eq!(ghost.ghost, Some(GhostReason::MinorTechnology));
    assert_eq!(run.tech_maps.len(), 2);
}

#[test]
fn test_config_file_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thresholds.json");
    std::fs::write(
        &path,
        r#"{"min_samples_for_report": 5, "reference_date": "2025-03-14"}"#,
    )
    .unwrap();

    let loaded = AnalysisConfig::load(&path).unwrap();
    assert_eq!(loaded.min_samples_for_report, 5);
    assert_eq!(loaded.dead_zone_rsrp, -130.0);

    let ingested = load_sources(&[fixture("drive_sofia.csv")], &loaded);
    assert!(matches!(
        analyze(ingested.samples, &loaded),
        PipelineOutcome::Completed(_)
    ));
}

#[test]
fn test_operator_split_device_comparison() {
    let path = fixture("drive_sofia.csv");
    let a1 = load_device(&path, "A1", Some("a1")).unwrap();
    let yettel = load_device(&path, "YETTEL", Some("yettel")).unwrap();
    assert_eq!(a1.points.len(), 6);
    assert_eq!(yettel.points.len(), 6);

    let matched = match_locations(&[a1, yettel], 4);
    assert_eq!(matched.len(), 5);

    let report = battle_report(&matched, ["A1", "YETTEL"]);
    assert!(report.iter().any(|l| l.contains("A1 Better:   5 spots (100.0%)")));
}

#[test]
fn test_off_globe_row_does_not_sink_statistics() {
    let csv = "Timestamp,Latitude,Longitude,RSRP,Operator,NetworkType,PCI\n\
               10:00:00,42.6970,23.3210,-85,A1,LTE,101\n\
               10:00:05,42.6980,23.3210,-86,A1,LTE,101\n\
               10:00:10,95.0000,23.3210,-87,A1,LTE,101\n\
               10:00:15,42.7000,23.3210,-88,A1,LTE,101\n\
               10:00:00,42.6970,23.3210,-95,Yettel,LTE,201\n\
               10:00:05,42.6980,23.3210,-96,Yettel,LTE,201\n\
               10:00:10,42.6990,23.3210,-97,Yettel,LTE,201\n";
    let relaxed = AnalysisConfig {
        min_samples_for_report: 3,
        ..config()
    };
    let (samples, summary) = parse_reader(csv.as_bytes(), "mixed", &relaxed).unwrap();
    assert_eq!(summary.dropped_position, 1);

    let run = completed(analyze(samples, &relaxed));

    let stats = run.stats.as_ref().unwrap();
    assert_eq!(stats.operators, vec!["A1", "YETTEL"]);
    assert_eq!(stats.distance.len(), 2);
    assert!(stats.distance.iter().all(|d| d.travelled_km > 0.0));
    assert!(!run.report.iter().any(|l| l.contains("statistics unavailable")));
    assert!(run.report.iter().any(|l| l == "  - YETTEL: 1 Unique Towers/Sectors"));
}
