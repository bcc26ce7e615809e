//! CLI entry point for the signal rater.
//!
//! `analyze` turns a batch of signal logs into the operator comparison report
//! and coverage maps; `compare` pits devices that logged the same route
//! against each other.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use signal_rater::analyzers::analyzer::{PipelineOutcome, analyze};
use signal_rater::compare::{battle_report, load_devices, match_locations, write_matched};
use signal_rater::config::{AnalysisConfig, SignificancePolicy};
use signal_rater::output::{DirectorySink, export, print_json, print_pretty};
use signal_rater::parser::{discover_inputs, load_sources};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "signal_rater")]
#[command(about = "Compare cellular coverage across operators from signal logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze signal logs and export the comparison report and coverage maps
    Analyze {
        /// CSV files, or directories whose CSV files are all read
        #[arg(value_name = "PATH", default_value = ".")]
        inputs: Vec<PathBuf>,

        /// Directory the report, maps and chart data are written to
        #[arg(short, long, default_value = "exported_results")]
        output_dir: PathBuf,

        /// JSON file overriding analysis thresholds
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Minimum samples an operator/technology needs to be reported
        #[arg(long)]
        min_samples: Option<usize>,

        /// Mean RSRP (dBm) below which an operator/technology is discarded
        #[arg(long, allow_hyphen_values = true)]
        dead_zone: Option<f64>,

        /// Also drop technologies holding at most this share of the operator's dominant one
        #[arg(long)]
        dominant_ratio: Option<f64>,

        /// Sample count above which --dominant-ratio no longer applies
        #[arg(long, default_value_t = 5000)]
        dominant_floor: usize,

        /// Date for logs that only record the time of day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Print the run summary as JSON on stdout
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Compare devices that logged the same route
    Compare {
        /// Device logs as LABEL=PATH (or just PATH to label by file name)
        #[arg(value_name = "LABEL=PATH", required = true, num_args = 2..)]
        devices: Vec<String>,

        /// Only keep rows whose operator contains this text
        #[arg(long)]
        operator: Option<String>,

        /// CSV file for the matched grid cells
        #[arg(short, long, default_value = "comparison_data.csv")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/signal_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("signal_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            inputs,
            output_dir,
            config,
            min_samples,
            dead_zone,
            dominant_ratio,
            dominant_floor,
            date,
            json,
        } => {
            let mut config = match config {
                Some(path) => AnalysisConfig::load(path)?,
                None => AnalysisConfig::default(),
            };
            if let Some(min) = min_samples {
                config.min_samples_for_report = min;
            }
            if let Some(threshold) = dead_zone {
                config.dead_zone_rsrp = threshold;
            }
            if let Some(ratio) = dominant_ratio {
                config.significance_policy = SignificancePolicy::RelativeToDominant {
                    ratio,
                    floor: dominant_floor,
                };
            }
            if date.is_some() {
                config.reference_date = date;
            }

            run_analysis(&inputs, &output_dir, &config, json)?;
        }
        Commands::Compare {
            devices,
            operator,
            output,
        } => {
            run_comparison(&devices, operator.as_deref(), &output)?;
        }
    }

    Ok(())
}

/// Ingests every input, runs the pipeline and exports the results.
#[tracing::instrument(skip(config), fields(inputs = inputs.len(), output_dir = %output_dir.display()))]
fn run_analysis(
    inputs: &[PathBuf],
    output_dir: &Path,
    config: &AnalysisConfig,
    json: bool,
) -> Result<()> {
    let files = discover_inputs(inputs).context("failed to list input files")?;
    info!(files = files.len(), "Found CSV files");

    let ingested = load_sources(&files, config);

    match analyze(ingested.samples, config) {
        PipelineOutcome::Completed(run) => {
            let mut sink = DirectorySink::new(output_dir)?;
            export(&run, &mut sink)?;

            print_pretty(&run.summary);
            if json {
                print_json(&run.summary)?;
            }
            info!(output_dir = %sink.dir().display(), "Export finished");
        }
        PipelineOutcome::Empty(reason) => {
            warn!(%reason, "Nothing to report");
        }
    }

    Ok(())
}

/// Matches device logs cell by cell and reports which device hears better.
#[tracing::instrument(skip_all, fields(devices = args.len()))]
fn run_comparison(args: &[String], operator: Option<&str>, output: &Path) -> Result<()> {
    let devices = load_devices(args, operator);

    if devices.len() < 2 {
        bail!("need at least 2 device logs with usable points");
    }

    let matched = match_locations(&devices, AnalysisConfig::default().geo_precision);
    if matched.is_empty() {
        warn!("No matching GPS locations found");
        return Ok(());
    }
    info!(shared = matched.len(), "Matched locations across devices");

    if let [a, b] = devices.as_slice() {
        for line in battle_report(&matched, [&a.label, &b.label]) {
            info!("{line}");
        }
    }

    write_matched(output, &matched, devices.len())?;
    info!(path = %output.display(), "Comparison data saved");
    Ok(())
}
