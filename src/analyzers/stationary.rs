use crate::analyzers::utility::round_to;
use crate::config::AnalysisConfig;
use crate::sample::Sample;

/// Drops readings that repeat the previous one exactly.
///
/// Samples are stable-sorted by time across all operators. A sample is kept
/// when its rounded position or its RSRP differs from the preceding sample;
/// the first sample is always kept. A device standing still with a moving
/// signal is therefore retained.
pub fn remove_stationary(mut samples: Vec<Sample>, config: &AnalysisConfig) -> Vec<Sample> {
    samples.sort_by_key(|s| s.timestamp);

    let places = config.stationary_precision;
    let mut kept = Vec::with_capacity(samples.len());
    let mut prev: Option<(f64, f64, f64)> = None;

    for s in samples {
        let current = (round_to(s.lat, places), round_to(s.lon, places), s.rsrp);
        if prev != Some(current) {
            kept.push(s);
        }
        prev = Some(current);
    }

    kept
}
