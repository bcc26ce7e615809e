use crate::config::AnalysisConfig;
use crate::sample::Sample;

/// Clears SNR and RSRQ readings outside their physical windows.
///
/// Out-of-range SNR usually comes from an integer-overflow sentinel on
/// incompatible modems; positive RSRQ is a device bug. Row count is unchanged.
pub fn sanitize(samples: Vec<Sample>, config: &AnalysisConfig) -> Vec<Sample> {
    let in_window = |v: f64, lo: f64, hi: f64| (lo..=hi).contains(&v);

    samples
        .into_iter()
        .map(|mut s| {
            s.snr = s.snr.filter(|&v| in_window(v, config.snr_min, config.snr_max));
            s.rsrq = s.rsrq.filter(|&v| in_window(v, config.rsrq_min, config.rsrq_max));
            s
        })
        .collect()
}
