use serde::Serialize;

use crate::config::AnalysisConfig;

/// Coverage quality bucket for an RSRP reading.
///
/// | RSRP (dBm, defaults) | Bucket    |
/// |----------------------|-----------|
/// | >= -80               | Excellent |
/// | >= -100              | Good      |
/// | >= -115              | Fair      |
/// | < -115               | Dead Zone |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SignalQuality {
    Excellent,
    Good,
    Fair,
    #[serde(rename = "Dead Zone")]
    DeadZone,
}

impl SignalQuality {
    /// Buckets in report order.
    pub const ALL: [SignalQuality; 4] = [
        SignalQuality::Excellent,
        SignalQuality::Good,
        SignalQuality::Fair,
        SignalQuality::DeadZone,
    ];

    /// Position in [`SignalQuality::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignalQuality::Excellent => "Excellent",
            SignalQuality::Good => "Good",
            SignalQuality::Fair => "Fair",
            SignalQuality::DeadZone => "Dead Zone",
        }
    }

    /// Colour the charting side paints this bucket with.
    pub fn color(&self) -> &'static str {
        match self {
            SignalQuality::Excellent => "green",
            SignalQuality::Good => "gold",
            SignalQuality::Fair => "orange",
            SignalQuality::DeadZone => "red",
        }
    }
}

/// Places an RSRP reading into its quality bucket.
pub fn grade(rsrp: f64, config: &AnalysisConfig) -> SignalQuality {
    match rsrp {
        r if r >= config.rsrp_excellent => SignalQuality::Excellent,
        r if r >= config.rsrp_good => SignalQuality::Good,
        r if r >= config.rsrp_poor => SignalQuality::Fair,
        _ => SignalQuality::DeadZone,
    }
}
