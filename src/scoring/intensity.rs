// Intensity classifier: peak solar wind speed among anomalous records.

use crate::models::Intensity;
use crate::telemetry::TelemetrySeries;

/// Speed thresholds (km/s) separating intensity levels. Both are strict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityThresholds {
    /// Peak speed strictly above this is Severe (default 600)
    pub severe: f64,
    /// Peak speed strictly above this is Medium (default 450)
    pub medium: f64,
}

impl Default for IntensityThresholds {
    fn default() -> Self {
        Self {
            severe: 600.0,
            medium: 450.0,
        }
    }
}

/// Highest present speed among `anomalies`, `None` if every one is missing.
pub fn peak_speed(series: &TelemetrySeries, anomalies: &[usize]) -> Option<f64> {
    anomalies
        .iter()
        .filter_map(|&i| series.speed_at(i))
        .fold(None, |max, s| Some(max.map_or(s, |m: f64| m.max(s))))
}

/// Classify the anomalous subset of `series`.
///
/// No anomalies is `None`. Anomalies with no usable speed at all are `Mild`.
pub fn classify(
    series: &TelemetrySeries,
    anomalies: &[usize],
    thresholds: &IntensityThresholds,
) -> Intensity {
    if anomalies.is_empty() {
        return Intensity::None;
    }
    match peak_speed(series, anomalies) {
        Some(peak) => Intensity::from_peak_speed(peak, thresholds.severe, thresholds.medium),
        None => Intensity::Mild,
    }
}
