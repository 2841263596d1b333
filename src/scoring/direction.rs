// Direction & confidence estimator.
//
// Energetic particles outrun the plasma cloud, so a particle flux peak that
// precedes the speed peak in the anomalous window suggests an Earthward
// ejection. Only the order of the two peaks in the series matters, not
// their magnitudes.
//
// Confidence is the mean |z| over every anomalous position (speed and flux
// scores concatenated, undefined scores as 0), divided by a normalizer and
// capped at 1.0. With the default normalizer of 4.0, a mean |z| of 4 or more
// is full confidence.

use crate::detection::zscore::RollingZScores;
use crate::models::Direction;
use crate::telemetry::TelemetrySeries;

use super::round2;

/// Default mean |z| treated as full confidence.
pub const DEFAULT_CONFIDENCE_NORMALIZER: f64 = 4.0;

/// Position of the largest present value among `positions`. Ties keep the earliest.
fn argmax(positions: &[usize], value_at: impl Fn(usize) -> Option<f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for &i in positions {
        if let Some(v) = value_at(i) {
            let better = match best {
                Some((_, b)) => v > b,
                None => true,
            };
            if better {
                best = Some((i, v));
            }
        }
    }
    best.map(|(i, _)| i)
}

/// Infer the likely direction from the flux and speed peak positions.
pub fn direction(series: &TelemetrySeries, anomalies: &[usize]) -> Direction {
    let Some(&earliest) = anomalies.iter().min() else {
        return Direction::None;
    };

    let flux_peak = argmax(anomalies, |i| series.flux_at(i));
    let speed_peak = argmax(anomalies, |i| series.speed_at(i));
    let (flux_peak, speed_peak) = match (flux_peak, speed_peak) {
        (Some(f), Some(s)) => (f, s),
        _ => (earliest, earliest),
    };

    match flux_peak.cmp(&speed_peak) {
        std::cmp::Ordering::Less => Direction::LikelyEarthward,
        std::cmp::Ordering::Equal => Direction::PossibleEarthward,
        std::cmp::Ordering::Greater => Direction::Uncertain,
    }
}

/// Confidence in [0, 1], rounded to two decimals.
pub fn confidence(zscores: &RollingZScores, anomalies: &[usize], normalizer: f64) -> f64 {
    if anomalies.is_empty() || !(normalizer > 0.0) {
        return 0.0;
    }
    let scores = zscores.abs_scores_at(anomalies);
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    round2((mean / normalizer).clamp(0.0, 1.0))
}

/// Direction and confidence together; (`None`, 0.0) without anomalies.
pub fn estimate(
    series: &TelemetrySeries,
    zscores: &RollingZScores,
    anomalies: &[usize],
    normalizer: f64,
) -> (Direction, f64) {
    if anomalies.is_empty() {
        return (Direction::None, 0.0);
    }
    (
        direction(series, anomalies),
        confidence(zscores, anomalies, normalizer),
    )
}
