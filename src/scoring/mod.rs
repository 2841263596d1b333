// Scoring: everything derived from the anomaly set: intensity, direction,
// arrival time, and the risk level shown to operators.

pub mod direction;
pub mod eta;
pub mod intensity;
pub mod risk;

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
