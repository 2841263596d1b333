// Earth arrival projection.
//
// First-order kinematics: the ejecta are assumed to cover one astronomical
// unit at the speed measured at the onset anomaly. No drag, no acceleration.

use crate::telemetry::TelemetrySeries;

use super::round2;

/// Mean Sun–Earth distance in km.
pub const AU_KM: f64 = 149_597_870.7;

/// Hours to cover 1 AU at `speed_km_s`, rounded to two decimals.
///
/// `None` for missing, zero, negative, or non-finite speeds, and for speeds
/// so small that the travel time itself is not finite.
pub fn eta_from_speed(speed_km_s: f64) -> Option<f64> {
    if !(speed_km_s.is_finite() && speed_km_s > 0.0) {
        return None;
    }
    let eta = round2(AU_KM / speed_km_s / 3600.0);
    eta.is_finite().then_some(eta)
}

/// Project arrival from the earliest anomaly's speed.
pub fn eta(series: &TelemetrySeries, anomalies: &[usize]) -> Option<f64> {
    let onset = *anomalies.iter().min()?;
    eta_from_speed(series.speed_at(onset)?)
}
