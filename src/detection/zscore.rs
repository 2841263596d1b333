// Rolling z-score test over solar wind speed and particle flux.
//
// z = (value - window_mean) / window_std, with the value itself inside its
// own trailing window. A position with a missing value, or whose window
// has zero spread, gets no z-score at all (never NaN or inf).

use super::window::{trailing_windows, window_stats};
use crate::telemetry::TelemetrySeries;

/// Per-position z-scores for both signals. `None` = undefined at that position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollingZScores {
    pub speed: Vec<Option<f64>>,
    pub flux: Vec<Option<f64>>,
}

impl RollingZScores {
    /// Compute z-scores for both signals of a series.
    pub fn compute(series: &TelemetrySeries, window: usize) -> Self {
        Self {
            speed: rolling_zscores(&series.speeds(), window),
            flux: rolling_zscores(&series.fluxes(), window),
        }
    }

    /// Positions where either signal exceeds `threshold` in absolute value, ascending.
    pub fn flagged(&self, threshold: f64) -> Vec<usize> {
        let exceeds = |z: &Option<f64>| z.is_some_and(|z| z.abs() > threshold);
        (0..self.speed.len().max(self.flux.len()))
            .filter(|&i| {
                self.speed.get(i).is_some_and(exceeds) || self.flux.get(i).is_some_and(exceeds)
            })
            .collect()
    }

    /// `|z|` for speed then flux at each position, missing scores as 0.0.
    pub fn abs_scores_at(&self, positions: &[usize]) -> Vec<f64> {
        let abs = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten().map_or(0.0, f64::abs);
        let mut out: Vec<f64> = positions.iter().map(|&i| abs(&self.speed[..], i)).collect();
        out.extend(positions.iter().map(|&i| abs(&self.flux[..], i)));
        out
    }
}

/// Rolling z-score of each value against its trailing window.
pub fn rolling_zscores(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .zip(trailing_windows(values, window))
        .map(|(value, w)| {
            let value = (*value)?;
            let stats = window_stats(w, 1)?;
            if stats.constant || stats.std <= 0.0 {
                return None;
            }
            let z = (value - stats.mean) / stats.std;
            z.is_finite().then_some(z)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_position_never_has_a_score() {
        let z = rolling_zscores(&[Some(400.0), Some(900.0)], 3);
        assert_eq!(z[0], None);
        // two-point window: z is exactly +1
        assert!((z[1].unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_window_is_undefined() {
        let z = rolling_zscores(&[Some(5.0); 4], 3);
        assert!(z.iter().all(Option::is_none));
    }

    #[test]
    fn missing_value_is_undefined() {
        let z = rolling_zscores(&[Some(1.0), Some(2.0), None, Some(3.0)], 3);
        assert_eq!(z[2], None);
        assert!(z[3].is_some());
    }

    #[test]
    fn three_point_window_cannot_exceed_sqrt_two() {
        // With the value inside its own window of n points, |z| <= sqrt(n - 1).
        let values: Vec<Option<f64>> = [1.0, 1.0, 1000.0, 1.0, 1.0, 5000.0]
            .into_iter()
            .map(Some)
            .collect();
        let z = rolling_zscores(&values, 3);
        assert!(z.iter().flatten().all(|z| z.abs() <= 2f64.sqrt() + 1e-9));
    }

    #[test]
    fn wide_window_flags_spikes() {
        let mut values = vec![Some(400.0); 9];
        values[1] = Some(402.0);
        values.push(Some(1200.0));
        let z = rolling_zscores(&values, 10);
        // close to the sqrt(n - 1) = 3 ceiling for a lone spike
        assert!(z[9].unwrap() > 2.0);
    }
}
