// Anomaly detector: runs both sub-detectors and merges their flags.
//
// The z-score test cannot fail. The forest can (empty or constant feature
// matrix); its error is kept on the report and it simply contributes no
// flags, so the z-score flags still come through.

use std::collections::BTreeSet;

use tracing::debug;

use super::forest::{self, ForestConfig};
use super::zscore::RollingZScores;
use super::DetectorError;
use crate::telemetry::TelemetrySeries;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// Trailing window size for the z-score test (default 3)
    pub zscore_window: usize,
    /// Flag when |z| is strictly above this (default 2.0)
    pub zscore_threshold: f64,
    pub forest: ForestConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            zscore_window: 3,
            zscore_threshold: 2.0,
            forest: ForestConfig::default(),
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.zscore_window == 0 {
            return Err(DetectorError::ZeroWindow);
        }
        if !(self.zscore_threshold.is_finite() && self.zscore_threshold > 0.0) {
            return Err(DetectorError::InvalidThreshold(self.zscore_threshold));
        }
        self.forest.validate()
    }
}

/// Everything the detector learned about one series.
#[derive(Debug, Clone)]
pub struct AnomalyReport {
    /// Union of both sub-detectors, strictly increasing
    pub indices: Vec<usize>,
    /// Per-position z-scores, reused for direction confidence
    pub zscores: RollingZScores,
    pub zscore_flags: Vec<usize>,
    pub forest_flags: Result<Vec<usize>, DetectorError>,
}

impl AnomalyReport {
    /// Report for an empty series; neither sub-detector runs.
    pub fn empty() -> Self {
        Self {
            indices: Vec::new(),
            zscores: RollingZScores::default(),
            zscore_flags: Vec::new(),
            forest_flags: Ok(Vec::new()),
        }
    }
}

/// Run both sub-detectors over `series` and union their flags.
pub fn detect(series: &TelemetrySeries, config: &DetectorConfig) -> AnomalyReport {
    if series.is_empty() {
        return AnomalyReport::empty();
    }

    let zscores = RollingZScores::compute(series, config.zscore_window);
    let zscore_flags = zscores.flagged(config.zscore_threshold);
    let forest_flags = forest::detect_outliers(series, &config.forest);

    let mut merged: BTreeSet<usize> = zscore_flags.iter().copied().collect();
    match &forest_flags {
        Ok(flags) => merged.extend(flags.iter().copied()),
        Err(e) => debug!(error = %e, "Isolation forest contributed no flags"),
    }
    let indices: Vec<usize> = merged.into_iter().filter(|&i| i < series.len()).collect();

    debug!(
        records = series.len(),
        zscore = zscore_flags.len(),
        forest = forest_flags.as_ref().map_or(0, Vec::len),
        anomalies = indices.len(),
        "Anomaly detection complete"
    );

    AnomalyReport {
        indices,
        zscores,
        zscore_flags,
        forest_flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TelemetryRecord;
    use chrono::{Duration, TimeZone, Utc};

    fn series(speeds: &[Option<f64>], fluxes: &[Option<f64>]) -> TelemetrySeries {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap();
        speeds
            .iter()
            .zip(fluxes)
            .enumerate()
            .map(|(i, (s, f))| TelemetryRecord {
                solar_wind_speed: *s,
                particle_flux: *f,
                ..TelemetryRecord::empty(t0 + Duration::minutes(i as i64))
            })
            .collect()
    }

    #[test]
    fn forest_failure_keeps_zscore_flags() {
        // An out-of-range contamination makes the forest refuse to fit
        let config = DetectorConfig {
            zscore_window: 10,
            forest: ForestConfig {
                contamination: 0.9,
                ..ForestConfig::default()
            },
            ..DetectorConfig::default()
        };
        let mut speeds = vec![Some(400.0); 9];
        speeds[1] = Some(402.0);
        speeds.push(Some(1200.0));
        let s = series(&speeds, &[None; 10]);
        let report = detect(&s, &config);
        assert!(report.forest_flags.is_err());
        assert_eq!(report.indices, vec![9]);
    }

    #[test]
    fn all_null_series_yields_no_flags() {
        let s = series(&[None; 6], &[None; 6]);
        let report = detect(&s, &DetectorConfig::default());
        assert!(report.indices.is_empty());
        assert!(matches!(
            report.forest_flags,
            Err(DetectorError::DegenerateFeatures { rows: 6 })
        ));
    }

    #[test]
    fn empty_series_short_circuits() {
        let report = detect(&TelemetrySeries::default(), &DetectorConfig::default());
        assert!(report.indices.is_empty());
        assert!(report.zscores.speed.is_empty());
    }

    #[test]
    fn zero_window_is_rejected() {
        let config = DetectorConfig {
            zscore_window: 0,
            ..DetectorConfig::default()
        };
        assert_eq!(config.validate(), Err(DetectorError::ZeroWindow));
    }
}
