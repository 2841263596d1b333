// Detection pipeline: series -> anomalies -> {intensity, direction, ETA} -> risk.
//
// A Pipeline is a plain value holding its configuration. It keeps no state
// between calls, so one instance can be shared across threads and used for
// any number of concurrent detections.

use tracing::info;

use crate::detection::{self, AnomalyReport, DetectorConfig, DetectorError};
use crate::models::{AlertResult, DetectionResult, Direction, ForecastResult, Intensity, RiskLevel};
use crate::scoring::direction::{self, DEFAULT_CONFIDENCE_NORMALIZER};
use crate::scoring::eta;
use crate::scoring::intensity::{self, IntensityThresholds};
use crate::scoring::risk::{self, ALL_CLEAR_MESSAGE};
use crate::telemetry::TelemetrySeries;

pub const NO_CME_FORECAST_MESSAGE: &str = "No CME detected.";
pub const NO_SPEED_FORECAST_MESSAGE: &str =
    "CME activity detected, but onset speed is unavailable; no ETA.";

/// Every tunable of the pipeline. `Default` is the reference configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub detector: DetectorConfig,
    pub intensity: IntensityThresholds,
    /// Mean |z| that maps to full confidence (default 4.0)
    pub confidence_normalizer: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            intensity: IntensityThresholds::default(),
            confidence_normalizer: DEFAULT_CONFIDENCE_NORMALIZER,
        }
    }
}

/// A detection result together with the detector's working data.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub result: DetectionResult,
    pub report: AnomalyReport,
    /// Projected arrival, `None` when undefined (the result carries 0.0)
    pub eta_hours: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Build a pipeline, rejecting unusable detector settings up front.
    pub fn new(config: PipelineConfig) -> Result<Self, DetectorError> {
        config.detector.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run detection and keep the intermediate anomaly report.
    pub fn analyze(&self, series: &TelemetrySeries) -> Analysis {
        if series.is_empty() {
            return Analysis {
                result: all_clear(),
                report: AnomalyReport::empty(),
                eta_hours: None,
            };
        }

        let report = detection::detect(series, &self.config.detector);
        let anomalies = &report.indices;

        let intensity = intensity::classify(series, anomalies, &self.config.intensity);
        let (direction, confidence) = direction::estimate(
            series,
            &report.zscores,
            anomalies,
            self.config.confidence_normalizer,
        );
        let eta_hours = eta::eta(series, anomalies);
        let (risk_level, message) = risk::risk(intensity);

        info!(
            records = series.len(),
            anomalies = anomalies.len(),
            intensity = %intensity,
            direction = %direction,
            risk = %risk_level,
            "CME detection complete"
        );

        let result = DetectionResult {
            cme_detected: !anomalies.is_empty(),
            intensity,
            eta_hours: eta_hours.unwrap_or(0.0),
            direction,
            confidence,
            risk_level,
            message: message.to_string(),
            anomaly_indices: anomalies.clone(),
        };

        Analysis {
            result,
            report,
            eta_hours,
        }
    }

    /// The full detection result for one series.
    pub fn detect(&self, series: &TelemetrySeries) -> DetectionResult {
        self.analyze(series).result
    }

    /// Forecast view: arrival time and a message describing it.
    pub fn forecast(&self, series: &TelemetrySeries) -> ForecastResult {
        let analysis = self.analyze(series);
        forecast_view(&analysis)
    }
}

/// Narrow an analysis down to its forecast view.
pub fn forecast_view(analysis: &Analysis) -> ForecastResult {
    let message = match analysis.eta_hours {
        Some(eta) => format!("Estimated CME impact at Earth in {eta} hours."),
        None if analysis.result.cme_detected => NO_SPEED_FORECAST_MESSAGE.to_string(),
        None => NO_CME_FORECAST_MESSAGE.to_string(),
    };
    ForecastResult {
        eta_hours: analysis.eta_hours.unwrap_or(0.0),
        message,
    }
}

/// Placeholder alert payload. Not derived from any telemetry.
pub fn alert_stub() -> AlertResult {
    AlertResult {
        risk_level: RiskLevel::Green,
        message: ALL_CLEAR_MESSAGE.to_string(),
    }
}

fn all_clear() -> DetectionResult {
    DetectionResult {
        cme_detected: false,
        intensity: Intensity::None,
        eta_hours: 0.0,
        direction: Direction::None,
        confidence: 0.0,
        risk_level: RiskLevel::Green,
        message: ALL_CLEAR_MESSAGE.to_string(),
        anomaly_indices: Vec::new(),
    }
}
