// Result models: the types that leave the detection pipeline.
//
// These are separate from the pipeline itself so the CLI, terminal output
// and web handlers can use them without pulling in detector internals.

use serde::{Deserialize, Serialize};

/// Severity of a detected event, from the peak solar-wind speed among anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    None,
    Mild,
    Medium,
    Severe,
}

impl Intensity {
    /// Map a peak speed (km/s) to an intensity, given the severe/medium thresholds.
    ///
    /// Both comparisons are strict: a peak of exactly `medium` is Mild, exactly
    /// `severe` is Medium. A NaN peak falls through to Mild.
    pub fn from_peak_speed(speed: f64, severe: f64, medium: f64) -> Self {
        match speed {
            s if s > severe => Intensity::Severe,
            s if s > medium => Intensity::Medium,
            _ => Intensity::Mild,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::None => "none",
            Intensity::Mild => "mild",
            Intensity::Medium => "medium",
            Intensity::Severe => "severe",
        }
    }
}

impl std::fmt::Display for Intensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Likely propagation direction inferred from flux/speed peak ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    None,
    Uncertain,
    PossibleEarthward,
    LikelyEarthward,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::None => "none",
            Direction::Uncertain => "uncertain",
            Direction::PossibleEarthward => "possible_earthward",
            Direction::LikelyEarthward => "likely_earthward",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Green,
    Yellow,
    Red,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Green => "green",
            RiskLevel::Yellow => "yellow",
            RiskLevel::Red => "red",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The aggregated output of one pipeline invocation.
///
/// Serializes as a flat record. `eta_hours` is 0.0 when no arrival time
/// could be projected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub cme_detected: bool,
    pub intensity: Intensity,
    pub eta_hours: f64,
    pub direction: Direction,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub message: String,
    pub anomaly_indices: Vec<usize>,
}

/// Narrow view of a detection: only the arrival projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub eta_hours: f64,
    pub message: String,
}

/// Placeholder alert payload served by the `alerts` surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertResult {
    pub risk_level: RiskLevel,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_serializes_snake_case() {
        let json = serde_json::to_string(&Direction::PossibleEarthward).unwrap();
        assert_eq!(json, "\"possible_earthward\"");
        assert_eq!(Direction::LikelyEarthward.to_string(), "likely_earthward");
    }

    #[test]
    fn intensity_nan_peak_is_mild() {
        assert_eq!(
            Intensity::from_peak_speed(f64::NAN, 600.0, 450.0),
            Intensity::Mild
        );
    }

    #[test]
    fn result_is_a_flat_record() {
        let result = DetectionResult {
            cme_detected: false,
            intensity: Intensity::None,
            eta_hours: 0.0,
            direction: Direction::None,
            confidence: 0.0,
            risk_level: RiskLevel::Green,
            message: "No CME detected. All clear.".to_string(),
            anomaly_indices: vec![],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["intensity"], "none");
        assert_eq!(value["risk_level"], "green");
        assert_eq!(value["anomaly_indices"], serde_json::json!([]));
    }
}
