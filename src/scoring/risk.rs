// Risk mapper: intensity to alert color and operator message.

use crate::models::{Intensity, RiskLevel};

pub const SEVERE_MESSAGE: &str =
    "Strong CME detected! High risk to satellites and power grids. Take immediate action.";
pub const MEDIUM_MESSAGE: &str =
    "Moderate CME detected. Monitor systems and prepare for possible impact.";
pub const MILD_MESSAGE: &str = "Mild CME detected. Low risk, but monitor for updates.";
pub const ALL_CLEAR_MESSAGE: &str = "No CME detected. All clear.";

pub fn risk(intensity: Intensity) -> (RiskLevel, &'static str) {
    match intensity {
        Intensity::Severe => (RiskLevel::Red, SEVERE_MESSAGE),
        Intensity::Medium => (RiskLevel::Yellow, MEDIUM_MESSAGE),
        Intensity::Mild => (RiskLevel::Yellow, MILD_MESSAGE),
        Intensity::None => (RiskLevel::Green, ALL_CLEAR_MESSAGE),
    }
}
