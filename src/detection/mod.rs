// Anomaly detection: rolling z-score test plus an isolation forest,
// unioned into one sorted set of series positions.

pub mod anomaly;
pub mod forest;
pub mod window;
pub mod zscore;

use thiserror::Error;

pub use anomaly::{detect, AnomalyReport, DetectorConfig};

/// Why a sub-detector or its configuration could not be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectorError {
    #[error("feature matrix is empty")]
    EmptyFeatures,
    #[error("feature matrix is degenerate: all {rows} rows are identical")]
    DegenerateFeatures { rows: usize },
    #[error("contamination must be in (0, 0.5], got {0}")]
    InvalidContamination(f64),
    #[error("isolation forest needs at least one tree")]
    NoTrees,
    #[error("per-tree sample size must be at least 2, got {0}")]
    SampleSizeTooSmall(usize),
    #[error("z-score window must be at least 1")]
    ZeroWindow,
    #[error("z-score threshold must be positive and finite, got {0}")]
    InvalidThreshold(f64),
}
