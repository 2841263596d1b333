// Telemetry normalization: every ingestion path ends in a TelemetrySeries.

pub mod archive;
pub mod csv;
pub mod fits;
pub mod record;

pub use record::{TelemetryRecord, TelemetrySeries};
