// CSV normalizer: turns an uploaded table into a TelemetrySeries.
//
// Column lookup is case-insensitive. Missing measurement columns become
// all-null columns. Cells that don't parse become None. Rows whose
// timestamp can't be parsed are dropped before the series is indexed.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use csv::StringRecord;
use tracing::{debug, warn};

use super::record::{parse_number, parse_timestamp, TelemetryRecord, TelemetrySeries};

/// Canonical column order written by the FITS ingestion path.
pub const CANONICAL_COLUMNS: [&str; 5] = [
    "timestamp",
    "solar_irradiance",
    "solar_wind_speed",
    "solar_wind_density",
    "particle_flux",
];

/// Read a telemetry CSV from any reader.
///
/// Fails only when the header row itself is unreadable or there is no
/// `timestamp` column; every other defect is coerced.
pub fn read_series<R: Read>(reader: R) -> Result<TelemetrySeries> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();
    let columns = ColumnMap::from_headers(&headers);

    let Some(ts_col) = columns.get("timestamp") else {
        anyhow::bail!("CSV has no `timestamp` column");
    };

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for (line, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(line = line + 2, error = %e, "Skipping unreadable CSV row");
                dropped += 1;
                continue;
            }
        };

        let Some(timestamp) = row.get(ts_col).and_then(parse_timestamp) else {
            dropped += 1;
            continue;
        };

        records.push(TelemetryRecord {
            timestamp,
            solar_wind_speed: columns.number(&row, "solar_wind_speed"),
            solar_wind_density: columns.number(&row, "solar_wind_density"),
            particle_flux: columns.number(&row, "particle_flux"),
            solar_irradiance: columns.number(&row, "solar_irradiance"),
        });
    }

    debug!(rows = records.len(), dropped, "Normalized telemetry CSV");
    Ok(TelemetrySeries::new(records))
}

/// Read a telemetry CSV from disk.
pub fn read_series_file(path: &Path) -> Result<TelemetrySeries> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open CSV '{}'", path.display()))?;
    read_series(file).with_context(|| format!("Failed to parse CSV '{}'", path.display()))
}

/// Write a series in canonical column order. Missing values are empty cells.
pub fn write_series<W: Write>(writer: W, series: &TelemetrySeries) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(CANONICAL_COLUMNS)?;

    for record in series {
        writer.write_record([
            record.timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            format_cell(record.solar_irradiance),
            format_cell(record.solar_wind_speed),
            format_cell(record.solar_wind_density),
            format_cell(record.particle_flux),
        ])?;
    }

    writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

fn format_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Lower-cased header name -> column position.
struct ColumnMap(HashMap<String, usize>);

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Self {
        let map = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();
        Self(map)
    }

    fn get(&self, name: &str) -> Option<usize> {
        self.0.get(name).copied()
    }

    fn number(&self, row: &StringRecord, name: &str) -> Option<f64> {
        self.get(name)
            .and_then(|i| row.get(i))
            .and_then(parse_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_become_null() {
        let csv = "timestamp,solar_wind_speed\n2024-01-01T00:00:00Z,400\n";
        let series = read_series(csv.as_bytes()).unwrap();
        assert_eq!(series.len(), 1);
        let r = series.get(0).unwrap();
        assert_eq!(r.solar_wind_speed, Some(400.0));
        assert_eq!(r.particle_flux, None);
        assert_eq!(r.solar_wind_density, None);
    }

    #[test]
    fn headers_are_case_insensitive() {
        let csv = "Timestamp, Solar_Wind_Speed ,PARTICLE_FLUX\n2024-01-01T00:00:00Z,400,12\n";
        let series = read_series(csv.as_bytes()).unwrap();
        assert_eq!(series.speed_at(0), Some(400.0));
        assert_eq!(series.flux_at(0), Some(12.0));
    }

    #[test]
    fn no_timestamp_column_is_an_error() {
        let csv = "solar_wind_speed\n400\n";
        assert!(read_series(csv.as_bytes()).is_err());
    }
}
