// Canonical telemetry records: the only input shape the pipeline accepts.
//
// Every ingestion path (CSV upload, FITS irradiance proxy, SWPC plasma feed)
// normalizes into a TelemetrySeries. Missing measurements are explicit
// `None`s, never sentinel numbers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub timestamp: DateTime<Utc>,
    /// Solar wind bulk speed in km/s
    pub solar_wind_speed: Option<f64>,
    /// Proton density (p/cm³)
    pub solar_wind_density: Option<f64>,
    pub particle_flux: Option<f64>,
    /// Image-derived irradiance proxy, used when no wind measurements exist
    pub solar_irradiance: Option<f64>,
}

impl TelemetryRecord {
    /// A record with only a timestamp; every measurement is missing.
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            solar_wind_speed: None,
            solar_wind_density: None,
            particle_flux: None,
            solar_irradiance: None,
        }
    }
}

/// An immutable, timestamp-ordered sequence of records.
///
/// Positions are 0-based and stable for the lifetime of the value, so
/// anomaly indices produced from a series always address that same series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<TelemetryRecord>", into = "Vec<TelemetryRecord>")]
pub struct TelemetrySeries {
    records: Vec<TelemetryRecord>,
}

impl TelemetrySeries {
    /// Build a series, sorting records by timestamp ascending.
    ///
    /// The sort is stable: records sharing a timestamp keep their input order.
    pub fn new(mut records: Vec<TelemetryRecord>) -> Self {
        records.sort_by_key(|r| r.timestamp);
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TelemetryRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[TelemetryRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TelemetryRecord> {
        self.records.iter()
    }

    /// Solar wind speed column, position-aligned with the series.
    pub fn speeds(&self) -> Vec<Option<f64>> {
        self.records.iter().map(|r| r.solar_wind_speed).collect()
    }

    /// Particle flux column, position-aligned with the series.
    pub fn fluxes(&self) -> Vec<Option<f64>> {
        self.records.iter().map(|r| r.particle_flux).collect()
    }

    /// Speed at a position, `None` if out of range or missing.
    pub fn speed_at(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(|r| r.solar_wind_speed)
    }

    /// Flux at a position, `None` if out of range or missing.
    pub fn flux_at(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(|r| r.particle_flux)
    }
}

impl From<Vec<TelemetryRecord>> for TelemetrySeries {
    fn from(records: Vec<TelemetryRecord>) -> Self {
        Self::new(records)
    }
}

impl From<TelemetrySeries> for Vec<TelemetryRecord> {
    fn from(series: TelemetrySeries) -> Self {
        series.records
    }
}

impl FromIterator<TelemetryRecord> for TelemetrySeries {
    fn from_iter<I: IntoIterator<Item = TelemetryRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a TelemetrySeries {
    type Item = &'a TelemetryRecord;
    type IntoIter = std::slice::Iter<'a, TelemetryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Naive layouts tried after RFC 3339; all are interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a timestamp cell into a UTC instant.
///
/// Accepts RFC 3339 (with offset or `Z`), common naive date-time layouts
/// (assumed UTC), and bare dates (midnight UTC). Anything else is `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // Naive timestamps sometimes carry a trailing Z without a full offset
    let naive_raw = raw.strip_suffix('Z').unwrap_or(raw);
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(naive_raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(naive_raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Coerce a numeric cell. Empty, non-numeric and non-finite values become `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_rfc3339_and_naive_layouts() {
        let a = parse_timestamp("2024-05-10T17:36:00Z").unwrap();
        let b = parse_timestamp("2024-05-10 17:36:00").unwrap();
        let c = parse_timestamp("2024-05-10T19:36:00+02:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.hour(), 17);
    }

    #[test]
    fn parses_fractional_seconds_and_bare_dates() {
        assert!(parse_timestamp("2024-05-10 17:36:00.500").is_some());
        let d = parse_timestamp("2024-05-10").unwrap();
        assert_eq!(d.hour(), 0);
    }

    #[test]
    fn garbage_timestamp_is_none() {
        assert!(parse_timestamp("yesterday-ish").is_none());
        assert!(parse_timestamp("   ").is_none());
    }

    #[test]
    fn numbers_coerce_to_none() {
        assert_eq!(parse_number(" 412.5 "), Some(412.5));
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn series_sorts_by_timestamp_stably() {
        let t0 = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
        let t1 = parse_timestamp("2024-01-01T01:00:00Z").unwrap();
        let mut late = TelemetryRecord::empty(t1);
        late.solar_wind_speed = Some(500.0);
        let mut early_a = TelemetryRecord::empty(t0);
        early_a.solar_wind_speed = Some(1.0);
        let mut early_b = TelemetryRecord::empty(t0);
        early_b.solar_wind_speed = Some(2.0);

        let series = TelemetrySeries::new(vec![late, early_a, early_b]);
        assert_eq!(series.speeds(), vec![Some(1.0), Some(2.0), Some(500.0)]);
    }

    #[test]
    fn deserialized_series_is_sorted() {
        let json = r#"[
            {"timestamp": "2024-01-01T01:00:00Z", "solar_wind_speed": 500.0,
             "solar_wind_density": null, "particle_flux": null, "solar_irradiance": null},
            {"timestamp": "2024-01-01T00:00:00Z", "solar_wind_speed": 1.0,
             "solar_wind_density": null, "particle_flux": null, "solar_irradiance": null}
        ]"#;
        let series: TelemetrySeries = serde_json::from_str(json).unwrap();
        assert_eq!(series.speeds(), vec![Some(1.0), Some(500.0)]);

        let back = serde_json::to_value(&series).unwrap();
        assert_eq!(back[0]["solar_wind_speed"], 1.0);
    }
}
