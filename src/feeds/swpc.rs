// NOAA SWPC real-time solar wind plasma feed.
//
// The product is a JSON table: an array of rows, the first being column
// names (`time_tag`, `density`, `speed`, `temperature`), every cell a string
// or null. Speed and density map onto the canonical record; the feed has no
// particle flux, so that column stays empty.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{get_json, http_client, SpaceWeatherFeed};
use crate::telemetry::record::{parse_number, parse_timestamp};
use crate::telemetry::{TelemetryRecord, TelemetrySeries};

/// A cell as text: strings as-is, numbers formatted, anything else `None`.
fn cell_text(cell: &Value) -> Option<String> {
    match cell {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Convert a plasma table into a series. Rows with an unparseable time are dropped.
pub fn parse_plasma_table(value: &Value) -> Result<TelemetrySeries> {
    let rows = value
        .as_array()
        .context("SWPC plasma payload is not an array")?;
    let Some((header, body)) = rows.split_first() else {
        return Ok(TelemetrySeries::default());
    };

    let columns: Vec<String> = header
        .as_array()
        .context("SWPC plasma header row is not an array")?
        .iter()
        .map(|c| cell_text(c).unwrap_or_default().to_lowercase())
        .collect();
    let position = |name: &str| columns.iter().position(|c| c == name);

    let Some(time_col) = position("time_tag") else {
        anyhow::bail!("SWPC plasma table has no time_tag column");
    };
    let speed_col = position("speed");
    let density_col = position("density");

    let number_at = |row: &[Value], col: Option<usize>| {
        col.and_then(|c| row.get(c))
            .and_then(cell_text)
            .and_then(|s| parse_number(&s))
    };

    let records: Vec<TelemetryRecord> = body
        .iter()
        .filter_map(Value::as_array)
        .filter_map(|row| {
            let timestamp = row
                .get(time_col)
                .and_then(cell_text)
                .and_then(|s| parse_timestamp(&s))?;
            Some(TelemetryRecord {
                solar_wind_speed: number_at(&row[..], speed_col),
                solar_wind_density: number_at(&row[..], density_col),
                ..TelemetryRecord::empty(timestamp)
            })
        })
        .collect();

    debug!(rows = body.len(), kept = records.len(), "Parsed SWPC plasma table");
    Ok(TelemetrySeries::new(records))
}

pub struct SwpcPlasmaClient {
    client: reqwest::Client,
    url: String,
}

impl SwpcPlasmaClient {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            url: url.to_string(),
        })
    }

    /// Fetch the feed and normalize it into a series.
    pub async fn fetch_series(&self) -> Result<TelemetrySeries> {
        let value = self.latest().await?;
        parse_plasma_table(&value)
    }
}

#[async_trait]
impl SpaceWeatherFeed for SwpcPlasmaClient {
    fn name(&self) -> &'static str {
        "swpc-plasma"
    }

    async fn latest(&self) -> Result<Value> {
        get_json(&self.client, self.name(), &self.url, &[]).await
    }
}
