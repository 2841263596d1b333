// NASA DONKI (Space Weather Database Of Notifications, Knowledge, Information)
// CME catalog client.
//
// GET {base}/CME?startDate=YYYY-MM-DD&endDate=YYYY-MM-DD&api_key=KEY returns
// an array of CME activities, each with zero or more coronagraph analyses.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{get_json, http_client, SpaceWeatherFeed};

/// Days covered by `latest()`.
const LATEST_WINDOW_DAYS: i64 = 7;

/// One coronagraph analysis of a CME.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmeAnalysis {
    pub speed: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub is_most_accurate: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub half_angle: Option<f64>,
    /// Time the leading edge reaches 21.5 solar radii
    #[serde(rename = "time21_5")]
    pub time_21_5: Option<String>,
}

/// A CME activity record from DONKI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonkiCme {
    #[serde(rename = "activityID")]
    pub activity_id: String,
    pub start_time: String,
    pub source_location: Option<String>,
    pub note: Option<String>,
    #[serde(default)]
    pub cme_analyses: Option<Vec<CmeAnalysis>>,
}

impl DonkiCme {
    /// The analysis flagged most accurate, else the first one.
    pub fn best_analysis(&self) -> Option<&CmeAnalysis> {
        let analyses = self.cme_analyses.as_deref()?;
        analyses
            .iter()
            .find(|a| a.is_most_accurate)
            .or_else(|| analyses.first())
    }

    /// Speed (km/s) from the best analysis, if it has one.
    pub fn best_speed(&self) -> Option<f64> {
        self.best_analysis().and_then(|a| a.speed)
    }
}

/// Decode a DONKI CME response. `null` (empty body) means no events.
pub fn parse_cmes(value: serde_json::Value) -> Result<Vec<DonkiCme>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value).context("Unexpected DONKI CME payload")
}

pub struct DonkiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DonkiClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn fetch_raw(&self, start: NaiveDate, end: NaiveDate) -> Result<serde_json::Value> {
        let url = format!("{}/CME", self.base_url);
        get_json(
            &self.client,
            self.name(),
            &url,
            &[
                ("startDate", start.format("%Y-%m-%d").to_string()),
                ("endDate", end.format("%Y-%m-%d").to_string()),
                ("api_key", self.api_key.clone()),
            ],
        )
        .await
    }

    /// CMEs whose activity started in `[start, end]`.
    pub async fn fetch_cmes(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DonkiCme>> {
        parse_cmes(self.fetch_raw(start, end).await?)
    }

    /// CMEs from the last `days` days, up to today (UTC).
    pub async fn recent_cmes(&self, days: i64) -> Result<Vec<DonkiCme>> {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(days.max(0));
        self.fetch_cmes(start, end).await
    }
}

#[async_trait]
impl SpaceWeatherFeed for DonkiClient {
    fn name(&self) -> &'static str {
        "donki"
    }

    async fn latest(&self) -> Result<serde_json::Value> {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(LATEST_WINDOW_DAYS);
        self.fetch_raw(start, end).await
    }
}
