// External space-weather feeds.
//
// These sit outside the detection core: they fetch data over HTTP and either
// proxy it as-is (DONKI, CACTus) or normalize it into a TelemetrySeries
// (SWPC real-time plasma) before the pipeline ever sees it.

pub mod cactus;
pub mod donki;
pub mod swpc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

pub const USER_AGENT: &str = concat!("cmewatch/", env!("CARGO_PKG_VERSION"), " (cme-detection)");

/// A remote source of space-weather data that can be proxied as JSON.
#[async_trait]
pub trait SpaceWeatherFeed: Send + Sync {
    /// Short identifier used in logs and routes.
    fn name(&self) -> &'static str;

    /// Fetch the feed's most recent payload, unmodified.
    async fn latest(&self) -> Result<serde_json::Value>;
}

/// Build the shared HTTP client used by every feed.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")
}

/// GET a URL and decode JSON, turning non-2xx responses into errors.
///
/// An empty 2xx body decodes as JSON `null`; DONKI answers that way when a
/// date range has no events.
pub(crate) async fn get_json(
    client: &reqwest::Client,
    feed: &str,
    url: &str,
    query: &[(&str, String)],
) -> Result<serde_json::Value> {
    debug!(feed, url, "Fetching feed");
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .with_context(|| format!("{feed} request failed"))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("{} returned {}: {}", feed, status, body);
    }

    let body = response
        .text()
        .await
        .with_context(|| format!("Failed to read {feed} response"))?;
    if body.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(&body).with_context(|| format!("Failed to parse {feed} response"))
}
