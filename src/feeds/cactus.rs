// CACTus (Computer Aided CME Tracking) latest-CME proxy.
//
// There is no stable JSON API for CACTus; the endpoint is configurable and
// its payload is passed through untouched.

use anyhow::Result;
use async_trait::async_trait;

use super::{get_json, http_client, SpaceWeatherFeed};

pub struct CactusClient {
    client: reqwest::Client,
    url: String,
}

impl CactusClient {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl SpaceWeatherFeed for CactusClient {
    fn name(&self) -> &'static str {
        "cactus"
    }

    async fn latest(&self) -> Result<serde_json::Value> {
        get_json(&self.client, self.name(), &self.url, &[]).await
    }
}
