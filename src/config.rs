use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::pipeline::PipelineConfig;

pub const DEFAULT_DONKI_URL: &str = "https://api.nasa.gov/DONKI";
pub const DEFAULT_CACTUS_URL: &str = "https://api.mock.cactus/cme/latest";
pub const DEFAULT_SWPC_PLASMA_URL: &str =
    "https://services.swpc.noaa.gov/products/solar-wind/plasma-1-day.json";

/// Central configuration loaded from environment variables.
///
/// Everything has a default; the .env file is loaded automatically at
/// startup via dotenvy. Detector tunables override `PipelineConfig::default()`
/// one field at a time.
#[derive(Debug, Clone)]
pub struct Config {
    pub pipeline: PipelineConfig,
    /// Default folder scanned by `scan-fits`
    pub data_dir: PathBuf,
    /// NASA DONKI base URL (the CME endpoint is appended)
    pub donki_url: String,
    /// DONKI API key. DEMO_KEY works but is heavily rate limited.
    pub donki_api_key: String,
    pub cactus_url: String,
    /// NOAA SWPC real-time solar wind plasma product
    pub swpc_plasma_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let mut pipeline = PipelineConfig::default();
        let detector = &mut pipeline.detector;

        if let Some(seed) = parse_var("CMEWATCH_SEED")? {
            detector.forest.seed = seed;
        }
        if let Some(contamination) = parse_var("CMEWATCH_CONTAMINATION")? {
            detector.forest.contamination = contamination;
        }
        if let Some(trees) = parse_var("CMEWATCH_TREES")? {
            detector.forest.n_trees = trees;
        }
        if let Some(window) = parse_var("CMEWATCH_ZSCORE_WINDOW")? {
            detector.zscore_window = window;
        }
        if let Some(threshold) = parse_var("CMEWATCH_ZSCORE_THRESHOLD")? {
            detector.zscore_threshold = threshold;
        }

        detector
            .validate()
            .context("Invalid detector settings in environment")?;

        Ok(Self {
            pipeline,
            data_dir: env::var("CMEWATCH_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            donki_url: env::var("DONKI_URL").unwrap_or_else(|_| DEFAULT_DONKI_URL.to_string()),
            donki_api_key: env::var("DONKI_API_KEY").unwrap_or_else(|_| "DEMO_KEY".to_string()),
            cactus_url: env::var("CACTUS_URL").unwrap_or_else(|_| DEFAULT_CACTUS_URL.to_string()),
            swpc_plasma_url: env::var("SWPC_PLASMA_URL")
                .unwrap_or_else(|_| DEFAULT_SWPC_PLASMA_URL.to_string()),
        })
    }
}

/// Parse an optional variable. Unset or blank is `None`; garbage is an error.
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        _ => Ok(None),
    }
}
