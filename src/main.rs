use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use cmewatch::config::Config;
use cmewatch::feeds::donki::DonkiClient;
use cmewatch::feeds::swpc::SwpcPlasmaClient;
use cmewatch::models::Intensity;
use cmewatch::output::terminal;
use cmewatch::pipeline::{alert_stub, forecast_view, Pipeline};
use cmewatch::telemetry::{archive, csv as telemetry_csv, fits};

/// cmewatch: Coronal mass ejection detection from solar telemetry.
///
/// Flags anomalous stretches in solar wind speed and particle flux, then
/// classifies the event's intensity, direction, Earth arrival time, and risk.
#[derive(Parser)]
#[command(name = "cmewatch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CME detection on a telemetry CSV
    Detect {
        /// CSV with a timestamp column and any of the telemetry columns
        csv: PathBuf,

        /// Print the raw DetectionResult as JSON
        #[arg(long)]
        json: bool,
    },

    /// Project the Earth arrival time for a telemetry CSV
    Forecast {
        csv: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Show the current alert (static placeholder)
    Alerts,

    /// Convert a folder or ZIP of FITS images into a telemetry CSV
    IngestFits {
        /// Directory (searched recursively) or .zip archive
        #[arg(long)]
        input: PathBuf,

        /// Output CSV path
        #[arg(long)]
        out: PathBuf,
    },

    /// Ingest FITS images and check them for a severe CME
    ScanFits {
        /// Directory or .zip archive (default: CMEWATCH_DATA_DIR)
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Export useful FITS header keywords to CSV, one row per file
    FitsHeaders {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        out: PathBuf,
    },

    /// Run detection on the NOAA SWPC real-time plasma feed
    Live {
        #[arg(long)]
        json: bool,
    },

    /// List CMEs reported by NASA DONKI
    Donki {
        /// How many days back to look (default: 7)
        #[arg(long, default_value = "7")]
        days: i64,
    },

    /// Start the HTTP API
    #[cfg(feature = "web")]
    Serve {
        /// Port to listen on (default: 8000)
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Address to bind (default: 127.0.0.1)
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cmewatch=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Detect { csv, json } => {
            let pipeline = build_pipeline(&config)?;
            let series = telemetry_csv::read_series_file(&csv)?;
            let analysis = pipeline.analyze(&series);
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis.result)?);
            } else {
                terminal::display_analysis(&analysis, &series);
            }
        }

        Commands::Forecast { csv, json } => {
            let pipeline = build_pipeline(&config)?;
            let series = telemetry_csv::read_series_file(&csv)?;
            let forecast = pipeline.forecast(&series);
            if json {
                println!("{}", serde_json::to_string_pretty(&forecast)?);
            } else {
                terminal::display_forecast(&forecast);
            }
        }

        Commands::Alerts => {
            terminal::display_alert(&alert_stub());
        }

        Commands::IngestFits { input, out } => {
            println!("Reading FITS files from {}...", input.display());
            let (summaries, series) = archive::load_irradiance_series(&input)?;
            let dropped = summaries.len() - series.len();
            if dropped > 0 {
                warn!(dropped, "FITS files without a usable observation time");
            }

            let file = File::create(&out)
                .with_context(|| format!("Failed to create '{}'", out.display()))?;
            telemetry_csv::write_series(BufWriter::new(file), &series)?;

            println!("\n{}", "Ingest complete.".bold());
            println!("  FITS files read: {}", summaries.len());
            println!("  Rows written: {}", series.len());
            println!("  Output: {}", out.display());
        }

        Commands::ScanFits { input } => {
            let pipeline = build_pipeline(&config)?;
            let input = input.unwrap_or_else(|| config.data_dir.clone());
            println!("Scanning FITS files in {}...", input.display());

            let (summaries, series) = archive::load_irradiance_series(&input)?;
            let analysis = pipeline.analyze(&series);
            info!(
                files = summaries.len(),
                records = series.len(),
                intensity = %analysis.result.intensity,
                "FITS scan complete"
            );

            if analysis.result.intensity == Intensity::Severe {
                println!("\n{}", "Severe CME detected!".red().bold());
                terminal::display_fits_summaries(&summaries);
            } else {
                println!(
                    "\nNo severe CME detected ({} files, intensity {}).",
                    summaries.len(),
                    terminal::colorize_intensity(analysis.result.intensity)
                );
            }
        }

        Commands::FitsHeaders { input, out } => {
            let rows = export_fits_headers(&input, &out)?;
            println!("Wrote {rows} header rows to {}", out.display());
        }

        Commands::Live { json } => {
            let pipeline = build_pipeline(&config)?;
            println!("Fetching SWPC real-time plasma...");
            let client = SwpcPlasmaClient::new(&config.swpc_plasma_url)?;
            let series = client.fetch_series().await?;
            let analysis = pipeline.analyze(&series);
            if json {
                let body = serde_json::json!({
                    "detection": &analysis.result,
                    "forecast": forecast_view(&analysis),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                terminal::display_analysis(&analysis, &series);
            }
        }

        Commands::Donki { days } => {
            let client = DonkiClient::new(&config.donki_url, &config.donki_api_key)?;
            let cmes = client.recent_cmes(days).await?;
            terminal::display_donki_cmes(&cmes);
        }

        #[cfg(feature = "web")]
        Commands::Serve { port, bind } => {
            cmewatch::web::run_server(config, port, &bind).await?;
        }
    }

    Ok(())
}

fn build_pipeline(config: &Config) -> Result<Pipeline> {
    Pipeline::new(config.pipeline).context("Invalid pipeline configuration")
}

/// Write `file,path,<keywords...>` for every FITS input. Unreadable files are skipped.
fn export_fits_headers(input: &Path, out: &Path) -> Result<usize> {
    let sources = archive::collect_sources(input)?;
    if sources.is_empty() {
        anyhow::bail!("No FITS files found under {}", input.display());
    }

    let mut writer = ::csv::Writer::from_path(out)
        .with_context(|| format!("Failed to create '{}'", out.display()))?;
    let mut header = vec!["file", "path"];
    header.extend_from_slice(fits::USEFUL_KEYWORDS);
    writer.write_record(&header)?;

    let mut rows = 0;
    for source in &sources {
        let values = source
            .read_bytes()
            .and_then(|bytes| Ok(fits::useful_header_values(&bytes)?));
        match values {
            Ok(values) => {
                let mut record = vec![source.name.clone(), source.path.clone()];
                record.extend(values);
                writer.write_record(&record)?;
                rows += 1;
            }
            Err(e) => warn!(file = %source.path, error = %e, "Failed to read FITS header"),
        }
    }

    writer.flush()?;
    Ok(rows)
}
