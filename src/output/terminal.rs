// Colored terminal output for detection results, FITS scans, and feeds.
//
// main.rs display paths delegate here; `--json` output bypasses this module.

use colored::Colorize;

use super::{fmt_opt, MAX_ANOMALY_ROWS};
use crate::feeds::donki::DonkiCme;
use crate::models::{AlertResult, ForecastResult, Intensity, RiskLevel};
use crate::pipeline::Analysis;
use crate::telemetry::fits::ImageSummary;
use crate::telemetry::TelemetrySeries;

/// Display a full detection with the anomalous records behind it.
pub fn display_analysis(analysis: &Analysis, series: &TelemetrySeries) {
    let result = &analysis.result;

    println!("\n{}", "=== CME Detection ===".bold());
    println!("  Records analyzed: {}", series.len());
    println!(
        "  Risk level: {}  |  Intensity: {}",
        colorize_risk(result.risk_level),
        colorize_intensity(result.intensity)
    );
    match analysis.eta_hours {
        Some(eta) => println!("  Earth arrival: ~{eta:.2} hours"),
        None => println!("  Earth arrival: {}", "n/a".dimmed()),
    }
    println!(
        "  Direction: {}  (confidence {:.2})",
        result.direction, result.confidence
    );
    println!("\n  {}", result.message.bold());

    let report = &analysis.report;
    if let Err(e) = &report.forest_flags {
        println!("  {} outlier model skipped: {}", "~".yellow(), e);
    }

    if result.anomaly_indices.is_empty() {
        return;
    }

    println!(
        "\n  {} anomalous records ({} z-score, {} outlier model):",
        result.anomaly_indices.len(),
        report.zscore_flags.len(),
        report.forest_flags.as_ref().map_or(0, Vec::len)
    );
    println!(
        "  {:>6}  {:<20}  {:>8}  {:>10}  {:>7}  {:>7}",
        "Index".dimmed(),
        "Timestamp".dimmed(),
        "Speed".dimmed(),
        "Flux".dimmed(),
        "z(spd)".dimmed(),
        "z(flx)".dimmed(),
    );
    println!("  {}", "-".repeat(68).dimmed());

    for &i in result.anomaly_indices.iter().take(MAX_ANOMALY_ROWS) {
        let Some(record) = series.get(i) else {
            continue;
        };
        let z = |col: &[Option<f64>]| col.get(i).copied().flatten();
        println!(
            "  {:>6}  {:<20}  {:>8}  {:>10}  {:>7}  {:>7}",
            i,
            record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            fmt_opt(record.solar_wind_speed, 1),
            fmt_opt(record.particle_flux, 2),
            fmt_opt(z(&report.zscores.speed[..]), 2),
            fmt_opt(z(&report.zscores.flux[..]), 2),
        );
    }
    if result.anomaly_indices.len() > MAX_ANOMALY_ROWS {
        println!(
            "  {}",
            format!(
                "... and {} more (use --json for the full list)",
                result.anomaly_indices.len() - MAX_ANOMALY_ROWS
            )
            .dimmed()
        );
    }
}

pub fn display_forecast(forecast: &ForecastResult) {
    println!("\n{}", "=== CME Forecast ===".bold());
    if forecast.eta_hours > 0.0 {
        println!("  ETA: {:.2} hours", forecast.eta_hours);
    }
    println!("  {}", forecast.message);
}

pub fn display_alert(alert: &AlertResult) {
    println!(
        "Alert level: {}  {}",
        colorize_risk(alert.risk_level),
        alert.message
    );
}

/// Display per-file FITS summaries as a table.
pub fn display_fits_summaries(summaries: &[ImageSummary]) {
    println!(
        "  {:<36} {:<24} {:>12} {:>12} {:>8} {:>14}",
        "File".dimmed(),
        "Observed".dimmed(),
        "Mean".dimmed(),
        "Median".dimmed(),
        "Exp".dimmed(),
        "Irradiance".dimmed(),
    );
    for s in summaries {
        let observed = s
            .timestamp
            .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .or_else(|| s.raw_time.clone())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "  {:<36} {:<24} {:>12} {:>12} {:>8} {:>14}",
            super::truncate_chars(&s.file, 36),
            observed,
            fmt_opt(s.mean_pixel, 2),
            fmt_opt(s.median_pixel, 2),
            fmt_opt(s.exposure, 3),
            fmt_opt(s.solar_irradiance, 2),
        );
    }
}

/// Display DONKI CME activities, newest last.
pub fn display_donki_cmes(cmes: &[DonkiCme]) {
    if cmes.is_empty() {
        println!("No CMEs reported by DONKI in this window.");
        return;
    }

    println!(
        "\n{}",
        format!("=== DONKI CMEs ({}) ===", cmes.len()).bold()
    );
    for cme in cmes {
        let speed = cme
            .best_speed()
            .map(|s| format!("{s:.0} km/s"))
            .unwrap_or_else(|| "speed n/a".to_string());
        let colored_speed = match cme.best_speed() {
            Some(s) if s > 1000.0 => speed.red().bold(),
            Some(s) if s > 600.0 => speed.yellow(),
            _ => speed.normal(),
        };
        println!(
            "  {:<24} {:<14} {}",
            cme.start_time,
            cme.source_location.as_deref().unwrap_or("-"),
            colored_speed
        );
        if let Some(note) = &cme.note {
            println!("    {}", super::truncate_chars(note, 120).dimmed());
        }
    }
}

pub fn colorize_risk(risk: RiskLevel) -> colored::ColoredString {
    let s = risk.as_str().to_uppercase();
    match risk {
        RiskLevel::Red => s.red().bold(),
        RiskLevel::Yellow => s.yellow().bold(),
        RiskLevel::Green => s.green(),
    }
}

pub fn colorize_intensity(intensity: Intensity) -> colored::ColoredString {
    let s = intensity.as_str();
    match intensity {
        Intensity::Severe => s.red().bold(),
        Intensity::Medium => s.bright_red(),
        Intensity::Mild => s.yellow(),
        Intensity::None => s.green(),
    }
}
