// Unit tests for telemetry ingestion.
//
// CSV normalization (column mapping, coercion, dropped rows, ordering),
// FITS decoding and summaries on in-memory fixtures, and source collection
// from directories and ZIP archives on disk.

use std::io::Write;

use chrono::{TimeZone, Utc};
use cmewatch::telemetry::archive::{collect_sources, is_fits_name, load_irradiance_series, summaries_to_series};
use cmewatch::telemetry::csv::{read_series, write_series, CANONICAL_COLUMNS};
use cmewatch::telemetry::fits::{self, encode_image, mjd_to_datetime, FitsError, HeaderValue, USEFUL_KEYWORDS};

fn fits_fixture(date_obs: &str, exptime: &str, pixels: &[f64]) -> Vec<u8> {
    let date = format!("'{date_obs}'");
    encode_image(
        &[("DATE-OBS", date.as_str()), ("EXPTIME", exptime)],
        -32,
        &[pixels.len()],
        pixels,
    )
}

// ============================================================
// CSV normalizer
// ============================================================

#[test]
fn csv_maps_columns_case_insensitively() {
    let data = "Timestamp,SOLAR_WIND_SPEED,Particle_Flux\n2024-05-10T00:00:00Z,420.5,3.2\n";
    let series = read_series(data.as_bytes()).unwrap();
    assert_eq!(series.len(), 1);
    let r = series.get(0).unwrap();
    assert_eq!(r.solar_wind_speed, Some(420.5));
    assert_eq!(r.particle_flux, Some(3.2));
    assert_eq!(r.solar_wind_density, None);
    assert_eq!(r.solar_irradiance, None);
}

#[test]
fn csv_missing_measurement_columns_become_null() {
    let data = "timestamp\n2024-05-10 00:00:00\n2024-05-10 00:01:00\n";
    let series = read_series(data.as_bytes()).unwrap();
    assert_eq!(series.len(), 2);
    assert!(series.speeds().iter().all(Option::is_none));
    assert!(series.fluxes().iter().all(Option::is_none));
}

#[test]
fn csv_non_numeric_cells_become_null() {
    let data = "timestamp,solar_wind_speed,particle_flux\n2024-05-10T00:00:00Z,fast,NaN\n";
    let series = read_series(data.as_bytes()).unwrap();
    let r = series.get(0).unwrap();
    assert_eq!(r.solar_wind_speed, None);
    assert_eq!(r.particle_flux, None);
}

#[test]
fn csv_drops_rows_with_bad_timestamps_before_indexing() {
    let data = "timestamp,solar_wind_speed\n\
                2024-05-10T00:00:00Z,400\n\
                not a time,999\n\
                ,998\n\
                2024-05-10T00:02:00Z,410\n";
    let series = read_series(data.as_bytes()).unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series.speed_at(0), Some(400.0));
    assert_eq!(series.speed_at(1), Some(410.0));
}

#[test]
fn csv_sorts_by_timestamp() {
    let data = "timestamp,solar_wind_speed\n\
                2024-05-10T02:00:00Z,3\n\
                2024-05-10T00:00:00Z,1\n\
                2024-05-10T01:00:00Z,2\n";
    let series = read_series(data.as_bytes()).unwrap();
    assert_eq!(series.speeds(), vec![Some(1.0), Some(2.0), Some(3.0)]);
}

#[test]
fn csv_without_timestamp_column_is_an_error() {
    let data = "time,solar_wind_speed\n2024-05-10T00:00:00Z,400\n";
    let err = read_series(data.as_bytes()).unwrap_err();
    assert!(format!("{err:#}").contains("timestamp"));
}

#[test]
fn csv_header_only_is_an_empty_series() {
    let series = read_series("timestamp,solar_wind_speed\n".as_bytes()).unwrap();
    assert!(series.is_empty());
}

#[test]
fn csv_written_in_canonical_order_reads_back() {
    let input = "particle_flux,timestamp,solar_wind_speed\n7,2024-05-10T00:00:00Z,\n";
    let series = read_series(input.as_bytes()).unwrap();

    let mut out = Vec::new();
    write_series(&mut out, &series).unwrap();
    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next().unwrap(), CANONICAL_COLUMNS.join(","));
    assert_eq!(lines.next().unwrap(), "2024-05-10T00:00:00Z,,,,7");

    let again = read_series(text.as_bytes()).unwrap();
    assert_eq!(again.records(), series.records());
}

// ============================================================
// FITS decoding
// ============================================================

#[test]
fn fits_header_values_are_typed() {
    let bytes = encode_image(
        &[("OBS_MODE", "'SCIENCE'"), ("IMGNUM", "17"), ("ROLL", "0.25"), ("NRMFLG", "T")],
        8,
        &[1],
        &[5.0],
    );
    let hdus = fits::parse(&bytes).unwrap();
    let header = &hdus[0].header;
    assert_eq!(header.get("OBS_MODE"), Some(&HeaderValue::Text("SCIENCE".to_string())));
    assert_eq!(header.get_i64("IMGNUM"), Some(17));
    assert_eq!(header.get_f64("ROLL"), Some(0.25));
    assert_eq!(header.get("NRMFLG"), Some(&HeaderValue::Logical(true)));
}

#[test]
fn fits_summary_uses_exposure_and_date_obs() {
    let bytes = fits_fixture("2024-05-10T06:30:00", "0.5", &[10.0, 20.0, 30.0, 40.0]);
    let summary = fits::summarize("x.fits", &bytes).unwrap().unwrap();
    assert_eq!(summary.mean_pixel, Some(25.0));
    assert_eq!(summary.median_pixel, Some(25.0));
    assert_eq!(summary.exposure, Some(0.5));
    assert_eq!(summary.solar_irradiance, Some(12.5));
    assert_eq!(
        summary.timestamp,
        Some(Utc.with_ymd_and_hms(2024, 5, 10, 6, 30, 0).unwrap())
    );
}

#[test]
fn fits_zero_exposure_is_ignored() {
    let bytes = fits_fixture("2024-05-10T06:30:00", "0.0", &[4.0, 6.0]);
    let summary = fits::summarize("x.fits", &bytes).unwrap().unwrap();
    assert_eq!(summary.exposure, None);
    assert_eq!(summary.solar_irradiance, Some(5.0));
}

#[test]
fn fits_falls_back_to_mjd() {
    let bytes = encode_image(&[("MJD-OBS", "60440.5")], 16, &[2], &[1.0, 3.0]);
    let summary = fits::summarize("m.fits", &bytes).unwrap().unwrap();
    assert_eq!(
        summary.timestamp,
        Some(Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap())
    );
}

#[test]
fn mjd_epoch_is_1858_11_17() {
    assert_eq!(
        mjd_to_datetime(0.0),
        Some(Utc.with_ymd_and_hms(1858, 11, 17, 0, 0, 0).unwrap())
    );
    assert_eq!(mjd_to_datetime(f64::NAN), None);
}

#[test]
fn fits_without_time_has_no_timestamp() {
    let bytes = encode_image(&[], 16, &[2], &[1.0, 3.0]);
    let summary = fits::summarize("t.fits", &bytes).unwrap().unwrap();
    assert!(summary.raw_time.is_none());
    assert!(summary.timestamp.is_none());
    assert!(summaries_to_series(&[summary]).is_empty());
}

#[test]
fn fits_garbage_is_rejected() {
    assert!(matches!(fits::parse(b"hello world"), Err(FitsError::NotFits)));
}

#[test]
fn useful_header_values_follow_keyword_order() {
    let bytes = encode_image(
        &[("DATE-OBS", "'2024-05-10T00:00:00'"), ("ROLL", "1.5")],
        8,
        &[1],
        &[0.0],
    );
    let values = fits::useful_header_values(&bytes).unwrap();
    assert_eq!(values.len(), USEFUL_KEYWORDS.len());
    assert_eq!(values[0], "2024-05-10T00:00:00");
    assert_eq!(values.last().unwrap(), "1.5");
    assert_eq!(values[1], "");
}

// ============================================================
// Source collection
// ============================================================

#[test]
fn fits_extensions_are_recognized() {
    assert!(is_fits_name("aia_171.FITS"));
    assert!(is_fits_name("a/b/c.fts"));
    assert!(!is_fits_name("notes.txt"));
    assert!(!is_fits_name("fits"));
}

#[test]
fn directory_inputs_are_walked_recursively() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("day1");
    std::fs::create_dir(&nested).unwrap();
    std::fs::write(dir.path().join("b.fits"), fits_fixture("2024-05-10T01:00:00", "1", &[2.0])).unwrap();
    std::fs::write(nested.join("a.fit"), fits_fixture("2024-05-10T00:00:00", "1", &[1.0])).unwrap();
    std::fs::write(dir.path().join("readme.txt"), b"ignore me").unwrap();

    let sources = collect_sources(dir.path()).unwrap();
    assert_eq!(sources.len(), 2);

    let (summaries, series) = load_irradiance_series(dir.path()).unwrap();
    assert_eq!(summaries.len(), 2);
    // ordered by observation time, not by file name
    assert_eq!(
        series.iter().map(|r| r.solar_irradiance).collect::<Vec<_>>(),
        vec![Some(1.0), Some(2.0)]
    );
}

#[test]
fn zip_inputs_are_read_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let zip_path = dir.path().join("batch.zip");
    {
        let file = std::fs::File::create(&zip_path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("frames/one.fits", options).unwrap();
        zip.write_all(&fits_fixture("2024-05-10T00:00:00", "2", &[3.0, 5.0])).unwrap();
        zip.start_file("frames/notes.md", options).unwrap();
        zip.write_all(b"# not fits").unwrap();
        zip.finish().unwrap();
    }

    let sources = collect_sources(&zip_path).unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].name, "one.fits");
    assert!(sources[0].path.ends_with("batch.zip!frames/one.fits"));

    let (_, series) = load_irradiance_series(&zip_path).unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series.get(0).unwrap().solar_irradiance, Some(8.0));
}

#[test]
fn corrupt_zip_entry_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let zip_path = dir.path().join("batch.zip");
    {
        let file = std::fs::File::create(&zip_path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let stored = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        zip.start_file("good.fits", stored).unwrap();
        zip.write_all(&fits_fixture("2024-05-10T00:00:00", "2", &[3.0, 5.0])).unwrap();
        zip.start_file("bad.fits", stored).unwrap();
        zip.write_all(&fits_fixture("2031-01-01T00:00:00", "2", &[1.0])).unwrap();
        zip.finish().unwrap();
    }

    // Flip a byte inside the stored payload of the second entry so its CRC no longer matches
    let mut raw = std::fs::read(&zip_path).unwrap();
    let at = raw.windows(4).position(|w| w == b"2031").unwrap();
    raw[at] = b'9';
    std::fs::write(&zip_path, &raw).unwrap();

    let sources = collect_sources(&zip_path).unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].name, "good.fits");

    let (_, series) = load_irradiance_series(&zip_path).unwrap();
    assert_eq!(series.len(), 1);
}

#[test]
fn unreadable_files_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("good.fits"), fits_fixture("2024-05-10T00:00:00", "1", &[4.0])).unwrap();
    std::fs::write(dir.path().join("bad.fits"), b"definitely not a fits file").unwrap();

    let (summaries, series) = load_irradiance_series(dir.path()).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(series.len(), 1);
}

#[test]
fn empty_input_folder_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_irradiance_series(dir.path()).is_err());
}

#[test]
fn missing_input_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(collect_sources(&dir.path().join("nope")).is_err());
}
