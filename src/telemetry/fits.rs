// Minimal FITS reader: just enough to turn solar images into telemetry.
//
// Reads 2880-byte header blocks of 80-column cards, walks every HDU, and
// decodes IMAGE data (BITPIX 8/16/32/64/-32/-64, big-endian, BZERO/BSCALE
// applied). Tables and tile-compressed images are skipped, not decoded.
//
// The image summary reduces each file to one irradiance proxy: the mean of
// finite pixels, scaled by exposure time when the header carries one.

use chrono::{DateTime, Duration, TimeZone, Utc};
use thiserror::Error;

use super::record::parse_timestamp;

const BLOCK_SIZE: usize = 2880;
const CARD_SIZE: usize = 80;

/// Time keywords tried in order. The MJD keys hold day counts, not dates.
const TIME_KEYWORDS: &[&str] = &[
    "DATE-OBS",
    "DATE_OBS",
    "DATE",
    "TIME-OBS",
    "TIME_OBS",
    "DATE-OBS-ISO",
    "OBS-DATE",
];
const MJD_KEYWORDS: &[&str] = &["MJD-OBS", "MJD"];
const EXPOSURE_KEYWORDS: &[&str] = &["EXPTIME", "EXPOSURE", "EXPOS"];

/// Header keywords exported by `fits-headers`, one column each.
pub const USEFUL_KEYWORDS: &[&str] = &[
    "DATE-OBS", "OBS_MODE", "IMGNUM", "FTR_NAME", "ROI_FF", "ROI_ID", "IMG_TYPE", "CMD_EXPT",
    "SOLX1TR", "SOLX2TR", "HELIOSTR", "FLR_TRIG", "NRMFLG", "PRMFLG", "SX1FLG", "SX2FLG",
    "HL1OSFLG", "CRPIX1", "CRPIX2", "RSUN_OBS", "DSUN_OBS", "HGLT_OBS", "HGLN_OBS", "P_ANGLE",
    "ROLL",
];

#[derive(Debug, Error)]
pub enum FitsError {
    #[error("not a FITS file (first card is not SIMPLE)")]
    NotFits,
    #[error("file truncated at byte {offset}")]
    Truncated { offset: usize },
    #[error("header missing required keyword {0}")]
    MissingKeyword(&'static str),
    #[error("unsupported BITPIX {0}")]
    UnsupportedBitpix(i64),
    #[error("invalid axis length {0}")]
    InvalidAxis(i64),
}

/// A parsed header card value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Text(String),
    Logical(bool),
    Integer(i64),
    Float(f64),
}

impl HeaderValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Integer(i) => Some(*i as f64),
            HeaderValue::Float(f) => Some(*f),
            HeaderValue::Text(s) => s.trim().parse().ok(),
            HeaderValue::Logical(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl std::fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeaderValue::Text(s) => write!(f, "{s}"),
            HeaderValue::Logical(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            HeaderValue::Integer(i) => write!(f, "{i}"),
            HeaderValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Keyword/value cards of one HDU, in file order. COMMENT/HISTORY cards are dropped.
#[derive(Debug, Clone, Default)]
pub struct FitsHeader {
    cards: Vec<(String, HeaderValue)>,
}

impl FitsHeader {
    /// First value recorded for `keyword`.
    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        self.cards
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, v)| v)
    }

    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(HeaderValue::as_f64)
    }

    pub fn get_i64(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(HeaderValue::as_i64)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    fn require_i64(&self, keyword: &'static str) -> Result<i64, FitsError> {
        self.get_i64(keyword)
            .ok_or(FitsError::MissingKeyword(keyword))
    }
}

/// One header-data unit. `pixels` holds physical values for IMAGE HDUs with data.
#[derive(Debug, Clone)]
pub struct Hdu {
    pub header: FitsHeader,
    pub pixels: Option<Vec<f64>>,
}

/// Parse every HDU in a FITS byte stream.
pub fn parse(bytes: &[u8]) -> Result<Vec<Hdu>, FitsError> {
    if !bytes.starts_with(b"SIMPLE") {
        return Err(FitsError::NotFits);
    }

    let mut hdus = Vec::new();
    let mut offset = 0;

    // Trailing bytes shorter than one block are padding, not another HDU
    while offset + BLOCK_SIZE <= bytes.len() {
        let (header, header_len) = parse_header(bytes, offset)?;
        offset += header_len;

        let primary = hdus.is_empty();
        let is_image = primary
            || matches!(header.get("XTENSION"), Some(HeaderValue::Text(t)) if t == "IMAGE");

        let bitpix = header.require_i64("BITPIX")?;
        let naxis = header.require_i64("NAXIS")?;
        if naxis < 0 {
            return Err(FitsError::InvalidAxis(naxis));
        }
        let mut elements: usize = if naxis == 0 { 0 } else { 1 };
        for axis in 1..=naxis {
            let len = header
                .get_i64(&format!("NAXIS{axis}"))
                .ok_or(FitsError::MissingKeyword("NAXISn"))?;
            if len < 0 {
                return Err(FitsError::InvalidAxis(len));
            }
            elements = elements.saturating_mul(len as usize);
        }
        let pcount = header.get_i64("PCOUNT").unwrap_or(0).max(0) as usize;
        let gcount = header.get_i64("GCOUNT").unwrap_or(1).max(1) as usize;
        let stored = if elements == 0 {
            0
        } else {
            gcount.saturating_mul(pcount.saturating_add(elements))
        };
        let width = bitpix.unsigned_abs() as usize / 8;
        let data_len = stored.saturating_mul(width);

        if offset.saturating_add(data_len) > bytes.len() {
            return Err(FitsError::Truncated { offset });
        }

        let pixels = if is_image && elements > 0 {
            let raw = &bytes[offset..offset + elements * width];
            Some(decode_pixels(raw, bitpix, &header)?)
        } else {
            None
        };

        hdus.push(Hdu { header, pixels });
        offset += padded(data_len);
    }

    if hdus.is_empty() {
        return Err(FitsError::Truncated { offset: 0 });
    }
    Ok(hdus)
}

fn padded(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

/// Parse header cards starting at `start` until END. Returns the header and
/// its length in bytes (whole blocks).
fn parse_header(bytes: &[u8], start: usize) -> Result<(FitsHeader, usize), FitsError> {
    let mut header = FitsHeader::default();
    let mut pos = start;

    loop {
        if pos + CARD_SIZE > bytes.len() {
            return Err(FitsError::Truncated { offset: pos });
        }
        let card = String::from_utf8_lossy(&bytes[pos..pos + CARD_SIZE]);
        pos += CARD_SIZE;

        let keyword = card.get(..8).unwrap_or("").trim_end();
        if keyword == "END" {
            break;
        }
        if keyword.is_empty() || card.get(8..10) != Some("= ") {
            continue;
        }
        if let Some(value) = parse_value(card.get(10..).unwrap_or("")) {
            header.cards.push((keyword.to_string(), value));
        }
    }

    Ok((header, padded(pos - start)))
}

/// Parse the value field of a card (columns 11-80).
fn parse_value(field: &str) -> Option<HeaderValue> {
    let field = field.trim_start();

    if let Some(rest) = field.strip_prefix('\'') {
        // Quoted string; '' is an escaped quote
        let mut out = String::new();
        let mut chars = rest.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    out.push('\'');
                } else {
                    break;
                }
            } else {
                out.push(c);
            }
        }
        return Some(HeaderValue::Text(out.trim_end().to_string()));
    }

    let value = field.split('/').next().unwrap_or("").trim();
    match value {
        "" => None,
        "T" => Some(HeaderValue::Logical(true)),
        "F" => Some(HeaderValue::Logical(false)),
        v => {
            if let Ok(i) = v.parse::<i64>() {
                return Some(HeaderValue::Integer(i));
            }
            v.replace(['D', 'd'], "E")
                .parse::<f64>()
                .ok()
                .map(HeaderValue::Float)
        }
    }
}

fn decode_pixels(raw: &[u8], bitpix: i64, header: &FitsHeader) -> Result<Vec<f64>, FitsError> {
    let bzero = header.get_f64("BZERO").unwrap_or(0.0);
    let bscale = header.get_f64("BSCALE").unwrap_or(1.0);

    let values: Vec<f64> = match bitpix {
        8 => raw.iter().map(|&b| b as f64).collect(),
        16 => raw
            .chunks_exact(2)
            .map(|c| i16::from_be_bytes([c[0], c[1]]) as f64)
            .collect(),
        32 => raw
            .chunks_exact(4)
            .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        64 => raw
            .chunks_exact(8)
            .map(|c| i64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f64)
            .collect(),
        -32 => raw
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        -64 => raw
            .chunks_exact(8)
            .map(|c| f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect(),
        other => return Err(FitsError::UnsupportedBitpix(other)),
    };

    if bzero == 0.0 && bscale == 1.0 {
        return Ok(values);
    }
    Ok(values.into_iter().map(|v| bzero + bscale * v).collect())
}

/// One FITS file reduced to the values the telemetry pipeline cares about.
#[derive(Debug, Clone)]
pub struct ImageSummary {
    pub file: String,
    /// Raw observation-time header value, as found
    pub raw_time: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub mean_pixel: Option<f64>,
    pub median_pixel: Option<f64>,
    pub exposure: Option<f64>,
    pub solar_irradiance: Option<f64>,
}

/// Summarize a FITS file. Returns `Ok(None)` when no HDU carries image data.
///
/// Time and exposure are looked up in the primary header first, then in the
/// header of the HDU the pixels came from.
pub fn summarize(file: &str, bytes: &[u8]) -> Result<Option<ImageSummary>, FitsError> {
    let hdus = parse(bytes)?;
    let Some(image) = hdus.iter().find(|h| h.pixels.is_some()) else {
        return Ok(None);
    };
    let primary = &hdus[0].header;
    let headers = [primary, &image.header];

    let mut finite: Vec<f64> = image
        .pixels
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect();

    let (mean_pixel, median_pixel) = if finite.is_empty() {
        (None, None)
    } else {
        let mean = finite.iter().sum::<f64>() / finite.len() as f64;
        finite.sort_by(|a, b| a.total_cmp(b));
        let mid = finite.len() / 2;
        let median = if finite.len() % 2 == 0 {
            (finite[mid - 1] + finite[mid]) / 2.0
        } else {
            finite[mid]
        };
        (Some(mean), Some(median))
    };

    // Zero exposure means "not recorded", not "scale to zero"
    let exposure = headers.iter().find_map(|h| {
        EXPOSURE_KEYWORDS
            .iter()
            .find_map(|k| h.get_f64(k))
            .filter(|e| *e != 0.0)
    });

    let solar_irradiance = mean_pixel.map(|m| match exposure {
        Some(e) => m * e,
        None => m,
    });

    let (raw_time, timestamp) = observation_time(&headers);

    Ok(Some(ImageSummary {
        file: file.to_string(),
        raw_time,
        timestamp,
        mean_pixel,
        median_pixel,
        exposure,
        solar_irradiance,
    }))
}

fn observation_time(headers: &[&FitsHeader]) -> (Option<String>, Option<DateTime<Utc>>) {
    for header in headers {
        for key in TIME_KEYWORDS {
            if let Some(value) = header.get(key) {
                let raw = value.to_string();
                let parsed = parse_timestamp(&raw);
                return (Some(raw), parsed);
            }
        }
        for key in MJD_KEYWORDS {
            if let Some(days) = header.get_f64(key) {
                return (Some(days.to_string()), mjd_to_datetime(days));
            }
        }
    }
    (None, None)
}

/// Convert a Modified Julian Date (days since 1858-11-17T00:00Z) to UTC.
pub fn mjd_to_datetime(days: f64) -> Option<DateTime<Utc>> {
    if !days.is_finite() {
        return None;
    }
    let epoch = Utc.with_ymd_and_hms(1858, 11, 17, 0, 0, 0).single()?;
    let millis = (days * 86_400_000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    epoch.checked_add_signed(Duration::milliseconds(millis as i64))
}

/// Values of `USEFUL_KEYWORDS` from the primary header, empty when absent.
pub fn useful_header_values(bytes: &[u8]) -> Result<Vec<String>, FitsError> {
    let hdus = parse(bytes)?;
    let primary = &hdus[0].header;
    Ok(USEFUL_KEYWORDS
        .iter()
        .map(|k| primary.get(k).map(|v| v.to_string()).unwrap_or_default())
        .collect())
}

/// Build a single-HDU FITS byte stream. Used by tests and fixtures.
pub fn encode_image(cards: &[(&str, &str)], bitpix: i64, dims: &[usize], data: &[f64]) -> Vec<u8> {
    let mut header = Vec::new();
    let mut push_card = |key: &str, value: &str| {
        let card = format!("{key:<8}= {value:>20}");
        header.extend_from_slice(format!("{card:<80}").as_bytes());
    };

    push_card("SIMPLE", "T");
    push_card("BITPIX", &bitpix.to_string());
    push_card("NAXIS", &dims.len().to_string());
    for (i, d) in dims.iter().enumerate() {
        push_card(&format!("NAXIS{}", i + 1), &d.to_string());
    }
    for (k, v) in cards {
        push_card(k, v);
    }
    header.extend_from_slice(format!("{:<80}", "END").as_bytes());
    header.resize(padded(header.len()), b' ');

    let mut body = Vec::new();
    for v in data {
        match bitpix {
            8 => body.push(*v as u8),
            16 => body.extend_from_slice(&(*v as i16).to_be_bytes()),
            32 => body.extend_from_slice(&(*v as i32).to_be_bytes()),
            64 => body.extend_from_slice(&(*v as i64).to_be_bytes()),
            -32 => body.extend_from_slice(&(*v as f32).to_be_bytes()),
            _ => body.extend_from_slice(&v.to_be_bytes()),
        }
    }
    body.resize(padded(body.len()), 0);

    header.extend_from_slice(&body);
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_quoted_strings_with_escapes() {
        assert_eq!(
            parse_value("'O''Brien'           / comment"),
            Some(HeaderValue::Text("O'Brien".to_string()))
        );
    }

    #[test]
    fn parses_numbers_logicals_and_d_exponents() {
        assert_eq!(parse_value("                   42"), Some(HeaderValue::Integer(42)));
        assert_eq!(parse_value("T / simple"), Some(HeaderValue::Logical(true)));
        assert_eq!(parse_value("1.5D2"), Some(HeaderValue::Float(150.0)));
        assert_eq!(parse_value("   / only a comment"), None);
    }

    #[test]
    fn decodes_scaled_int16_image() {
        let bytes = encode_image(
            &[("BZERO", "32768"), ("BSCALE", "1")],
            16,
            &[2, 2],
            &[-32768.0, 0.0, 100.0, 32767.0],
        );
        let hdus = parse(&bytes).unwrap();
        assert_eq!(hdus.len(), 1);
        let pixels = hdus[0].pixels.as_ref().unwrap();
        assert_eq!(pixels, &vec![0.0, 32768.0, 32868.0, 65535.0]);
    }

    #[test]
    fn summary_scales_mean_by_exposure() {
        let bytes = encode_image(
            &[("EXPTIME", "2.0"), ("DATE-OBS", "'2025-08-22T04:16:48.755'")],
            -32,
            &[2, 2],
            &[1.0, 2.0, 3.0, f64::NAN],
        );
        let summary = summarize("a.fits", &bytes).unwrap().unwrap();
        assert_eq!(summary.mean_pixel, Some(2.0));
        assert_eq!(summary.median_pixel, Some(2.0));
        assert_eq!(summary.solar_irradiance, Some(4.0));
        let ts = summary.timestamp.unwrap();
        assert_eq!((ts.year(), ts.hour(), ts.minute()), (2025, 4, 16));
    }

    #[test]
    fn header_only_file_has_no_summary() {
        let bytes = encode_image(&[], 8, &[], &[]);
        assert!(summarize("empty.fits", &bytes).unwrap().is_none());
    }

    #[test]
    fn truncated_data_is_an_error() {
        let mut bytes = encode_image(&[], 16, &[100, 100], &[0.0; 10]);
        bytes.truncate(BLOCK_SIZE * 2);
        assert!(matches!(parse(&bytes), Err(FitsError::Truncated { .. })));
    }

    #[test]
    fn negative_naxis_is_rejected() {
        let mut bytes = encode_image(&[], 8, &[], &[]);
        let card = format!("{:<8}= {:>20}", "NAXIS", "0");
        let at = bytes.windows(card.len()).position(|w| w == card.as_bytes()).unwrap();
        let bad = format!("{:<8}= {:>20}", "NAXIS", "-1");
        bytes[at..at + bad.len()].copy_from_slice(bad.as_bytes());
        assert!(matches!(parse(&bytes), Err(FitsError::InvalidAxis(-1))));
    }

    #[test]
    fn rejects_non_fits() {
        assert!(matches!(parse(b"PK\x03\x04"), Err(FitsError::NotFits)));
    }

    #[test]
    fn mjd_epoch_and_offset() {
        let dt = mjd_to_datetime(60000.5).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (2023, 2, 25, 12));
    }
}
