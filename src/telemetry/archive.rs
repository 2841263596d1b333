// FITS source collection: directories, single files, or ZIP archives.
//
// Directory inputs are walked recursively. ZIP entries are read fully into
// memory since the archive has to be decompressed anyway; loose files are
// read lazily, one at a time, while summarizing.

use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};
use zip::ZipArchive;

use super::fits::{self, ImageSummary};
use super::record::{TelemetryRecord, TelemetrySeries};

const FITS_EXTENSIONS: [&str; 3] = ["fits", "fit", "fts"];

/// Largest ZIP entry extracted into memory, in bytes.
pub const MAX_ENTRY_BYTES: u64 = 1 << 30;

/// Where a FITS file's bytes come from.
#[derive(Debug)]
enum Content {
    OnDisk,
    InMemory(Vec<u8>),
}

/// One FITS file found under an input path.
#[derive(Debug)]
pub struct FitsSource {
    /// File name without directories
    pub name: String,
    /// Display path (`archive.zip!inner/name.fits` for archive entries)
    pub path: String,
    disk_path: PathBuf,
    content: Content,
}

impl FitsSource {
    pub fn read_bytes(&self) -> Result<Cow<'_, [u8]>> {
        match &self.content {
            Content::InMemory(bytes) => Ok(Cow::Borrowed(bytes)),
            Content::OnDisk => std::fs::read(&self.disk_path)
                .map(Cow::Owned)
                .with_context(|| format!("Failed to read '{}'", self.path)),
        }
    }
}

/// Whether a file name carries a FITS extension (case-insensitive).
pub fn is_fits_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FITS_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

/// Collect FITS sources from a directory, a `.zip` archive, or a single file.
/// Results are sorted by display path.
pub fn collect_sources(input: &Path) -> Result<Vec<FitsSource>> {
    let mut sources = if input.is_dir() {
        let mut out = Vec::new();
        walk_dir(input, &mut out)?;
        out
    } else if input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
    {
        read_zip(input)?
    } else if input.is_file() {
        vec![disk_source(input)]
    } else {
        anyhow::bail!("Input not found: {}", input.display());
    };

    sources.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(count = sources.len(), input = %input.display(), "Collected FITS sources");
    Ok(sources)
}

fn disk_source(path: &Path) -> FitsSource {
    FitsSource {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: path.display().to_string(),
        disk_path: path.to_path_buf(),
        content: Content::OnDisk,
    }
}

fn walk_dir(dir: &Path, out: &mut Vec<FitsSource>) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to list '{}'", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            walk_dir(&path, out)?;
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_fits_name)
        {
            out.push(disk_source(&path));
        }
    }
    Ok(())
}

fn read_zip(path: &Path) -> Result<Vec<FitsSource>> {
    let file = File::open(path).with_context(|| format!("Failed to open '{}'", path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("'{}' is not a valid ZIP archive", path.display()))?;

    let mut out = Vec::new();
    for i in 0..archive.len() {
        match read_zip_entry(&mut archive, i, path) {
            Ok(Some(source)) => out.push(source),
            Ok(None) => {}
            Err(e) => warn!(
                archive = %path.display(),
                entry = i,
                error = %format!("{e:#}"),
                "Skipping unreadable ZIP entry"
            ),
        }
    }
    Ok(out)
}

/// Extract one FITS entry, `None` for directories and non-FITS names.
fn read_zip_entry(
    archive: &mut ZipArchive<File>,
    index: usize,
    path: &Path,
) -> Result<Option<FitsSource>> {
    let entry = archive.by_index(index)?;
    if entry.is_dir() || !is_fits_name(entry.name()) {
        return Ok(None);
    }
    let inner = entry.name().to_string();

    // The declared size is untrusted, so the read itself is bounded
    let mut bytes = Vec::new();
    entry
        .take(MAX_ENTRY_BYTES + 1)
        .read_to_end(&mut bytes)
        .with_context(|| format!("Failed to extract '{inner}'"))?;
    if bytes.len() as u64 > MAX_ENTRY_BYTES {
        anyhow::bail!("'{inner}' exceeds {MAX_ENTRY_BYTES} bytes");
    }

    Ok(Some(FitsSource {
        name: inner.rsplit('/').next().unwrap_or(&inner).to_string(),
        path: format!("{}!{}", path.display(), inner),
        disk_path: path.to_path_buf(),
        content: Content::InMemory(bytes),
    }))
}

/// Summarize every source. Unreadable or non-image files are logged and skipped.
pub fn summarize_sources(sources: &[FitsSource]) -> Result<Vec<ImageSummary>> {
    let pb = ProgressBar::new(sources.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("  FITS [{bar:30}] {pos}/{len} ({eta})")?);

    let mut summaries = Vec::new();
    for source in sources {
        let summary = source
            .read_bytes()
            .and_then(|bytes| Ok(fits::summarize(&source.name, &bytes)?));
        match summary {
            Ok(Some(summary)) => summaries.push(summary),
            Ok(None) => debug!(file = %source.path, "No image data, skipping"),
            Err(e) => warn!(file = %source.path, error = %e, "Failed to read FITS file"),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(summaries)
}

/// Build an irradiance-only series from image summaries.
///
/// Images without a parseable observation time are dropped. Wind and flux
/// fields stay `None`.
pub fn summaries_to_series(summaries: &[ImageSummary]) -> TelemetrySeries {
    summaries
        .iter()
        .filter_map(|s| {
            s.timestamp.map(|timestamp| TelemetryRecord {
                solar_irradiance: s.solar_irradiance,
                ..TelemetryRecord::empty(timestamp)
            })
        })
        .collect()
}

/// Collect, summarize, and convert in one step. Errors when nothing usable is found.
pub fn load_irradiance_series(input: &Path) -> Result<(Vec<ImageSummary>, TelemetrySeries)> {
    let sources = collect_sources(input)?;
    if sources.is_empty() {
        anyhow::bail!("No FITS files found under {}", input.display());
    }
    let summaries = summarize_sources(&sources)?;
    if summaries.is_empty() {
        anyhow::bail!("No valid FITS data found under {}", input.display());
    }
    let series = summaries_to_series(&summaries);
    Ok((summaries, series))
}
