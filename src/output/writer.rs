//! Catalog file persistence
//!
//! The catalog is a JSON array of `{date, links}` groups, two-space indented with a
//! trailing newline. Writing truncates the file in place.

use crate::catalog::{CatalogEntry, DateGroup};
use crate::output::{OutputError, OutputResult};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Orders a run's date groups for persistence
///
/// Groups without links are dropped. The rest are sorted by label in reverse
/// lexicographic order; groups with equal labels keep their relative order.
pub fn build_catalog(groups: Vec<DateGroup>) -> Vec<CatalogEntry> {
    let mut entries: Vec<CatalogEntry> = groups
        .into_iter()
        .filter(|group| !group.links.is_empty())
        .map(CatalogEntry::from)
        .collect();

    entries.sort_by(|a, b| b.date.cmp(&a.date));
    entries
}

/// Replaces the catalog file at `path` with `entries`
///
/// # Returns
///
/// * `Ok(())` - The file was written and flushed
/// * `Err(OutputError)` - Creating, encoding or flushing failed; the file may be truncated
pub fn write_catalog(path: &Path, entries: &[CatalogEntry]) -> OutputResult<()> {
    let io_error = |source| OutputError::Io {
        path: path.display().to_string(),
        source,
    };

    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, entries).map_err(OutputError::Encode)?;
    writer.write_all(b"\n").map_err(io_error)?;
    writer.flush().map_err(io_error)?;

    tracing::debug!("Wrote {} date groups to {}", entries.len(), path.display());
    Ok(())
}

/// Reads a previously written catalog
pub fn load_catalog(path: &Path) -> OutputResult<Vec<CatalogEntry>> {
    let file = File::open(path).map_err(|source| OutputError::Io {
        path: path.display().to_string(),
        source,
    })?;

    serde_json::from_reader(BufReader::new(file)).map_err(|source| OutputError::Decode {
        path: path.display().to_string(),
        source,
    })
}
