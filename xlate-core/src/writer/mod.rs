//! Package assembly with byte-level preservation
//!
//! Untouched entries are copied between archives without recompression,
//! so their bytes, order, and metadata survive exactly. Replaced
//! entries are written fresh but keep the original entry's compression
//! method and metadata.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Write a copy of the package at `input` to `output`, substituting the
/// entries named in `replacements`.
///
/// The output is staged in a temporary file next to `output` and only
/// renamed into place once the whole archive is written; a failed run
/// leaves no partial output behind.
pub fn write_package(
    input: &Path,
    output: &Path,
    replacements: &HashMap<String, Vec<u8>>,
) -> Result<()> {
    let file = File::open(input)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    let staging_dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = NamedTempFile::new_in(staging_dir)?;
    let mut writer = ZipWriter::new(staged.as_file());

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        match replacements.get(entry.name()) {
            Some(bytes) => {
                let mut options =
                    SimpleFileOptions::default().compression_method(entry.compression());
                if let Some(mode) = entry.unix_mode() {
                    options = options.unix_permissions(mode);
                }
                if let Some(modified) = entry.last_modified() {
                    options = options.last_modified_time(modified);
                }
                let name = entry.name().to_string();
                drop(entry);
                writer.start_file(name, options)?;
                writer.write_all(bytes)?;
            }
            None => writer.raw_copy_file(entry)?,
        }
    }

    writer.finish()?;
    staged
        .persist(output)
        .map_err(|e| Error::from(e.error))?;
    Ok(())
}
