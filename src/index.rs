//! Raster file indexing.
//!
//! Walks a directory tree, recovers the acquisition timestamp and revision of
//! every `.nc` file from its name, and keeps a single file per timestamp: the
//! one with the highest revision. Files are never opened here.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::btree_map::{self, BTreeMap};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::{FcoverError, Result};
use crate::logging::{log_index_stats, log_operation_end, log_operation_start};

/// Extension of the raster files picked up by the scan
pub const RASTER_EXTENSION: &str = ".nc";

/// Format of the timestamp token embedded in filenames
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

/// Format of the public lookup key derived from a timestamp
pub const DISPLAY_DATE_FORMAT: &str = "%d-%m-%Y";

static FILENAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"RT([0-9])_([0-9]+)_").expect("filename pattern is valid"));

/// A raster file found during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    /// Acquisition time parsed from the filename
    pub timestamp: NaiveDateTime,
    /// Location on disk
    pub path: PathBuf,
    /// Processing revision parsed from the filename
    pub revision: u8,
}

impl RawFile {
    /// The `dd-mm-YYYY` key this file is looked up by
    pub fn display_date(&self) -> String {
        format_display_date(&self.timestamp)
    }
}

/// Format a timestamp as a display date (`05-03-2023`)
pub fn format_display_date(timestamp: &NaiveDateTime) -> String {
    timestamp.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Recover `(timestamp, revision)` from a raster filename.
///
/// The name must contain `RT<digit>_<YYYYMMDDhhmm>_`.
pub fn parse_filename(filename: &str) -> Result<(NaiveDateTime, u8)> {
    let parse_error = |message: String| FcoverError::Parse {
        filename: filename.to_string(),
        message,
    };

    let captures = FILENAME_PATTERN
        .captures(filename)
        .ok_or_else(|| parse_error("missing RT<digit>_<timestamp>_ token".to_string()))?;

    // Both groups are guaranteed by the pattern
    let revision = captures[1]
        .parse::<u8>()
        .map_err(|e| parse_error(format!("invalid revision: {}", e)))?;

    let token = &captures[2];
    if token.len() != 12 {
        return Err(parse_error(format!(
            "timestamp token {} is not YYYYMMDDhhmm",
            token
        )));
    }
    let timestamp = NaiveDateTime::parse_from_str(token, TIMESTAMP_FORMAT)
        .map_err(|e| parse_error(format!("invalid timestamp {}: {}", token, e)))?;

    Ok((timestamp, revision))
}

/// Date-sorted table of the surviving raster file for each timestamp
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    entries: BTreeMap<NaiveDateTime, RawFile>,
}

impl FileIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, keeping it only if its timestamp is new or its revision
    /// is strictly greater than the one already held.
    ///
    /// Returns `true` when the file was kept.
    pub fn insert(&mut self, file: RawFile) -> bool {
        match self.entries.entry(file.timestamp) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(file);
                true
            }
            btree_map::Entry::Occupied(mut slot) => {
                if file.revision > slot.get().revision {
                    trace!(
                        timestamp = %file.timestamp,
                        old_revision = slot.get().revision,
                        new_revision = file.revision,
                        "Replacing lower revision"
                    );
                    slot.insert(file);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Number of distinct timestamps
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the scan found no raster file
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending timestamp order
    pub fn iter(&self) -> impl Iterator<Item = &RawFile> {
        self.entries.values()
    }

    /// Entry for an exact timestamp
    pub fn get(&self, timestamp: &NaiveDateTime) -> Option<&RawFile> {
        self.entries.get(timestamp)
    }

    /// Display dates in index order. Same-day timestamps appear once each.
    pub fn display_dates(&self) -> Vec<String> {
        self.iter().map(RawFile::display_date).collect()
    }

    /// First entry, in ascending order, whose display date equals `date`
    pub fn lookup(&self, date: &str) -> Result<&RawFile> {
        self.iter()
            .find(|file| file.display_date() == date)
            .ok_or_else(|| FcoverError::DateNotFound {
                date: date.to_string(),
            })
    }
}

/// Path of the raster file indexed under a display date
pub fn lookup_file_by_date<'a>(index: &'a FileIndex, date: &str) -> Result<&'a Path> {
    index.lookup(date).map(|file| file.path.as_path())
}

/// Scan `root` recursively and build the deduplicated index.
///
/// Any `.nc` file whose name does not parse aborts the scan.
pub fn build_index(root: &Path) -> Result<FileIndex> {
    if !root.is_dir() {
        return Err(FcoverError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Raster directory not found: {}", root.display()),
        )));
    }

    let start = Instant::now();
    log_operation_start("build_index", Some(&root.display().to_string()));

    let mut index = FileIndex::new();
    let mut scanned = 0usize;

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        // Symlinked files count, symlinked directories are not descended into
        if !entry.path().is_file() {
            continue;
        }

        let filename = entry.file_name().to_string_lossy();
        if !filename.ends_with(RASTER_EXTENSION) {
            continue;
        }

        let (timestamp, revision) = parse_filename(&filename)?;
        scanned += 1;

        let kept = index.insert(RawFile {
            timestamp,
            path: entry.path().to_path_buf(),
            revision,
        });
        debug!(
            file = %filename,
            timestamp = %timestamp,
            revision = revision,
            kept = kept,
            "Indexed raster file"
        );
    }

    log_index_stats(&root.display().to_string(), scanned, &index);
    log_operation_end("build_index", start, true);

    Ok(index)
}
