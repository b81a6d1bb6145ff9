//! The indexed raster archive.
//!
//! An [`Archive`] owns the file index built at construction and a zone
//! resolver. It exposes the query side used by presenters: the ordered date
//! and zone lists and the extraction call.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::extract::{extract_values, ExtractedGrid, DEFAULT_VARIABLE};
use crate::index::{build_index, FileIndex};
use crate::zones::{ZoneCatalog, ZoneResolver};

/// Indexed raster files plus the zones they can be cut into
#[derive(Debug)]
pub struct Archive<R = ZoneCatalog> {
    root_dir: PathBuf,
    index: FileIndex,
    zones: R,
    variable: String,
}

impl Archive<ZoneCatalog> {
    /// Index the configured directory and load the configured zone catalog
    pub fn open(config: &Config) -> Result<Self> {
        let zones = ZoneCatalog::from_geojson_file(config.zone_catalog()?)?;
        let mut archive = Self::new(config.root_dir()?, zones)?;
        archive.variable = config.data.variable.clone();
        Ok(archive)
    }
}

impl<R: ZoneResolver> Archive<R> {
    /// Index `root_dir` once; a malformed raster filename aborts construction
    pub fn new(root_dir: &Path, zones: R) -> Result<Self> {
        let index = build_index(root_dir)?;
        Ok(Self {
            root_dir: root_dir.to_path_buf(),
            index,
            zones,
            variable: DEFAULT_VARIABLE.to_string(),
        })
    }

    /// Read another variable than the default one
    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = variable.into();
        self
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    pub fn zones(&self) -> &R {
        &self.zones
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Display dates in ascending order
    pub fn list_dates(&self) -> Vec<String> {
        self.index.display_dates()
    }

    /// Zone names in catalog order
    pub fn list_zone_names(&self) -> Vec<String> {
        self.zones.zone_names()
    }

    /// File indexed under a display date
    pub fn lookup_file_by_date(&self, date: &str) -> Result<&Path> {
        crate::index::lookup_file_by_date(&self.index, date)
    }

    /// Masked grid of `zone` at `date` for the archive's variable
    pub fn extract_values(&self, date: &str, zone: &str) -> Result<ExtractedGrid> {
        extract_values(&self.index, &self.zones, date, zone, &self.variable)
    }
}

impl<R: ZoneResolver> fmt::Display for Archive<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dates = self.list_dates();
        write!(
            f,
            "Archive ({}) [{}] - {} dates, {} zones",
            self.root_dir.display(),
            self.variable,
            dates.len(),
            self.zones.zone_names().len()
        )?;
        if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
            write!(f, " from {} to {}", first, last)?;
        }
        Ok(())
    }
}
