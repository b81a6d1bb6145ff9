//! # fcover
//!
//! Index a directory of revisioned NetCDF vegetation-cover rasters and cut
//! masked grids out of them by date and named zone.
//!
//! ## Architecture
//!
//! - **Index**: scans the raster directory once, keeping the highest revision
//!   of every acquisition timestamp
//! - **Zones**: resolves zone names to bounding boxes from a GeoJSON catalog
//! - **Extract**: reads the first time slice of a variable inside a bounding
//!   box, masked cells as NaN
//! - **Presentation**: PNG rendering and an interactive selection loop on top
//!   of the [`Archive`] query API

pub mod archive;
pub mod colormaps;
pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod interactive;
pub mod logging;
pub mod render;
pub mod zones;

pub use archive::Archive;
pub use config::Config;
pub use error::{FcoverError, Result};
pub use extract::{extract_from_file, extract_values, ExtractedGrid, GridSummary, DEFAULT_VARIABLE};
pub use index::{build_index, lookup_file_by_date, FileIndex, RawFile};
pub use logging::{init_tracing, log_error, log_operation_end, log_operation_start, log_timed_operation};
pub use render::{plot_title, PngPresenter, Presenter};
pub use zones::{BoundingBox, GeoZone, ZoneCatalog, ZoneResolver};
