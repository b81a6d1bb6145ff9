//! Masked grid extraction.
//!
//! Resolves a (display date, zone) pair to a raster file and a bounding box,
//! reads the first time slice of a variable restricted to the grid cells
//! inside the box, and replaces masked cells with NaN.

use ndarray::{Array2, Axis};
use netcdf::types::{BasicType, VariableType};
use netcdf::{AttributeValue, Variable};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

use crate::error::{FcoverError, Result};
use crate::index::FileIndex;
use crate::logging::log_timed_operation;
use crate::zones::{BoundingBox, ZoneResolver};

/// Variable read when none is named
pub const DEFAULT_VARIABLE: &str = "FCOVER";

/// Name of the longitude coordinate variable
pub const LON_VARIABLE: &str = "lon";

/// Name of the latitude coordinate variable
pub const LAT_VARIABLE: &str = "lat";

/// A masked 2-D slice, rows follow latitude and columns longitude in file order
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedGrid {
    /// Cell values, NaN where the source flags the cell invalid
    pub values: Array2<f32>,
    /// Latitudes of the selected rows
    pub lats: Vec<f64>,
    /// Longitudes of the selected columns
    pub lons: Vec<f64>,
}

/// NaN-aware statistics of a grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSummary {
    pub rows: usize,
    pub cols: usize,
    pub valid_cells: usize,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub mean: Option<f64>,
}

impl ExtractedGrid {
    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// True when the box selected no row or no column
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    pub fn summary(&self) -> GridSummary {
        let (rows, cols) = self.shape();
        let mut valid_cells = 0usize;
        let mut sum = 0.0f64;
        let mut min: Option<f32> = None;
        let mut max: Option<f32> = None;

        for &v in self.values.iter().filter(|v| !v.is_nan()) {
            valid_cells += 1;
            sum += v as f64;
            min = Some(min.map_or(v, |m| m.min(v)));
            max = Some(max.map_or(v, |m| m.max(v)));
        }

        GridSummary {
            rows,
            cols,
            valid_cells,
            min,
            max,
            mean: (valid_cells > 0).then(|| sum / valid_cells as f64),
        }
    }

    /// JSON rendering with masked cells as `null`
    pub fn to_json(&self) -> serde_json::Value {
        let rows: Vec<Vec<Option<f32>>> = self
            .values
            .outer_iter()
            .map(|row| row.iter().map(|v| (!v.is_nan()).then_some(*v)).collect())
            .collect();

        serde_json::json!({
            "lat": self.lats,
            "lon": self.lons,
            "values": rows,
        })
    }
}

/// Packing and validity attributes of a data variable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidityMask {
    pub fill_values: Vec<f64>,
    pub valid_min: Option<f64>,
    pub valid_max: Option<f64>,
    pub scale_factor: Option<f64>,
    pub add_offset: Option<f64>,
}

impl ValidityMask {
    /// Read `_FillValue`, `missing_value`, `valid_range`, `valid_min`,
    /// `valid_max`, `scale_factor` and `add_offset` from a variable.
    pub fn from_variable(var: &Variable) -> Self {
        let mut mask = ValidityMask::default();

        match numeric_attribute(var, "_FillValue") {
            Some(values) => mask.fill_values.extend(values),
            None => mask.fill_values.extend(default_fill_value(&var.vartype())),
        }
        if let Some(values) = numeric_attribute(var, "missing_value") {
            mask.fill_values.extend(values);
        }

        match numeric_attribute(var, "valid_range").filter(|r| r.len() == 2) {
            Some(range) => {
                mask.valid_min = Some(range[0]);
                mask.valid_max = Some(range[1]);
            }
            None => {
                mask.valid_min = numeric_attribute(var, "valid_min").and_then(|v| v.first().copied());
                mask.valid_max = numeric_attribute(var, "valid_max").and_then(|v| v.first().copied());
            }
        }

        mask.scale_factor = numeric_attribute(var, "scale_factor").and_then(|v| v.first().copied());
        mask.add_offset = numeric_attribute(var, "add_offset").and_then(|v| v.first().copied());

        mask
    }

    /// Whether a stored value is flagged invalid
    pub fn is_masked(&self, raw: f64) -> bool {
        raw.is_nan()
            || self.fill_values.iter().any(|&fill| raw == fill)
            || self.valid_min.is_some_and(|min| raw < min)
            || self.valid_max.is_some_and(|max| raw > max)
    }

    /// Physical value of a stored cell, NaN when masked
    pub fn unpack(&self, raw: f64) -> f32 {
        if self.is_masked(raw) {
            return f32::NAN;
        }
        let value = raw * self.scale_factor.unwrap_or(1.0) + self.add_offset.unwrap_or(0.0);
        value as f32
    }
}

/// NetCDF default fill value of a type. Byte and char variables have none.
fn default_fill_value(vartype: &VariableType) -> Option<f64> {
    match vartype {
        VariableType::Basic(BasicType::Short) => Some(-32767.0),
        VariableType::Basic(BasicType::Ushort) => Some(65535.0),
        VariableType::Basic(BasicType::Int) => Some(-2147483647.0),
        VariableType::Basic(BasicType::Uint) => Some(4294967295.0),
        VariableType::Basic(BasicType::Int64) => Some(-9223372036854775806.0),
        VariableType::Basic(BasicType::Uint64) => Some(18446744073709551614.0),
        VariableType::Basic(BasicType::Float) => Some(f64::from(9.969_21e36_f32)),
        VariableType::Basic(BasicType::Double) => Some(9.969_209_968_386_869e36),
        _ => None,
    }
}

/// Numeric attribute values widened to f64, `None` when absent or textual
fn numeric_attribute(var: &Variable, name: &str) -> Option<Vec<f64>> {
    let value = var.attribute(name)?.value().ok()?;
    let numbers = match value {
        AttributeValue::Uchar(v) => vec![v as f64],
        AttributeValue::Uchars(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Schar(v) => vec![v as f64],
        AttributeValue::Schars(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Ushort(v) => vec![v as f64],
        AttributeValue::Ushorts(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Short(v) => vec![v as f64],
        AttributeValue::Shorts(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Uint(v) => vec![v as f64],
        AttributeValue::Uints(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Int(v) => vec![v as f64],
        AttributeValue::Ints(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Ulonglong(v) => vec![v as f64],
        AttributeValue::Ulonglongs(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Longlong(v) => vec![v as f64],
        AttributeValue::Longlongs(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Float(v) => vec![v as f64],
        AttributeValue::Floats(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Double(v) => vec![v],
        AttributeValue::Doubles(v) => v,
        _ => return None,
    };
    Some(numbers)
}

/// Indices whose coordinate satisfies `keep`, ascending
fn selected_indices(coords: &[f64], keep: impl Fn(f64) -> bool) -> Vec<usize> {
    coords
        .iter()
        .enumerate()
        .filter(|(_, &c)| keep(c))
        .map(|(i, _)| i)
        .collect()
}

/// Resolve a zone and a display date, then extract the masked grid.
pub fn extract_values<R>(
    index: &FileIndex,
    resolver: &R,
    date: &str,
    zone: &str,
    variable: &str,
) -> Result<ExtractedGrid>
where
    R: ZoneResolver + ?Sized,
{
    let bbox = resolver.bbox_by_name(zone)?;
    let file = index.lookup(date)?;

    debug!(
        date = date,
        zone = zone,
        bbox = %bbox,
        file = %file.path.display(),
        revision = file.revision,
        "Resolved extraction request"
    );

    log_timed_operation("extract_values", || {
        extract_from_file(&file.path, &bbox, variable)
    })
}

/// Read the first time slice of `variable` inside `bbox` from one file.
///
/// The file handle lives only for the duration of this call.
pub fn extract_from_file(path: &Path, bbox: &BoundingBox, variable: &str) -> Result<ExtractedGrid> {
    let access_error = |message: String| FcoverError::DataAccess {
        path: path.to_path_buf(),
        message,
    };

    let file = netcdf::open(path).map_err(|e| access_error(e.to_string()))?;

    let read_coordinate = |name: &str| -> Result<Vec<f64>> {
        let var = file
            .variable(name)
            .ok_or_else(|| access_error(format!("coordinate {} not found", name)))?;
        var.get_values::<f64, _>(..)
            .map_err(|e| access_error(format!("cannot read {}: {}", name, e)))
    };
    let lons = read_coordinate(LON_VARIABLE)?;
    let lats = read_coordinate(LAT_VARIABLE)?;

    let var = file
        .variable(variable)
        .ok_or_else(|| access_error(format!("variable {} not found", variable)))?;

    let dims: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    if dims.len() != 3 {
        return Err(access_error(format!(
            "variable {} has {} dimensions, expected (time, lat, lon)",
            variable,
            dims.len()
        )));
    }
    if dims[0] == 0 {
        return Err(access_error(format!("variable {} has no time slice", variable)));
    }
    if dims[1] != lats.len() || dims[2] != lons.len() {
        return Err(access_error(format!(
            "variable {} is {}x{} but coordinates are {}x{}",
            variable,
            dims[1],
            dims[2],
            lats.len(),
            lons.len()
        )));
    }

    let rows = selected_indices(&lats, |lat| bbox.contains_lat(lat));
    let cols = selected_indices(&lons, |lon| bbox.contains_lon(lon));
    let sel_lats: Vec<f64> = rows.iter().map(|&i| lats[i]).collect();
    let sel_lons: Vec<f64> = cols.iter().map(|&i| lons[i]).collect();

    let (first_row, last_row, first_col, last_col) =
        match (rows.first(), rows.last(), cols.first(), cols.last()) {
            (Some(&r0), Some(&r1), Some(&c0), Some(&c1)) => (r0, r1, c0, c1),
            _ => {
                debug!(
                    path = %path.display(),
                    rows = rows.len(),
                    cols = cols.len(),
                    "Bounding box selects no cell"
                );
                return Ok(ExtractedGrid {
                    values: Array2::zeros((rows.len(), cols.len())),
                    lats: sel_lats,
                    lons: sel_lons,
                });
            }
        };

    // Read the smallest window covering the selection, then gather
    let height = last_row - first_row + 1;
    let width = last_col - first_col + 1;
    let raw = var
        .get_values::<f64, _>((0usize, first_row..last_row + 1, first_col..last_col + 1))
        .map_err(|e| access_error(format!("cannot read {}: {}", variable, e)))?;
    let window = Array2::from_shape_vec((height, width), raw)
        .map_err(|e| access_error(format!("unexpected shape for {}: {}", variable, e)))?;

    let local_rows: Vec<usize> = rows.iter().map(|&r| r - first_row).collect();
    let local_cols: Vec<usize> = cols.iter().map(|&c| c - first_col).collect();
    let selected = window
        .select(Axis(0), &local_rows)
        .select(Axis(1), &local_cols);

    let mask = ValidityMask::from_variable(&var);
    let values = selected.mapv(|raw| mask.unpack(raw));

    debug!(
        path = %path.display(),
        variable = variable,
        rows = values.nrows(),
        cols = values.ncols(),
        "Extracted grid"
    );

    Ok(ExtractedGrid {
        values,
        lats: sel_lats,
        lons: sel_lons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_index;
    use crate::zones::{GeoZone, ZoneCatalog};
    use std::fs::File;
    use tempfile::tempdir;

    /// Write a (time=1, lat, lon) f32 variable with fill value -1
    fn create_grid_file(path: &Path, lats: &[f64], lons: &[f64], values: &[f32]) {
        let mut file = netcdf::create(path).unwrap();
        file.add_dimension("time", 1).unwrap();
        file.add_dimension("lat", lats.len()).unwrap();
        file.add_dimension("lon", lons.len()).unwrap();

        {
            let mut var = file.add_variable::<f64>("lat", &["lat"]).unwrap();
            var.put_values(lats, ..).unwrap();
        }
        {
            let mut var = file.add_variable::<f64>("lon", &["lon"]).unwrap();
            var.put_values(lons, ..).unwrap();
        }
        {
            let mut var = file
                .add_variable::<f32>(DEFAULT_VARIABLE, &["time", "lat", "lon"])
                .unwrap();
            var.set_fill_value(-1.0f32).unwrap();
            var.put_values(values, ..).unwrap();
        }
    }

    /// 2x2 grid on `lat = [11, 13]`, `lon = [21, 23]` whose data variable has
    /// no `_FillValue`, only the given attributes
    fn create_unfilled_file<T: netcdf::NcPutGet>(
        path: &Path,
        values: &[T],
        attributes: Vec<(&str, AttributeValue)>,
    ) {
        let mut file = netcdf::create(path).unwrap();
        file.add_dimension("time", 1).unwrap();
        file.add_dimension("lat", 2).unwrap();
        file.add_dimension("lon", 2).unwrap();

        {
            let mut var = file.add_variable::<f64>("lat", &["lat"]).unwrap();
            var.put_values(&[11.0f64, 13.0], ..).unwrap();
        }
        {
            let mut var = file.add_variable::<f64>("lon", &["lon"]).unwrap();
            var.put_values(&[21.0f64, 23.0], ..).unwrap();
        }
        {
            let mut var = file
                .add_variable::<T>(DEFAULT_VARIABLE, &["time", "lat", "lon"])
                .unwrap();
            for (name, value) in attributes {
                var.put_attribute(name, value).unwrap();
            }
            var.put_values(values, ..).unwrap();
        }
    }

    fn whole_grid() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 90.0, 90.0)
    }

    fn zone1() -> ZoneCatalog {
        ZoneCatalog::from_zones(vec![GeoZone {
            name: "Zone1".to_string(),
            bbox: BoundingBox::new(10.0, 20.0, 15.0, 25.0),
        }])
    }

    #[test]
    fn test_validity_mask() {
        let mask = ValidityMask {
            fill_values: vec![255.0],
            valid_min: Some(0.0),
            valid_max: Some(250.0),
            scale_factor: Some(0.004),
            add_offset: None,
        };
        assert!(mask.is_masked(255.0));
        assert!(mask.is_masked(251.0));
        assert!(mask.is_masked(f64::NAN));
        assert!(!mask.is_masked(250.0));
        assert!((mask.unpack(125.0) - 0.5).abs() < 1e-6);
        assert!(mask.unpack(255.0).is_nan());
    }

    #[test]
    fn test_extract_zone_window() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("AREA_RT0_202303050900_v1.nc");
        let values: Vec<f32> = (0..16).map(|i| i as f32).collect();
        create_grid_file(
            &path,
            &[9.0, 11.0, 13.0, 16.0],
            &[19.0, 21.0, 23.0, 26.0],
            &values,
        );

        let index = build_index(dir.path()).unwrap();
        let grid = extract_values(&index, &zone1(), "05-03-2023", "Zone1", DEFAULT_VARIABLE).unwrap();

        assert_eq!(grid.shape(), (2, 2));
        assert_eq!(grid.lats, vec![11.0, 13.0]);
        assert_eq!(grid.lons, vec![21.0, 23.0]);
        assert_eq!(grid.values[[0, 0]], 5.0);
        assert_eq!(grid.values[[0, 1]], 6.0);
        assert_eq!(grid.values[[1, 0]], 9.0);
        assert_eq!(grid.values[[1, 1]], 10.0);
    }

    #[test]
    fn test_extract_masks_fill_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.nc");
        create_grid_file(&path, &[11.0, 13.0], &[21.0, 23.0], &[0.25, -1.0, -1.0, 0.75]);

        let grid = extract_from_file(&path, &BoundingBox::new(10.0, 20.0, 15.0, 25.0), DEFAULT_VARIABLE)
            .unwrap();
        assert_eq!(grid.values[[0, 0]], 0.25);
        assert!(grid.values[[0, 1]].is_nan());
        assert!(grid.values[[1, 0]].is_nan());
        assert_eq!(grid.values[[1, 1]], 0.75);
        assert_eq!(grid.valid_count(), 2);
    }

    #[test]
    fn test_extract_masks_default_float_fill() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.nc");
        create_unfilled_file::<f32>(&path, &[0.5, 9.969_21e36, 0.25, 1.0], vec![]);

        let grid = extract_from_file(&path, &whole_grid(), DEFAULT_VARIABLE).unwrap();
        assert_eq!(grid.values[[0, 0]], 0.5);
        assert!(grid.values[[0, 1]].is_nan());
        assert_eq!(grid.values[[1, 0]], 0.25);
        assert_eq!(grid.values[[1, 1]], 1.0);
    }

    #[test]
    fn test_extract_masks_missing_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.nc");
        create_unfilled_file::<f32>(
            &path,
            &[0.5, -9.0, -9.0, 1.0],
            vec![("missing_value", AttributeValue::Float(-9.0))],
        );

        let grid = extract_from_file(&path, &whole_grid(), DEFAULT_VARIABLE).unwrap();
        assert_eq!(grid.values[[0, 0]], 0.5);
        assert!(grid.values[[0, 1]].is_nan());
        assert!(grid.values[[1, 0]].is_nan());
        assert_eq!(grid.valid_count(), 2);
    }

    #[test]
    fn test_extract_masks_above_valid_max() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.nc");
        create_unfilled_file::<f32>(
            &path,
            &[-3.0, 0.5, 1.0, 1.5],
            vec![("valid_max", AttributeValue::Float(1.0))],
        );

        let grid = extract_from_file(&path, &whole_grid(), DEFAULT_VARIABLE).unwrap();
        // No lower bound: negative values survive
        assert_eq!(grid.values[[0, 0]], -3.0);
        assert_eq!(grid.values[[0, 1]], 0.5);
        assert_eq!(grid.values[[1, 0]], 1.0);
        assert!(grid.values[[1, 1]].is_nan());
    }

    #[test]
    fn test_extract_byte_variable_has_no_default_fill() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.nc");
        create_unfilled_file::<u8>(&path, &[0, 125, 250, 255], vec![]);

        let grid = extract_from_file(&path, &whole_grid(), DEFAULT_VARIABLE).unwrap();
        assert_eq!(grid.values[[1, 1]], 255.0);
        assert_eq!(grid.values[[0, 1]], 125.0);
        assert_eq!(grid.valid_count(), 4);
    }

    #[test]
    fn test_extract_outside_box_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.nc");
        create_grid_file(&path, &[11.0, 13.0], &[21.0, 23.0], &[1.0, 2.0, 3.0, 4.0]);

        let grid = extract_from_file(&path, &BoundingBox::new(-50.0, -50.0, -40.0, -40.0), DEFAULT_VARIABLE)
            .unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.shape(), (0, 0));
        assert_eq!(grid.summary().valid_cells, 0);
    }

    #[test]
    fn test_extract_missing_variable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.nc");
        create_grid_file(&path, &[11.0], &[21.0], &[1.0]);

        match extract_from_file(&path, &BoundingBox::new(0.0, 0.0, 90.0, 90.0), "LAI") {
            Err(FcoverError::DataAccess { message, .. }) => assert!(message.contains("LAI")),
            other => panic!("Expected data access error, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_unreadable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("AREA_RT1_202303050900_v1.nc");
        File::create(&path).unwrap();

        let index = build_index(dir.path()).unwrap();
        let result = extract_values(&index, &zone1(), "05-03-2023", "Zone1", DEFAULT_VARIABLE);
        assert!(matches!(result, Err(FcoverError::DataAccess { .. })));
    }

    #[test]
    fn test_extract_resolves_zone_before_date() {
        let index = FileIndex::new();
        assert!(matches!(
            extract_values(&index, &zone1(), "05-03-2023", "Nowhere", DEFAULT_VARIABLE),
            Err(FcoverError::UnknownZone { .. })
        ));
        assert!(matches!(
            extract_values(&index, &zone1(), "05-03-2023", "Zone1", DEFAULT_VARIABLE),
            Err(FcoverError::DateNotFound { .. })
        ));
    }

    #[test]
    fn test_summary_and_json() {
        let grid = ExtractedGrid {
            values: Array2::from_shape_vec((1, 3), vec![0.2, f32::NAN, 0.6]).unwrap(),
            lats: vec![12.0],
            lons: vec![21.0, 22.0, 23.0],
        };
        let summary = grid.summary();
        assert_eq!(summary.valid_cells, 2);
        assert_eq!(summary.min, Some(0.2));
        assert_eq!(summary.max, Some(0.6));
        assert!((summary.mean.unwrap() - 0.4).abs() < 1e-6);

        let json = grid.to_json();
        assert!(json["values"][0][1].is_null());
        assert_eq!(json["lon"].as_array().unwrap().len(), 3);
    }
}
