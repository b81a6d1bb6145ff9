//! Test data generation utilities.
//!
//! Builds NetCDF rasters shaped like the Copernicus vegetation products
//! (time, lat, lon) and GeoJSON zone catalogs with known contents.

use serde_json::json;
use std::path::{Path, PathBuf};

// The netcdf crate's error type is enough for fixture writing
use netcdf::Error;
type Result<T> = std::result::Result<T, Error>;

/// Stored value flagging a missing cell in packed rasters
pub const PACKED_FILL: u8 = 255;

/// Packing factor of the packed rasters (0..=250 maps to 0.0..=1.0)
pub const PACKED_SCALE: f64 = 0.004;

/// Creates an f32 raster with a `-1` fill value.
///
/// `values` is row-major over (lat, lon) for the single time step.
pub fn create_float_raster(path: &Path, lats: &[f64], lons: &[f64], values: &[f32]) -> Result<()> {
    let mut file = netcdf::create(path)?;
    add_axes(&mut file, lats, lons)?;

    let mut var = file.add_variable::<f32>("FCOVER", &["time", "lat", "lon"])?;
    var.put_attribute("long_name", "Fraction of green vegetation cover")?;
    var.set_fill_value(-1.0f32)?;
    var.put_values(values, ..)?;

    Ok(())
}

/// Creates a packed u8 raster: fill 255, valid range 0..=250, scale 0.004.
pub fn create_packed_raster(path: &Path, lats: &[f64], lons: &[f64], values: &[u8]) -> Result<()> {
    let mut file = netcdf::create(path)?;
    add_axes(&mut file, lats, lons)?;

    let mut var = file.add_variable::<u8>("FCOVER", &["time", "lat", "lon"])?;
    var.set_fill_value(PACKED_FILL)?;
    var.put_attribute("valid_range", vec![0u8, 250u8])?;
    var.put_attribute("scale_factor", PACKED_SCALE)?;
    var.put_attribute("add_offset", 0.0f64)?;
    var.put_values(values, ..)?;

    Ok(())
}

fn add_axes(file: &mut netcdf::FileMut, lats: &[f64], lons: &[f64]) -> Result<()> {
    file.add_dimension("time", 1)?;
    file.add_dimension("lat", lats.len())?;
    file.add_dimension("lon", lons.len())?;

    file.add_attribute("title", "fcover test raster")?;
    file.add_attribute("institution", "fcover test suite")?;

    {
        let mut time_var = file.add_variable::<f64>("time", &["time"])?;
        time_var.put_attribute("units", "days since 2000-01-01")?;
        time_var.put_values(&[0.0], ..)?;
    }
    {
        let mut lat_var = file.add_variable::<f64>("lat", &["lat"])?;
        lat_var.put_attribute("units", "degrees_north")?;
        lat_var.put_values(lats, ..)?;
    }
    {
        let mut lon_var = file.add_variable::<f64>("lon", &["lon"])?;
        lon_var.put_attribute("units", "degrees_east")?;
        lon_var.put_values(lons, ..)?;
    }

    Ok(())
}

/// Writes a GeoJSON FeatureCollection with one rectangular polygon per zone.
///
/// Boxes are `(lat_min, lon_min, lat_max, lon_max)`.
pub fn write_zone_catalog(path: &Path, zones: &[(&str, (f64, f64, f64, f64))]) -> std::io::Result<PathBuf> {
    let features: Vec<_> = zones
        .iter()
        .map(|(name, (lat0, lon0, lat1, lon1))| {
            json!({
                "type": "Feature",
                "properties": {"name": name},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [lon0, lat0], [lon1, lat0], [lon1, lat1], [lon0, lat1], [lon0, lat0]
                    ]]
                }
            })
        })
        .collect();

    let collection = json!({"type": "FeatureCollection", "features": features});
    std::fs::write(path, collection.to_string())?;
    Ok(path.to_path_buf())
}
