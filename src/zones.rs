//! Geographic zones and their bounding boxes.
//!
//! The extractor only needs the narrow [`ZoneResolver`] capability. The
//! [`ZoneCatalog`] implementation reads named zones from a GeoJSON
//! FeatureCollection.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{FcoverError, Result};

/// Rectangular region, bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lon_min: f64,
    pub lat_max: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Build from the `(lat0, lon0, lat1, lon1)` ordering used by zone lookups
    pub fn new(lat_min: f64, lon_min: f64, lat_max: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lon_min,
            lat_max,
            lon_max,
        }
    }

    pub fn contains_lat(&self, lat: f64) -> bool {
        self.lat_min <= lat && lat <= self.lat_max
    }

    pub fn contains_lon(&self, lon: f64) -> bool {
        self.lon_min <= lon && lon <= self.lon_max
    }

    /// Grow the box so it covers a `(lon, lat)` position
    fn include(&mut self, lon: f64, lat: f64) {
        self.lat_min = self.lat_min.min(lat);
        self.lat_max = self.lat_max.max(lat);
        self.lon_min = self.lon_min.min(lon);
        self.lon_max = self.lon_max.max(lon);
    }

    fn empty() -> Self {
        Self::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY)
    }

    fn is_valid(&self) -> bool {
        self.lat_min <= self.lat_max && self.lon_min <= self.lon_max
    }
}

impl From<(f64, f64, f64, f64)> for BoundingBox {
    fn from((lat_min, lon_min, lat_max, lon_max): (f64, f64, f64, f64)) -> Self {
        Self::new(lat_min, lon_min, lat_max, lon_max)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lat [{}, {}] lon [{}, {}]",
            self.lat_min, self.lat_max, self.lon_min, self.lon_max
        )
    }
}

/// Maps zone names to bounding boxes
pub trait ZoneResolver {
    /// Zone names in catalog order
    fn zone_names(&self) -> Vec<String>;

    /// Bounding box of a zone, `UnknownZone` when absent
    fn bbox_by_name(&self, name: &str) -> Result<BoundingBox>;
}

/// A named zone of a catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoZone {
    pub name: String,
    pub bbox: BoundingBox,
}

/// Ordered collection of named zones
#[derive(Debug, Clone, Default)]
pub struct ZoneCatalog {
    source: Option<PathBuf>,
    zones: Vec<GeoZone>,
}

impl ZoneCatalog {
    /// Build a catalog from zones already in memory
    pub fn from_zones(zones: Vec<GeoZone>) -> Self {
        Self {
            source: None,
            zones,
        }
    }

    /// Load a GeoJSON FeatureCollection from disk
    pub fn from_geojson_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut catalog = Self::parse_geojson(&content, path)?;
        catalog.source = Some(path.to_path_buf());

        info!(
            path = %path.display(),
            zones = catalog.zones.len(),
            "Loaded zone catalog"
        );
        Ok(catalog)
    }

    /// Parse GeoJSON text. `origin` only labels errors.
    pub fn parse_geojson(content: &str, origin: &Path) -> Result<Self> {
        let catalog_error = |message: String| FcoverError::ZoneCatalog {
            path: origin.to_path_buf(),
            message,
        };

        let root: Value = serde_json::from_str(content)?;
        let features = root
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| catalog_error("expected a FeatureCollection".to_string()))?;

        let mut zones = Vec::with_capacity(features.len());
        for (i, feature) in features.iter().enumerate() {
            let name = feature
                .pointer("/properties/name")
                .and_then(Value::as_str)
                .ok_or_else(|| catalog_error(format!("feature {} has no properties.name", i)))?;

            let bbox = feature_bbox(feature)
                .ok_or_else(|| catalog_error(format!("zone {} has no usable geometry", name)))?;

            debug!(zone = name, bbox = %bbox, "Parsed zone");
            zones.push(GeoZone {
                name: name.to_string(),
                bbox,
            });
        }

        Ok(Self {
            source: None,
            zones,
        })
    }

    /// File the catalog was read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeoZone> {
        self.zones.iter()
    }
}

impl ZoneResolver for ZoneCatalog {
    fn zone_names(&self) -> Vec<String> {
        self.zones.iter().map(|z| z.name.clone()).collect()
    }

    fn bbox_by_name(&self, name: &str) -> Result<BoundingBox> {
        self.zones
            .iter()
            .find(|z| z.name == name)
            .map(|z| z.bbox)
            .ok_or_else(|| FcoverError::UnknownZone {
                name: name.to_string(),
            })
    }
}

/// Bounding box of a feature: its `bbox` member when present, otherwise the
/// extent of every position in its geometry.
fn feature_bbox(feature: &Value) -> Option<BoundingBox> {
    if let Some(bbox) = feature.get("bbox").and_then(Value::as_array) {
        // GeoJSON order is [west, south, east, north]
        let v: Vec<f64> = bbox.iter().filter_map(Value::as_f64).collect();
        if v.len() == 4 {
            return Some(BoundingBox::new(v[1], v[0], v[3], v[2]));
        }
    }

    let mut bbox = BoundingBox::empty();
    collect_positions(feature.get("geometry")?, &mut bbox);
    bbox.is_valid().then_some(bbox)
}

fn collect_positions(geometry: &Value, bbox: &mut BoundingBox) {
    if let Some(members) = geometry.get("geometries").and_then(Value::as_array) {
        for member in members {
            collect_positions(member, bbox);
        }
        return;
    }
    if let Some(coordinates) = geometry.get("coordinates") {
        walk_coordinates(coordinates, bbox);
    }
}

fn walk_coordinates(value: &Value, bbox: &mut BoundingBox) {
    let Some(items) = value.as_array() else {
        return;
    };
    match (items.first().and_then(Value::as_f64), items.get(1).and_then(Value::as_f64)) {
        (Some(lon), Some(lat)) => bbox.include(lon, lat),
        _ => {
            for item in items {
                walk_coordinates(item, bbox);
            }
        }
    }
}
