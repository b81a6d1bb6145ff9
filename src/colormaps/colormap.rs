//! Colormap trait and lookup by name.

use super::sequential::GradientColormap;
use crate::error::{FcoverError, Result};

/// Color given to NaN cells (fully transparent)
pub const MISSING_COLOR: [u8; 4] = [0, 0, 0, 0];

/// Names accepted by [`get_colormap`]
pub const COLORMAP_NAMES: &[&str] = &[
    "viridis", "plasma", "inferno", "magma", "cividis", "greens", "yl_gn",
];

/// Trait for color mapping implementations
pub trait Colormap {
    /// Map a normalized value (0.0 to 1.0) to an RGBA color
    fn map_normalized(&self, value: f32) -> [u8; 4];

    /// Map a value to an RGBA color given the data range
    fn map(&self, value: f32, min: f32, max: f32) -> [u8; 4] {
        if value.is_nan() {
            return MISSING_COLOR;
        }
        let normalized = if max > min {
            ((value - min) / (max - min)).clamp(0.0, 1.0)
        } else {
            0.5
        };
        self.map_normalized(normalized)
    }

    /// Get the name of this colormap
    fn name(&self) -> &str;
}

/// Get a colormap by name
pub fn get_colormap(name: &str) -> Result<Box<dyn Colormap>> {
    let lower = name.to_lowercase();
    let gradient = match lower.as_str() {
        "viridis" => colorgrad::viridis(),
        "plasma" => colorgrad::plasma(),
        "inferno" => colorgrad::inferno(),
        "magma" => colorgrad::magma(),
        "cividis" => colorgrad::cividis(),
        "greens" => colorgrad::greens(),
        "yl_gn" | "ylgn" => colorgrad::yl_gn(),
        _ => {
            return Err(FcoverError::InvalidParameter {
                param: "colormap".to_string(),
                message: format!(
                    "Unknown colormap: {}. Available: {}",
                    name,
                    COLORMAP_NAMES.join(", ")
                ),
            })
        }
    };
    Ok(Box::new(GradientColormap::new(lower, gradient)))
}
