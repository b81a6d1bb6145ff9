//! Rendering of extracted grids.
//!
//! A [`Presenter`] consumes a grid and a title. [`PngPresenter`] draws the
//! grid through a colormap into a PNG file named after the title.

use image::{ImageBuffer, Rgba, RgbaImage};
use ndarray::ArrayView2;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::colormaps::{get_colormap, Colormap};
use crate::config::RenderConfig;
use crate::error::{FcoverError, Result};
use crate::extract::ExtractedGrid;

/// Something that displays an extracted grid
pub trait Presenter {
    fn render(&mut self, grid: &ExtractedGrid, title: &str) -> Result<()>;
}

/// Title shown for a zone at a date
pub fn plot_title(zone: &str, variable: &str, date: &str) -> String {
    format!("{} [{}] on {}", zone, variable, date)
}

/// File-system friendly version of a title
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            slug.push(c);
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

/// Draw a grid with one `scale`×`scale` block per cell.
///
/// Row 0 is drawn at the top. Colors span the grid's finite min/max and NaN
/// cells are transparent.
pub fn grid_to_image(data: ArrayView2<f32>, colormap: &dyn Colormap, scale: u32) -> Result<RgbaImage> {
    let (rows, cols) = data.dim();
    if rows == 0 || cols == 0 {
        return Err(FcoverError::ImageGeneration {
            message: format!("Cannot render an empty {}x{} grid", rows, cols),
        });
    }
    if scale == 0 {
        return Err(FcoverError::ImageGeneration {
            message: "Scale must be at least 1".to_string(),
        });
    }

    // Find min/max values for normalization
    let mut min_val = f32::INFINITY;
    let mut max_val = f32::NEG_INFINITY;
    for &val in data.iter() {
        if val.is_finite() {
            min_val = min_val.min(val);
            max_val = max_val.max(val);
        }
    }

    let width = cols as u32 * scale;
    let height = rows as u32 * scale;
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let value = data[[(y / scale) as usize, (x / scale) as usize]];
        Rgba(colormap.map(value, min_val, max_val))
    });

    Ok(img)
}

/// Writes each rendered grid to `<output_dir>/<slug>.png`
pub struct PngPresenter {
    output_dir: PathBuf,
    colormap: Box<dyn Colormap>,
    scale: u32,
    last_written: Option<PathBuf>,
}

impl PngPresenter {
    pub fn new(output_dir: impl Into<PathBuf>, colormap: Box<dyn Colormap>, scale: u32) -> Self {
        Self {
            output_dir: output_dir.into(),
            colormap,
            scale,
            last_written: None,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Result<Self> {
        let colormap = get_colormap(&config.colormap)?;
        Ok(Self::new(config.output_dir.clone(), colormap, config.scale))
    }

    /// Path of the image produced by the last successful render
    pub fn last_written(&self) -> Option<&Path> {
        self.last_written.as_deref()
    }
}

impl Presenter for PngPresenter {
    fn render(&mut self, grid: &ExtractedGrid, title: &str) -> Result<()> {
        let img = grid_to_image(grid.values.view(), self.colormap.as_ref(), self.scale)?;

        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{}.png", slugify(title)));
        img.save(&path).map_err(|e| FcoverError::ImageGeneration {
            message: format!("Failed to write {}: {}", path.display(), e),
        })?;

        info!(
            title = title,
            path = %path.display(),
            width = img.width(),
            height = img.height(),
            colormap = self.colormap.name(),
            "Rendered grid"
        );
        self.last_written = Some(path);
        Ok(())
    }
}
