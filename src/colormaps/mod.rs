//! Colormaps for rendering extracted grids.
//!
//! Sequential gradients only: vegetation cover is a 0..1 fraction with no
//! meaningful center.

pub mod colormap;
pub mod sequential;

pub use colormap::{get_colormap, Colormap, COLORMAP_NAMES, MISSING_COLOR};
pub use sequential::GradientColormap;
