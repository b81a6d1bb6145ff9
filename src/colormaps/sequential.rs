//! Sequential colormaps backed by `colorgrad` presets.

use super::colormap::Colormap;

/// A named preset gradient
pub struct GradientColormap {
    name: String,
    gradient: colorgrad::Gradient,
}

impl GradientColormap {
    pub fn new(name: impl Into<String>, gradient: colorgrad::Gradient) -> Self {
        Self {
            name: name.into(),
            gradient,
        }
    }
}

impl Colormap for GradientColormap {
    fn map_normalized(&self, value: f32) -> [u8; 4] {
        let t = value.clamp(0.0, 1.0) as f64;
        let [r, g, b, _] = self.gradient.at(t).to_rgba8();
        [r, g, b, 255]
    }

    fn name(&self) -> &str {
        &self.name
    }
}
